use super::calendar::parse_appointment_time;
use chrono::{DateTime, TimeZone, Utc};

const ELLIPSIS: char = '…';

/// `2024-03-15 10:30` in `tz`, or an empty string for unparsable input
pub fn format_timestamp<Tz: TimeZone>(raw: Option<&str>, tz: &Tz) -> String {
    format_with(raw, tz, "%Y-%m-%d %H:%M")
}

/// Clock time only, e.g. `09:30`
pub fn format_time_short<Tz: TimeZone>(raw: Option<&str>, tz: &Tz) -> String {
    format_with(raw, tz, "%H:%M")
}

/// Long form used in appointment details, e.g. `Friday, March 15, 2024 10:30`
pub fn format_full<Tz: TimeZone>(raw: Option<&str>, tz: &Tz) -> String {
    format_with(raw, tz, "%A, %B %-d, %Y %H:%M")
}

fn format_with<Tz: TimeZone>(raw: Option<&str>, tz: &Tz, pattern: &str) -> String {
    raw.and_then(|r| parse_appointment_time(r, tz))
        .map(|dt| dt.naive_local().format(pattern).to_string())
        .unwrap_or_default()
}

/// Collapse whitespace and cut to at most `max` characters, ending with `…`
/// when truncated.
pub fn preview_text(text: Option<&str>, max: usize) -> String {
    let collapsed = text
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if collapsed.chars().count() <= max {
        return collapsed;
    }

    let mut preview: String = collapsed.chars().take(max.saturating_sub(1)).collect();
    preview.push(ELLIPSIS);
    preview
}

/// Relative label for an upcoming appointment: `in 2 days`, `in 1 hour`, `soon`
pub fn time_until(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = target - now;
    let hours = diff.num_milliseconds().div_euclid(3_600_000);
    let days = hours.div_euclid(24);

    if days > 0 {
        format!("in {} {}", days, if days == 1 { "day" } else { "days" })
    } else if hours > 0 {
        format!("in {} {}", hours, if hours == 1 { "hour" } else { "hours" })
    } else {
        "soon".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    #[test]
    fn test_format_timestamp_in_zone() {
        let paris = FixedOffset::east_opt(3600).unwrap();
        let raw = Some("2024-03-15 09:30:00+00");

        assert_eq!(format_timestamp(raw, &paris), "2024-03-15 10:30");
        assert_eq!(format_time_short(raw, &paris), "10:30");
        assert_eq!(format_full(raw, &paris), "Friday, March 15, 2024 10:30");
    }

    #[test]
    fn test_format_unparsable_is_empty() {
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(format_timestamp(None, &utc), "");
        assert_eq!(format_timestamp(Some("whenever"), &utc), "");
    }

    #[test]
    fn test_preview_text() {
        assert_eq!(preview_text(None, 10), "");
        assert_eq!(preview_text(Some("  two\n\tlines  "), 48), "two lines");
        assert_eq!(preview_text(Some("abcdefghij"), 10), "abcdefghij");
        assert_eq!(preview_text(Some("abcdefghijk"), 10), "abcdefghi…");
        assert_eq!(preview_text(Some("ééééé"), 3), "éé…");
    }

    #[test]
    fn test_time_until() {
        let now = Utc::now();

        assert_eq!(time_until(now + Duration::days(3), now), "in 3 days");
        assert_eq!(time_until(now + Duration::hours(25), now), "in 1 day");
        assert_eq!(time_until(now + Duration::minutes(150), now), "in 2 hours");
        assert_eq!(time_until(now + Duration::minutes(61), now), "in 1 hour");
        assert_eq!(time_until(now + Duration::minutes(20), now), "soon");
        assert_eq!(time_until(now - Duration::hours(5), now), "soon");
    }
}
