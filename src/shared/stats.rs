use super::calendar::parse_appointment_time;
use super::config::StatsConfig;
use super::format::time_until;
use super::models::{AppointmentRecord, ConversationRow, LeadRow};
use chrono::{DateTime, Days, Duration, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LeadCategory {
    Hot,
    Warm,
    Cold,
}

impl LeadCategory {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "HOT" => Some(LeadCategory::Hot),
            "WARM" => Some(LeadCategory::Warm),
            "COLD" => Some(LeadCategory::Cold),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UpcomingAppointment {
    pub appointment: AppointmentRecord,
    pub starts_at: DateTime<Utc>,
    pub time_until: String,
}

/// Headline numbers of the dashboard overview
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardStats {
    pub total_leads: usize,
    pub hot_leads: usize,
    pub warm_leads: usize,
    pub cold_leads: usize,
    pub uncategorized_leads: usize,
    /// Leads with an appointment at or after local midnight today
    pub appointments_from_today: usize,
    /// Conversations updated since local midnight yesterday
    pub active_conversations: usize,
    /// Conversations updated since local midnight today
    pub conversations_today: usize,
    pub upcoming: Vec<UpcomingAppointment>,
}

fn local_midnight_utc<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz, days_back: u64) -> DateTime<Utc> {
    let date = now.with_timezone(tz).date_naive() - Days::new(days_back);
    tz.from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        // midnight skipped by a DST jump
        .unwrap_or_else(|| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

// Offset-less values are wall-clock time in `tz`, as on the calendar
fn parse_instant<Tz: TimeZone>(raw: Option<&str>, tz: &Tz) -> Option<DateTime<Utc>> {
    raw.and_then(|r| parse_appointment_time(r, tz))
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn compute_stats<Tz: TimeZone>(
    leads: &[LeadRow],
    conversations: &[ConversationRow],
    now: DateTime<Utc>,
    tz: &Tz,
    options: &StatsConfig,
) -> DashboardStats {
    let today_start = local_midnight_utc(now, tz, 0);
    let active_since = local_midnight_utc(now, tz, 1);
    let upcoming_until = Duration::try_days(options.upcoming_days)
        .and_then(|window| now.checked_add_signed(window))
        .unwrap_or(if options.upcoming_days < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        });

    let mut stats = DashboardStats {
        total_leads: leads.len(),
        ..Default::default()
    };

    for lead in leads {
        match lead.category().and_then(LeadCategory::parse) {
            Some(LeadCategory::Hot) => stats.hot_leads += 1,
            Some(LeadCategory::Warm) => stats.warm_leads += 1,
            Some(LeadCategory::Cold) => stats.cold_leads += 1,
            None => stats.uncategorized_leads += 1,
        }

        let Some(starts_at) = parse_instant(lead.text("appointment_time").as_deref(), tz) else {
            continue;
        };

        if starts_at >= today_start {
            stats.appointments_from_today += 1;
        }

        if starts_at >= now && starts_at <= upcoming_until {
            if let Some(appointment) = lead.to_appointment() {
                stats.upcoming.push(UpcomingAppointment {
                    appointment,
                    starts_at,
                    time_until: time_until(starts_at, now),
                });
            }
        }
    }

    stats.upcoming.sort_by_key(|u| u.starts_at);
    stats.upcoming.truncate(options.upcoming_limit);

    for conversation in conversations {
        let Some(updated) = parse_instant(conversation.updated_at.as_deref(), tz) else {
            continue;
        };
        if updated >= active_since {
            stats.active_conversations += 1;
        }
        if updated >= today_start {
            stats.conversations_today += 1;
        }
    }

    debug!(
        "Computed stats over {} leads and {} conversations",
        leads.len(),
        conversations.len()
    );

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use serde_json::json;

    fn lead(value: serde_json::Value) -> LeadRow {
        LeadRow::try_from(value).unwrap()
    }

    fn convo(id: &str, updated_at: Option<&str>) -> ConversationRow {
        ConversationRow {
            whatsapp_user_id: id.to_string(),
            name: None,
            phone_number: None,
            label: None,
            content: None,
            updated_at: updated_at.map(str::to_string),
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!(LeadCategory::parse(" hot "), Some(LeadCategory::Hot));
        assert_eq!(LeadCategory::parse("Warm"), Some(LeadCategory::Warm));
        assert_eq!(LeadCategory::parse("lukewarm"), None);
    }

    #[test]
    fn test_category_counts() {
        let leads = vec![
            lead(json!({"id": 1, "Lead Category": "HOT"})),
            lead(json!({"id": 2, "Lead Category": "hot"})),
            lead(json!({"id": 3, "Lead Category": "COLD"})),
            lead(json!({"id": 4})),
        ];
        let utc = FixedOffset::east_opt(0).unwrap();
        let stats = compute_stats(&leads, &[], now(), &utc, &StatsConfig::default());

        assert_eq!(stats.total_leads, 4);
        assert_eq!(stats.hot_leads, 2);
        assert_eq!(stats.warm_leads, 0);
        assert_eq!(stats.cold_leads, 1);
        assert_eq!(stats.uncategorized_leads, 1);
    }

    #[test]
    fn test_upcoming_window_and_limit() {
        let leads = vec![
            lead(json!({"id": 1, "appointment_time": "2024-03-15T08:00:00Z"})),
            lead(json!({"id": 2, "appointment_time": "2024-03-18T09:00:00Z"})),
            lead(json!({"id": 3, "appointment_time": "2024-03-15T14:30:00Z"})),
            lead(json!({"id": 4, "appointment_time": "2024-03-30T09:00:00Z"})),
            lead(json!({"id": 5, "appointment_time": "garbage"})),
        ];
        let utc = FixedOffset::east_opt(0).unwrap();
        let options = StatsConfig {
            upcoming_limit: 1,
            upcoming_days: 7,
        };
        let stats = compute_stats(&leads, &[], now(), &utc, &options);

        assert_eq!(stats.appointments_from_today, 4);
        assert_eq!(stats.upcoming.len(), 1);
        assert_eq!(stats.upcoming[0].appointment.id.to_string(), "3");
        assert_eq!(stats.upcoming[0].time_until, "in 2 hours");
    }

    #[test]
    fn test_today_follows_local_zone() {
        // 23:30 UTC on the 14th is already the 15th in Tokyo
        let leads = vec![lead(json!({"id": 1, "appointment_time": "2024-03-14T23:30:00Z"}))];
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();

        let local = compute_stats(&leads, &[], now(), &tokyo, &StatsConfig::default());
        let plain = compute_stats(&leads, &[], now(), &utc, &StatsConfig::default());

        assert_eq!(local.appointments_from_today, 1);
        assert_eq!(plain.appointments_from_today, 0);
    }

    #[test]
    fn test_active_conversations_since_yesterday() {
        let conversations = vec![
            convo("a", Some("2024-03-15 09:00:00+00")),
            convo("b", Some("2024-03-14 00:00:00+00")),
            convo("c", Some("2024-03-13 23:59:59+00")),
            convo("d", None),
        ];
        let utc = FixedOffset::east_opt(0).unwrap();
        let stats = compute_stats(&[], &conversations, now(), &utc, &StatsConfig::default());

        assert_eq!(stats.active_conversations, 2);
        assert_eq!(stats.conversations_today, 1);
    }

    #[test]
    fn test_conversations_today_follow_local_zone() {
        // 12:00 UTC is 21:00 in Tokyo; the local day began at 15:00 UTC on the 14th
        let conversations = vec![
            convo("a", Some("2024-03-14T16:00:00Z")),
            convo("b", Some("2024-03-14T14:00:00Z")),
            convo("c", Some("2024-03-15 08:00:00")),
        ];
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let stats = compute_stats(&[], &conversations, now(), &tokyo, &StatsConfig::default());

        assert_eq!(stats.conversations_today, 2);
        assert_eq!(stats.active_conversations, 3);
    }

    #[test]
    fn test_offset_less_times_read_in_local_zone() {
        // 02:00 in New York is 07:00 UTC, after local midnight today
        let leads = vec![lead(json!({"id": 1, "appointment_time": "2024-03-15 02:00:00"}))];
        let new_york = FixedOffset::west_opt(5 * 3600).unwrap();
        let stats = compute_stats(&leads, &[], now(), &new_york, &StatsConfig::default());

        let records: Vec<AppointmentRecord> =
            leads.iter().filter_map(LeadRow::to_appointment).collect();
        let buckets = crate::shared::calendar::bucket_by_local_day(&records, &new_york);

        assert_eq!(buckets["2024-03-15"].len(), 1);
        assert_eq!(stats.appointments_from_today, 1);
        assert!(stats.upcoming.is_empty());

        // 09:00 local is 14:00 UTC, two hours from now
        let later = vec![lead(json!({"id": 2, "appointment_time": "2024-03-15T09:00:00"}))];
        let stats = compute_stats(&later, &[], now(), &new_york, &StatsConfig::default());
        assert_eq!(stats.upcoming.len(), 1);
        assert_eq!(stats.upcoming[0].time_until, "in 2 hours");
    }

    #[test]
    fn test_out_of_range_upcoming_window() {
        let leads = vec![lead(json!({"id": 1, "appointment_time": "2024-03-20T09:00:00Z"}))];
        let utc = FixedOffset::east_opt(0).unwrap();

        let wide = StatsConfig {
            upcoming_limit: 5,
            upcoming_days: i64::MAX,
        };
        assert_eq!(compute_stats(&leads, &[], now(), &utc, &wide).upcoming.len(), 1);

        let negative = StatsConfig {
            upcoming_limit: 5,
            upcoming_days: i64::MIN,
        };
        assert!(compute_stats(&leads, &[], now(), &utc, &negative).upcoming.is_empty());
    }
}
