use super::models::AppointmentRecord;
use chrono::{
    DateTime, Datelike, Days, Duration, LocalResult, Months, NaiveDate, NaiveDateTime, NaiveTime,
    Offset, TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Appointments grouped by local calendar day, keyed `YYYY-MM-DD`
pub type DayBucketMap = BTreeMap<String, Vec<AppointmentRecord>>;

pub const MONTH_GRID_CELLS: u64 = 42;
pub const WEEK_GRID_CELLS: u64 = 7;
pub const HOURS_PER_DAY: usize = 24;

// Postgres renders `timestamptz` as `2026-01-26 09:23:03+00`
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M%#z",
    "%Y-%m-%dT%H:%M%#z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a backend timestamp into `tz`.
///
/// Values without an offset are taken as wall-clock time in `tz`; a bare date
/// is midnight UTC. Returns `None` for anything unparsable.
pub fn parse_appointment_time<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(tz));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(tz));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return resolve_local(&naive, tz);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)).with_timezone(tz))
}

/// Place a wall-clock time in `tz`. Repeated times take the earlier instant;
/// times skipped by a DST jump move forward by the length of the gap, reading
/// them with the offset in effect before the jump.
fn resolve_local<Tz: TimeZone>(naive: &NaiveDateTime, tz: &Tz) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => {
            let before = naive.checked_sub_signed(Duration::days(1))?;
            let offset = tz.offset_from_utc_datetime(&before).fix();
            let utc = naive
                .checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))?;
            Some(tz.from_utc_datetime(&utc))
        }
    }
}

/// Canonical bucket key for a local date
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Local date of a record's appointment, if it has a usable one
pub fn local_date<Tz: TimeZone>(record: &AppointmentRecord, tz: &Tz) -> Option<NaiveDate> {
    record
        .appointment_time
        .as_deref()
        .and_then(|raw| parse_appointment_time(raw, tz))
        .map(|dt| dt.date_naive())
}

/// Group records by the local day of their appointment.
///
/// Records without a parsable `appointment_time` are left out. Records keep
/// their input order inside each bucket, so sort before bucketing.
pub fn bucket_by_local_day<Tz: TimeZone>(records: &[AppointmentRecord], tz: &Tz) -> DayBucketMap {
    let mut buckets = DayBucketMap::new();

    for record in records {
        if let Some(date) = local_date(record, tz) {
            buckets
                .entry(date_key(date))
                .or_default()
                .push(record.clone());
        }
    }

    buckets
}

/// Sort records ascending by appointment time. Missing or unparsable times
/// sort as the epoch.
pub fn sort_by_time<Tz: TimeZone>(records: &mut [AppointmentRecord], tz: &Tz) {
    records.sort_by_cached_key(|record| {
        record
            .appointment_time
            .as_deref()
            .and_then(|raw| parse_appointment_time(raw, tz))
            .map(|dt| dt.timestamp_millis())
            .unwrap_or(0)
    });
}

/// Keep records whose local appointment date falls within `[start, end]`
pub fn records_in_range<Tz: TimeZone>(
    records: &[AppointmentRecord],
    start: NaiveDate,
    end: NaiveDate,
    tz: &Tz,
) -> Vec<AppointmentRecord> {
    records
        .iter()
        .filter(|record| local_date(record, tz).is_some_and(|d| d >= start && d <= end))
        .cloned()
        .collect()
}

pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Monday on or before `date`, or the earliest representable date
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
        .unwrap_or(NaiveDate::MIN)
}

// Cells past the last representable date are dropped
fn days_from(start: NaiveDate, count: u64) -> impl Iterator<Item = NaiveDate> {
    (0..count).map_while(move |offset| start.checked_add_days(Days::new(offset)))
}

pub fn today<Tz: TimeZone>(tz: &Tz) -> NaiveDate {
    Utc::now().with_timezone(tz).date_naive()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridDay {
    pub date: NaiveDate,
    pub in_month: bool,
    pub is_today: bool,
}

/// The 6x7 month grid shown for `cursor`, starting on the Monday before the
/// first of the month. Always 42 cells; days of adjacent months have
/// `in_month == false`.
pub fn month_grid(cursor: NaiveDate, today: NaiveDate) -> Vec<GridDay> {
    let start = start_of_week(start_of_month(cursor));
    days_from(start, MONTH_GRID_CELLS)
        .map(|date| GridDay {
            date,
            in_month: date.month() == cursor.month() && date.year() == cursor.year(),
            is_today: date == today,
        })
        .collect()
}

/// Monday to Sunday of the week containing `cursor`
pub fn week_grid(cursor: NaiveDate) -> Vec<NaiveDate> {
    days_from(start_of_week(cursor), WEEK_GRID_CELLS).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourSlot {
    pub hour: u32,
    pub appointments: Vec<AppointmentRecord>,
}

/// Partition the appointments of `cursor`'s day into 24 hourly slots
pub fn day_grid<Tz: TimeZone>(cursor: NaiveDate, buckets: &DayBucketMap, tz: &Tz) -> Vec<HourSlot> {
    let mut slots: Vec<HourSlot> = (0..HOURS_PER_DAY as u32)
        .map(|hour| HourSlot {
            hour,
            appointments: Vec::new(),
        })
        .collect();

    let Some(records) = buckets.get(&date_key(cursor)) else {
        return slots;
    };

    for record in records {
        let parsed = record
            .appointment_time
            .as_deref()
            .and_then(|raw| parse_appointment_time(raw, tz));
        if let Some(dt) = parsed {
            slots[dt.hour() as usize].appointments.push(record.clone());
        }
    }

    slots
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Day,
    Week,
    #[default]
    Month,
}

impl FromStr for ViewMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(ViewMode::Day),
            "week" => Ok(ViewMode::Week),
            "month" => Ok(ViewMode::Month),
            other => Err(anyhow::anyhow!(
                "unknown view mode '{}', expected day, week or month",
                other
            )),
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewMode::Day => "day",
            ViewMode::Week => "week",
            ViewMode::Month => "month",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Shift by whole months with calendar rollover: the day of month is kept and
/// any overflow carries into the following month (Jan 31 + 1 month = Mar 2 in
/// a leap year, Mar 31 - 1 month = Mar 2).
fn add_months_rollover(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let first = date.with_day(1)?;
    let first = if months < 0 {
        first.checked_sub_months(Months::new(months.unsigned_abs()))?
    } else {
        first.checked_add_months(Months::new(months.unsigned_abs()))?
    };
    first.checked_add_days(Days::new(u64::from(date.day0())))
}

/// Move the cursor one page in `mode`. Stays put at the edge of the
/// representable range.
pub fn step(cursor: NaiveDate, mode: ViewMode, direction: Direction) -> NaiveDate {
    let moved = match (mode, direction) {
        (ViewMode::Day, Direction::Next) => cursor.checked_add_days(Days::new(1)),
        (ViewMode::Day, Direction::Previous) => cursor.checked_sub_days(Days::new(1)),
        (ViewMode::Week, Direction::Next) => cursor.checked_add_days(Days::new(7)),
        (ViewMode::Week, Direction::Previous) => cursor.checked_sub_days(Days::new(7)),
        (ViewMode::Month, Direction::Next) => add_months_rollover(cursor, 1),
        (ViewMode::Month, Direction::Previous) => add_months_rollover(cursor, -1),
    };
    moved.unwrap_or(cursor)
}

/// Apply `count` steps; negative counts move backwards
pub fn step_by(cursor: NaiveDate, mode: ViewMode, count: i32) -> NaiveDate {
    let direction = if count < 0 {
        Direction::Previous
    } else {
        Direction::Next
    };
    (0..count.unsigned_abs()).fold(cursor, |date, _| step(date, mode, direction))
}

fn span(start: NaiveDate, cells: u64) -> (NaiveDate, NaiveDate) {
    let end = start
        .checked_add_days(Days::new(cells - 1))
        .unwrap_or(NaiveDate::MAX);
    (start, end)
}

/// First and last date visible in `mode`, used as the fetch window
pub fn visible_range(cursor: NaiveDate, mode: ViewMode) -> (NaiveDate, NaiveDate) {
    match mode {
        ViewMode::Day => (cursor, cursor),
        ViewMode::Week => span(start_of_week(cursor), WEEK_GRID_CELLS),
        ViewMode::Month => span(start_of_week(start_of_month(cursor)), MONTH_GRID_CELLS),
    }
}
