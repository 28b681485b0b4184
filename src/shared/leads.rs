use super::calendar::parse_appointment_time;
use super::models::LeadRow;
use anyhow::{Result, anyhow};
use chrono::TimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

/// Columns shown for WhatsApp Agent leads unless configured otherwise
pub const WHATSAPP_COLUMNS: &[&str] = &[
    "customer_name",
    "phone",
    "email",
    "property_type",
    "requirements",
    "location",
    "timeline",
    "budget",
    "price_estimate",
    "property_address",
    "lead_score",
    "star_rating",
    "current_presence",
    "appointment_time",
    "conversation_summary",
    "GDPR_Consent",
    "Lead Category",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadSource {
    WhatsApp,
    Voice,
}

impl LeadSource {
    /// Value of the backend `Source` column
    pub fn backend_label(&self) -> &'static str {
        match self {
            LeadSource::WhatsApp => "WhatsApp Agent",
            LeadSource::Voice => "Voice Agent",
        }
    }
}

impl fmt::Display for LeadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.backend_label())
    }
}

impl FromStr for LeadSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whatsapp" | "whatsapp agent" => Ok(LeadSource::WhatsApp),
            "voice" | "voice agent" => Ok(LeadSource::Voice),
            other => Err(anyhow!("unknown lead source '{}'", other)),
        }
    }
}

/// Which columns a lead table displays
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSet {
    /// Exactly these columns, in this order
    Only(Vec<String>),
    /// Every column of the first returned row, `id` first
    AllReturned,
}

impl ColumnSet {
    pub fn whatsapp_default() -> Self {
        ColumnSet::Only(WHATSAPP_COLUMNS.iter().map(|c| c.to_string()).collect())
    }

    pub fn resolve(&self, rows: &[LeadRow]) -> Vec<String> {
        match self {
            ColumnSet::Only(columns) => columns.clone(),
            ColumnSet::AllReturned => {
                let Some(first) = rows.first() else {
                    return Vec::new();
                };
                let mut columns: Vec<String> = first.columns().map(str::to_string).collect();
                if let Some(pos) = columns.iter().position(|c| c == "id") {
                    let id = columns.remove(pos);
                    columns.insert(0, id);
                }
                columns
            }
        }
    }
}

impl From<Option<Vec<String>>> for ColumnSet {
    fn from(columns: Option<Vec<String>>) -> Self {
        match columns {
            Some(columns) => ColumnSet::Only(columns),
            None => ColumnSet::AllReturned,
        }
    }
}

pub fn filter_by_source(rows: Vec<LeadRow>, source: LeadSource) -> Vec<LeadRow> {
    rows.into_iter()
        .filter(|row| row.source() == Some(source.backend_label()))
        .collect()
}

// Variant order puts date-like keys before plain strings
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Dated(Reverse<i64>),
    Undated(Reverse<String>),
}

fn sort_key<Tz: TimeZone>(row: &LeadRow, tz: &Tz) -> SortKey {
    let raw = ["appointment_time", "date", "id"]
        .into_iter()
        .find_map(|column| row.text(column))
        .unwrap_or_default();

    match parse_appointment_time(&raw, tz) {
        Some(dt) => SortKey::Dated(Reverse(dt.timestamp_millis())),
        None => SortKey::Undated(Reverse(raw)),
    }
}

/// Order leads newest first by appointment time, falling back to `date` and
/// then `id`. Rows with a date-like key come before the rest, which follow in
/// descending string order. Offset-less times are wall-clock time in `tz`.
pub fn sort_leads<Tz: TimeZone>(rows: &mut [LeadRow], tz: &Tz) {
    rows.sort_by_cached_key(|row| sort_key(row, tz));
}

/// Display text of a single cell
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        // objects and arrays render as compact JSON
        Some(v) => v.to_string(),
    }
}

/// Project rows onto `columns`
pub fn project(rows: &[LeadRow], columns: &[String]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| columns.iter().map(|c| cell_text(row.get(c))).collect())
        .collect()
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// CSV export with a header row; every field is quoted
pub fn to_csv(columns: &[String], rows: &[LeadRow]) -> String {
    let mut out = String::new();

    let header: Vec<String> = columns.iter().map(|c| csv_field(c)).collect();
    out.push_str(&header.join(","));
    out.push('\n');

    for cells in project(rows, columns) {
        let line: Vec<String> = cells.iter().map(|c| csv_field(c)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }

    out
}
