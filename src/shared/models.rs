use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Who authored a transcript line
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Bot,
    User,
    System,
}

impl Sender {
    /// Short display name for output (Bot, User, Sys)
    pub fn short_name(&self) -> &'static str {
        match self {
            Sender::Bot => "Bot",
            Sender::User => "User",
            Sender::System => "Sys",
        }
    }
}

/// One message of a parsed WhatsApp transcript
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub timestamp: Option<String>,
}

/// Backend-issued row id, either numeric or textual (uuid)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum LeadScore {
    Number(f64),
    Text(String),
}

impl fmt::Display for LeadScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeadScore::Number(n) => write!(f, "{}", n),
            LeadScore::Text(s) => f.write_str(s),
        }
    }
}

/// Lead row carrying an appointment, as selected by the calendar views
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppointmentRecord {
    pub id: RecordId,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub appointment_time: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub lead_score: Option<LeadScore>,
    #[serde(default, rename = "Lead Category", skip_serializing_if = "Option::is_none")]
    pub lead_category: Option<String>,
}

impl AppointmentRecord {
    /// Title used in calendar cells and lists
    pub fn title(&self) -> &str {
        [&self.customer_name, &self.phone, &self.email]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or("Appointment")
    }
}

/// Row of the `whatsapp_conversations` table
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConversationRow {
    pub whatsapp_user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Row of the `lead_store` table.
///
/// Lead columns differ between agent sources, so the row keeps the raw JSON
/// object and exposes typed accessors. Construction only checks that the
/// value is an object; column selection happens through
/// [`ColumnSet`](super::leads::ColumnSet).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(try_from = "Value", into = "Value")]
pub struct LeadRow(Map<String, Value>);

impl LeadRow {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column).filter(|v| !v.is_null())
    }

    /// String value of a column; numbers are rendered, other types are ignored
    pub fn text(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Column names in backend order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Backend `Source` column ("WhatsApp Agent", "Voice Agent")
    pub fn source(&self) -> Option<&str> {
        self.get("Source").and_then(Value::as_str)
    }

    pub fn category(&self) -> Option<&str> {
        self.get("Lead Category").and_then(Value::as_str)
    }

    /// View the row as an appointment, if it carries the required columns
    pub fn to_appointment(&self) -> Option<AppointmentRecord> {
        serde_json::from_value(Value::Object(self.0.clone())).ok()
    }
}

impl TryFrom<Value> for LeadRow {
    type Error = anyhow::Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(anyhow!(
                "lead row must be a JSON object, got {}",
                json_type_name(&other)
            )),
        }
    }
}

impl From<LeadRow> for Value {
    fn from(row: LeadRow) -> Self {
        Value::Object(row.0)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
