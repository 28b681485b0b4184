use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use tokio::fs as tokio_fs;
use tracing::{info, warn};

/// Decode a JSON export of backend rows.
///
/// Accepts either a bare array or an object with a `data` array (the shape
/// of a REST response). Rows that fail to decode are skipped with a warning.
pub fn rows_from_json<T: DeserializeOwned>(content: &str, origin: &str) -> Result<Vec<T>> {
    let value: Value =
        serde_json::from_str(content).with_context(|| format!("Invalid JSON in {}", origin))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => return Err(anyhow!("{} must contain a JSON array of rows", origin)),
        },
        _ => return Err(anyhow!("{} must contain a JSON array of rows", origin)),
    };

    let mut rows = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<T>(item) {
            Ok(row) => rows.push(row),
            Err(e) => warn!("Skipping row {} of {}: {}", index, origin, e),
        }
    }

    Ok(rows)
}

pub async fn load_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = tokio_fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let rows = rows_from_json(&content, &path.display().to_string())?;
    info!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

pub async fn load_text(path: &Path) -> Result<String> {
    tokio_fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}
