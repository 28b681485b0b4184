use super::leads::{ColumnSet, LeadSource, WHATSAPP_COLUMNS};
use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "saasient-dash";

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct CalendarConfig {
    /// Fixed zone for local-day bucketing; the system zone when unset
    pub utc_offset_minutes: Option<i32>,
}

impl CalendarConfig {
    pub fn fixed_offset(&self) -> Result<Option<FixedOffset>> {
        self.utc_offset_minutes
            .map(|minutes| {
                FixedOffset::east_opt(minutes * 60)
                    .ok_or_else(|| anyhow!("utc_offset_minutes out of range: {}", minutes))
            })
            .transpose()
    }
}

/// Column allow-lists per lead source; `null` shows every returned column
#[derive(Debug, Serialize, Deserialize)]
pub struct LeadColumnsConfig {
    #[serde(default = "LeadColumnsConfig::default_whatsapp")]
    pub whatsapp: Option<Vec<String>>,
    #[serde(default)]
    pub voice: Option<Vec<String>>,
}

impl LeadColumnsConfig {
    fn default_whatsapp() -> Option<Vec<String>> {
        Some(WHATSAPP_COLUMNS.iter().map(|c| c.to_string()).collect())
    }

    pub fn column_set(&self, source: LeadSource) -> ColumnSet {
        match source {
            LeadSource::WhatsApp => self.whatsapp.clone().into(),
            LeadSource::Voice => self.voice.clone().into(),
        }
    }
}

impl Default for LeadColumnsConfig {
    fn default() -> Self {
        Self {
            whatsapp: Self::default_whatsapp(),
            voice: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct LeadsConfig {
    #[serde(default)]
    pub columns: LeadColumnsConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct NicknameConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "StatsConfig::default_upcoming_limit")]
    pub upcoming_limit: usize,
    #[serde(default = "StatsConfig::default_upcoming_days")]
    pub upcoming_days: i64,
}

impl StatsConfig {
    fn default_upcoming_limit() -> usize {
        5
    }

    fn default_upcoming_days() -> i64 {
        7
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            upcoming_limit: 5,
            upcoming_days: 7,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub leads: LeadsConfig,
    #[serde(default)]
    pub nicknames: NicknameConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?
            .join(APP_DIR);
        Ok(config_dir.join("config.yaml"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Read `config_path`, writing the defaults there first if it is missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config = if config_path.exists() {
            let config_content = fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            serde_yaml::from_str(&config_content)
                .with_context(|| format!("Invalid config {}", config_path.display()))?
        } else {
            if let Some(config_dir) = config_path.parent() {
                fs::create_dir_all(config_dir)?;
            }
            let default_config = Self::default();
            let config_content = serde_yaml::to_string(&default_config)?;
            fs::write(config_path, config_content)?;
            default_config
        };

        Ok(config)
    }

    pub fn get_nickname_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.nicknames.path {
            return Ok(path.clone());
        }

        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow!("Could not determine data directory"))?;
        Ok(data_dir.join(APP_DIR).join("nicknames.json"))
    }
}

// Global config instance
use once_cell::sync::OnceCell;
static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(|| {
        Config::load().unwrap_or_else(|e| {
            tracing::warn!("Using default config: {:#}", e);
            Config::default()
        })
    })
}
