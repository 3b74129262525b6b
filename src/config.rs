use anyhow::{Context, Result};
use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::corridor::GoalConfig;
use crate::error::ConfigError;
use crate::import::SlotTimes;
use crate::logging::{LogConfig, LogFormat, LogLevel};
use crate::timezone::{self, DEFAULT_TIMEZONE};

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application metadata
    #[serde(default)]
    pub metadata: ConfigMetadata,

    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,

    /// Goal corridor settings
    #[serde(default)]
    pub goal: GoalConfig,

    /// Data import preferences
    #[serde(default)]
    pub import: ImportSettings,

    /// Logging output
    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// IANA timezone used for day boundaries
    pub timezone: String,

    /// Plot one point per day instead of every measurement
    pub show_daily_averages: bool,

    /// Default display window in days (None shows all history)
    pub default_window_days: Option<u32>,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        let now = Utc::now();

        ConfigMetadata {
            version: "1.0".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            timezone: DEFAULT_TIMEZONE.to_string(),
            show_daily_averages: true,
            default_window_days: None,
        }
    }
}

/// Import settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Times of day assigned to spreadsheet measurement columns
    pub slots: SlotTimes,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            metadata: ConfigMetadata::default(),
            settings: AppSettings::default(),
            goal: GoalConfig::default(),
            import: ImportSettings::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Keys accepted by `get_value` / `set_value`
pub const CONFIG_KEYS: &[&str] = &[
    "settings.timezone",
    "settings.show_daily_averages",
    "settings.default_window_days",
    "goal.target_value",
    "goal.weekly_rate",
    "goal.buffer_fraction",
    "goal.secondary_ratio",
    "import.slots.morning",
    "import.slots.noon",
    "import.slots.evening",
    "logging.level",
    "logging.format",
    "logging.file_path",
];

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_as<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| invalid(key, value))
}

fn parse_slot_time(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| invalid(key, value))
}

fn format_level(level: LogLevel) -> String {
    level.to_filter()
}

fn format_log_format(format: LogFormat) -> &'static str {
    match format {
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
        LogFormat::Compact => "compact",
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config
            .goal
            .validate()
            .with_context(|| format!("Invalid goal in {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".weightrs")
            .join("config.toml")
    }

    /// Load the file at `path`, or defaults when it does not exist yet.
    ///
    /// A file that exists but cannot be parsed is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Configured timezone
    pub fn timezone(&self) -> crate::error::Result<Tz> {
        timezone::parse_timezone(&self.settings.timezone)
    }

    /// Goal settings with unset rates replaced by defaults
    pub fn effective_goal(&self) -> GoalConfig {
        self.goal.with_fallbacks()
    }

    /// Read a setting by dotted key
    pub fn get_value(&self, key: &str) -> Result<String, ConfigError> {
        let value = match key {
            "settings.timezone" => self.settings.timezone.clone(),
            "settings.show_daily_averages" => self.settings.show_daily_averages.to_string(),
            "settings.default_window_days" => self
                .settings
                .default_window_days
                .map(|d| d.to_string())
                .unwrap_or_default(),
            "goal.target_value" => self.goal.target_value.to_string(),
            "goal.weekly_rate" => self.goal.weekly_rate.to_string(),
            "goal.buffer_fraction" => self.goal.buffer_fraction.to_string(),
            "goal.secondary_ratio" => self.goal.secondary_ratio.to_string(),
            "import.slots.morning" => self.import.slots.morning.format("%H:%M").to_string(),
            "import.slots.noon" => self.import.slots.noon.format("%H:%M").to_string(),
            "import.slots.evening" => self.import.slots.evening.format("%H:%M").to_string(),
            "logging.level" => format_level(self.logging.level),
            "logging.format" => format_log_format(self.logging.format).to_string(),
            "logging.file_path" => self
                .logging
                .file_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            _ => {
                return Err(ConfigError::UnknownKey {
                    key: key.to_string(),
                })
            }
        };
        Ok(value)
    }

    /// Update a setting by dotted key.
    ///
    /// An empty value clears optional settings. Goal changes are validated
    /// before they are applied.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "settings.timezone" => {
                timezone::parse_timezone(value).map_err(|_| invalid(key, value))?;
                self.settings.timezone = value.trim().to_string();
            }
            "settings.show_daily_averages" => {
                self.settings.show_daily_averages = parse_as(key, value)?;
            }
            "settings.default_window_days" => {
                self.settings.default_window_days = if value.trim().is_empty() {
                    None
                } else {
                    Some(parse_as(key, value)?)
                };
            }
            "goal.target_value" | "goal.weekly_rate" | "goal.buffer_fraction"
            | "goal.secondary_ratio" => {
                let number: f64 = parse_as(key, value)?;
                let mut goal = self.goal;
                match key {
                    "goal.target_value" => goal.target_value = number,
                    "goal.weekly_rate" => goal.weekly_rate = number,
                    "goal.buffer_fraction" => goal.buffer_fraction = number,
                    _ => goal.secondary_ratio = number,
                }
                goal.validate()?;
                self.goal = goal;
            }
            "import.slots.morning" => self.import.slots.morning = parse_slot_time(key, value)?,
            "import.slots.noon" => self.import.slots.noon = parse_slot_time(key, value)?,
            "import.slots.evening" => self.import.slots.evening = parse_slot_time(key, value)?,
            "logging.level" => {
                self.logging.level = value.parse().map_err(|_| invalid(key, value))?;
            }
            "logging.format" => {
                self.logging.format = value.parse().map_err(|_| invalid(key, value))?;
            }
            "logging.file_path" => {
                self.logging.file_path = if value.trim().is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value.trim()))
                };
            }
            _ => {
                return Err(ConfigError::UnknownKey {
                    key: key.to_string(),
                })
            }
        }

        self.metadata.updated_at = Utc::now();
        Ok(())
    }

    /// All settings as (key, value) pairs, in `CONFIG_KEYS` order
    pub fn list_values(&self) -> Vec<(&'static str, String)> {
        CONFIG_KEYS
            .iter()
            .filter_map(|key| self.get_value(key).ok().map(|v| (*key, v)))
            .collect()
    }
}
