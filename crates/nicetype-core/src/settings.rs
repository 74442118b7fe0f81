// NiceType Settings Module
// Feature toggles, timing and rule tables loaded from TOML

use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::rules::{CompletionRules, PunctuationRules, RuleError};

/// Default window in which two characters combine into a punctuation rule
pub const DEFAULT_CONVERSION_TIMEOUT_MS: u64 = 1000;

/// Default settle delay kept inside the echo-suppression window
pub const DEFAULT_ECHO_SETTLE_MS: u64 = 10;

const MAX_CONVERSION_TIMEOUT_MS: u64 = 60_000;
const MAX_ECHO_SETTLE_MS: u64 = 500;
const MAX_KEY_DELAY_MS: u64 = 100;

const FEATURE_ENABLED: &str = "enabled";
const FEATURE_PUNCTUATION: &str = "punctuation_conversion";
const FEATURE_COMPLETION: &str = "auto_complete";
const FEATURE_CASE_SENSITIVE: &str = "case_sensitive";

const DEFAULT_PUNCTUATION: &[(&str, &str)] = &[
    ("，，", ","),
    ("。。", "."),
    ("；；", ";"),
    ("：：", ":"),
    ("？？", "?"),
    ("！！", "!"),
    ("\u{201c}\u{201d}", "\""),
    ("\u{2018}\u{2019}", "'"),
];

const DEFAULT_COMPLETION: &[(&str, &str)] = &[
    ("(", ")"),
    ("[", "]"),
    ("{", "}"),
    ("\"", "\""),
    ("'", "'"),
    ("（", "）"),
    ("【", "】"),
    ("《", "》"),
    ("\u{201c}", "\u{201d}"),
];

/// Runtime settings for NiceType.
///
/// Loaded from a TOML file (default: ~/.config/nicetype/settings.toml). Every
/// section is optional; a `[punctuation]` or `[completion]` table present in
/// the file replaces the built-in table of the same name.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    enabled: bool,
    punctuation_conversion: bool,
    auto_complete: bool,
    case_sensitive: bool,

    conversion_timeout: Duration,
    echo_settle: Duration,
    key_pre_delay_ms: u64,
    key_post_delay_ms: u64,

    /// Explicit device names/paths to observe (empty = autodetect)
    device_filter: Vec<String>,

    punctuation: PunctuationRules,
    completion: CompletionRules,

    /// Path to the settings file (for reload)
    source_path: Option<PathBuf>,
}

/// Errors that can occur when loading or saving settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),

    #[error("Unknown feature toggle: {0}")]
    UnknownFeature(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(#[from] RuleError),
}

/// TOML representation of the settings file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct SettingsToml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    features: Option<IndexMap<String, toml::Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    timing: Option<TimingSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    devices: Option<DevicesSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    punctuation: Option<IndexMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    completion: Option<IndexMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TimingSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    conversion_timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    echo_settle_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_pre_delay_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_post_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct DevicesSettings {
    #[serde(default)]
    only: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    /// Create settings with the built-in defaults
    pub fn new() -> Self {
        Self {
            enabled: true,
            punctuation_conversion: true,
            auto_complete: true,
            case_sensitive: true,
            conversion_timeout: Duration::from_millis(DEFAULT_CONVERSION_TIMEOUT_MS),
            echo_settle: Duration::from_millis(DEFAULT_ECHO_SETTLE_MS),
            key_pre_delay_ms: 0,
            key_post_delay_ms: 0,
            device_filter: Vec::new(),
            punctuation: default_punctuation_rules(),
            completion: default_completion_rules(),
            source_path: None,
        }
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(&path)?;
        let mut settings = Self::from_toml(&content)?;
        settings.source_path = Some(path.as_ref().to_path_buf());
        Ok(settings)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let toml_settings: SettingsToml =
            toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))?;

        let mut settings = Self::new();

        if let Some(features) = toml_settings.features {
            for (name, value) in features {
                let flag = parse_bool_value(&value)?;
                settings.set_feature(&name, flag)?;
            }
        }

        if let Some(timing) = toml_settings.timing {
            if let Some(ms) = timing.conversion_timeout_ms {
                check_range("timing.conversion_timeout_ms", ms, MAX_CONVERSION_TIMEOUT_MS)?;
                settings.conversion_timeout = Duration::from_millis(ms);
            }
            if let Some(ms) = timing.echo_settle_ms {
                check_range("timing.echo_settle_ms", ms, MAX_ECHO_SETTLE_MS)?;
                settings.echo_settle = Duration::from_millis(ms);
            }
            if let Some(ms) = timing.key_pre_delay_ms {
                check_range("timing.key_pre_delay_ms", ms, MAX_KEY_DELAY_MS)?;
                settings.key_pre_delay_ms = ms;
            }
            if let Some(ms) = timing.key_post_delay_ms {
                check_range("timing.key_post_delay_ms", ms, MAX_KEY_DELAY_MS)?;
                settings.key_post_delay_ms = ms;
            }
        }

        if let Some(devices) = toml_settings.devices {
            settings.device_filter = devices.only;
        }

        if let Some(table) = toml_settings.punctuation {
            settings.punctuation = PunctuationRules::from_pairs(&table)?;
        }

        if let Some(table) = toml_settings.completion {
            settings.completion = CompletionRules::from_pairs(&table)?;
        }

        Ok(settings)
    }

    /// Render the settings as a complete TOML document
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        let mut features = IndexMap::new();
        for (name, value) in self.features() {
            features.insert(name.to_string(), toml::Value::Boolean(value));
        }

        let document = SettingsToml {
            features: Some(features),
            timing: Some(TimingSettings {
                conversion_timeout_ms: Some(self.conversion_timeout.as_millis() as u64),
                echo_settle_ms: Some(self.echo_settle.as_millis() as u64),
                key_pre_delay_ms: Some(self.key_pre_delay_ms),
                key_post_delay_ms: Some(self.key_post_delay_ms),
            }),
            devices: Some(DevicesSettings {
                only: self.device_filter.clone(),
            }),
            punctuation: Some(self.punctuation.to_string_map()),
            completion: Some(self.completion.to_string_map()),
        };

        toml::to_string_pretty(&document).map_err(|e| SettingsError::TomlSerialize(e.to_string()))
    }

    /// Write the settings to `path`, creating the parent directory if needed
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_toml()?)?;
        log::debug!("settings written to {}", path.display());
        Ok(())
    }

    /// Get the default settings path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("nicetype").join("settings.toml"))
    }

    /// Load from default location (~/.config/nicetype/settings.toml)
    pub fn load_default() -> Result<Self, SettingsError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        // Return default settings if file doesn't exist
        Ok(Self::new())
    }

    /// Reload settings from the original file
    pub fn reload(&mut self) -> Result<(), SettingsError> {
        if let Some(ref path) = self.source_path {
            let new_settings = Self::from_file(path)?;
            *self = new_settings;
            Ok(())
        } else {
            Err(SettingsError::InvalidValue("No source path set".to_string()))
        }
    }

    /// Set a feature toggle by its TOML name
    pub fn set_feature(&mut self, name: &str, value: bool) -> Result<(), SettingsError> {
        match name {
            FEATURE_ENABLED => self.enabled = value,
            FEATURE_PUNCTUATION => self.punctuation_conversion = value,
            FEATURE_COMPLETION => self.auto_complete = value,
            FEATURE_CASE_SENSITIVE => self.case_sensitive = value,
            _ => return Err(SettingsError::UnknownFeature(name.to_string())),
        }
        Ok(())
    }

    /// All feature toggles with their TOML names
    pub fn features(&self) -> [(&'static str, bool); 4] {
        [
            (FEATURE_ENABLED, self.enabled),
            (FEATURE_PUNCTUATION, self.punctuation_conversion),
            (FEATURE_COMPLETION, self.auto_complete),
            (FEATURE_CASE_SENSITIVE, self.case_sensitive),
        ]
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_punctuation_conversion_enabled(&self) -> bool {
        self.punctuation_conversion
    }

    pub fn set_punctuation_conversion_enabled(&mut self, enabled: bool) {
        self.punctuation_conversion = enabled;
    }

    pub fn is_auto_complete_enabled(&self) -> bool {
        self.auto_complete
    }

    pub fn set_auto_complete_enabled(&mut self, enabled: bool) {
        self.auto_complete = enabled;
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        self.case_sensitive = case_sensitive;
    }

    pub fn conversion_timeout(&self) -> Duration {
        self.conversion_timeout
    }

    pub fn set_conversion_timeout(&mut self, timeout: Duration) {
        self.conversion_timeout = timeout;
    }

    pub fn echo_settle(&self) -> Duration {
        self.echo_settle
    }

    pub fn set_echo_settle(&mut self, settle: Duration) {
        self.echo_settle = settle;
    }

    /// Output throttle delays (pre, post) in milliseconds
    pub fn key_delays_ms(&self) -> (u64, u64) {
        (self.key_pre_delay_ms, self.key_post_delay_ms)
    }

    pub fn device_filter(&self) -> &[String] {
        &self.device_filter
    }

    pub fn set_device_filter(&mut self, devices: Vec<String>) {
        self.device_filter = devices;
    }

    pub fn punctuation_rules(&self) -> &PunctuationRules {
        &self.punctuation
    }

    pub fn set_punctuation_rules(&mut self, rules: PunctuationRules) {
        self.punctuation = rules;
    }

    pub fn completion_rules(&self) -> &CompletionRules {
        &self.completion
    }

    pub fn set_completion_rules(&mut self, rules: CompletionRules) {
        self.completion = rules;
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }
}

/// The built-in punctuation table
pub fn default_punctuation_rules() -> PunctuationRules {
    let mut rules = PunctuationRules::new();
    for (sequence, replacement) in DEFAULT_PUNCTUATION {
        let mut chars = sequence.chars();
        if let (Some(a), Some(b), Some(r)) = (chars.next(), chars.next(), replacement.chars().next()) {
            rules.insert([a, b], r);
        }
    }
    rules
}

/// The built-in completion table
pub fn default_completion_rules() -> CompletionRules {
    let mut rules = CompletionRules::new();
    for (opener, closer) in DEFAULT_COMPLETION {
        if let (Some(o), Some(c)) = (opener.chars().next(), closer.chars().next()) {
            rules.insert(o, c);
        }
    }
    rules
}

fn check_range(name: &str, value: u64, max: u64) -> Result<(), SettingsError> {
    if value > max {
        return Err(SettingsError::OutOfRange(format!(
            "{} = {} (maximum {})",
            name, value, max
        )));
    }
    Ok(())
}

/// Parse a TOML value as a boolean
fn parse_bool_value(value: &toml::Value) -> Result<bool, SettingsError> {
    match value {
        toml::Value::Boolean(b) => Ok(*b),
        toml::Value::Integer(1) => Ok(true),
        toml::Value::Integer(0) => Ok(false),
        toml::Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(SettingsError::InvalidValue(format!(
                "Cannot convert '{}' to boolean",
                s
            ))),
        },
        _ => Err(SettingsError::InvalidValue(format!(
            "Cannot convert {:?} to boolean",
            value
        ))),
    }
}
