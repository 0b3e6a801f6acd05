//! Configuration system for repersona
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (REPERSONA_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values
//!
//! API keys are deliberately absent: they come from the command line or the
//! environment for the current session only and are never written to disk.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::persona::compiler::DEFAULT_SETTING;
use crate::provider::ProviderKind;

/// Upper bound for `max_retries` in any provider section
pub const MAX_RETRIES: u32 = 10;

/// Upper bound for `timeout_secs` in any provider section
pub const MAX_TIMEOUT_SECS: u64 = 600;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Provider selection and token limits
    pub provider: ProviderSettings,

    /// Conversation window and export location
    pub conversation: ConversationSettings,

    /// Persona prompt settings
    pub persona: PersonaSettings,

    /// OpenAI chat-completions endpoint
    pub openai: EndpointSettings,

    /// Anthropic messages endpoint
    pub anthropic: EndpointSettings,

    /// Google Gemini generateContent endpoint
    pub gemini: EndpointSettings,

    /// DeepSeek (OpenAI-compatible) endpoint
    pub deepseek: EndpointSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Provider selection and request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Provider used when --provider is not given
    pub default: ProviderKind,

    /// Token ceiling for conversation replies
    pub chat_max_tokens: u32,

    /// Sampling temperature for conversation replies (provider default if unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_temperature: Option<f32>,

    /// Token ceiling for the persona introduction
    pub intro_max_tokens: u32,

    /// Sampling temperature for the persona introduction
    pub intro_temperature: f32,
}

/// Conversation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationSettings {
    /// Number of prior turns sent with each message, for every provider
    pub context_turns: usize,

    /// Directory transcripts are exported to
    pub export_dir: String,
}

/// Persona prompt settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaSettings {
    /// Where the roleplay takes place, e.g. "a Swedish school setting"
    pub setting: String,
}

/// Connection settings for one hosted provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EndpointSettings {
    /// API base URL
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries on 429/5xx and connection failures
    pub max_retries: u32,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// Default implementations

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            default: ProviderKind::OpenAi,
            chat_max_tokens: 500,
            chat_temperature: None,
            intro_max_tokens: 200,
            intro_temperature: 0.7,
        }
    }
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            context_turns: 10,
            export_dir: ".".to_string(),
        }
    }
}

impl Default for PersonaSettings {
    fn default() -> Self {
        Self {
            setting: DEFAULT_SETTING.to_string(),
        }
    }
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self::openai()
    }
}

impl EndpointSettings {
    fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            model: model.to_string(),
            timeout_secs: 120,
            max_retries: 2,
        }
    }

    pub fn openai() -> Self {
        Self::new("https://api.openai.com/v1", "gpt-4o")
    }

    pub fn anthropic() -> Self {
        Self::new("https://api.anthropic.com/v1", "claude-sonnet-4-20250514")
    }

    pub fn gemini() -> Self {
        Self::new("https://generativelanguage.googleapis.com/v1beta", "gemini-1.5-pro")
    }

    pub fn deepseek() -> Self {
        Self::new("https://api.deepseek.com/v1", "deepseek-chat")
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
            max_files: 5,
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Default configuration with each endpoint section pointing at its vendor
    pub fn with_vendor_defaults() -> Self {
        Self {
            openai: EndpointSettings::openai(),
            anthropic: EndpointSettings::anthropic(),
            gemini: EndpointSettings::gemini(),
            deepseek: EndpointSettings::deepseek(),
            ..Default::default()
        }
    }

    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::with_vendor_defaults();

        // 1. Load from config file if it exists
        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            config = Self::from_toml(&content)?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides();

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML document; sections left out keep their vendor defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(content).map_err(|e| Error::ConfigParse {
            message: e.to_string(),
            source: Some(e),
        })?;
        Ok(file.into_config())
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            return if path.exists() {
                Ok(Some(path))
            } else {
                Err(Error::config_not_found(path))
            };
        }

        let search_paths = [
            PathBuf::from("repersona.toml"),
            dirs::config_dir()
                .map(|p| p.join("repersona").join("config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".repersona").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("REPERSONA_PROVIDER") {
            if let Ok(kind) = val.parse() {
                self.provider.default = kind;
            }
        }
        if let Ok(val) = std::env::var("REPERSONA_CHAT_MAX_TOKENS") {
            if let Ok(n) = val.parse() {
                self.provider.chat_max_tokens = n;
            }
        }

        if let Ok(val) = std::env::var("REPERSONA_CONTEXT_TURNS") {
            if let Ok(n) = val.parse() {
                self.conversation.context_turns = n;
            }
        }
        if let Ok(val) = std::env::var("REPERSONA_EXPORT_DIR") {
            self.conversation.export_dir = val;
        }

        if let Ok(val) = std::env::var("REPERSONA_SETTING") {
            self.persona.setting = val;
        }

        for (prefix, endpoint) in [
            ("OPENAI", &mut self.openai),
            ("ANTHROPIC", &mut self.anthropic),
            ("GEMINI", &mut self.gemini),
            ("DEEPSEEK", &mut self.deepseek),
        ] {
            if let Ok(val) = std::env::var(format!("REPERSONA_{}_BASE_URL", prefix)) {
                endpoint.base_url = val;
            }
            if let Ok(val) = std::env::var(format!("REPERSONA_{}_MODEL", prefix)) {
                endpoint.model = val;
            }
            if let Ok(val) = std::env::var(format!("REPERSONA_{}_TIMEOUT_SECS", prefix)) {
                if let Ok(n) = val.parse() {
                    endpoint.timeout_secs = n;
                }
            }
        }

        if let Ok(val) = std::env::var("REPERSONA_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("REPERSONA_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("REPERSONA_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        self.conversation.export_dir = expand_path(&self.conversation.export_dir);

        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.conversation.context_turns == 0 {
            return Err(Error::config_field_invalid(
                "conversation.context_turns",
                "context_turns must be at least 1",
            ));
        }

        if self.provider.chat_max_tokens == 0 || self.provider.intro_max_tokens == 0 {
            return Err(Error::config_field_invalid(
                "provider",
                "max token limits must be greater than 0",
            ));
        }

        if !(0.0..=2.0).contains(&self.provider.intro_temperature) {
            return Err(Error::config_field_invalid(
                "provider.intro_temperature",
                "intro_temperature must be between 0.0 and 2.0",
            ));
        }

        if self.persona.setting.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "persona.setting",
                "setting cannot be empty",
            ));
        }

        for (section, endpoint) in [
            ("openai", &self.openai),
            ("anthropic", &self.anthropic),
            ("gemini", &self.gemini),
            ("deepseek", &self.deepseek),
        ] {
            if !endpoint.base_url.starts_with("http://") && !endpoint.base_url.starts_with("https://") {
                return Err(Error::config_field_invalid(
                    format!("{}.base_url", section),
                    "base_url must start with http:// or https://",
                ));
            }
            if endpoint.model.trim().is_empty() {
                return Err(Error::config_field_invalid(
                    format!("{}.model", section),
                    "model cannot be empty",
                ));
            }
            if endpoint.timeout_secs == 0 || endpoint.timeout_secs > MAX_TIMEOUT_SECS {
                return Err(Error::config_field_invalid(
                    format!("{}.timeout_secs", section),
                    format!("timeout_secs must be between 1 and {}", MAX_TIMEOUT_SECS),
                ));
            }
            if endpoint.max_retries > MAX_RETRIES {
                return Err(Error::config_field_invalid(
                    format!("{}.max_retries", section),
                    format!("max_retries must be at most {}", MAX_RETRIES),
                ));
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Endpoint settings for a hosted provider
    pub fn endpoint(&self, kind: ProviderKind) -> Option<&EndpointSettings> {
        match kind {
            ProviderKind::OpenAi => Some(&self.openai),
            ProviderKind::Anthropic => Some(&self.anthropic),
            ProviderKind::Gemini => Some(&self.gemini),
            ProviderKind::DeepSeek => Some(&self.deepseek),
            ProviderKind::Mock => None,
        }
    }

    /// Export directory as a PathBuf
    pub fn export_dir(&self) -> PathBuf {
        PathBuf::from(&self.conversation.export_dir)
    }
}

/// On-disk shape: endpoint sections are optional so a partial section
/// only overrides the fields it names.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    provider: ProviderSettings,
    conversation: ConversationSettings,
    persona: PersonaSettings,
    openai: Option<EndpointOverrides>,
    anthropic: Option<EndpointOverrides>,
    gemini: Option<EndpointOverrides>,
    deepseek: Option<EndpointOverrides>,
    logging: LoggingSettings,
}

impl FileConfig {
    fn into_config(self) -> AppConfig {
        AppConfig {
            provider: self.provider,
            conversation: self.conversation,
            persona: self.persona,
            openai: merge_endpoint(EndpointSettings::openai(), self.openai),
            anthropic: merge_endpoint(EndpointSettings::anthropic(), self.anthropic),
            gemini: merge_endpoint(EndpointSettings::gemini(), self.gemini),
            deepseek: merge_endpoint(EndpointSettings::deepseek(), self.deepseek),
            logging: self.logging,
        }
    }
}

/// A vendor section as written in the file; unset fields keep the defaults
#[derive(Debug, Default, Deserialize)]
struct EndpointOverrides {
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

fn merge_endpoint(mut base: EndpointSettings, overrides: Option<EndpointOverrides>) -> EndpointSettings {
    let Some(o) = overrides else {
        return base;
    };
    if let Some(v) = o.base_url {
        base.base_url = v;
    }
    if let Some(v) = o.model {
        base.model = v;
    }
    if let Some(v) = o.timeout_secs {
        base.timeout_secs = v;
    }
    if let Some(v) = o.max_retries {
        base.max_retries = v;
    }
    base
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".repersona")
                .join("config.toml")
        });

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# repersona configuration
#
# API keys are never read from this file. Pass --api-key, or set
# REPERSONA_API_KEY / OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY /
# DEEPSEEK_API_KEY in the environment.

[provider]
# Provider used when --provider is not given: openai, anthropic, gemini, deepseek
default = "openai"

# Token ceiling for conversation replies
chat_max_tokens = 500

# Token ceiling and temperature for the persona introduction
intro_max_tokens = 200
intro_temperature = 0.7

[conversation]
# Prior turns sent with every message (same for all providers)
context_turns = 10

# Where /export writes transcripts
export_dir = "."

[persona]
# Where the roleplay takes place
setting = "a Swedish school setting"

[openai]
base_url = "https://api.openai.com/v1"
model = "gpt-4o"
timeout_secs = 120
max_retries = 2

[anthropic]
base_url = "https://api.anthropic.com/v1"
model = "claude-sonnet-4-20250514"
timeout_secs = 120
max_retries = 2

[gemini]
base_url = "https://generativelanguage.googleapis.com/v1beta"
model = "gemini-1.5-pro"
timeout_secs = 120
max_retries = 2

[deepseek]
base_url = "https://api.deepseek.com/v1"
model = "deepseek-chat"
timeout_secs = 120
max_retries = 2

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log file path (comment out to disable file logging)
# file = "~/.repersona/logs/repersona.log"

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#
    .to_string()
}
