//! Error types for repersona
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-facing messages with hints
//! - Exit codes for CLI

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for repersona operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Persona errors (3xx)
    PersonaIncomplete = 300,
    PersonaMissing = 301,
    PersonaFileInvalid = 302,

    // Input errors (4xx)
    EmptyInput = 400,

    // Provider errors (5xx)
    ProviderFailed = 500,
    ProviderAuth = 501,
    ProviderUnknown = 502,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10,
            200..=299 => 20,
            300..=399 => 30,
            400..=499 => 40,
            500..=599 => 50,
            900..=999 => 90,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Persona Errors
    // ─────────────────────────────────────────────────────────────

    /// Required persona fields were left empty
    #[error("Please fill in all required fields: {}", fields.join(", "))]
    MissingPersonaFields { fields: Vec<&'static str> },

    /// Persona file exists but is not a valid persona
    #[error("Invalid persona file: {message}")]
    PersonaFile {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// A chat or export was attempted before a persona exists
    #[error("No persona has been created yet")]
    NoPersona,

    // ─────────────────────────────────────────────────────────────
    // Input Errors
    // ─────────────────────────────────────────────────────────────

    /// Empty message or empty export
    #[error("Nothing to {action}")]
    EmptyInput { action: &'static str },

    // ─────────────────────────────────────────────────────────────
    // Provider Errors
    // ─────────────────────────────────────────────────────────────

    /// No API key available for the selected provider
    #[error("No API key provided for {provider}")]
    MissingApiKey { provider: String },

    /// The hosted provider returned an error or could not be reached
    #[error("{provider} API error: {message}")]
    Provider { provider: String, message: String },

    /// Unknown provider name
    #[error("Unknown provider '{0}'")]
    UnknownProvider(String),

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::Config(_) => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,

            Error::MissingPersonaFields { .. } => ErrorCode::PersonaIncomplete,
            Error::NoPersona => ErrorCode::PersonaMissing,
            Error::PersonaFile { .. } => ErrorCode::PersonaFileInvalid,

            Error::EmptyInput { .. } => ErrorCode::EmptyInput,

            Error::MissingApiKey { .. } => ErrorCode::ProviderAuth,
            Error::Provider { .. } => {
                if self.is_authentication_problem() {
                    ErrorCode::ProviderAuth
                } else {
                    ErrorCode::ProviderFailed
                }
            }
            Error::UnknownProvider(_) => ErrorCode::ProviderUnknown,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Whether the failure looks like a missing or rejected API key.
    ///
    /// Provider messages are free text, so this is a keyword heuristic over
    /// the message: anything mentioning "api", "key" or "auth".
    pub fn is_authentication_problem(&self) -> bool {
        match self {
            Error::MissingApiKey { .. } => true,
            Error::Provider { message, .. } => {
                let lower = message.to_lowercase();
                lower.contains("api") || lower.contains("key") || lower.contains("auth")
            }
            _ => false,
        }
    }

    /// Whether the error came from a hosted provider
    pub fn is_provider_error(&self) -> bool {
        matches!(self, Error::Provider { .. } | Error::MissingApiKey { .. })
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Facing Messages
    // ─────────────────────────────────────────────────────────────

    /// Message shown in the chat when a provider call fails
    pub fn user_message(&self) -> String {
        if self.is_authentication_problem() {
            format!(
                "API Key Error: The API key appears to be invalid or missing. \
                 Please check your API key.\n\nError details: {}",
                self
            )
        } else if self.is_provider_error() {
            format!("Could not generate a response: {}", self)
        } else {
            self.to_string()
        }
    }

    /// Get a suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'repersona config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'repersona config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values."
            ),
            Error::MissingPersonaFields { .. } => Some(
                "Religious tradition, denomination, geographic context and demographics are required."
            ),
            Error::PersonaFile { .. } => Some(
                "Persona files take tradition, denomination, context, demographics, personality, \
                 knowledge, engagement and attitude. Levels are low, medium or high."
            ),
            Error::MissingApiKey { .. } => Some(
                "Pass --api-key or set REPERSONA_API_KEY. Keys are never written to disk."
            ),
            Error::UnknownProvider(_) => Some(
                "Valid providers: openai, anthropic, gemini, deepseek."
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            self.code().as_str(),
            self
        );

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Error::ConfigNotFound { path: path.into() }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a provider error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
