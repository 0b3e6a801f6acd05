//! Core types for the persona system.
//!
//! A persona is the structured character the hosted model is asked to play:
//! who they are, how much they know about their tradition, how much they
//! practise, and how they feel about it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Sentinel stored when no personality details were given.
pub const PERSONALITY_NOT_SPECIFIED: &str = "Not specified";

// ─────────────────────────────────────────────────────────────────
// Graded Attributes
// ─────────────────────────────────────────────────────────────────

/// Three-step scale used for both knowledge and engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Level {
    #[default]
    Low,
    Medium,
    High,
}

impl Level {
    /// Label used in prompts and exports ("Low", "Medium", "High").
    pub fn label(&self) -> &'static str {
        match self {
            Level::Low => "Low",
            Level::Medium => "Medium",
            Level::High => "High",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Level::Low),
            "medium" | "med" => Ok(Level::Medium),
            "high" => Ok(Level::High),
            _ => Err(format!("Unknown level '{}'. Valid: low, medium, high", s)),
        }
    }
}

impl TryFrom<String> for Level {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// How the persona feels about their own tradition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Attitude {
    #[default]
    Negative,
    Neutral,
    Positive,
}

impl Attitude {
    pub fn label(&self) -> &'static str {
        match self {
            Attitude::Negative => "Negative",
            Attitude::Neutral => "Neutral",
            Attitude::Positive => "Positive",
        }
    }
}

impl fmt::Display for Attitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Attitude {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "negative" => Ok(Attitude::Negative),
            "neutral" => Ok(Attitude::Neutral),
            "positive" => Ok(Attitude::Positive),
            _ => Err(format!(
                "Unknown attitude '{}'. Valid: negative, neutral, positive",
                s
            )),
        }
    }
}

impl TryFrom<String> for Attitude {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

// ─────────────────────────────────────────────────────────────────
// Persona Attributes
// ─────────────────────────────────────────────────────────────────

/// Everything the educator fills in before a persona is created.
///
/// Values are kept exactly as entered; prompts embed them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaAttributes {
    #[serde(default)]
    pub tradition: String,
    #[serde(default)]
    pub denomination: String,
    #[serde(default, alias = "context")]
    pub geographic_context: String,
    #[serde(default)]
    pub demographics: String,
    #[serde(default = "default_personality")]
    pub personality: String,
    #[serde(default, alias = "knowledge")]
    pub knowledge_level: Level,
    #[serde(default, alias = "engagement")]
    pub engagement_level: Level,
    #[serde(default)]
    pub attitude: Attitude,
}

fn default_personality() -> String {
    PERSONALITY_NOT_SPECIFIED.to_string()
}

impl PersonaAttributes {
    /// Build attributes, normalising an empty personality to the sentinel.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tradition: impl Into<String>,
        denomination: impl Into<String>,
        geographic_context: impl Into<String>,
        demographics: impl Into<String>,
        personality: Option<String>,
        knowledge_level: Level,
        engagement_level: Level,
        attitude: Attitude,
    ) -> Self {
        let mut attrs = Self {
            tradition: tradition.into(),
            denomination: denomination.into(),
            geographic_context: geographic_context.into(),
            demographics: demographics.into(),
            personality: personality.unwrap_or_default(),
            knowledge_level,
            engagement_level,
            attitude,
        };
        attrs.normalize();
        attrs
    }

    /// Parse attributes from a TOML persona file body.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut attrs: Self = toml::from_str(content).map_err(|e| Error::PersonaFile {
            message: e.message().to_string(),
            source: Some(e),
        })?;
        attrs.normalize();
        Ok(attrs)
    }

    fn normalize(&mut self) {
        if self.personality.trim().is_empty() {
            self.personality = default_personality();
        }
    }

    /// Whether personality details were actually given.
    pub fn has_personality(&self) -> bool {
        self.personality != PERSONALITY_NOT_SPECIFIED
    }

    /// Names of required fields that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("tradition", &self.tradition),
            ("denomination", &self.denomination),
            ("geographic context", &self.geographic_context),
            ("demographics", &self.demographics),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Reject attributes with any required field empty.
    pub fn validate(&self) -> Result<()> {
        let fields = self.missing_fields();
        if fields.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingPersonaFields { fields })
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Compiled Persona
// ─────────────────────────────────────────────────────────────────

/// Where the introduction text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntroductionSource {
    /// Written by the hosted model
    Generated,
    /// Built locally because no provider call succeeded
    Fallback,
}

/// A persona ready for conversation. Replaced wholesale, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledPersona {
    pub name: String,
    pub introduction_text: String,
    pub system_prompt: String,
    pub source: IntroductionSource,
    /// Why the introduction fell back, worded for the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introduction_error: Option<String>,
}

impl CompiledPersona {
    /// Opening line the persona says once created.
    pub fn greeting(&self) -> String {
        greeting_for(&self.name)
    }

    /// Fixed reply once the persona has withdrawn from the conversation.
    pub fn departure_line(&self) -> String {
        departure_line_for(&self.name)
    }
}

pub fn greeting_for(name: &str) -> String {
    format!("Hi, I am {}.", name)
}

pub fn departure_line_for(name: &str) -> String {
    format!("[{}] has left the building", name)
}
