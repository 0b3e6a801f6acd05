//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for repersona.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::{Error, Result};
use crate::persona::{Attitude, Level, PersonaAttributes};

/// repersona - talk to a religious persona played by an LLM
///
/// Describe a person by their tradition, context and attitude; the chosen
/// provider introduces them and then answers in their voice.
#[derive(Parser, Debug)]
#[command(name = "repersona")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a persona and chat with it on stdin
    Chat {
        #[command(flatten)]
        persona: PersonaArgs,

        #[command(flatten)]
        provider: ProviderArgs,
    },

    /// Create a persona, print its introduction and exit
    Create {
        #[command(flatten)]
        persona: PersonaArgs,

        #[command(flatten)]
        provider: ProviderArgs,

        /// Also print the roleplay system prompt
        #[arg(long)]
        show_prompt: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Provider selection shared by chat and create
#[derive(Args, Debug, Clone, Default)]
pub struct ProviderArgs {
    /// LLM provider: openai, anthropic, gemini, deepseek
    #[arg(short, long)]
    pub provider: Option<String>,

    /// API key for this session only (never saved)
    #[arg(long, env = "REPERSONA_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Path to configuration file
    #[arg(short, long, env = "REPERSONA_CONFIG")]
    pub config: Option<String>,
}

/// Persona description flags
///
/// A persona file is read first; any flag given on the command line
/// replaces the matching value from the file.
#[derive(Args, Debug, Clone, Default)]
pub struct PersonaArgs {
    /// TOML file with the persona attributes
    #[arg(long, value_name = "FILE")]
    pub persona_file: Option<PathBuf>,

    /// Religious tradition (e.g. "Islam")
    #[arg(long)]
    pub tradition: Option<String>,

    /// Denomination or movement (e.g. "Sunni")
    #[arg(long)]
    pub denomination: Option<String>,

    /// Geographic or cultural context (e.g. "Stockholm suburbs")
    #[arg(long)]
    pub context: Option<String>,

    /// Demographics (e.g. "Woman, 34, nurse")
    #[arg(long)]
    pub demographics: Option<String>,

    /// Personality and background details
    #[arg(long)]
    pub personality: Option<String>,

    /// Knowledge of the tradition: low, medium, high
    #[arg(long)]
    pub knowledge: Option<Level>,

    /// Engagement in practice: low, medium, high
    #[arg(long)]
    pub engagement: Option<Level>,

    /// Attitude towards religion: negative, neutral, positive
    #[arg(long)]
    pub attitude: Option<Attitude>,
}

impl PersonaArgs {
    /// Merge the persona file (if any) with the command-line flags
    pub fn resolve(&self) -> Result<PersonaAttributes> {
        let base = match self.persona_file {
            Some(ref path) => {
                let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
                    path: path.clone(),
                    source: e,
                })?;
                PersonaAttributes::from_toml(&content)?
            }
            None => PersonaAttributes::new("", "", "", "", None, Level::default(), Level::default(), Attitude::default()),
        };

        let personality = self
            .personality
            .clone()
            .or_else(|| base.has_personality().then(|| base.personality.clone()));

        Ok(PersonaAttributes::new(
            self.tradition.clone().unwrap_or(base.tradition),
            self.denomination.clone().unwrap_or(base.denomination),
            self.context.clone().unwrap_or(base.geographic_context),
            self.demographics.clone().unwrap_or(base.demographics),
            personality,
            self.knowledge.unwrap_or(base.knowledge_level),
            self.engagement.unwrap_or(base.engagement_level),
            self.attitude.unwrap_or(base.attitude),
        ))
    }
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}
