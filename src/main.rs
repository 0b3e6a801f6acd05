//! repersona - chat with an LLM-played religious persona
//!
//! This is the main entry point for the repersona binary. An educator
//! describes a person, the configured provider introduces them, and the
//! conversation then runs on stdin/stdout.

mod cli;
mod config;
mod conversation;
mod error;
mod logging;
mod persona;
mod provider;
mod session;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::{debug, info, warn};

use crate::cli::{Cli, Commands, PersonaArgs, ProviderArgs};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::persona::IntroductionSource;
use crate::provider::{ProviderFactory, ProviderKind, SharedProvider};
use crate::session::Session;

fn main() -> Result<()> {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    if let Commands::Config { subcommand } = &cli.command {
        // Config commands use minimal logging
        logging::init_simple(tracing::Level::WARN)?;
        return handle_config_command(subcommand.clone());
    }

    let provider_args = match &cli.command {
        Commands::Chat { provider, .. } | Commands::Create { provider, .. } => provider.clone(),
        Commands::Config { .. } => ProviderArgs::default(),
    };

    let config = match AppConfig::load(provider_args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => exit_with(e),
    };

    // The guards must be kept alive for the lifetime of the program
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting repersona");

    let result = match cli.command {
        Commands::Chat { persona, provider } => run_chat(&config, &persona, &provider),
        Commands::Create {
            persona,
            provider,
            show_prompt,
        } => run_create(&config, &persona, &provider, show_prompt),
        Commands::Config { .. } => unreachable!(),
    };

    if let Err(e) = result {
        exit_with(e);
    }

    Ok(())
}

/// Print a formatted error and exit with its code
fn exit_with(e: Error) -> ! {
    eprint!("{}", e.format_for_terminal());
    std::process::exit(e.exit_code());
}

/// Build the async runtime; provider calls run one at a time
fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create runtime: {}", e)))
}

// ─────────────────────────────────────────────────────────────────
// Session Setup
// ─────────────────────────────────────────────────────────────────

/// Resolve the provider kind and key, and build the session.
///
/// A missing key is not an error here: the session still creates personas
/// with the fallback description and reports the missing key on chat.
fn open_session(config: &AppConfig, args: &ProviderArgs) -> Result<Session> {
    let kind = match args.provider {
        Some(ref name) => name.parse::<ProviderKind>()?,
        None => config.provider.default,
    };

    let api_key = resolve_api_key(kind, args.api_key.as_deref());

    let provider: Option<SharedProvider> = match api_key {
        Some(ref key) => Some(ProviderFactory::create(kind, config, key)?),
        None if !kind.requires_api_key() => Some(ProviderFactory::create(kind, config, "")?),
        None => {
            warn!(provider = %kind, "No API key available");
            None
        }
    };

    Ok(Session::from_config(config, kind, provider))
}

/// Explicit key first, then the vendor's own environment variable
fn resolve_api_key(kind: ProviderKind, explicit: Option<&str>) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| kind.api_key_env().and_then(|var| std::env::var(var).ok()))
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

// ─────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────

/// Create a persona once and print it
fn run_create(
    config: &AppConfig,
    persona: &PersonaArgs,
    provider: &ProviderArgs,
    show_prompt: bool,
) -> Result<()> {
    let attrs = persona.resolve()?;
    let mut session = open_session(config, provider)?;
    let rt = build_runtime()?;

    let compiled = rt.block_on(session.create_persona(attrs))?.clone();

    if let Some(ref reason) = compiled.introduction_error {
        println!("{}", reason);
        println!();
    }
    println!("Name: {}", compiled.name);
    println!("Source: {}", source_label(compiled.source, session.provider_kind()));
    println!();
    println!("{}", compiled.introduction_text);

    if show_prompt {
        println!();
        println!("System prompt:");
        println!("{}", compiled.system_prompt);
    }

    Ok(())
}

/// Create a persona and run the interactive conversation loop
fn run_chat(config: &AppConfig, persona: &PersonaArgs, provider: &ProviderArgs) -> Result<()> {
    let attrs = persona.resolve()?;
    let mut session = open_session(config, provider)?;
    let rt = build_runtime()?;

    let compiled = rt.block_on(session.create_persona(attrs))?.clone();
    let export_dir = config.export_dir();

    if let Some(ref reason) = compiled.introduction_error {
        println!("{}", reason);
        println!();
    }
    println!("{} ({})", compiled.name, source_label(compiled.source, session.provider_kind()));
    println!();
    println!("{}", compiled.introduction_text);
    println!();
    println!("Commands: /new, /export [DIR], /persona, /quit");
    println!();
    println!("Persona: {}", compiled.greeting());

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("Me: ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            println!();
            break;
        }

        match ChatCommand::parse(&line) {
            ChatCommand::Quit => break,
            ChatCommand::Empty => continue,
            ChatCommand::New => {
                session.start_new_conversation();
                println!("Started a new conversation with {}.", compiled.name);
            }
            ChatCommand::Persona => {
                if let Some(p) = session.persona() {
                    println!("{}", p.introduction_text);
                }
            }
            ChatCommand::Export(dir) => {
                let dir = dir.unwrap_or_else(|| export_dir.clone());
                match session.write_export(&dir) {
                    Ok(path) => println!("Conversation saved to {}", path.display()),
                    Err(Error::EmptyInput { .. }) => println!("No conversation to download."),
                    Err(e) => eprint!("{}", e.format_for_terminal()),
                }
            }
            ChatCommand::Message(text) => match rt.block_on(session.send_message(&text)) {
                Ok(reply) => println!("Persona: {}", reply),
                Err(Error::EmptyInput { .. }) => continue,
                Err(e) => {
                    debug!(error = %e.format_for_log(), "Message failed");
                    println!("{}", e.user_message());
                }
            },
        }
    }

    info!(session_id = %session.id(), turns = session.ledger().len(), "Chat ended");
    Ok(())
}

fn source_label(source: IntroductionSource, kind: ProviderKind) -> String {
    match source {
        IntroductionSource::Generated => format!("introduced by {}", kind.display_name()),
        IntroductionSource::Fallback => "fallback description".to_string(),
    }
}

/// One line of chat input
#[derive(Debug, PartialEq)]
enum ChatCommand {
    Empty,
    Quit,
    New,
    Persona,
    Export(Option<PathBuf>),
    Message(String),
}

impl ChatCommand {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ChatCommand::Empty;
        }

        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        match head {
            "/quit" | "/exit" => ChatCommand::Quit,
            "/new" => ChatCommand::New,
            "/persona" => ChatCommand::Persona,
            "/export" | "/download" => {
                ChatCommand::Export((!rest.is_empty()).then(|| PathBuf::from(rest)))
            }
            _ => ChatCommand::Message(line.to_string()),
        }
    }
}

/// Handle configuration subcommands
fn handle_config_command(subcommand: cli::ConfigSubcommand) -> Result<()> {
    use cli::ConfigSubcommand;

    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = AppConfig::load(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let path = config::init_config(path.as_deref(), force)?;
            println!("Configuration written to {}", path.display());
        }
        ConfigSubcommand::Validate { config } => match AppConfig::load(config.as_deref()) {
            Ok(_) => println!("Configuration is valid."),
            Err(e) => exit_with(e),
        },
    }

    Ok(())
}
