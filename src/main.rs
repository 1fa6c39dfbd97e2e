//! Hookwarden entry point.

mod cli;

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use hookwarden::cancel::CancelToken;
use hookwarden::config::{Config, ConfigError};
use hookwarden::decision::Decision;
use hookwarden::engine::{Engine, EngineError};
use hookwarden::input::{EventKind, HookInput, InputError, ToolInvocationEvent};
use hookwarden::logging::{self, Logger};
use hookwarden::output::{format_response, modified_event_json};

use crate::cli::{Cli, Command, ConfigCommand};

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config file already exists: {} (use --force to overwrite)", .0.display())]
    ConfigExists(PathBuf),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("hookwarden: {e}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, AppError> {
    match &cli.command {
        Command::Version => {
            println!("hookwarden {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
        Command::Config(cmd) => run_config(cli, cmd),
        Command::PreToolUse | Command::PostToolUse | Command::Stop => run_hook(cli),
    }
}

fn run_config(cli: &Cli, cmd: &ConfigCommand) -> Result<ExitCode, AppError> {
    let path = Config::resolve_path(cli.config.as_deref())?;
    match cmd {
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(AppError::ConfigExists(path));
            }
            Config::default().save(&path)?;
            println!("wrote default configuration to {}", path.display());
        }
        ConfigCommand::Show => {
            let config = Config::load(&path)?;
            print!("{}", config.to_toml()?);
        }
        ConfigCommand::Validate => {
            let config = Config::load(&path)?;
            let engine = Engine::new(&config, &Logger::new())?;
            println!(
                "configuration is valid: {} (rules: [{}], tools: [{}])",
                path.display(),
                engine.rule_names().join(", "),
                engine.tool_names().join(", ")
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_hook(cli: &Cli) -> Result<ExitCode, AppError> {
    let path = Config::resolve_path(cli.config.as_deref())?;
    let config = Config::load(&path)?;

    let level = if cli.verbose {
        "debug"
    } else {
        config.general.log_level.as_str()
    };
    logging::init(level, &config.general.log_file)?;

    let timeout_ms = cli.timeout.unwrap_or(config.general.timeout_ms);
    if timeout_ms == 0 {
        return Err(ConfigError::InvalidTimeout.into());
    }
    let cancel = CancelToken::with_timeout(Duration::from_millis(timeout_ms));

    let log = Logger::new().with("hook", hook_name(&cli.command));
    let engine = Engine::new(&config, &log)?;

    let mut raw = String::new();
    let read = io::stdin().read_to_string(&mut raw);

    let decision = match cli.command {
        Command::PreToolUse => {
            read?;
            let event = HookInput::parse(&raw)?.into_event()?;
            engine.pre_action(&event, &cancel)?
        }
        Command::PostToolUse => {
            read?;
            let event = HookInput::parse(&raw)?.into_event()?;
            engine.post_action(&event, &cancel)
        }
        _ => engine.session_end(&stop_event(&log, read, &raw), &cancel),
    };

    log.with("action", decision.action)
        .with("violations", decision.violations.len())
        .with("ms", decision.process_time.as_millis())
        .info("decision");
    emit(&decision, cli.verbose)?;
    Ok(ExitCode::from(decision.action.exit_code()))
}

/// Session end never fails on a missing or malformed payload.
fn stop_event(log: &Logger, read: io::Result<usize>, raw: &str) -> ToolInvocationEvent {
    if let Err(e) = read {
        log.warn(format!("failed to read stop payload, using a synthetic event: {e}"));
        return ToolInvocationEvent::stop();
    }
    match HookInput::parse(raw) {
        Ok(input) => input.into_event_as(EventKind::Stop),
        Err(e) => {
            log.debug(format!("unusable stop payload, using a synthetic event: {e}"));
            ToolInvocationEvent::stop()
        }
    }
}

fn emit(decision: &Decision, verbose: bool) -> Result<(), AppError> {
    if let Some(json) = modified_event_json(decision)? {
        println!("{json}");
    }
    if let Some(report) = format_response(decision, verbose) {
        eprint!("{report}");
    }
    Ok(())
}

fn hook_name(command: &Command) -> &'static str {
    match command {
        Command::PreToolUse => "pre-tool-use",
        Command::PostToolUse => "post-tool-use",
        _ => "stop",
    }
}
