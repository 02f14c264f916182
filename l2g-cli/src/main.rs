use anyhow::Context;
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

mod cli;

use crate::cli::{Cli, Commands, Session};
use l2g_core::audit::{AuditLayer, AuditSink};
use l2g_core::{ApiError, Config, ErrorCode, L2gError};

/// Used when `--audit` is given without a path and the config names none
const DEFAULT_AUDIT_FILE: &str = "l2g-audit.jsonl";

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        let exit_code = match e.downcast_ref::<ApiError>() {
            Some(api) => {
                eprintln!(
                    "{} {} ({}, {})",
                    "Error:".red().bold(),
                    api.message,
                    api.code,
                    api.corr_id
                );
                if let Some(details) = &api.details {
                    eprintln!("  {}", details.dimmed());
                }
                exit_code(api.code)
            }
            None => {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
                match e.downcast_ref::<L2gError>() {
                    Some(L2gError::Configuration(_)) | Some(L2gError::InvalidInput(_)) => 2,
                    _ => 1,
                }
            }
        };
        process::exit(exit_code);
    }
}

fn exit_code(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::InvalidProduct | ErrorCode::Validation => 2,
        ErrorCode::AttributeMissing | ErrorCode::TermsMissing => 3,
        ErrorCode::TermAssignment | ErrorCode::ApplyFailed => 4,
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    init_tracing(&cli, &config)?;

    let allow_missing = matches!(cli.command, Commands::Simulate(_));
    let mut session = Session::open(&cli.store, config, allow_missing)?;
    session.json = cli.json;

    match cli.command {
        Commands::Discover(args) => crate::cli::commands::discover::run(args, &session),
        Commands::Suggest(args) => crate::cli::commands::suggest::run(args, &session),
        Commands::Plan(args) => crate::cli::commands::plan::run(args, &session),
        Commands::Apply(args) => crate::cli::commands::apply::run(args, session),
        Commands::Resync(args) => crate::cli::commands::resync::run(args, session),
        Commands::Terms(args) => crate::cli::commands::terms::run(args, &session),
        Commands::Backups(args) => crate::cli::commands::rollback::list(args, &session),
        Commands::Rollback(args) => crate::cli::commands::rollback::run(args, session),
        Commands::Simulate(args) => crate::cli::commands::simulate::run(args, session),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let config = match &cli.config {
        Some(path) => l2g_core::load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::from_env_or_default()?,
    };
    config.validate()?;
    Ok(config)
}

fn init_tracing(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    if !config.logging.enabled {
        return Ok(());
    }

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let level = std::env::var("L2G_LOG").unwrap_or_else(|_| default_level.to_string());
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("warn"));

    let audit_path = cli
        .audit_file
        .clone()
        .or_else(|| {
            let configured = config.logging.audit_file.trim();
            (!configured.is_empty()).then(|| PathBuf::from(configured))
        })
        .or_else(|| cli.audit.then(|| PathBuf::from(DEFAULT_AUDIT_FILE)));

    let audit = match audit_path {
        Some(path) => {
            let sink = AuditSink::file(&path)
                .with_context(|| format!("Failed to open audit log {}", path.display()))?;
            let max_level = config
                .logging
                .level
                .parse::<tracing::Level>()
                .unwrap_or(tracing::Level::INFO);
            Some(AuditLayer::new(sink).with_max_level(max_level))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .with(audit)
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(())
}
