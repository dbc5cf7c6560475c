//! catalog-sync CLI entry point.

use catalog_sync::cli::commands;
use catalog_sync::cli::{Cli, Commands};
use catalog_sync::config::load_config;
use catalog_sync::error::Error;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    init_tracing(cli.verbose, cli.quiet);

    // JSON when asked for, or when stdout is not a terminal
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    if let Commands::Version = cli.command {
        return commands::version::execute(json);
    }
    if let Commands::Completions { shell } = cli.command {
        return commands::completions::execute(shell);
    }

    let settings = load_config()?;
    let db = cli.db.as_deref();

    match &cli.command {
        Commands::Init { force } => commands::init::execute(db, &settings, *force, json),
        Commands::Import(args) => commands::import::execute(args, db, &settings, json),
        Commands::Reconcile { path, match_policy } => {
            commands::reconcile::execute(path, match_policy.as_deref(), db, &settings, json)
        }
        Commands::Status { limit } => commands::status::execute(db, &settings, *limit, json),
        Commands::Catalog => commands::catalog::execute(db, &settings, json),
        Commands::Version | Commands::Completions { .. } => Ok(()),
    }
}
