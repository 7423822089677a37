//! herakles-proc-watch - version 0.1.0
//!
//! Process observer CLI with tracing logging.
//! This is the main entry point that resolves configuration and dispatches subcommands.

mod cli;
mod commands;
mod config;

use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::filter::LevelFilter;

use cli::{Args, Commands, LogLevel};
use commands::{command_check, command_children, command_stats, command_status, command_watch};
use config::{resolve_config, show_config, validate_effective_config, Config};

/// Initializes tracing logging subsystem with configured log level.
///
/// Logs go to stderr so stdout stays machine-readable for `--json`.
fn setup_logging(config: &Config) {
    let level = config.log_level();
    let filter = match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    debug!("Logging initialized with level: {:?}", level);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = resolve_config(&args)?;
    setup_logging(&config);

    if args.check_config {
        return match validate_effective_config(&config) {
            Ok(()) => {
                println!("✅ Configuration is valid");
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
        };
    }

    if args.show_config {
        return show_config(&config, args.config_format.clone());
    }

    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }

    let Some(command) = args.command else {
        error!("No subcommand given, see --help");
        std::process::exit(2);
    };

    info!("herakles-proc-watch {} starting", env!("CARGO_PKG_VERSION"));

    match command {
        Commands::Status { pid } => command_status(pid, &config),
        Commands::Stats { pid } => command_stats(pid, &config),
        Commands::Children { pid } => command_children(pid, &config),
        Commands::Watch { pid, count } => command_watch(pid, count, &config).await,
        Commands::Check { pid } => {
            if !command_check(pid, &config)? {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
