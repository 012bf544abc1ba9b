pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use estimator_core::config::{AppConfig, LoadOptions, LogFormat};

use crate::commands::price::OutputFormat;
use crate::commands::render::RecipientArg;

#[derive(Debug, Parser)]
#[command(
    name = "estimator",
    about = "Banquet estimate operator CLI",
    long_about = "Price calculator page snapshots, render submitted estimates into emails, and inspect configuration.",
    after_help = "Examples:\n  estimator price demos/page_snapshot.json --guests 80\n  estimator render demos/submission.json --recipient owner\n  estimator config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to an estimator.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run the pricing pipeline over a page snapshot and print the estimate")]
    Price {
        snapshot: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        #[arg(long, help = "Override the guest count read from the snapshot")]
        guests: Option<u32>,
    },
    #[command(about = "Render a submitted estimate form into the estimate email")]
    Render {
        submission: PathBuf,
        #[arg(long, value_enum, help = "Render only one recipient's envelope")]
        recipient: Option<RecipientArg>,
        #[arg(long, help = "Emit the composed envelopes as JSON instead of raw HTML")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions {
        require_file: cli.config.is_some(),
        config_path: cli.config,
        ..LoadOptions::default()
    };
    init_logging(&options);

    let correlation_id = uuid::Uuid::new_v4().to_string();
    let result = match cli.command {
        Command::Price { snapshot, format, guests } => {
            commands::price::run(&options, &snapshot, format, guests)
        }
        Command::Render { submission, recipient, json } => {
            commands::render::run(&options, &submission, recipient, json, &correlation_id)
        }
        Command::Config => commands::CommandResult { exit_code: 0, output: commands::config::run(&options) },
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so command output on stdout stays machine readable.
fn init_logging(options: &LoadOptions) {
    use tracing::Level;

    let logging = AppConfig::load(options.clone()).map(|config| config.logging).unwrap_or_else(|_| {
        AppConfig::default().logging
    });
    let log_level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
