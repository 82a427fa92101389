//! Binary entry point for `relevance-bot`.
//!
//! This module provides the command-line interface for relevance-bot with options
//! for configuration file paths and logging verbosity. It initializes the
//! necessary components and either runs the bot or imports user records.

use clap::{Parser, Subcommand};
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use relevance_bot::base::{config::Config, types::Void};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

/// Relevance-bot – direct messages you the Discord posts that match your preferences.
///
/// Configuration can come from `config.toml` or `RELEVANCE_BOT_*` environment variables.
/// The bot watches every server it has joined, asks an LLM whether each new message
/// is relevant to a user's stored preferences for that server, and sends matches to
/// the user as a direct message.
#[derive(Parser, Debug)]
#[command(version, author, about, long_about = None)]
struct Args {
    /// Override the config file path (optional).
    ///
    /// By default, the bot will look for a config file at `.hidden/config.toml`
    /// in the current directory.
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
    /// Increase log verbosity (-v, -vv, etc.).
    ///
    /// Use multiple times to increase verbosity:
    /// - No flag: INFO level
    /// - -v: DEBUG level
    /// - -vv or more: TRACE level
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Export spans over OTLP (HTTP) to the collector named by the standard
    /// `OTEL_EXPORTER_OTLP_*` environment variables.
    #[arg(long, global = true)]
    otlp: bool,
    /// What to do (defaults to `run`).
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to Discord and start watching messages.
    Run,
    /// Upsert user preference records from a JSON file into the store.
    Import {
        /// Path to the JSON file (`{ "authorized_users": [...] }` or a bare array).
        file: std::path::PathBuf,
    },
}

/// Main entry point for the relevance-bot binary.
///
/// Sets up logging based on verbosity, loads configuration, and dispatches the command.
#[tokio::main]
async fn main() -> Void {
    let args = Args::parse();

    // Construct the level filter.

    let level = match args.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let level_filter = tracing_subscriber::filter::LevelFilter::from_level(level);

    // Prepare the log layer.

    let stdout = tracing_subscriber::fmt::layer()
        .without_time()
        .with_ansi(true)
        .with_level(true)
        .with_file(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    // Prepare the otlp layer, if asked for.

    let otel = if args.otlp {
        let exporter = opentelemetry_otlp::SpanExporter::builder().with_http().with_protocol(Protocol::HttpBinary).build()?;
        let tracer = opentelemetry_sdk::trace::SdkTracerProvider::builder().with_simple_exporter(exporter).build().tracer("relevance-bot");
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry().with(otel).with(level_filter).with(stdout).init();

    let config = Config::load(args.config.as_deref())?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => relevance_bot::start(config).await,
        Command::Import { file } => {
            let count = relevance_bot::run_import(config, &file).await?;
            println!("Updated or inserted {count} users");
            Ok(())
        }
    }
}
