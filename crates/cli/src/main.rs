//! Marquee CLI
//!
//! Main entry point for the marquee command-line tool: an interactive movie
//! recommendation session plus one-shot commands for building, querying and
//! maintaining the movie index.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    BuildCommand, ChatCommand, FilterCommand, IndexCommand, RecommendCommand, SimilarCommand,
    UpdateCommand,
};
use marquee_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Marquee - movie recommendations over a local vector index
#[derive(Parser, Debug)]
#[command(name = "marquee")]
#[command(about = "Movie recommendations over a local vector index", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "MARQUEE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "MARQUEE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Generation provider (ollama, azure-openai)
    #[arg(short, long, global = true, env = "MARQUEE_PROVIDER")]
    provider: Option<String>,

    /// Generation model identifier
    #[arg(short, long, global = true, env = "MARQUEE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive recommendation session
    Chat(ChatCommand),

    /// Build the index from a movie dataset, replacing any existing one
    Build(BuildCommand),

    /// Upsert movies from a dataset into the existing index
    Update(UpdateCommand),

    /// Recommend movies for a free-text request
    Recommend(RecommendCommand),

    /// Recommend movies similar to a given title
    Similar(SimilarCommand),

    /// List movies matching a request and rating/budget/genre filters
    Filter(FilterCommand),

    /// Index maintenance
    Index(IndexCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Marquee starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_marquee_dir()?;

    let command_name = match &cli.command {
        Commands::Chat(_) => "chat",
        Commands::Build(_) => "build",
        Commands::Update(_) => "update",
        Commands::Recommend(_) => "recommend",
        Commands::Similar(_) => "similar",
        Commands::Filter(_) => "filter",
        Commands::Index(_) => "index",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Build(cmd) => cmd.execute(&config).await,
        Commands::Update(cmd) => cmd.execute(&config).await,
        Commands::Recommend(cmd) => cmd.execute(&config).await,
        Commands::Similar(cmd) => cmd.execute(&config).await,
        Commands::Filter(cmd) => cmd.execute(&config).await,
        Commands::Index(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
