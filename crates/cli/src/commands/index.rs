//! Index maintenance command handlers.

use super::{open_index, to_json, RetrievalArgs};
use clap::{Args, Subcommand};
use marquee_core::{config::AppConfig, AppError, AppResult};

/// Index maintenance
#[derive(Args, Debug)]
pub struct IndexCommand {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Show index statistics
    Stats(IndexStatsCommand),
    /// Retrain the approximate index and persist it
    Optimize(IndexOptimizeCommand),
}

/// Show index statistics
#[derive(Args, Debug)]
pub struct IndexStatsCommand {
    #[command(flatten)]
    pub retrieval: RetrievalArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexStatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index stats command");

        let index = open_index(config, &self.retrieval).await?;
        let stats = index.stats();

        if self.json {
            let output = serde_json::to_value(&stats)
                .map_err(|e| AppError::Serialization(format!("JSON serialization failed: {}", e)))?;
            println!("{}", to_json(&output)?);
        } else {
            println!("Index: {:?}", index.config().store_dir);
            println!("  State: {}", stats.state);
            println!("  Strategy: {}", stats.strategy);
            println!("  Documents: {}", stats.documents);
            println!("  Vectors: {} x {}", stats.vectors, stats.dimension);
            if stats.trained {
                println!("  Clusters: {}", stats.clusters);
            } else {
                println!("  Clusters: untrained (run 'marquee index optimize')");
            }
            println!("  Pending updates: {}", stats.pending_updates);
            println!(
                "  Cache: {} entries, {} hits, {} misses",
                stats.cache_entries, stats.cache_hits, stats.cache_misses
            );
            if let Some(persisted) = stats.last_persisted {
                println!("  Last persisted: {}", persisted);
            }
        }

        Ok(())
    }
}

/// Retrain the approximate index
#[derive(Args, Debug)]
pub struct IndexOptimizeCommand {
    #[command(flatten)]
    pub retrieval: RetrievalArgs,
}

impl IndexOptimizeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index optimize command");

        let index = open_index(config, &self.retrieval).await?;
        let clusters = index.optimize().await?;
        index.persist().await?;

        println!("Trained approximate index with {} clusters", clusters);
        Ok(())
    }
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            IndexAction::Stats(cmd) => cmd.execute(config).await,
            IndexAction::Optimize(cmd) => cmd.execute(config).await,
        }
    }
}
