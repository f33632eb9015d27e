//! Build and update command handlers.
//!
//! Both read a movie dataset; `build` replaces the index, `update` upserts
//! into the existing one (building it if none exists yet).

use super::{dataset_documents, index_manager, to_json};
use clap::Args;
use marquee_core::{config::AppConfig, AppResult};
use marquee_index::{IndexError, UpdateReport};
use std::path::PathBuf;
use std::time::Instant;

/// Build the index from a dataset
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Movie dataset (.csv, or JSON Lines otherwise); defaults to data.path from config
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl BuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let path = self.data.clone().unwrap_or_else(|| config.data_path());
        tracing::info!("Building index from {:?}", path);

        let start = Instant::now();
        let documents = dataset_documents(config, &path)?;
        let manager = index_manager(config)?;
        let report = manager.build(documents).await?;

        print_report("Built", &report, start, self.json)?;
        unpersisted(&report)
    }
}

/// Upsert movies from a dataset
#[derive(Args, Debug)]
pub struct UpdateCommand {
    /// Movie dataset (.csv, or JSON Lines otherwise); defaults to data.path from config
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Documents per embedding batch (default: updateBatchSize from index config)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl UpdateCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let path = self.data.clone().unwrap_or_else(|| config.data_path());
        tracing::info!("Updating index from {:?}", path);

        let start = Instant::now();
        let documents = dataset_documents(config, &path)?;
        let manager = index_manager(config)?;
        if manager.has_snapshot() {
            manager.load().await?;
        }

        let batch_size = self
            .batch_size
            .unwrap_or(manager.config().update_batch_size);
        let report = manager.update_with_batch_size(documents, batch_size).await?;
        print_report("Updated", &report, start, self.json)?;

        manager.cleanup().await?;
        Ok(())
    }
}

fn print_report(verb: &str, report: &UpdateReport, start: Instant, json: bool) -> AppResult<()> {
    let duration = start.elapsed().as_secs_f64();

    if json {
        let failures: Vec<_> = report
            .failures()
            .map(|(id, reason)| serde_json::json!({ "id": id, "reason": reason }))
            .collect();
        let output = serde_json::json!({
            "indexed": report.indexed(),
            "metadataOnly": report.metadata_only(),
            "failed": failures,
            "persisted": report.persisted,
            "persistError": report.persist_error,
            "durationSecs": duration,
        });
        println!("{}", to_json(&output)?);
    } else {
        println!(
            "{} index: {} indexed, {} metadata-only, {} failed in {:.2}s",
            verb,
            report.indexed(),
            report.metadata_only(),
            report.failed(),
            duration
        );
        for (id, reason) in report.failures() {
            println!("  ! {}: {}", id, reason);
        }
        if let Some(e) = &report.persist_error {
            println!("  ! not saved to disk: {}", e);
        }
    }

    Ok(())
}

fn unpersisted(report: &UpdateReport) -> AppResult<()> {
    match &report.persist_error {
        Some(e) => Err(IndexError::Persistence(e.clone()).into()),
        None => Ok(()),
    }
}
