//! Command handlers for the marquee CLI.
//!
//! Each subcommand lives in its own module; opening the index and wiring the
//! recommender is shared here.

pub mod chat;
pub mod data;
pub mod index;
pub mod recommend;

pub use chat::ChatCommand;
pub use data::{BuildCommand, UpdateCommand};
pub use index::IndexCommand;
pub use recommend::{FilterCommand, RecommendCommand, SimilarCommand};

use clap::Args;
use marquee_core::{config::AppConfig, AppError, AppResult};
use marquee_index::{
    load_config, load_movies, Document, IndexManager, Initialized, MovieRecommender,
    ProgressEvent, ProgressReporter, RecommenderPrompts,
};
use marquee_llm::create_client;
use std::path::Path;
use std::sync::Arc;

/// Flags shared by every command that retrieves from the index.
#[derive(Args, Debug, Clone)]
pub struct RetrievalArgs {
    /// Search the clustered (approximate) index instead of the exact one
    #[arg(long)]
    pub approximate: bool,

    /// Movies retrieved per answer (default: recommender.topK from config)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Rebuild the index from the dataset before answering
    #[arg(long)]
    pub rebuild: bool,
}

/// Progress lines on stderr so stdout stays clean for answers.
fn progress_reporter() -> ProgressReporter {
    ProgressReporter::new(Arc::new(|event: ProgressEvent| eprintln!("{}", event.format_simple())))
}

/// Create an index manager for the workspace without loading anything.
pub fn index_manager(config: &AppConfig) -> AppResult<IndexManager> {
    let index_config = load_config(&config.workspace)?;
    Ok(IndexManager::new(index_config)?.with_progress(progress_reporter()))
}

/// Read the dataset at `path` as index documents.
pub fn dataset_documents(config: &AppConfig, path: &Path) -> AppResult<Vec<Document>> {
    let dataset = load_movies(path, config.recommender.min_budget)?;
    if !dataset.skipped.is_empty() {
        tracing::warn!(
            skipped = dataset.skipped.len(),
            first_line = dataset.skipped[0].line,
            first_reason = %dataset.skipped[0].reason,
            "Some dataset rows could not be read"
        );
    }
    if dataset.records.is_empty() {
        return Err(AppError::Dataset(format!(
            "No usable movies in {:?} ({} filtered by budget, {} malformed)",
            path,
            dataset.filtered,
            dataset.skipped.len()
        )));
    }
    Ok(dataset.records.iter().map(|m| m.to_document()).collect())
}

/// Load the persisted index, building it from the dataset when there is none
/// or a rebuild was requested, then apply the search strategy.
pub async fn open_index(config: &AppConfig, args: &RetrievalArgs) -> AppResult<Arc<IndexManager>> {
    let manager = index_manager(config)?;

    let documents = if args.rebuild || !manager.has_snapshot() {
        Some(dataset_documents(config, &config.data_path())?)
    } else {
        None
    };

    match manager.initialize(documents).await? {
        Initialized::Loaded { documents } => {
            tracing::info!(documents, "Opened persisted index");
        }
        Initialized::Built(report) => {
            tracing::info!(
                indexed = report.indexed(),
                failed = report.failed(),
                "Built index from dataset"
            );
            if let Some(e) = &report.persist_error {
                tracing::warn!(error = %e, "Built index could not be saved, serving from memory");
            }
        }
    }

    manager.select_strategy(args.approximate).await;
    Ok(Arc::new(manager))
}

/// Wire the generator and prompts around an opened index.
pub fn recommender(
    config: &AppConfig,
    index: Arc<IndexManager>,
    args: &RetrievalArgs,
) -> AppResult<MovieRecommender> {
    config.validate()?;

    let api_key = config.resolve_api_key(&config.provider);
    let llm = create_client(
        &config.provider,
        config.get_provider_config(&config.provider),
        api_key.as_deref(),
    )?;
    let prompts = RecommenderPrompts::resolve(&config.workspace)?;

    Ok(MovieRecommender::new(index, llm, config.model.clone(), prompts)
        .with_top_k(args.top_k.unwrap_or(config.recommender.top_k))
        .with_filter_pool(config.recommender.filter_pool))
}

pub fn to_json(value: &serde_json::Value) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
