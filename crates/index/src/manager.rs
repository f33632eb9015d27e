//! Index lifecycle manager.
//!
//! Owns the document store, both similarity index variants, the query cache
//! and the on-disk snapshot, and moves them through
//! `Uninitialized → Loaded ⇄ Dirty (→ Persisting)`.
//!
//! Locking:
//! - `state` is a read-write lock; searches share it, mutations take it
//!   exclusively and only for in-memory work.
//! - `cache` is always taken after `state`, never before.
//! - `writer` serializes every mutating operation end to end, so embedding
//!   and disk I/O happen with no state lock held while still admitting a
//!   single writer at a time.

use crate::cache::{QueryCache, QueryKey};
use crate::config::{FlushPolicy, IndexConfig};
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::error::{IndexError, IndexResult};
use crate::persistence::{self, DocumentTable, IndexSnapshot, FORMAT_VERSION};
use crate::progress::ProgressReporter;
use crate::similarity::{check_dimension, FlatIndex, IvfIndex, SimilarityIndex};
use crate::store::DocumentStore;
use crate::types::{
    Document, DocumentOutcome, IndexStats, LifecycleState, MetadataValue, OutcomeStatus,
    SearchStrategy, UpdateReport,
};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// How `initialize` brought the index up.
#[derive(Debug, Clone, PartialEq)]
pub enum Initialized {
    /// Restored from the snapshot on disk
    Loaded { documents: usize },
    /// Built from the supplied documents
    Built(UpdateReport),
}

struct IndexState {
    lifecycle: LifecycleState,
    store: DocumentStore,
    flat: FlatIndex,
    ivf: IvfIndex,
    strategy: SearchStrategy,
    /// Ids inserted or updated since the last successful persist
    pending: BTreeSet<String>,
    last_persisted: Option<DateTime<Utc>>,
    last_flush: Instant,
}

impl IndexState {
    fn empty(config: &IndexConfig) -> Self {
        Self {
            lifecycle: LifecycleState::Uninitialized,
            store: DocumentStore::new(),
            flat: FlatIndex::new(config.dimension),
            ivf: new_ivf(config),
            strategy: config.default_strategy,
            pending: BTreeSet::new(),
            last_persisted: None,
            last_flush: Instant::now(),
        }
    }

    fn active(&self) -> &dyn SimilarityIndex {
        match self.strategy {
            SearchStrategy::Exact => &self.flat,
            SearchStrategy::Approximate => &self.ivf,
        }
    }

    /// Insert into both variants so either can serve the next search.
    fn insert_vector(&mut self, id: &str, vector: &[f32]) -> IndexResult<()> {
        self.flat.insert(id, vector)?;
        self.ivf.insert(id, vector)
    }

    fn mark_dirty(&mut self, id: &str) {
        self.pending.insert(id.to_string());
        self.lifecycle = LifecycleState::Dirty;
    }
}

fn new_ivf(config: &IndexConfig) -> IvfIndex {
    IvfIndex::new(config.dimension, config.nlist, config.nprobe, config.seed)
}

pub struct IndexManager {
    config: IndexConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    state: RwLock<IndexState>,
    cache: Mutex<QueryCache>,
    writer: tokio::sync::Mutex<()>,
    progress: ProgressReporter,
}

impl IndexManager {
    /// Create an uninitialized manager using the configured embedding provider.
    pub fn new(config: IndexConfig) -> IndexResult<Self> {
        let embedder = create_provider(&config.embedding, config.dimension)?;
        Self::with_provider(config, embedder)
    }

    pub fn with_provider(
        config: IndexConfig,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> IndexResult<Self> {
        config.validate()?;
        if embedder.dimensions() != config.dimension {
            return Err(IndexError::Configuration(format!(
                "Embedding provider '{}' produces {} dimensions, index expects {}",
                embedder.provider_name(),
                embedder.dimensions(),
                config.dimension
            )));
        }

        Ok(Self {
            state: RwLock::new(IndexState::empty(&config)),
            cache: Mutex::new(QueryCache::new(config.cache_size)),
            writer: tokio::sync::Mutex::new(()),
            progress: ProgressReporter::noop(),
            embedder,
            config,
        })
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn state(&self) -> LifecycleState {
        self.state.read().lifecycle
    }

    pub fn strategy(&self) -> SearchStrategy {
        self.state.read().strategy
    }

    pub fn pending_updates(&self) -> Vec<String> {
        self.state.read().pending.iter().cloned().collect()
    }

    pub fn has_snapshot(&self) -> bool {
        persistence::exists(&self.config.store_dir)
    }

    /// Load the persisted index when no documents are given, otherwise build.
    pub async fn initialize(&self, documents: Option<Vec<Document>>) -> IndexResult<Initialized> {
        match documents {
            None if self.has_snapshot() => {
                let documents = self.load().await?;
                Ok(Initialized::Loaded { documents })
            }
            Some(documents) if !documents.is_empty() => {
                Ok(Initialized::Built(self.build(documents).await?))
            }
            _ => Err(IndexError::Configuration(format!(
                "No persisted index at {:?} and no documents to build from",
                self.config.store_dir
            ))),
        }
    }

    /// Replace in-memory state with the snapshot on disk.
    ///
    /// All or nothing: on failure the current state is left as it was.
    /// Refuses while the index holds unpersisted changes; `persist` or
    /// `cleanup` first. Returns the number of documents loaded.
    pub async fn load(&self) -> IndexResult<usize> {
        let _writer = self.writer.lock().await;

        {
            let state = self.state.read();
            if state.lifecycle == LifecycleState::Dirty {
                warn!(
                    pending = state.pending.len(),
                    "Refusing to load over unpersisted changes"
                );
                return Err(IndexError::Configuration(format!(
                    "Index has unpersisted changes ({} pending updates); persist before loading",
                    state.pending.len()
                )));
            }
        }

        let restored = self.restore().map_err(|e| match e {
            IndexError::Persistence(_) => e,
            other => IndexError::Persistence(other.to_string()),
        })?;
        let documents = restored.store.len();

        *self.state.write() = restored;
        self.cache.lock().invalidate_all();

        info!(
            documents,
            dir = ?self.config.store_dir,
            "Loaded index from disk"
        );
        Ok(documents)
    }

    fn restore(&self) -> IndexResult<IndexState> {
        let (snapshot, documents) =
            persistence::read_snapshot(&self.config.store_dir, self.config.dimension)?;

        let flat = FlatIndex::from_entries(
            self.config.dimension,
            snapshot.entries.clone(),
            snapshot.next_seq,
        )?;
        let ivf = new_ivf(&self.config).restore(
            snapshot.entries,
            snapshot.next_seq,
            snapshot.centroids,
            snapshot.assignments,
        )?;

        let store: DocumentStore = documents.into_iter().collect();
        if store.len() != flat.len() {
            return Err(IndexError::Persistence(format!(
                "Document table holds {} distinct ids for {} vectors",
                store.len(),
                flat.len()
            )));
        }

        Ok(IndexState {
            lifecycle: LifecycleState::Loaded,
            store,
            flat,
            ivf,
            strategy: self.config.default_strategy,
            pending: BTreeSet::new(),
            last_persisted: Some(snapshot.persisted_at),
            last_flush: Instant::now(),
        })
    }

    /// Build a fresh index from `documents`, replacing any current one, then persist.
    pub async fn build(&self, documents: Vec<Document>) -> IndexResult<UpdateReport> {
        let _writer = self.writer.lock().await;
        self.build_locked(documents).await
    }

    async fn build_locked(&self, documents: Vec<Document>) -> IndexResult<UpdateReport> {
        if documents.is_empty() {
            return Err(IndexError::Configuration(
                "Cannot build an index from zero documents".to_string(),
            ));
        }

        let total = documents.len() as u64;
        info!(
            documents = total,
            batch_size = self.config.build_batch_size,
            "Building index"
        );

        let mut store = DocumentStore::new();
        let mut flat = FlatIndex::new(self.config.dimension);
        let mut ivf = new_ivf(&self.config);
        let mut outcomes = Vec::with_capacity(documents.len());
        let mut processed = 0u64;

        let mut remaining = documents.into_iter();
        loop {
            let batch: Vec<Document> = remaining
                .by_ref()
                .take(self.config.build_batch_size)
                .collect();
            if batch.is_empty() {
                break;
            }
            processed += batch.len() as u64;

            let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
            let vectors = self.embed_texts(&texts).await;
            self.progress
                .embed(processed, Some(total), self.embedder.model_name());

            let indexed_at = Utc::now();
            for (mut doc, vector) in batch.into_iter().zip(vectors) {
                match vector {
                    Ok(vector) => {
                        flat.insert(&doc.id, &vector)?;
                        ivf.insert(&doc.id, &vector)?;
                        doc.embedding = Some(vector);
                        doc.indexed_at = Some(indexed_at);
                        outcomes.push(DocumentOutcome {
                            id: doc.id.clone(),
                            status: OutcomeStatus::Indexed,
                        });
                        store.upsert(doc);
                    }
                    Err(e) => {
                        warn!(id = %doc.id, error = %e, "Skipping document");
                        outcomes.push(DocumentOutcome {
                            id: doc.id,
                            status: OutcomeStatus::Failed(e.to_string()),
                        });
                    }
                }
            }
            self.progress.index(processed, Some(total));
        }

        if store.is_empty() {
            return Err(IndexError::Embedding(format!(
                "None of the {} documents could be embedded",
                total
            )));
        }

        {
            let mut state = self.state.write();
            let strategy = match state.lifecycle {
                LifecycleState::Uninitialized => self.config.default_strategy,
                _ => state.strategy,
            };
            *state = IndexState {
                lifecycle: LifecycleState::Dirty,
                pending: store.iter().map(|d| d.id.clone()).collect(),
                store,
                flat,
                ivf,
                strategy,
                last_persisted: state.last_persisted,
                last_flush: state.last_flush,
            };
            self.cache.lock().invalidate_all();
        }

        let mut report = UpdateReport {
            outcomes,
            ..UpdateReport::default()
        };
        self.flush_into(&mut report);

        info!(
            indexed = report.indexed(),
            failed = report.failed(),
            persisted = report.persisted,
            "Index built"
        );
        Ok(report)
    }

    /// Upsert documents using the configured update batch size.
    pub async fn update(&self, documents: Vec<Document>) -> IndexResult<UpdateReport> {
        self.update_with_batch_size(documents, self.config.update_batch_size)
            .await
    }

    /// Upsert documents in batches of `batch_size`.
    ///
    /// Builds instead when the index is uninitialized. A document whose id is
    /// already stored with identical text only has its metadata replaced;
    /// repeated ids resolve in input order, the last one wins.
    ///
    /// The flush policy is checked after every batch. A failed flush does not
    /// stop the update: the error lands in `UpdateReport::persist_error`, the
    /// index stays dirty and no further flush is attempted for this call.
    pub async fn update_with_batch_size(
        &self,
        documents: Vec<Document>,
        batch_size: usize,
    ) -> IndexResult<UpdateReport> {
        if batch_size == 0 {
            return Err(IndexError::Configuration(
                "batch size must be greater than zero".to_string(),
            ));
        }

        let _writer = self.writer.lock().await;

        if self.state() == LifecycleState::Uninitialized {
            info!("Index not initialized, building from update");
            return self.build_locked(documents).await;
        }

        let total = documents.len() as u64;
        let mut report = UpdateReport::default();
        let mut processed = 0u64;

        let mut remaining = documents.into_iter();
        loop {
            let batch: Vec<Document> = remaining.by_ref().take(batch_size).collect();
            if batch.is_empty() {
                break;
            }
            processed += batch.len() as u64;

            // Compare against the text this batch will have left behind
            // for the id, not only what is stored now.
            let needs_embedding: Vec<bool> = {
                let state = self.state.read();
                let mut latest: HashMap<&str, &str> = HashMap::new();
                batch
                    .iter()
                    .map(|doc| {
                        let current = latest.get(doc.id.as_str()).copied().or_else(|| {
                            state.store.get(&doc.id).ok().map(|stored| stored.text.as_str())
                        });
                        latest.insert(doc.id.as_str(), doc.text.as_str());
                        current != Some(doc.text.as_str())
                    })
                    .collect()
            };

            let to_embed: Vec<String> = batch
                .iter()
                .zip(&needs_embedding)
                .filter(|(_, &embed)| embed)
                .map(|(doc, _)| doc.text.clone())
                .collect();
            let vectors = self.embed_texts(&to_embed).await;
            if !to_embed.is_empty() {
                self.progress
                    .embed(processed, Some(total), self.embedder.model_name());
            }

            let flush = self.apply_batch(batch, needs_embedding, vectors, batch_size, &mut report)?;

            self.progress.index(processed, Some(total));

            if flush && report.persist_error.is_none() {
                self.flush_into(&mut report);
            }
        }

        debug!(
            indexed = report.indexed(),
            metadata_only = report.metadata_only(),
            failed = report.failed(),
            pending = self.state.read().pending.len(),
            persisted = report.persisted,
            persist_failed = report.persist_error.is_some(),
            "Update applied"
        );
        Ok(report)
    }

    /// Apply one embedded batch to the in-memory state.
    ///
    /// Returns whether the flush policy now calls for a persist.
    fn apply_batch(
        &self,
        batch: Vec<Document>,
        needs_embedding: Vec<bool>,
        vectors: Vec<IndexResult<Vec<f32>>>,
        batch_size: usize,
        report: &mut UpdateReport,
    ) -> IndexResult<bool> {
        let indexed_at = Utc::now();
        let mut vectors = vectors.into_iter();
        let mut rankings_changed = false;
        let mut state = self.state.write();

        for (mut doc, embed) in batch.into_iter().zip(needs_embedding) {
            let id = doc.id.clone();
            let status = if !embed {
                // The stored text can differ when an earlier copy of this id
                // in the same batch failed to embed.
                let refreshed = match state.store.get_mut(&id) {
                    Some(stored) if stored.text == doc.text => {
                        stored.metadata = doc.metadata;
                        true
                    }
                    _ => false,
                };
                if refreshed {
                    state.mark_dirty(&id);
                    OutcomeStatus::MetadataOnly
                } else {
                    OutcomeStatus::Failed(
                        "earlier entry for this id in the batch was not indexed".to_string(),
                    )
                }
            } else {
                match vectors.next() {
                    Some(Ok(vector)) => {
                        state.insert_vector(&id, &vector)?;
                        doc.embedding = Some(vector);
                        doc.indexed_at = Some(indexed_at);
                        state.store.upsert(doc);
                        state.mark_dirty(&id);
                        rankings_changed = true;
                        OutcomeStatus::Indexed
                    }
                    Some(Err(e)) => {
                        warn!(id = %id, error = %e, "Skipping document");
                        OutcomeStatus::Failed(e.to_string())
                    }
                    None => OutcomeStatus::Failed("no embedding returned".to_string()),
                }
            };
            report.outcomes.push(DocumentOutcome { id, status });
        }

        if rankings_changed {
            self.cache.lock().invalidate_all();
        }
        Ok(self.flush_due(&state, batch_size))
    }

    /// Replace a stored document's metadata without re-embedding it.
    pub async fn update_metadata(
        &self,
        id: &str,
        metadata: BTreeMap<String, MetadataValue>,
    ) -> IndexResult<()> {
        let _writer = self.writer.lock().await;
        let mut state = self.state.write();

        let doc = state
            .store
            .get_mut(id)
            .ok_or_else(|| IndexError::NotFound(format!("document '{}'", id)))?;
        doc.metadata = metadata;
        state.mark_dirty(id);
        Ok(())
    }

    fn flush_due(&self, state: &IndexState, batch_size: usize) -> bool {
        if state.pending.is_empty() {
            return false;
        }
        match &self.config.flush_policy {
            FlushPolicy::PendingCount { threshold } => {
                state.pending.len() >= threshold.unwrap_or(batch_size)
            }
            FlushPolicy::Interval { seconds } => {
                state.last_flush.elapsed() >= Duration::from_secs(*seconds)
            }
            FlushPolicy::Explicit => false,
        }
    }

    /// Write the current index and document table to disk.
    pub async fn persist(&self) -> IndexResult<()> {
        let _writer = self.writer.lock().await;
        self.persist_locked()
    }

    /// Persist on behalf of a build or update, recording the outcome in `report`.
    fn flush_into(&self, report: &mut UpdateReport) {
        match self.persist_locked() {
            Ok(()) => report.persisted = true,
            Err(e) => report.persist_error = Some(e.to_string()),
        }
    }

    /// Copies state under a short lock, writes with no lock held.
    /// Callers must hold the writer gate (or `&mut self`).
    fn persist_locked(&self) -> IndexResult<()> {
        let (index, table, previous) = {
            let mut state = self.state.write();
            if state.lifecycle == LifecycleState::Uninitialized {
                return Err(IndexError::Configuration(
                    "Nothing to persist: index is not initialized".to_string(),
                ));
            }

            let snapshot_id = uuid::Uuid::new_v4().to_string();
            let index = IndexSnapshot {
                format_version: FORMAT_VERSION,
                snapshot_id: snapshot_id.clone(),
                persisted_at: Utc::now(),
                dimension: self.config.dimension,
                next_seq: state.flat.next_seq(),
                entries: state.flat.entries().to_vec(),
                nlist: state.ivf.nlist(),
                centroids: state.ivf.centroids().to_vec(),
                assignments: state.ivf.assignments().to_vec(),
            };
            let table = DocumentTable {
                format_version: FORMAT_VERSION,
                snapshot_id,
                documents: state.store.iter().cloned().collect(),
            };

            let previous = state.lifecycle;
            state.lifecycle = LifecycleState::Persisting;
            (index, table, previous)
        };

        self.progress.persist(index.entries.len() as u64);
        let result = persistence::write_snapshot(&self.config.store_dir, &index, &table);

        let mut state = self.state.write();
        match result {
            Ok(()) => {
                state.lifecycle = LifecycleState::Loaded;
                state.pending.clear();
                state.last_persisted = Some(index.persisted_at);
                state.last_flush = Instant::now();
                Ok(())
            }
            Err(e) => {
                state.lifecycle = previous;
                error!(error = %e, "Persist failed, in-memory changes kept");
                Err(e)
            }
        }
    }

    /// Switch the variant that serves searches. Clears the query cache.
    pub async fn select_strategy(&self, use_approximate: bool) {
        let _writer = self.writer.lock().await;
        let strategy = SearchStrategy::from_approximate(use_approximate);

        let mut state = self.state.write();
        if state.strategy != strategy {
            info!(from = %state.strategy, to = %strategy, "Switching search strategy");
        }
        if strategy == SearchStrategy::Approximate && !state.ivf.is_trained() {
            debug!("Approximate index untrained, searches will scan every vector");
        }
        state.strategy = strategy;
        self.cache.lock().invalidate_all();
    }

    /// Retrain the approximate variant on a seeded sample of stored vectors.
    ///
    /// Returns the number of clusters. Clears the query cache.
    pub async fn optimize(&self) -> IndexResult<usize> {
        let _writer = self.writer.lock().await;

        let (samples, mut ivf) = {
            let state = self.state.read();
            if state.lifecycle == LifecycleState::Uninitialized {
                return Err(IndexError::Configuration(
                    "Cannot optimize an uninitialized index".to_string(),
                ));
            }

            let entries = state.flat.entries();
            let amount = entries.len().min(self.config.train_sample_size);
            let mut rng = StdRng::seed_from_u64(self.config.seed);
            let mut picked = rand::seq::index::sample(&mut rng, entries.len(), amount).into_vec();
            picked.sort_unstable();

            let samples: Vec<Vec<f32>> = picked
                .into_iter()
                .map(|i| entries[i].vector.clone())
                .collect();
            (samples, state.ivf.clone())
        };

        if samples.is_empty() {
            return Err(IndexError::Training(
                "No stored vectors to train on".to_string(),
            ));
        }

        ivf.train(&samples)?;
        let clusters = ivf.clusters();
        self.progress.train(samples.len() as u64, clusters);

        let mut state = self.state.write();
        state.ivf = ivf;
        state.lifecycle = LifecycleState::Dirty;
        self.cache.lock().invalidate_all();

        info!(clusters, samples = samples.len(), "Index optimized");
        Ok(clusters)
    }

    /// Flush unpersisted changes and clear the cache. Safe to call repeatedly.
    pub async fn cleanup(&self) -> IndexResult<()> {
        let _writer = self.writer.lock().await;

        if self.state() == LifecycleState::Dirty {
            info!(
                pending = self.state.read().pending.len(),
                "Flushing pending updates"
            );
            self.persist_locked()?;
        }
        self.cache.lock().invalidate_all();
        Ok(())
    }

    /// Ids of the `k` nearest stored vectors, best first.
    pub fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<String>> {
        let state = self.state.read();
        self.search_in(&state, query, k)
    }

    fn search_in(&self, state: &IndexState, query: &[f32], k: usize) -> IndexResult<Vec<String>> {
        if state.lifecycle == LifecycleState::Uninitialized {
            return Err(IndexError::Configuration(
                "Index not initialized".to_string(),
            ));
        }
        check_dimension(self.config.dimension, query)?;

        let key = QueryKey::new(state.strategy, query);
        if let Some(ids) = self.cache.lock().get(&key, k) {
            return Ok(ids);
        }

        let ids: Vec<String> = state
            .active()
            .search(query, k)?
            .into_iter()
            .map(|n| n.id)
            .collect();

        self.cache.lock().put(key, k, ids.clone());
        Ok(ids)
    }

    /// Embed `text`, search, and hydrate the hits from the document store.
    ///
    /// Search and hydration share one read guard, so a concurrent build
    /// cannot swap the store out between them.
    pub async fn query(&self, text: &str, k: usize) -> IndexResult<Vec<Document>> {
        let vector = self.embedder.embed(text).await?;

        let state = self.state.read();
        let ids = self.search_in(&state, &vector, k)?;
        ids.iter()
            .map(|id| state.store.get(id).cloned())
            .collect()
    }

    pub fn get(&self, id: &str) -> IndexResult<Document> {
        self.state.read().store.get(id).cloned()
    }

    pub fn find_by_title(&self, title: &str) -> Option<Document> {
        self.state.read().store.find_by_title(title).cloned()
    }

    pub fn stats(&self) -> IndexStats {
        let state = self.state.read();
        let cache = self.cache.lock();
        let counters = cache.stats().report();

        IndexStats {
            state: state.lifecycle.to_string(),
            strategy: state.strategy,
            documents: state.store.len(),
            vectors: state.flat.len(),
            dimension: self.config.dimension,
            trained: state.ivf.is_trained(),
            clusters: state.ivf.clusters(),
            pending_updates: state.pending.len(),
            cache_entries: cache.len(),
            cache_hits: counters.hits,
            cache_misses: counters.misses,
            last_persisted: state.last_persisted,
        }
    }

    /// Embed a batch, falling back to one call per document when the batch
    /// call fails so each failure is attributed to its document.
    async fn embed_texts(&self, texts: &[String]) -> Vec<IndexResult<Vec<f32>>> {
        if texts.is_empty() {
            return Vec::new();
        }

        match self.embedder.embed_batch(texts).await {
            Ok(vectors) if vectors.len() == texts.len() => vectors
                .into_iter()
                .map(|v| self.check_embedding(v))
                .collect(),
            Ok(vectors) => {
                warn!(
                    expected = texts.len(),
                    actual = vectors.len(),
                    "Provider returned wrong number of embeddings, retrying individually"
                );
                self.embed_individually(texts).await
            }
            Err(e) => {
                warn!(
                    batch = texts.len(),
                    error = %e,
                    "Batch embedding failed, retrying individually"
                );
                self.embed_individually(texts).await
            }
        }
    }

    async fn embed_individually(&self, texts: &[String]) -> Vec<IndexResult<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            let result = self.embedder.embed(text).await;
            results.push(result.and_then(|v| self.check_embedding(v)));
        }
        results
    }

    fn check_embedding(&self, vector: Vec<f32>) -> IndexResult<Vec<f32>> {
        if vector.len() != self.config.dimension {
            return Err(IndexError::Embedding(format!(
                "provider returned {} dimensions, expected {}",
                vector.len(),
                self.config.dimension
            )));
        }
        Ok(vector)
    }
}

impl Drop for IndexManager {
    fn drop(&mut self) {
        if self.state.get_mut().lifecycle != LifecycleState::Dirty {
            return;
        }
        warn!("Index dropped with unpersisted changes, flushing");
        if let Err(e) = self.persist_locked() {
            error!(error = %e, "Final flush failed, unpersisted changes lost");
        }
    }
}

impl std::fmt::Debug for IndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("store_dir", &self.config.store_dir)
            .field("state", &self.state())
            .field("embedder", &self.embedder)
            .finish()
    }
}
