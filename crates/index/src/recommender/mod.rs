//! Retrieval-augmented recommendations.
//!
//! Retrieves movies from the index, renders a prompt around them and hands
//! it to the generator. The generator is a black box: whatever text it
//! returns is wrapped with the standard header and footer.

pub mod format;

use crate::dataset::MovieRecord;
use crate::manager::IndexManager;
use marquee_core::{AppError, AppResult};
use marquee_llm::{LlmClient, LlmRequest};
use marquee_prompt::{
    build_prompt, builtin_prompt, resolve_prompt, PromptDefinition, RECOMMEND_PROMPT_ID,
    SIMILAR_PROMPT_ID,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub use format::{build_context, format_filtered, format_money, format_response};

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 1000;

/// Prompts used for the two generation paths.
#[derive(Debug, Clone)]
pub struct RecommenderPrompts {
    pub recommend: PromptDefinition,
    pub similar: PromptDefinition,
}

impl RecommenderPrompts {
    pub fn builtin() -> AppResult<Self> {
        let get = |id: &str| {
            builtin_prompt(id)
                .ok_or_else(|| AppError::Prompt(format!("Missing built-in prompt '{}'", id)))
        };
        Ok(Self {
            recommend: get(RECOMMEND_PROMPT_ID)?,
            similar: get(SIMILAR_PROMPT_ID)?,
        })
    }

    /// Built-ins, replaced by workspace overrides where present.
    pub fn resolve(workspace: &Path) -> AppResult<Self> {
        Ok(Self {
            recommend: resolve_prompt(workspace, RECOMMEND_PROMPT_ID)?,
            similar: resolve_prompt(workspace, SIMILAR_PROMPT_ID)?,
        })
    }
}

/// Constraints for [`MovieRecommender::filter`].
#[derive(Debug, Clone)]
pub struct FilterCriteria {
    pub min_rating: f64,
    pub max_budget: f64,
    /// Keep movies having any of these genres; empty keeps all
    pub genres: Vec<String>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min_rating: 0.0,
            max_budget: f64::INFINITY,
            genres: Vec::new(),
        }
    }
}

impl FilterCriteria {
    pub fn matches(&self, movie: &MovieRecord) -> bool {
        movie.vote_average >= self.min_rating
            && movie.budget <= self.max_budget
            && (self.genres.is_empty()
                || self.genres.iter().any(|wanted| {
                    movie
                        .genres
                        .iter()
                        .any(|g| g.eq_ignore_ascii_case(wanted.trim()))
                }))
    }
}

pub struct MovieRecommender {
    index: Arc<IndexManager>,
    llm: Arc<dyn LlmClient>,
    model: String,
    prompts: RecommenderPrompts,
    top_k: usize,
    filter_pool: usize,
}

impl MovieRecommender {
    pub fn new(
        index: Arc<IndexManager>,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompts: RecommenderPrompts,
    ) -> Self {
        Self {
            index,
            llm,
            model: model.into(),
            prompts,
            top_k: 3,
            filter_pool: 50,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_filter_pool(mut self, filter_pool: usize) -> Self {
        self.filter_pool = filter_pool.max(1);
        self
    }

    pub fn index(&self) -> &Arc<IndexManager> {
        &self.index
    }

    /// Recommend movies for a free-text request.
    pub async fn recommend(&self, query: &str) -> AppResult<String> {
        let movies = self.retrieve(query, self.top_k).await?;
        tracing::debug!(query, retrieved = movies.len(), "Retrieved movies");
        if movies.is_empty() {
            return Ok(format_response(
                "I couldn't find any movies matching that request.",
            ));
        }

        let mut variables = HashMap::new();
        variables.insert("query".to_string(), query.to_string());
        variables.insert("context".to_string(), build_context(&movies));

        let answer = self.generate(&self.prompts.recommend, variables).await?;
        Ok(format_response(&answer))
    }

    /// Recommend movies similar to a stored title.
    pub async fn similar(&self, title: &str) -> AppResult<String> {
        let Some(doc) = self.index.find_by_title(title) else {
            tracing::info!(title, "Title not in index");
            return Ok(format!(
                "Sorry, I couldn't find the movie '{}' in my database.",
                title
            ));
        };
        let movie = MovieRecord::from_document(&doc);

        let neighbors: Vec<MovieRecord> = self
            .index
            .query(&doc.text, self.top_k + 1)
            .await?
            .iter()
            .filter(|candidate| candidate.id != doc.id)
            .take(self.top_k)
            .map(MovieRecord::from_document)
            .collect();

        let mut variables = HashMap::new();
        variables.insert("title".to_string(), movie.title.clone());
        variables.insert("genres".to_string(), movie.genre_list());
        variables.insert("runtime".to_string(), movie.runtime.to_string());
        variables.insert("rating".to_string(), movie.vote_average.to_string());
        variables.insert("context".to_string(), build_context(&neighbors));

        let answer = self.generate(&self.prompts.similar, variables).await?;
        Ok(format_response(&answer))
    }

    /// List retrieved movies that satisfy `criteria`, best match first.
    ///
    /// No generation happens here; the listing is built from stored metadata.
    pub async fn filter(&self, query: &str, criteria: &FilterCriteria) -> AppResult<String> {
        let movies = self.retrieve(query, self.filter_pool).await?;
        let listing: Vec<String> = movies
            .iter()
            .filter(|movie| criteria.matches(movie))
            .map(format_filtered)
            .collect();

        tracing::debug!(
            candidates = movies.len(),
            kept = listing.len(),
            "Filtered recommendations"
        );
        Ok(listing.join("\n\n"))
    }

    async fn retrieve(&self, query: &str, k: usize) -> AppResult<Vec<MovieRecord>> {
        let docs = self.index.query(query, k).await?;
        Ok(docs.iter().map(MovieRecord::from_document).collect())
    }

    async fn generate(
        &self,
        prompt: &PromptDefinition,
        variables: HashMap<String, String>,
    ) -> AppResult<String> {
        let built = build_prompt(prompt, variables)?;

        let mut request = LlmRequest::new(built.user, &self.model)
            .with_temperature(TEMPERATURE)
            .with_max_tokens(MAX_TOKENS);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        tracing::debug!(
            provider = self.llm.provider_name(),
            prompt = %built.metadata.source_prompt_id,
            "Requesting generation"
        );
        let response = self.llm.complete(&request).await?;
        Ok(response.content)
    }
}
