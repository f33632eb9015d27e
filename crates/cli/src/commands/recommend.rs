//! One-shot retrieval command handlers: recommend, similar, filter.

use super::{open_index, recommender, RetrievalArgs};
use clap::Args;
use marquee_core::{config::AppConfig, AppResult};
use marquee_index::FilterCriteria;

/// Recommend movies for a request
#[derive(Args, Debug)]
pub struct RecommendCommand {
    /// What kind of movie you are looking for
    pub query: String,

    #[command(flatten)]
    pub retrieval: RetrievalArgs,
}

impl RecommendCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing recommend command");

        let index = open_index(config, &self.retrieval).await?;
        let bot = recommender(config, index.clone(), &self.retrieval)?;

        let response = bot.recommend(&self.query).await;
        index.cleanup().await?;
        println!("{}", response?);
        Ok(())
    }
}

/// Recommend movies similar to a title
#[derive(Args, Debug)]
pub struct SimilarCommand {
    /// Movie title (case-insensitive)
    pub title: String,

    #[command(flatten)]
    pub retrieval: RetrievalArgs,
}

impl SimilarCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing similar command for '{}'", self.title);

        let index = open_index(config, &self.retrieval).await?;
        let bot = recommender(config, index.clone(), &self.retrieval)?;

        let response = bot.similar(&self.title).await;
        index.cleanup().await?;
        println!("{}", response?);
        Ok(())
    }
}

/// List movies matching a request and filters
#[derive(Args, Debug)]
pub struct FilterCommand {
    /// What kind of movie you are looking for
    pub query: String,

    /// Minimum average rating (0-10)
    #[arg(long, default_value_t = 0.0)]
    pub min_rating: f64,

    /// Maximum budget in dollars
    #[arg(long)]
    pub max_budget: Option<f64>,

    /// Keep movies with any of these genres (repeatable)
    #[arg(long = "genre")]
    pub genres: Vec<String>,

    #[command(flatten)]
    pub retrieval: RetrievalArgs,
}

impl FilterCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing filter command");

        let criteria = FilterCriteria {
            min_rating: self.min_rating,
            max_budget: self.max_budget.unwrap_or(f64::INFINITY),
            genres: self.genres.clone(),
        };

        let index = open_index(config, &self.retrieval).await?;
        let bot = recommender(config, index.clone(), &self.retrieval)?;

        let listing = bot.filter(&self.query, &criteria).await;
        index.cleanup().await?;

        let listing = listing?;
        if listing.is_empty() {
            println!("No movies matched those filters.");
        } else {
            println!("{}", listing);
        }
        Ok(())
    }
}
