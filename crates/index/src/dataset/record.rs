//! Normalized movie record.

use crate::types::{Document, MetadataValue};
use serde::{Deserialize, Serialize};

/// One movie, as consumed by the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: String,
    pub title: String,
    /// Embedded text
    pub overview: String,
    pub genres: Vec<String>,
    pub collection: Option<String>,
    pub budget: f64,
    pub popularity: f64,
    pub revenue: f64,
    pub runtime: f64,
    pub vote_average: f64,
    pub vote_count: f64,
}

impl MovieRecord {
    /// Return on investment; 0 when the budget is unknown.
    pub fn roi(&self) -> f64 {
        if self.budget == 0.0 {
            return 0.0;
        }
        (self.revenue - self.budget) / self.budget
    }

    /// Rating weighted by vote volume (saturating at 1000 votes), averaged
    /// with raw popularity.
    pub fn popularity_score(&self) -> f64 {
        let vote_weight = (self.vote_count / 1000.0).min(1.0);
        (self.vote_average * vote_weight + self.popularity) / 2.0
    }

    pub fn is_successful(&self) -> bool {
        self.roi() > 0.5 && self.popularity_score() > 5.0
    }

    pub fn genre_list(&self) -> String {
        self.genres.join(", ")
    }

    pub fn to_document(&self) -> Document {
        Document::new(self.id.clone(), self.overview.clone())
            .with_metadata("title", self.title.as_str())
            .with_metadata("genres", self.genre_list())
            .with_metadata("belongs_to_collection", self.collection.clone())
            .with_metadata("budget", self.budget)
            .with_metadata("popularity", self.popularity)
            .with_metadata("revenue", self.revenue)
            .with_metadata("runtime", self.runtime)
            .with_metadata("vote_average", self.vote_average)
            .with_metadata("vote_count", self.vote_count)
    }

    /// Rebuild a record from an indexed document. Missing numbers read as 0.
    pub fn from_document(doc: &Document) -> Self {
        let number = |key: &str| doc.metadata_f64(key).unwrap_or(0.0);
        let genres = doc
            .metadata_str("genres")
            .map(|g| {
                g.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: doc.id.clone(),
            title: doc.metadata_str("title").unwrap_or_default().to_string(),
            overview: doc.text.clone(),
            genres,
            collection: doc
                .metadata
                .get("belongs_to_collection")
                .and_then(MetadataValue::as_str)
                .map(str::to_string),
            budget: number("budget"),
            popularity: number("popularity"),
            revenue: number("revenue"),
            runtime: number("runtime"),
            vote_average: number("vote_average"),
            vote_count: number("vote_count"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_story() -> MovieRecord {
        MovieRecord {
            id: "862".into(),
            title: "Toy Story".into(),
            overview: "Led by Woody, Andy's toys live happily in his room.".into(),
            genres: vec!["Animation".into(), "Comedy".into(), "Family".into()],
            collection: Some("Toy Story Collection".into()),
            budget: 30_000_000.0,
            popularity: 21.946943,
            revenue: 373_554_033.0,
            runtime: 81.0,
            vote_average: 7.7,
            vote_count: 5415.0,
        }
    }

    #[test]
    fn test_analytics() {
        let movie = toy_story();
        assert!((movie.roi() - 11.4518).abs() < 1e-3);
        assert!((movie.popularity_score() - (7.7 + 21.946943) / 2.0).abs() < 1e-9);
        assert!(movie.is_successful());
    }

    #[test]
    fn test_zero_budget_roi() {
        let movie = MovieRecord {
            budget: 0.0,
            ..toy_story()
        };
        assert_eq!(movie.roi(), 0.0);
        assert!(!movie.is_successful());
    }

    #[test]
    fn test_low_vote_count_is_discounted() {
        let movie = MovieRecord {
            vote_count: 100.0,
            popularity: 0.0,
            ..toy_story()
        };
        assert!((movie.popularity_score() - 0.385).abs() < 1e-9);
    }

    #[test]
    fn test_document_round_trip() {
        let movie = toy_story();
        let doc = movie.to_document();

        assert_eq!(doc.id, "862");
        assert_eq!(doc.text, movie.overview);
        assert_eq!(doc.metadata_str("genres"), Some("Animation, Comedy, Family"));
        assert_eq!(MovieRecord::from_document(&doc), movie);
    }

    #[test]
    fn test_no_collection_is_null() {
        let movie = MovieRecord {
            collection: None,
            ..toy_story()
        };
        let doc = movie.to_document();
        assert_eq!(doc.metadata["belongs_to_collection"], MetadataValue::Null);
        assert_eq!(MovieRecord::from_document(&doc).collection, None);
    }
}
