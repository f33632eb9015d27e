//! Document store: the id → document table backing the similarity index.

use crate::error::{IndexError, IndexResult};
use crate::types::Document;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    documents: BTreeMap<String, Document>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by id. Returns the previous document, if any.
    pub fn upsert(&mut self, document: Document) -> Option<Document> {
        self.documents.insert(document.id.clone(), document)
    }

    pub fn get(&self, id: &str) -> IndexResult<&Document> {
        self.documents
            .get(id)
            .ok_or_else(|| IndexError::NotFound(format!("document '{}'", id)))
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Document> {
        self.documents.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    /// Case-insensitive lookup on the `title` metadata field.
    pub fn find_by_title(&self, title: &str) -> Option<&Document> {
        let needle = title.trim().to_lowercase();
        self.documents
            .values()
            .find(|doc| {
                doc.metadata_str("title")
                    .is_some_and(|t| t.to_lowercase() == needle)
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl FromIterator<Document> for DocumentStore {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        let mut store = Self::new();
        for doc in iter {
            store.upsert(doc);
        }
        store
    }
}
