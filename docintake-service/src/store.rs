//! In-memory document store.
//!
//! Records live for the lifetime of the process. Each entry holds the
//! document record plus the text and entities from its last successful
//! processing run.

use dashmap::DashMap;

use crate::models::{Document, Entity, ProcessingStatus};

#[derive(Debug, Clone)]
struct StoredDocument {
    document: Document,
    text: Option<String>,
    entities: Vec<Entity>,
}

/// Process-memory map of documents keyed by id
#[derive(Default)]
pub struct DocumentStore {
    documents: DashMap<String, StoredDocument>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, document: Document) {
        self.documents.insert(
            document.id.clone(),
            StoredDocument {
                document,
                text: None,
                entities: Vec::new(),
            },
        );
    }

    pub fn get(&self, id: &str) -> Option<Document> {
        self.documents.get(id).map(|d| d.document.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// List documents in upload order
    pub fn list(&self, skip: usize, limit: usize) -> Vec<Document> {
        let mut documents: Vec<Document> = self
            .documents
            .iter()
            .map(|entry| entry.document.clone())
            .collect();
        documents.sort_by(|a, b| a.upload_date.cmp(&b.upload_date).then(a.id.cmp(&b.id)));
        documents.into_iter().skip(skip).take(limit).collect()
    }

    /// Apply `f` to the stored record. Returns false if the id is unknown.
    pub fn update<F>(&self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Document),
    {
        match self.documents.get_mut(id) {
            Some(mut entry) => {
                f(&mut entry.document);
                true
            }
            None => false,
        }
    }

    pub fn set_status(&self, id: &str, status: ProcessingStatus) -> bool {
        self.update(id, |doc| doc.processing_status = status)
    }

    /// Remember the output of the latest successful run
    pub fn set_extraction(&self, id: &str, text: Option<String>, entities: Vec<Entity>) {
        if let Some(mut entry) = self.documents.get_mut(id) {
            entry.text = text;
            entry.entities = entities;
        }
    }

    pub fn text(&self, id: &str) -> Option<Option<String>> {
        self.documents.get(id).map(|d| d.text.clone())
    }

    pub fn entities(&self, id: &str) -> Option<Vec<Entity>> {
        self.documents.get(id).map(|d| d.entities.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::path::PathBuf;

    fn doc(name: &str, offset_secs: i64) -> Document {
        let mut doc = Document::new(name, PathBuf::from(name), 1);
        doc.upload_date += Duration::seconds(offset_secs);
        doc
    }

    #[test]
    fn test_list_orders_by_upload_and_pages() {
        let store = DocumentStore::new();
        store.insert(doc("c.txt", 2));
        store.insert(doc("a.txt", 0));
        store.insert(doc("b.txt", 1));

        let names: Vec<String> = store.list(0, 100).into_iter().map(|d| d.filename).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);

        let page: Vec<String> = store.list(1, 1).into_iter().map(|d| d.filename).collect();
        assert_eq!(page, vec!["b.txt"]);

        assert!(store.list(5, 10).is_empty());
    }

    #[test]
    fn test_update_and_status() {
        let store = DocumentStore::new();
        let d = doc("a.txt", 0);
        let id = d.id.clone();
        store.insert(d);

        assert!(store.set_status(&id, ProcessingStatus::Processing));
        assert_eq!(
            store.get(&id).unwrap().processing_status,
            ProcessingStatus::Processing
        );
        assert!(!store.set_status("missing", ProcessingStatus::Failed));
    }

    #[test]
    fn test_extraction_round() {
        let store = DocumentStore::new();
        let d = doc("a.txt", 0);
        let id = d.id.clone();
        store.insert(d);

        assert_eq!(store.text(&id), Some(None));
        store.set_extraction(&id, Some("hello".to_string()), Vec::new());
        assert_eq!(store.text(&id), Some(Some("hello".to_string())));
        assert!(store.text("missing").is_none());
    }
}
