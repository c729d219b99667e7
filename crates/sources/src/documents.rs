//! Document-store abstraction used for collection-sourced batches.

use async_trait::async_trait;
use bulksms_core::types::Context;
use bulksms_core::{BulkSmsError, BulkSmsResult};
use dashmap::DashMap;
use serde_json::Value;

/// Query surface the recipient adapter needs from a document database.
///
/// `project_field` returns one value per document that has the field; it
/// does not filter empty values, that stays with the caller.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_collections(&self) -> BulkSmsResult<Vec<String>>;

    /// Field names of one sample document (`_id` excluded). Empty when the
    /// collection has no documents.
    async fn list_fields(&self, collection: &str) -> BulkSmsResult<Vec<String>>;

    async fn project_field(&self, collection: &str, field: &str) -> BulkSmsResult<Vec<Value>>;
}

/// Resolve a possibly dotted path (`contact.phone`) inside a JSON document.
pub fn lookup_path<'a>(document: &'a Context, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// In-memory document store for tests and demos.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: DashMap<String, Vec<Context>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collection. Non-object values are ignored.
    pub fn insert_collection(&self, name: &str, documents: Vec<Value>) {
        let documents = documents
            .into_iter()
            .filter_map(|doc| match doc {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.collections.insert(name.to_string(), documents);
    }

    fn documents(&self, collection: &str) -> BulkSmsResult<Vec<Context>> {
        self.collections
            .get(collection)
            .map(|docs| docs.value().clone())
            .ok_or_else(|| BulkSmsError::SourceNotFound(format!("collection '{collection}'")))
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list_collections(&self) -> BulkSmsResult<Vec<String>> {
        let mut names: Vec<String> = self.collections.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn list_fields(&self, collection: &str) -> BulkSmsResult<Vec<String>> {
        let documents = self.documents(collection)?;
        Ok(documents
            .first()
            .map(|doc| doc.keys().filter(|k| k.as_str() != "_id").cloned().collect())
            .unwrap_or_default())
    }

    async fn project_field(&self, collection: &str, field: &str) -> BulkSmsResult<Vec<Value>> {
        let documents = self.documents(collection)?;
        Ok(documents
            .iter()
            .filter_map(|doc| lookup_path(doc, field).cloned())
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_project_omits_documents_without_field() {
        let store = MemoryDocumentStore::new();
        store.insert_collection(
            "contacts",
            vec![json!({"phone": "+1"}), json!({"other": "x"}), json!({"phone": ""})],
        );
        let values = store.project_field("contacts", "phone").await.unwrap();
        assert_eq!(values, vec![json!("+1"), json!("")]);
    }

    #[tokio::test]
    async fn test_list_fields_uses_first_document() {
        let store = MemoryDocumentStore::new();
        store.insert_collection(
            "contacts",
            vec![json!({"_id": 1, "name": "A", "phone": "+1"}), json!({"email": "x"})],
        );
        store.insert_collection("empty", vec![]);
        assert_eq!(store.list_fields("contacts").await.unwrap(), vec!["name", "phone"]);
        assert!(store.list_fields("empty").await.unwrap().is_empty());
        assert_eq!(store.list_collections().await.unwrap(), vec!["contacts", "empty"]);
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let store = MemoryDocumentStore::new();
        assert!(matches!(
            store.project_field("nope", "phone").await,
            Err(BulkSmsError::SourceNotFound(_))
        ));
    }

    #[test]
    fn test_lookup_dotted_path() {
        let doc = json!({"contact": {"phone": "+9"}, "flat": 1});
        let doc = doc.as_object().unwrap();
        assert_eq!(lookup_path(doc, "contact.phone"), Some(&json!("+9")));
        assert_eq!(lookup_path(doc, "flat.deeper"), None);
        assert_eq!(lookup_path(doc, "missing"), None);
    }
}
