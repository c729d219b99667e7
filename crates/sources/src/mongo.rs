//! MongoDB-backed document store.

use crate::documents::DocumentStore;
use async_trait::async_trait;
use bulksms_core::config::MongoConfig;
use bulksms_core::{BulkSmsError, BulkSmsResult};
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Database};
use serde_json::Value;
use tracing::{debug, info};

pub struct MongoDocumentStore {
    db: Database,
}

impl MongoDocumentStore {
    /// Build a client for the configured database. The driver connects
    /// lazily, so an unreachable server surfaces on first query.
    pub async fn connect(config: &MongoConfig) -> BulkSmsResult<Self> {
        let client = Client::with_uri_str(&config.uri).await.map_err(store_error)?;
        info!(database = %config.database, "MongoDB document store initialized");
        Ok(Self {
            db: client.database(&config.database),
        })
    }

    pub fn from_database(db: Database) -> Self {
        Self { db }
    }
}

fn store_error(e: mongodb::error::Error) -> BulkSmsError {
    BulkSmsError::Store(format!("mongodb: {e}"))
}

fn lookup_path<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }
    Some(current)
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn list_collections(&self) -> BulkSmsResult<Vec<String>> {
        let mut names = self.db.list_collection_names().await.map_err(store_error)?;
        names.sort();
        Ok(names)
    }

    async fn list_fields(&self, collection: &str) -> BulkSmsResult<Vec<String>> {
        let sample = self
            .db
            .collection::<Document>(collection)
            .find_one(doc! {})
            .await
            .map_err(store_error)?;
        Ok(sample
            .map(|doc| doc.keys().filter(|k| k.as_str() != "_id").cloned().collect())
            .unwrap_or_default())
    }

    async fn project_field(&self, collection: &str, field: &str) -> BulkSmsResult<Vec<Value>> {
        let mut projection = Document::new();
        projection.insert(field, 1);
        projection.insert("_id", 0);

        let mut cursor = self
            .db
            .collection::<Document>(collection)
            .find(doc! {})
            .projection(projection)
            .await
            .map_err(store_error)?;

        let mut values = Vec::new();
        while let Some(document) = cursor.try_next().await.map_err(store_error)? {
            if let Some(value) = lookup_path(&document, field) {
                values.push(value.clone().into_relaxed_extjson());
            }
        }

        debug!(collection = %collection, field = %field, count = values.len(), "Projected field");
        Ok(values)
    }
}
