//! Recipient Source Adapter: turns a `RecipientSource` into recipients and
//! serves the companion listing operations (sheets, columns, collections,
//! fields) the UI uses to pick a source.

use crate::documents::DocumentStore;
use crate::files::FileStore;
use bulksms_core::types::address_from_value;
use bulksms_core::{BulkSmsError, BulkSmsResult, Recipient, RecipientSource};
use std::sync::Arc;
use tracing::{debug, info};

pub struct RecipientSourceAdapter {
    files: Arc<dyn FileStore>,
    documents: Arc<dyn DocumentStore>,
}

impl RecipientSourceAdapter {
    pub fn new(files: Arc<dyn FileStore>, documents: Arc<dyn DocumentStore>) -> Self {
        Self { files, documents }
    }

    /// Produce the ordered recipient list for one batch.
    pub async fn extract_recipients(&self, source: &RecipientSource) -> BulkSmsResult<Vec<Recipient>> {
        let recipients = match source {
            RecipientSource::Tabular {
                file,
                sheet,
                column,
            } => {
                let (file, sheet, column) = (file.clone(), sheet.clone(), *column);
                self.blocking(move |files| files.open_sheet(&file, &sheet)?.extract_column(column))
                    .await?
            }
            RecipientSource::Collection { collection, field } => {
                self.extract_from_collection(collection, field).await?
            }
        };

        metrics::counter!("sources.recipients_extracted", "source" => source.label())
            .increment(recipients.len() as u64);
        info!(source = source.label(), count = recipients.len(), "Recipients extracted");
        Ok(recipients)
    }

    async fn extract_from_collection(
        &self,
        collection: &str,
        field: &str,
    ) -> BulkSmsResult<Vec<Recipient>> {
        validate_field_name(field)?;
        self.require_collection(collection).await?;

        let values = self.documents.project_field(collection, field).await?;
        let projected = values.len();
        let recipients: Vec<Recipient> = values
            .iter()
            .filter_map(address_from_value)
            .map(Recipient::new)
            .collect();

        debug!(
            collection = %collection,
            field = %field,
            projected,
            skipped = projected - recipients.len(),
            "Collection field projected"
        );
        Ok(recipients)
    }

    async fn require_collection(&self, collection: &str) -> BulkSmsResult<()> {
        let exists = self
            .documents
            .list_collections()
            .await?
            .iter()
            .any(|c| c == collection);
        if !exists {
            return Err(BulkSmsError::SourceNotFound(format!("collection '{collection}'")));
        }
        Ok(())
    }

    // ─── Companion operations ────────────────────────────────────────────

    pub async fn save_upload(&self, name: &str, bytes: Vec<u8>) -> BulkSmsResult<String> {
        let name = name.to_string();
        self.blocking(move |files| files.save(&name, &bytes)).await
    }

    pub async fn read_file(&self, name: &str) -> BulkSmsResult<Vec<u8>> {
        let name = name.to_string();
        self.blocking(move |files| files.read(&name)).await
    }

    pub async fn list_sheets(&self, file: &str) -> BulkSmsResult<Vec<String>> {
        let file = file.to_string();
        self.blocking(move |files| files.sheet_names(&file)).await
    }

    /// Header names (row 1) of a sheet.
    pub async fn list_columns(&self, file: &str, sheet: &str) -> BulkSmsResult<Vec<String>> {
        let (file, sheet) = (file.to_string(), sheet.to_string());
        self.blocking(move |files| Ok(files.open_sheet(&file, &sheet)?.header()))
            .await
    }

    pub async fn list_collections(&self) -> BulkSmsResult<Vec<String>> {
        self.documents.list_collections().await
    }

    pub async fn list_fields(&self, collection: &str) -> BulkSmsResult<Vec<String>> {
        self.require_collection(collection).await?;
        self.documents.list_fields(collection).await
    }

    async fn blocking<T, F>(&self, f: F) -> BulkSmsResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn FileStore) -> BulkSmsResult<T> + Send + 'static,
    {
        let files = self.files.clone();
        tokio::task::spawn_blocking(move || f(files.as_ref()))
            .await
            .map_err(|e| BulkSmsError::Internal(anyhow::anyhow!("file store task failed: {e}")))?
    }
}

fn validate_field_name(field: &str) -> BulkSmsResult<()> {
    if field.trim().is_empty() {
        return Err(BulkSmsError::InvalidField("field name must not be empty".to_string()));
    }
    // Mongo cannot include `_id` while excluding it, so it is never a recipient field.
    if field.starts_with('$') || field.contains('\0') || field.trim() == "_id" {
        return Err(BulkSmsError::InvalidField(format!("'{field}' is not a valid field name")));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::documents::MemoryDocumentStore;
    use crate::files::MemoryFileStore;
    use crate::sheet::Sheet;
    use serde_json::json;

    fn adapter() -> RecipientSourceAdapter {
        let files = MemoryFileStore::new();
        files.insert_workbook(
            "contacts.xlsx",
            vec![(
                "Sheet1",
                Sheet::from_strings([["phone"], ["+1"], [""], ["+2"]]),
            )],
        );
        let documents = MemoryDocumentStore::new();
        documents.insert_collection(
            "customers",
            vec![
                json!({"phone": "+1"}),
                json!({"other": "x"}),
                json!({"phone": "+2"}),
                json!({"phone": null}),
                json!({"phone": "  "}),
            ],
        );
        RecipientSourceAdapter::new(Arc::new(files), Arc::new(documents))
    }

    fn addresses(recipients: Vec<Recipient>) -> Vec<String> {
        recipients.into_iter().map(|r| r.address).collect()
    }

    #[tokio::test]
    async fn test_tabular_extraction() {
        let source = RecipientSource::Tabular {
            file: "contacts.xlsx".into(),
            sheet: "Sheet1".into(),
            column: 0,
        };
        let recipients = adapter().extract_recipients(&source).await.unwrap();
        assert_eq!(addresses(recipients), vec!["+1", "+2"]);
    }

    #[tokio::test]
    async fn test_tabular_errors() {
        let adapter = adapter();
        let missing_sheet = RecipientSource::Tabular {
            file: "contacts.xlsx".into(),
            sheet: "Nope".into(),
            column: 0,
        };
        assert!(matches!(
            adapter.extract_recipients(&missing_sheet).await,
            Err(BulkSmsError::SourceNotFound(_))
        ));

        let bad_column = RecipientSource::Tabular {
            file: "contacts.xlsx".into(),
            sheet: "Sheet1".into(),
            column: 5,
        };
        assert!(matches!(
            adapter.extract_recipients(&bad_column).await,
            Err(BulkSmsError::InvalidColumn { column: 5, .. })
        ));
    }

    #[tokio::test]
    async fn test_collection_extraction_skips_missing_and_empty() {
        let source = RecipientSource::Collection {
            collection: "customers".into(),
            field: "phone".into(),
        };
        let recipients = adapter().extract_recipients(&source).await.unwrap();
        assert_eq!(addresses(recipients), vec!["+1", "+2"]);
    }

    #[tokio::test]
    async fn test_collection_errors() {
        let adapter = adapter();
        let missing = RecipientSource::Collection {
            collection: "ghosts".into(),
            field: "phone".into(),
        };
        assert!(matches!(
            adapter.extract_recipients(&missing).await,
            Err(BulkSmsError::SourceNotFound(_))
        ));

        for field in ["", "$where", "_id"] {
            let bad_field = RecipientSource::Collection {
                collection: "customers".into(),
                field: field.into(),
            };
            assert!(matches!(
                adapter.extract_recipients(&bad_field).await,
                Err(BulkSmsError::InvalidField(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_companion_listings() {
        let adapter = adapter();
        assert_eq!(adapter.list_sheets("contacts.xlsx").await.unwrap(), vec!["Sheet1"]);
        assert_eq!(
            adapter.list_columns("contacts.xlsx", "Sheet1").await.unwrap(),
            vec!["phone"]
        );
        assert_eq!(adapter.list_collections().await.unwrap(), vec!["customers"]);
        assert_eq!(adapter.list_fields("customers").await.unwrap(), vec!["phone"]);
        assert!(matches!(
            adapter.list_fields("ghosts").await,
            Err(BulkSmsError::SourceNotFound(_))
        ));
    }
}
