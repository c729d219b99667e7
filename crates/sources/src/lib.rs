//! Recipient sourcing: spreadsheet uploads and document-store collections.
//!
//! Both sources reduce to an ordered list of `Recipient`s. Blank or missing
//! values are skipped here so the dispatch engine only ever sees real addresses.

pub mod adapter;
pub mod documents;
pub mod files;
pub mod mongo;
pub mod sheet;

pub use adapter::RecipientSourceAdapter;
pub use documents::{DocumentStore, MemoryDocumentStore};
pub use files::{sanitize_filename, FileStore, MemoryFileStore, UploadDirStore};
pub use mongo::MongoDocumentStore;
pub use sheet::Sheet;
