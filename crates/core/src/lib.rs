pub mod config;
pub mod error;
pub mod templates;
pub mod types;

pub use config::AppConfig;
pub use error::{BulkSmsError, BulkSmsResult, RenderError, SendError};
pub use templates::{render, MessageTemplate, TemplateMode};
pub use types::{BatchSummary, DispatchOutcome, DispatchResult, Recipient, RecipientSource, SendReceipt};
