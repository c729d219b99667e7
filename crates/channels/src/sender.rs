use async_trait::async_trait;
use bulksms_core::{SendError, SendReceipt};

/// Send one message to one address. Implementations carry their own sender
/// identity (from-number or messaging service) and credentials.
#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Provider name for logs and metrics.
    fn name(&self) -> &'static str;

    async fn send(&self, to: &str, body: &str) -> Result<SendReceipt, SendError>;
}
