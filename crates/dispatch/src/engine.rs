//! Dispatch Engine.

use crate::report::BatchReport;
use bulksms_channels::SmsSender;
use bulksms_core::config::DispatchConfig;
use bulksms_core::{DispatchOutcome, DispatchResult, MessageTemplate, Recipient, SendError};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct DispatchSettings {
    /// Sends in flight at once; values below 1 are treated as 1.
    pub concurrency: usize,
    pub send_timeout: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

impl From<&DispatchConfig> for DispatchSettings {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            send_timeout: Duration::from_millis(config.send_timeout_ms),
        }
    }
}

/// Runs batches against an injected `SmsSender`.
///
/// Every recipient is attempted exactly once. Results come back in source
/// order even when sends overlap.
pub struct DispatchEngine {
    sender: Arc<dyn SmsSender>,
    settings: DispatchSettings,
}

impl DispatchEngine {
    pub fn new(sender: Arc<dyn SmsSender>, settings: DispatchSettings) -> Self {
        info!(
            provider = sender.name(),
            concurrency = settings.concurrency,
            send_timeout_ms = settings.send_timeout.as_millis() as u64,
            "Dispatch engine initialized"
        );
        Self { sender, settings }
    }

    pub fn provider(&self) -> &'static str {
        self.sender.name()
    }

    /// Send `template` to every recipient, rendering it against each context.
    pub async fn dispatch_batch(&self, recipients: Vec<Recipient>, template: &MessageTemplate) -> BatchReport {
        let template = Arc::new(template.clone());
        let items = recipients
            .into_iter()
            .map(|recipient| (recipient, template.clone()))
            .collect();
        self.run(items).await
    }

    /// Send a different template to each recipient.
    pub async fn dispatch_each(&self, items: Vec<(Recipient, MessageTemplate)>) -> BatchReport {
        let items = items
            .into_iter()
            .map(|(recipient, template)| (recipient, Arc::new(template)))
            .collect();
        self.run(items).await
    }

    async fn run(&self, items: Vec<(Recipient, Arc<MessageTemplate>)>) -> BatchReport {
        if items.is_empty() {
            return BatchReport::empty();
        }

        let start = Instant::now();
        let batch_size = items.len();
        metrics::counter!("dispatch.batches").increment(1);
        metrics::histogram!("dispatch.batch_size").record(batch_size as f64);

        let results: Vec<DispatchResult> = stream::iter(items)
            .map(|(recipient, template)| self.dispatch_one(recipient, template))
            .buffered(self.settings.concurrency.max(1))
            .collect()
            .await;

        let report = BatchReport::from_results(results);
        let latency_ms = start.elapsed().as_millis() as u64;
        metrics::histogram!("dispatch.latency_ms").record(latency_ms as f64);

        info!(
            provider = self.sender.name(),
            attempted = report.summary.attempted,
            succeeded = report.summary.succeeded,
            failed = report.summary.failed,
            latency_ms,
            "Batch dispatched"
        );
        report
    }

    async fn dispatch_one(&self, recipient: Recipient, template: Arc<MessageTemplate>) -> DispatchResult {
        let outcome = match template.render(&recipient.context) {
            Ok(body) => self.send(&recipient.address, &body).await,
            Err(e) => {
                warn!(to = %recipient.address, error = %e, "Message render failed");
                metrics::counter!("sms.failed", "reason" => "render").increment(1);
                DispatchOutcome::Failed(e.to_string())
            }
        };
        DispatchResult { recipient, outcome }
    }

    async fn send(&self, to: &str, body: &str) -> DispatchOutcome {
        let result = match tokio::time::timeout(self.settings.send_timeout, self.sender.send(to, body)).await {
            Ok(result) => result,
            Err(_) => Err(SendError::Timeout(self.settings.send_timeout)),
        };

        match result {
            Ok(receipt) => {
                debug!(to = %to, provider_id = %receipt.provider_id, segments = receipt.segments, "SMS sent");
                metrics::counter!("sms.sent", "provider" => self.sender.name()).increment(1);
                DispatchOutcome::Sent
            }
            Err(e) => {
                warn!(to = %to, error = %e, "SMS send failed");
                metrics::counter!("sms.failed", "reason" => e.kind()).increment(1);
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bulksms_channels::SimulatedSmsSender;
    use bulksms_core::{BatchSummary, SendReceipt};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn engine(sender: Arc<dyn SmsSender>) -> DispatchEngine {
        DispatchEngine::new(
            sender,
            DispatchSettings {
                concurrency: 3,
                send_timeout: Duration::from_millis(200),
            },
        )
    }

    fn recipients(addresses: &[&str]) -> Vec<Recipient> {
        addresses.iter().map(|a| Recipient::new(*a)).collect()
    }

    #[tokio::test]
    async fn test_all_sent() {
        let sender = Arc::new(SimulatedSmsSender::new("+15550000000"));
        let report = engine(sender.clone())
            .dispatch_batch(
                recipients(&["+15551111111", "+15552222222"]),
                &MessageTemplate::literal("hi"),
            )
            .await;
        assert_eq!(
            report.summary,
            BatchSummary {
                attempted: 2,
                succeeded: 2,
                failed: 0
            }
        );
        assert_eq!(sender.sent_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let sender = Arc::new(SimulatedSmsSender::new("+15550000000"));
        let report = engine(sender)
            .dispatch_batch(Vec::new(), &MessageTemplate::literal("hi"))
            .await;
        assert_eq!(report.summary, BatchSummary::default());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_batch() {
        let sender = Arc::new(SimulatedSmsSender::new("+15550000000"));
        sender.fail_for("+15550000003", SendError::Rejected {
            code: "30007".into(),
            message: "filtered".into(),
        });
        let batch = recipients(&[
            "+15550000001",
            "+15550000002",
            "+15550000003",
            "+15550000004",
            "+15550000005",
        ]);
        let report = engine(sender.clone())
            .dispatch_batch(batch, &MessageTemplate::literal("promo"))
            .await;

        assert_eq!(
            report.summary,
            BatchSummary {
                attempted: 5,
                succeeded: 4,
                failed: 1
            }
        );
        assert_eq!(sender.sent_count(), 4);
        let failures = report.failures();
        assert_eq!(failures[0].address, "+15550000003");
        assert!(failures[0].reason.contains("filtered"));
    }

    #[tokio::test]
    async fn test_render_failure_is_per_recipient() {
        let sender = Arc::new(SimulatedSmsSender::new("+15550000000"));
        let batch = vec![
            Recipient::with_context("+15550000001", json!({"name": "Alice"}).as_object().unwrap().clone()),
            Recipient::with_context("+15550000002", json!({"nick": "B"}).as_object().unwrap().clone()),
            Recipient::with_context("+15550000003", json!({"name": "Cy"}).as_object().unwrap().clone()),
        ];
        let report = engine(sender.clone())
            .dispatch_batch(batch, &MessageTemplate::substituted("Hi {name}"))
            .await;

        assert_eq!(report.summary.succeeded, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.results[1].outcome, DispatchOutcome::Failed("missing placeholder 'name'".into()));
        assert_eq!(sender.messages_to("+15550000003")[0].body, "Hi Cy");
    }

    #[tokio::test]
    async fn test_dispatch_each_uses_own_template() {
        let sender = Arc::new(SimulatedSmsSender::new("+15550000000"));
        let items = vec![
            (Recipient::new("+15550000001"), MessageTemplate::literal("a")),
            (Recipient::new("+15550000002"), MessageTemplate::literal("b")),
        ];
        let report = engine(sender.clone()).dispatch_each(items).await;
        assert_eq!(report.summary.succeeded, 2);
        assert_eq!(sender.messages_to("+15550000002")[0].body, "b");
    }

    /// Sleeps on one address, counts concurrent sends.
    struct SlowSender {
        slow: String,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl SmsSender for SlowSender {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn send(&self, to: &str, _body: &str) -> Result<SendReceipt, SendError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let delay = if to == self.slow { 5_000 } else { 20 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(SendReceipt {
                provider_id: format!("SM-{to}"),
                to: to.to_string(),
                segments: 1,
                status: "queued".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_timeout_and_bounded_concurrency() {
        let sender = Arc::new(SlowSender {
            slow: "+2".into(),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let batch = recipients(&["+1", "+2", "+3", "+4", "+5", "+6"]);
        let report = engine(sender.clone())
            .dispatch_batch(batch, &MessageTemplate::literal("x"))
            .await;

        assert_eq!(report.summary.attempted, 6);
        assert_eq!(report.summary.failed, 1);
        assert!(report.failures()[0].reason.contains("timed out"));
        assert!(sender.peak.load(Ordering::SeqCst) <= 3);

        // Source order survives overlapping sends.
        let order: Vec<&str> = report.results.iter().map(|r| r.recipient.address.as_str()).collect();
        assert_eq!(order, vec!["+1", "+2", "+3", "+4", "+5", "+6"]);
    }
}
