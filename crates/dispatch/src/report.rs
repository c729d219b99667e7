//! Batch Result Reporter.

use bulksms_core::{BatchSummary, DispatchOutcome, DispatchResult};
use serde::Serialize;
use utoipa::ToSchema;

/// Count attempted/succeeded/failed. `attempted == succeeded + failed` always holds.
pub fn summarize(results: &[DispatchResult]) -> BatchSummary {
    let succeeded = results.iter().filter(|r| r.outcome.is_sent()).count();
    BatchSummary {
        attempted: results.len(),
        succeeded,
        failed: results.len() - succeeded,
    }
}

/// One recipient that did not get its message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FailureDetail {
    pub address: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub summary: BatchSummary,
    pub results: Vec<DispatchResult>,
}

impl BatchReport {
    pub fn from_results(results: Vec<DispatchResult>) -> Self {
        Self {
            summary: summarize(&results),
            results,
        }
    }

    pub fn empty() -> Self {
        Self::from_results(Vec::new())
    }

    /// Failed recipients in source order.
    pub fn failures(&self) -> Vec<FailureDetail> {
        self.results
            .iter()
            .filter_map(|r| match &r.outcome {
                DispatchOutcome::Failed(reason) => Some(FailureDetail {
                    address: r.recipient.address.clone(),
                    reason: reason.clone(),
                }),
                DispatchOutcome::Sent => None,
            })
            .collect()
    }

    pub fn all_sent(&self) -> bool {
        self.summary.failed == 0
    }
}

/// Which send workflow produced the batch; selects the summary wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Tabular,
    Paired,
    Templated,
    Collection,
}

impl BatchKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Tabular => "tabular",
            Self::Paired => "paired",
            Self::Templated => "templated",
            Self::Collection => "collection",
        }
    }

    pub fn message(&self, summary: &BatchSummary) -> String {
        let n = summary.succeeded;
        match self {
            Self::Tabular => format!("SMS sent to {n} contacts."),
            Self::Paired => format!("SMS sent to {n} recipients."),
            Self::Templated => format!("Successfully sent SMS to {n} recipients."),
            Self::Collection => format!("Successfully sent {n} messages."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulksms_core::Recipient;

    fn result(address: &str, outcome: DispatchOutcome) -> DispatchResult {
        DispatchResult {
            recipient: Recipient::new(address),
            outcome,
        }
    }

    #[test]
    fn test_summarize_counts() {
        let results = vec![
            result("+1", DispatchOutcome::Sent),
            result("+2", DispatchOutcome::Failed("bad".into())),
            result("+3", DispatchOutcome::Sent),
        ];
        let summary = summarize(&results);
        assert_eq!(
            summary,
            BatchSummary {
                attempted: 3,
                succeeded: 2,
                failed: 1
            }
        );
        assert_eq!(summary.attempted, summary.succeeded + summary.failed);
    }

    #[test]
    fn test_empty_report() {
        let report = BatchReport::empty();
        assert_eq!(report.summary, BatchSummary::default());
        assert!(report.all_sent());
        assert!(report.failures().is_empty());
    }

    #[test]
    fn test_failures_keep_order() {
        let report = BatchReport::from_results(vec![
            result("+1", DispatchOutcome::Failed("a".into())),
            result("+2", DispatchOutcome::Sent),
            result("+3", DispatchOutcome::Failed("b".into())),
        ]);
        let failures = report.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].address, "+1");
        assert_eq!(failures[1].reason, "b");
        assert!(!report.all_sent());
    }

    #[test]
    fn test_messages_use_succeeded_count() {
        let summary = BatchSummary {
            attempted: 5,
            succeeded: 4,
            failed: 1,
        };
        assert_eq!(BatchKind::Tabular.message(&summary), "SMS sent to 4 contacts.");
        assert_eq!(BatchKind::Paired.message(&summary), "SMS sent to 4 recipients.");
        assert_eq!(
            BatchKind::Templated.message(&summary),
            "Successfully sent SMS to 4 recipients."
        );
        assert_eq!(BatchKind::Collection.message(&summary), "Successfully sent 4 messages.");
    }
}
