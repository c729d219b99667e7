//! In-memory SMS provider. Records every message instead of delivering it;
//! used for dry runs and as the test double behind the dispatch engine.

use crate::segments::calculate_segments;
use crate::sender::SmsSender;
use async_trait::async_trait;
use bulksms_core::{SendError, SendReceipt};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message accepted by the simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsMessage {
    pub id: Uuid,
    pub to: String,
    pub from: String,
    pub body: String,
    pub provider_id: String,
    pub created_at: DateTime<Utc>,
    pub segments: u32,
}

pub struct SimulatedSmsSender {
    from_number: String,
    messages: DashMap<Uuid, SmsMessage>,
    /// Addresses that fail with a preset error.
    failures: DashMap<String, SendError>,
}

impl SimulatedSmsSender {
    pub fn new(from_number: impl Into<String>) -> Self {
        let from_number = from_number.into();
        tracing::info!(from = %from_number, "Simulated SMS provider initialized");
        Self {
            from_number,
            messages: DashMap::new(),
            failures: DashMap::new(),
        }
    }

    /// Make every send to `to` fail with `error`.
    pub fn fail_for(&self, to: impl Into<String>, error: SendError) {
        self.failures.insert(to.into(), error);
    }

    pub fn sent_count(&self) -> usize {
        self.messages.len()
    }

    /// Messages sent to one address, oldest first.
    pub fn messages_to(&self, to: &str) -> Vec<SmsMessage> {
        let mut messages: Vec<SmsMessage> = self
            .messages
            .iter()
            .filter(|entry| entry.value().to == to)
            .map(|entry| entry.value().clone())
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        messages
    }

    /// Up to `limit` most recently created messages.
    pub fn list_messages(&self, limit: usize) -> Vec<SmsMessage> {
        let mut messages: Vec<SmsMessage> = self
            .messages
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        messages.truncate(limit);
        messages
    }
}

/// Loose phone-number check: optional leading `+`, then 3..=15 digits
/// with common separators.
fn plausible_number(to: &str) -> bool {
    let digits = to.trim_start_matches('+');
    let count = digits.chars().filter(char::is_ascii_digit).count();
    (3..=15).contains(&count)
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')' | '.'))
}

#[async_trait]
impl SmsSender for SimulatedSmsSender {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn send(&self, to: &str, body: &str) -> Result<SendReceipt, SendError> {
        if let Some(error) = self.failures.get(to) {
            return Err(error.value().clone());
        }
        if !plausible_number(to) {
            return Err(SendError::InvalidAddress(format!("'{to}' is not a phone number")));
        }

        let id = Uuid::new_v4();
        let provider_id = format!("SM{}", id.simple());
        let segments = calculate_segments(body);

        self.messages.insert(
            id,
            SmsMessage {
                id,
                to: to.to_string(),
                from: self.from_number.clone(),
                body: body.to_string(),
                provider_id: provider_id.clone(),
                created_at: Utc::now(),
                segments,
            },
        );
        tracing::debug!(to = %to, provider_id = %provider_id, segments, "SMS message recorded");

        Ok(SendReceipt {
            provider_id,
            to: to.to_string(),
            segments,
            status: "queued".to_string(),
        })
    }
}
