//! Pairing of parallel request arrays (phones with messages or with
//! placeholder sets).
//!
//! Arrays of different lengths are zipped and the tail of the longer one is
//! dropped, unless strict pairing is enabled, in which case the request is
//! rejected. Entries with a blank phone are never dispatched.

use bulksms_core::types::Context;
use bulksms_core::{BulkSmsError, BulkSmsResult, MessageTemplate, Recipient};
use tracing::warn;

fn zip_checked<A, B>(
    phones: Vec<String>,
    values: Vec<B>,
    values_name: &str,
    strict: bool,
    mut build: impl FnMut(String, B) -> Option<A>,
) -> BulkSmsResult<Vec<A>> {
    if phones.len() != values.len() {
        if strict {
            return Err(BulkSmsError::InputValidation(format!(
                "phones has {} entries but {values_name} has {}",
                phones.len(),
                values.len()
            )));
        }
        warn!(
            phones = phones.len(),
            values = values.len(),
            values_name,
            "Paired arrays differ in length, truncating to the shorter"
        );
    }

    Ok(phones
        .into_iter()
        .zip(values)
        .filter_map(|(phone, value)| {
            let phone = phone.trim();
            if phone.is_empty() {
                return None;
            }
            build(phone.to_string(), value)
        })
        .collect())
}

/// Pair each phone with its own literal message. Pairs with an empty message are dropped.
pub fn paired_messages(
    phones: Vec<String>,
    messages: Vec<String>,
    strict: bool,
) -> BulkSmsResult<Vec<(Recipient, MessageTemplate)>> {
    zip_checked(phones, messages, "messages", strict, |phone, message| {
        (!message.is_empty()).then(|| (Recipient::new(phone), MessageTemplate::literal(message)))
    })
}

/// Pair each phone with the placeholder values its templated message is rendered with.
pub fn paired_contexts(
    phones: Vec<String>,
    contexts: Vec<Context>,
    strict: bool,
) -> BulkSmsResult<Vec<Recipient>> {
    zip_checked(phones, contexts, "placeholders", strict, |phone, context| {
        Some(Recipient::with_context(phone, context))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_truncates_to_shorter() {
        let pairs = paired_messages(strings(&["+1", "+2", "+3"]), strings(&["a", "b"]), false).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].0.address, "+2");
        assert_eq!(pairs[1].1.text(), "b");
    }

    #[test]
    fn test_strict_rejects_mismatch() {
        let err = paired_messages(strings(&["+1", "+2", "+3"]), strings(&["a", "b"]), true).unwrap_err();
        assert!(matches!(err, BulkSmsError::InputValidation(_)));
    }

    #[test]
    fn test_blank_entries_dropped() {
        let pairs = paired_messages(strings(&["+1", " ", "+3"]), strings(&["a", "b", ""]), false).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0.address, "+1");
    }

    #[test]
    fn test_contexts_follow_phones() {
        let contexts = vec![
            json!({"name": "A"}).as_object().unwrap().clone(),
            json!({"name": "B"}).as_object().unwrap().clone(),
        ];
        let recipients = paired_contexts(strings(&["+1", "+2"]), contexts, true).unwrap();
        assert_eq!(recipients[1].address, "+2");
        assert_eq!(recipients[1].context.get("name"), Some(&json!("B")));
    }

    #[test]
    fn test_more_contexts_than_phones() {
        let contexts = vec![Context::new(), Context::new(), Context::new()];
        let recipients = paired_contexts(strings(&["+1"]), contexts, false).unwrap();
        assert_eq!(recipients.len(), 1);
    }
}
