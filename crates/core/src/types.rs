use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Per-recipient placeholder values, kept in insertion order.
pub type Context = Map<String, Value>;

/// Where a batch gets its recipients from. Built per request, consumed once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecipientSource {
    /// A previously uploaded spreadsheet; `column` is zero-based.
    Tabular {
        file: String,
        sheet: String,
        column: usize,
    },
    /// A document-store collection; `field` is projected from every document.
    Collection { collection: String, field: String },
}

impl RecipientSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Tabular { .. } => "tabular",
            Self::Collection { .. } => "collection",
        }
    }
}

/// One destination plus the values its message is rendered with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Recipient {
    pub address: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub context: Context,
}

impl Recipient {
    /// Plain-message recipient with an empty context.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            context: Context::new(),
        }
    }

    pub fn with_context(address: impl Into<String>, context: Context) -> Self {
        Self {
            address: address.into(),
            context,
        }
    }
}

/// Normalise a raw cell or document value into a destination address.
///
/// Non-blank strings (trimmed) and numbers qualify. Nulls, booleans, arrays
/// and objects never do.
pub fn address_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(number_text(n)),
        _ => None,
    }
}

/// Integral floats print without a fractional part (`15551234567.0` -> `15551234567`).
pub fn number_text(n: &serde_json::Number) -> String {
    if let Some(f) = n.as_f64().filter(|_| n.is_f64()) {
        if f.fract() == 0.0 && f.abs() < 1e15 {
            return format!("{}", f as i64);
        }
    }
    n.to_string()
}

/// What the messaging provider handed back for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SendReceipt {
    pub provider_id: String,
    pub to: String,
    pub segments: u32,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent,
    Failed(String),
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Outcome of one recipient within a batch. Lives only until the batch is reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub recipient: Recipient,
    pub outcome: DispatchOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}
