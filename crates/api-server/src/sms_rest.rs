//! Bulk send endpoints and the document-store listings that feed them.

use crate::rest::{ApiError, AppState, ErrorResponse};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use bulksms_core::types::Context;
use bulksms_core::{MessageTemplate, RecipientSource};
use bulksms_dispatch::{paired_contexts, paired_messages, BatchKind, BatchReport, FailureDetail};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

/// Zero-based column index, accepted as a JSON number (integral floats
/// included) or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ColumnIndex {
    Number(i64),
    Float(f64),
    Text(String),
}

impl ColumnIndex {
    fn resolve(&self) -> Result<usize, ApiError> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Float(f) if f.is_finite() && f.fract() == 0.0 => *f as i64,
            Self::Float(f) => return Err(ApiError::invalid(format!("column '{f}' is not an integer"))),
            Self::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| ApiError::invalid(format!("column '{s}' is not an integer")))?,
        };
        usize::try_from(value).map_err(|_| ApiError::invalid("column must not be negative"))
    }
}

#[derive(Deserialize, ToSchema)]
pub struct TabularSendRequest {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub sheet: String,
    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub column: Option<ColumnIndex>,
    #[serde(default)]
    pub message: String,
    /// Fill `{header}` placeholders from each row's cells.
    #[serde(default)]
    pub substitute: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct PairedSendRequest {
    #[serde(default)]
    pub phones: Vec<String>,
    #[serde(default)]
    pub messages: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplatedSendRequest {
    #[serde(default)]
    pub template_message: String,
    #[serde(default)]
    pub phones: Vec<String>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub placeholders: Vec<Context>,
}

#[derive(Deserialize, ToSchema)]
pub struct CollectionSendRequest {
    #[serde(default)]
    pub collection: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub message: String,
}

/// Outcome of a batch: the human-readable summary plus the counts behind it.
#[derive(Debug, Serialize, ToSchema)]
pub struct SendResponse {
    /// True when no recipient failed.
    pub success: bool,
    pub message: String,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<FailureDetail>,
}

impl SendResponse {
    fn from_report(kind: BatchKind, report: &BatchReport) -> Self {
        metrics::counter!("api.batches", "kind" => kind.label()).increment(1);
        info!(
            kind = kind.label(),
            attempted = report.summary.attempted,
            succeeded = report.summary.succeeded,
            "Send request completed"
        );
        Self {
            success: report.all_sent(),
            message: kind.message(&report.summary),
            attempted: report.summary.attempted,
            succeeded: report.summary.succeeded,
            failed: report.summary.failed,
            failures: report.failures(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CollectionsResponse {
    pub collections: Vec<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FieldsQuery {
    /// Collection to sample; omitted or empty yields no fields.
    pub collection: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct FieldsResponse {
    pub fields: Vec<String>,
}

fn require(value: &str, message: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::invalid(message));
    }
    Ok(())
}

/// POST /send_sms: Send one message to every number in a spreadsheet column.
#[utoipa::path(
    post,
    path = "/send_sms",
    tag = "SMS",
    request_body = TabularSendRequest,
    responses(
        (status = 200, description = "Batch dispatched", body = SendResponse),
        (status = 400, description = "Missing input or bad column", body = ErrorResponse),
        (status = 404, description = "Unknown file or sheet", body = ErrorResponse),
    )
)]
pub async fn handle_tabular_send(
    State(state): State<AppState>,
    payload: Result<Json<TabularSendRequest>, JsonRejection>,
) -> Result<Json<SendResponse>, ApiError> {
    let Json(request) = payload?;
    require(&request.filename, "filename is required.")?;
    require(&request.sheet, "sheet is required.")?;
    require(&request.message, "message is required.")?;
    let column = request
        .column
        .as_ref()
        .ok_or_else(|| ApiError::invalid("column is required."))?
        .resolve()?;

    let source = RecipientSource::Tabular {
        file: request.filename,
        sheet: request.sheet,
        column,
    };
    let recipients = state.sources.extract_recipients(&source).await?;
    let template = if request.substitute {
        MessageTemplate::substituted(request.message)
    } else {
        MessageTemplate::literal(request.message)
    };

    let report = state.engine.dispatch_batch(recipients, &template).await;
    Ok(Json(SendResponse::from_report(BatchKind::Tabular, &report)))
}

/// POST /excel_send_sms: Send each phone its own message.
#[utoipa::path(
    post,
    path = "/excel_send_sms",
    tag = "SMS",
    request_body = PairedSendRequest,
    responses(
        (status = 200, description = "Batch dispatched", body = SendResponse),
        (status = 400, description = "Phone numbers or messages missing", body = ErrorResponse),
    )
)]
pub async fn handle_paired_send(
    State(state): State<AppState>,
    payload: Result<Json<PairedSendRequest>, JsonRejection>,
) -> Result<Json<SendResponse>, ApiError> {
    let Json(request) = payload?;
    if request.phones.is_empty() || request.messages.is_empty() {
        return Err(ApiError::invalid("Phone numbers or messages are missing."));
    }

    let items = paired_messages(request.phones, request.messages, state.strict_pairing)?;
    let report = state.engine.dispatch_each(items).await;
    Ok(Json(SendResponse::from_report(BatchKind::Paired, &report)))
}

/// POST /advanced_send_sms: Render a template per phone from its placeholder values.
#[utoipa::path(
    post,
    path = "/advanced_send_sms",
    tag = "SMS",
    request_body = TemplatedSendRequest,
    responses(
        (status = 200, description = "Batch dispatched", body = SendResponse),
        (status = 400, description = "Phone numbers or template missing", body = ErrorResponse),
    )
)]
pub async fn handle_templated_send(
    State(state): State<AppState>,
    payload: Result<Json<TemplatedSendRequest>, JsonRejection>,
) -> Result<Json<SendResponse>, ApiError> {
    let Json(request) = payload?;
    if request.phones.is_empty() || request.template_message.is_empty() {
        return Err(ApiError::invalid("Missing phone numbers or message template."));
    }

    let template = MessageTemplate::substituted(request.template_message);
    let placeholders = template.placeholders().map_err(|e| ApiError::invalid(e.to_string()))?;
    tracing::debug!(placeholders = ?placeholders, "Template parsed");

    let recipients = paired_contexts(request.phones, request.placeholders, state.strict_pairing)?;
    let report = state.engine.dispatch_batch(recipients, &template).await;
    Ok(Json(SendResponse::from_report(BatchKind::Templated, &report)))
}

/// POST /mongo_send_sms: Send one message to a field of every document in a collection.
#[utoipa::path(
    post,
    path = "/mongo_send_sms",
    tag = "SMS",
    request_body = CollectionSendRequest,
    responses(
        (status = 200, description = "Batch dispatched", body = SendResponse),
        (status = 400, description = "Missing input or bad field", body = ErrorResponse),
        (status = 404, description = "Unknown collection", body = ErrorResponse),
    )
)]
pub async fn handle_collection_send(
    State(state): State<AppState>,
    payload: Result<Json<CollectionSendRequest>, JsonRejection>,
) -> Result<Json<SendResponse>, ApiError> {
    let Json(request) = payload?;
    require(&request.collection, "collection is required.")?;
    require(&request.field, "field is required.")?;
    require(&request.message, "message is required.")?;

    let source = RecipientSource::Collection {
        collection: request.collection,
        field: request.field,
    };
    let recipients = state.sources.extract_recipients(&source).await?;
    let report = state
        .engine
        .dispatch_batch(recipients, &MessageTemplate::literal(request.message))
        .await;
    Ok(Json(SendResponse::from_report(BatchKind::Collection, &report)))
}

/// GET /collections: Collections in the document store.
#[utoipa::path(
    get,
    path = "/collections",
    tag = "SMS",
    responses((status = 200, description = "Collection names", body = CollectionsResponse))
)]
pub async fn handle_collections(State(state): State<AppState>) -> Result<Json<CollectionsResponse>, ApiError> {
    let collections = state.sources.list_collections().await?;
    Ok(Json(CollectionsResponse { collections }))
}

/// GET /fields: Field names of a sample document.
#[utoipa::path(
    get,
    path = "/fields",
    tag = "SMS",
    params(FieldsQuery),
    responses(
        (status = 200, description = "Field names", body = FieldsResponse),
        (status = 404, description = "Unknown collection", body = ErrorResponse),
    )
)]
pub async fn handle_fields(
    State(state): State<AppState>,
    Query(query): Query<FieldsQuery>,
) -> Result<Json<FieldsResponse>, ApiError> {
    let fields = match query.collection.as_deref().map(str::trim) {
        Some(collection) if !collection.is_empty() => state.sources.list_fields(collection).await?,
        _ => Vec::new(),
    };
    Ok(Json(FieldsResponse { fields }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_column_index_forms() {
        let parse = |v: serde_json::Value| serde_json::from_value::<ColumnIndex>(v).unwrap().resolve();
        assert_eq!(parse(serde_json::json!(2)).unwrap(), 2);
        assert_eq!(parse(serde_json::json!(" 3 ")).unwrap(), 3);
        assert_eq!(parse(serde_json::json!(1.0)).unwrap(), 1);
        assert!(parse(serde_json::json!(1.5)).is_err());
        assert!(parse(serde_json::json!(-2.0)).is_err());
        assert!(parse(serde_json::json!(-1)).is_err());
        assert!(parse(serde_json::json!("B")).is_err());
    }
}
