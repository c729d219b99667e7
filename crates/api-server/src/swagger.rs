//! OpenAPI specification and Swagger UI configuration.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bulk SMS API",
        version = "0.1.0",
        description = "Bulk SMS dispatch.\n\nRecipients come from uploaded spreadsheets, request arrays, or document-store collections. Every recipient is attempted once and the batch reports how many were sent.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Files", description = "Spreadsheet upload, header listing, and download"),
        (name = "SMS", description = "Bulk send endpoints and document-store listings"),
        (name = "Operations", description = "Health, readiness, and liveness probes"),
    ),
    paths(
        // Files
        crate::files_rest::handle_upload,
        crate::files_rest::handle_columns,
        crate::files_rest::handle_download,
        // SMS
        crate::sms_rest::handle_tabular_send,
        crate::sms_rest::handle_paired_send,
        crate::sms_rest::handle_templated_send,
        crate::sms_rest::handle_collection_send,
        crate::sms_rest::handle_collections,
        crate::sms_rest::handle_fields,
        // Operations
        crate::rest::health_check,
        crate::rest::readiness,
        crate::rest::liveness,
    ),
    components(schemas(
        crate::files_rest::UploadForm,
        crate::files_rest::UploadResponse,
        crate::files_rest::ColumnsRequest,
        crate::files_rest::ColumnsResponse,
        crate::sms_rest::TabularSendRequest,
        crate::sms_rest::PairedSendRequest,
        crate::sms_rest::TemplatedSendRequest,
        crate::sms_rest::CollectionSendRequest,
        crate::sms_rest::SendResponse,
        crate::sms_rest::CollectionsResponse,
        crate::sms_rest::FieldsResponse,
        bulksms_dispatch::FailureDetail,
        crate::rest::ErrorResponse,
        crate::rest::HealthResponse,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_send_endpoints() {
        let doc = ApiDoc::openapi();
        for path in ["/send_sms", "/excel_send_sms", "/advanced_send_sms", "/mongo_send_sms"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
