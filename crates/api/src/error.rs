use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clinicops_core::error::CoreError;
use serde::Serialize;

/// Error type returned by every handler.
///
/// Renders as `{"error": "...", "code": "..."}`; request validation failures
/// add a `fields` map naming what was wrong with each field.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Request body failed its `validator` rules.
    #[error("Validation failed: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    /// Never shown to the client; logged and replaced by a generic message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(entity: &'static str, id: clinicops_core::types::DbId) -> Self {
        AppError::Core(CoreError::NotFound { entity, id })
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Core(CoreError::Unauthorized(msg.into()))
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Core(CoreError::Forbidden(msg.into()))
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Core(CoreError::Conflict(msg.into()))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Core(CoreError::Validation(msg.into()))
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<std::collections::BTreeMap<String, Vec<String>>>,
}

impl ErrorBody {
    fn new(code: &'static str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code,
            fields: None,
        }
    }

    fn internal() -> Self {
        Self::new("INTERNAL_ERROR", "An internal error occurred")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Core(core) => core_error_body(core),
            AppError::Database(err) => database_error_body(&err),
            AppError::Invalid(errors) => {
                let fields = field_errors(&errors);
                let summary = if fields.is_empty() {
                    "Invalid request body".to_string()
                } else {
                    let names: Vec<&str> = fields.keys().map(String::as_str).collect();
                    format!("Invalid fields: {}", names.join(", "))
                };
                let mut body = ErrorBody::new("VALIDATION_ERROR", summary);
                body.fields = Some(fields);
                (StatusCode::BAD_REQUEST, body)
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::internal())
            }
        };

        (status, Json(body)).into_response()
    }
}

fn core_error_body(err: CoreError) -> (StatusCode, ErrorBody) {
    let message = err.to_string();
    match err {
        CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, ErrorBody::new("NOT_FOUND", message)),
        CoreError::Validation(msg) => (
            StatusCode::BAD_REQUEST,
            ErrorBody::new("VALIDATION_ERROR", msg),
        ),
        CoreError::InvalidTransition { .. } => (
            StatusCode::BAD_REQUEST,
            ErrorBody::new("INVALID_TRANSITION", message),
        ),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, ErrorBody::new("CONFLICT", msg)),
        CoreError::Unauthorized(msg) => (
            StatusCode::UNAUTHORIZED,
            ErrorBody::new("UNAUTHORIZED", msg),
        ),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorBody::new("FORBIDDEN", msg)),
    }
}

/// Validator failures as `field -> [codes]`, nested structs flattened with
/// dotted paths (`lines[0].quantity`).
fn field_errors(errors: &validator::ValidationErrors) -> std::collections::BTreeMap<String, Vec<String>> {
    use validator::ValidationErrorsKind;

    fn walk(
        prefix: &str,
        errors: &validator::ValidationErrors,
        out: &mut std::collections::BTreeMap<String, Vec<String>>,
    ) {
        for (field, kind) in errors.errors() {
            let path = if prefix.is_empty() {
                field.to_string()
            } else {
                format!("{prefix}.{field}")
            };
            match kind {
                ValidationErrorsKind::Field(errs) => {
                    out.entry(path)
                        .or_default()
                        .extend(errs.iter().map(|e| e.code.to_string()));
                }
                ValidationErrorsKind::Struct(inner) => walk(&path, inner, out),
                ValidationErrorsKind::List(items) => {
                    for (index, inner) in items {
                        walk(&format!("{path}[{index}]"), inner, out);
                    }
                }
            }
        }
    }

    let mut out = std::collections::BTreeMap::new();
    walk("", errors, &mut out);
    out
}

/// Friendly wording for the unique constraints users can actually hit.
fn duplicate_message(constraint: &str) -> &'static str {
    match constraint {
        "uq_users_email" => "A user with this email already exists",
        "uq_inventory_items_sku" => "An item with this SKU already exists",
        "uq_inventory_categories_name" => "A category with this name already exists",
        "uq_shifts_code" => "A shift with this code already exists",
        "uq_schedule_entries_user_date_period" => "The staff member is already scheduled for that slot",
        "uq_user_skills_user_skill" => "The staff member already has this skill",
        "uq_vendors_name" => "A vendor with this name already exists",
        "uq_assets_asset_tag" => "An asset with this tag already exists",
        "uq_purchase_orders_request_id" => "This request has already been ordered",
        "uq_documents_code" => "A document with this code already exists",
        "uq_document_acknowledgements_doc_user_version" => {
            "This version has already been acknowledged"
        }
        "uq_cost_snapshots_period" => "A snapshot for this period already exists",
        "uq_user_permissions_user_permission" => "The permission override already exists",
        _ => "Duplicate value",
    }
}

/// `RowNotFound` -> 404, `uq_*` unique violations -> 409, foreign key and
/// CHECK violations -> 400, anything else -> 500 with a sanitized message.
fn database_error_body(err: &sqlx::Error) -> (StatusCode, ErrorBody) {
    let db_err = match err {
        sqlx::Error::RowNotFound => {
            return (
                StatusCode::NOT_FOUND,
                ErrorBody::new("NOT_FOUND", "Resource not found"),
            )
        }
        sqlx::Error::Database(db_err) => db_err,
        other => {
            tracing::error!(error = %other, "Database error");
            return (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::internal());
        }
    };

    let constraint = db_err.constraint().unwrap_or_default();
    match db_err.code().as_deref() {
        Some("23505") if constraint.starts_with("uq_") => (
            StatusCode::CONFLICT,
            ErrorBody::new("CONFLICT", duplicate_message(constraint)),
        ),
        Some("23503") => (
            StatusCode::BAD_REQUEST,
            ErrorBody::new(
                "VALIDATION_ERROR",
                format!("Referenced record does not exist ({constraint})"),
            ),
        ),
        // An enum value that slipped past request validation.
        Some("23514") => (
            StatusCode::BAD_REQUEST,
            ErrorBody::new(
                "VALIDATION_ERROR",
                format!("Value violates check constraint: {constraint}"),
            ),
        ),
        _ => {
            tracing::error!(error = %db_err, "Database error");
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::internal())
        }
    }
}
