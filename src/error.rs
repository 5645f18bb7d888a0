//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Type-tag mapping failures, without table/column context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("unsupported type tag '{0}'")]
    InvalidTypeTag(String),
    #[error("short_text requires a length")]
    MissingLength,
    #[error("invalid length {0}")]
    InvalidLength(u32),
    #[error("invalid scale {scale} for precision {precision}")]
    InvalidScale { precision: u32, scale: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscapeError {
    #[error("invalid identifier '{raw}': {reason}")]
    InvalidIdentifier { raw: String, reason: &'static str },
    #[error("value '{value}' is not a valid {expected} literal")]
    InvalidLiteral { value: String, expected: &'static str },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: String },
    #[error("project must define at least one table")]
    NoTables,
    #[error("table {table} must define at least one column")]
    EmptyTable { table: String },
    #[error("duplicate table name: {table}")]
    DuplicateTable { table: String },
    #[error("duplicate column {column} in table {table}")]
    DuplicateColumn { table: String, column: String },
    #[error("column {column} in table {table} collides with a generated column")]
    ReservedColumn { table: String, column: String },
    #[error("{table}.{column}: {source}")]
    ColumnType {
        table: String,
        column: String,
        source: TypeError,
    },
    #[error("{field}: {source}")]
    Identifier { field: String, source: EscapeError },
    #[error("{table}.{column}: unknown lookup table {lookup}")]
    UnknownLookup {
        table: String,
        column: String,
        lookup: String,
    },
    #[error("{table}.{column}: lookups require a text column")]
    LookupNotText { table: String, column: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{table}.{field}: {source}")]
    Escaping {
        table: String,
        field: String,
        source: EscapeError,
    },
}

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("history storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("history record not found: {0}")]
    NotFound(Uuid),
    #[error("history record corrupt: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for HistoryError {
    fn from(e: sqlx::Error) -> Self {
        HistoryError::StorageUnavailable(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config load: {0}")]
    Load(String),
    #[error("config parse: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("bundle: {0}")]
    Bundle(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

/// Structured description of a failure: kind, offending table/field, message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl TypeError {
    pub fn kind(&self) -> &'static str {
        match self {
            TypeError::InvalidTypeTag(_) => "invalid_type_tag",
            TypeError::MissingLength => "missing_length",
            TypeError::InvalidLength(_) => "invalid_length",
            TypeError::InvalidScale { .. } => "invalid_scale",
        }
    }
}

impl EscapeError {
    pub fn kind(&self) -> &'static str {
        match self {
            EscapeError::InvalidIdentifier { .. } => "invalid_identifier",
            EscapeError::InvalidLiteral { .. } => "invalid_literal",
        }
    }
}

impl ValidationError {
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::MissingField { .. } => "missing_field",
            ValidationError::NoTables => "no_tables",
            ValidationError::EmptyTable { .. } => "empty_table",
            ValidationError::DuplicateTable { .. } => "duplicate_table",
            ValidationError::DuplicateColumn { .. } => "duplicate_column",
            ValidationError::ReservedColumn { .. } => "reserved_column",
            ValidationError::ColumnType { source, .. } => source.kind(),
            ValidationError::Identifier { source, .. } => source.kind(),
            ValidationError::UnknownLookup { .. } => "unknown_lookup",
            ValidationError::LookupNotText { .. } => "lookup_not_text",
        }
    }

    pub fn report(&self) -> ErrorReport {
        let (table, field) = match self {
            ValidationError::MissingField { field } | ValidationError::Identifier { field, .. } => {
                (None, Some(field.clone()))
            }
            ValidationError::NoTables => (None, Some("tables".to_string())),
            ValidationError::EmptyTable { table } | ValidationError::DuplicateTable { table } => {
                (Some(table.clone()), None)
            }
            ValidationError::DuplicateColumn { table, column }
            | ValidationError::ReservedColumn { table, column }
            | ValidationError::ColumnType { table, column, .. }
            | ValidationError::UnknownLookup { table, column, .. }
            | ValidationError::LookupNotText { table, column } => {
                (Some(table.clone()), Some(column.clone()))
            }
        };
        ErrorReport {
            kind: self.kind(),
            table,
            field,
            message: self.to_string(),
        }
    }
}

impl GenerateError {
    pub fn kind(&self) -> &'static str {
        match self {
            GenerateError::Validation(e) => e.kind(),
            GenerateError::Escaping { source, .. } => source.kind(),
        }
    }

    pub fn report(&self) -> ErrorReport {
        match self {
            GenerateError::Validation(e) => e.report(),
            GenerateError::Escaping { table, field, .. } => ErrorReport {
                kind: self.kind(),
                table: Some(table.clone()),
                field: Some(field.clone()),
                message: self.to_string(),
            },
        }
    }
}

impl HistoryError {
    pub fn kind(&self) -> &'static str {
        match self {
            HistoryError::StorageUnavailable(_) => "storage_unavailable",
            HistoryError::NotFound(_) => "not_found",
            HistoryError::Corrupt(_) => "storage_corrupt",
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            table: None,
            field: None,
            message: self.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Generate(GenerateError::Validation(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error")
            }
            AppError::Generate(GenerateError::Escaping { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "escaping_error")
            }
            AppError::History(HistoryError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::History(HistoryError::StorageUnavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable")
            }
            AppError::History(HistoryError::Corrupt(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_corrupt")
            }
            AppError::Config(_) => (StatusCode::BAD_REQUEST, "config_error"),
            AppError::Bundle(_) => (StatusCode::INTERNAL_SERVER_ERROR, "bundle_error"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        };
        let details = match &self {
            AppError::Generate(e) => serde_json::to_value(e.report()).ok(),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
