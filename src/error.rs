use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("{field} cannot be empty")]
    EmptyRequiredField { field: &'static str },
    #[error("couldn't find {kind} {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("{actor} is not allowed to change the settlement of {member}")]
    PermissionDenied { actor: String, member: String },
    #[error("{member} has no share to settle on this expense")]
    NotSplitMember { member: String },
    #[error("member {0} appears more than once")]
    DuplicateMember(String),
    #[error("unknown history filter {0:?}")]
    UnknownFilter(String),
    #[error("no expenses selected")]
    EmptySelection,
    #[error("cannot split an expense between zero members")]
    DivisionByZero,
    #[error("storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl From<mongodb::error::Error> for LedgerError {
    fn from(err: mongodb::error::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

impl ResponseError for LedgerError {
    fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
            LedgerError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
