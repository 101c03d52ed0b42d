//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Services return typed errors which propagate, uncaught, to a single boundary
//! translator: the `actix_web::error::ResponseError` implementation below, which maps
//! each error kind to an HTTP status and the standard JSON envelope
//! `{success, message, errors?}`.
//!
//! `From` implementations for `sqlx::Error`, `validator::ValidationErrors`,
//! `jsonwebtoken::errors::Error`, and `bcrypt::BcryptError` allow conversion with `?`.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use validator::ValidationErrors;

/// Represents all possible errors that can occur within the application.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Malformed input caught at the boundary (HTTP 400), with field-level messages.
    Validation(HashMap<String, String>),
    /// Missing, invalid, or expired credentials or tokens (HTTP 401).
    Authentication(String),
    /// Authenticated but forbidden by a role, membership, or ownership rule (HTTP 403).
    Authorization(String),
    /// A referenced entity is absent (HTTP 404).
    NotFound(String),
    /// Invariant violation: duplicate unique field, duplicate membership,
    /// last-admin removal (HTTP 409).
    Conflict(String),
    /// An error originating from the data store (HTTP 500).
    Database(String),
    /// Any other unexpected server-side error (HTTP 500).
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Validation(_) => write!(f, "Validation failed"),
            AppError::Authentication(msg) => write!(f, "Authentication error: {}", msg),
            AppError::Authorization(msg) => write!(f, "Authorization error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Database(msg) => write!(f, "Database Error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl AppError {
    /// The client-facing message. Internal details of 500-class errors never
    /// leave the server; they are logged instead.
    fn client_message(&self) -> String {
        match self {
            AppError::Validation(_) => "Validation failed".to_string(),
            AppError::Authentication(msg)
            | AppError::Authorization(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::Database(_) | AppError::Internal(_) => {
                "An unexpected error occurred".to_string()
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("unexpected error: {}", self);
        }

        let mut body = json!({
            "success": false,
            "message": self.client_message(),
        });
        if let AppError::Validation(fields) = self {
            body["errors"] = json!(fields);
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

/// `sqlx::Error::RowNotFound` maps to 404; unique-constraint violations map to 409
/// so store-level duplicate inserts surface as conflicts even when a service-level
/// pre-check raced.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match &error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("Resource already exists".into())
            }
            _ => AppError::Database(error.to_string()),
        }
    }
}

/// Flattens `validator::ValidationErrors` into a field -> message map,
/// keeping the first message per field.
impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> AppError {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                (field.to_string(), message)
            })
            .collect();
        AppError::Validation(fields)
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Authentication(format!("Invalid token: {}", error))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::Internal(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases: Vec<(AppError, u16)> = vec![
            (AppError::Validation(HashMap::new()), 400),
            (AppError::Authentication("Invalid token".into()), 401),
            (AppError::Authorization("Forbidden".into()), 403),
            (AppError::NotFound("Project not found".into()), 404),
            (AppError::Conflict("Duplicate".into()), 409),
            (AppError::Database("connection reset".into()), 500),
            (AppError::Internal("boom".into()), 500),
        ];
        for (error, status) in cases {
            assert_eq!(error.error_response().status().as_u16(), status);
        }
    }

    #[test]
    fn test_internal_detail_is_not_leaked() {
        let error = AppError::Database("password for role postgres".into());
        assert_eq!(error.client_message(), "An unexpected error occurred");
    }

    #[test]
    fn test_validation_errors_become_field_map() {
        use validator::Validate;

        #[derive(Validate)]
        struct Probe {
            #[validate(email(message = "Invalid email address"))]
            email: String,
        }

        let probe = Probe {
            email: "not-an-email".into(),
        };
        let err: AppError = probe.validate().unwrap_err().into();
        match err {
            AppError::Validation(fields) => {
                assert_eq!(fields.get("email").unwrap(), "Invalid email address");
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_sqlx_row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
