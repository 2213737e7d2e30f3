use actix_web::{error::BlockingError, http::StatusCode, HttpResponse, ResponseError};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;

/// Unified error body returned by every route group.
#[derive(Serialize)]
pub struct ErrorResponse<'a> {
    pub code: &'a str,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DbError(#[from] DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal,
}

impl From<BlockingError> for AppError {
    fn from(err: BlockingError) -> Self {
        log::error!("Blocking task failed: {}", err);
        AppError::Internal
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DbError(_) | AppError::Io(_) | AppError::Hashing(_) | AppError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Server-side failures are logged in full but never echoed to the client.
        let message = if status.is_server_error() {
            log::error!("{}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorResponse {
            code: self.code(),
            message,
        };
        HttpResponse::build(status).json(body)
    }
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DbError(_) => "DB_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Hashing(_) => "HASHING_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Internal => "INTERNAL",
        }
    }
}

/// True when a write was rejected by a unique index.
/// Falls back to MySQL's "Duplicate entry" text (error 1062) for errors not raised by the driver.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        || err.to_string().contains("Duplicate entry")
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use sea_orm::RuntimeErr;

    #[test]
    fn recognises_duplicate_key_errors() {
        let duplicate = DbErr::Exec(RuntimeErr::Internal(
            "Duplicate entry 'ada@example.com' for key 'users.email'".to_string(),
        ));
        let other = DbErr::Exec(RuntimeErr::Internal("Lock wait timeout exceeded".to_string()));

        assert!(is_unique_violation(&duplicate));
        assert!(!is_unique_violation(&other));
    }

    #[actix_web::test]
    async fn client_errors_keep_their_message() {
        let err = AppError::Conflict("Bill 4 is already paid".to_string());
        let resp = err.error_response();

        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "CONFLICT");
        assert_eq!(json["message"], "Conflict: Bill 4 is already paid");
        assert!(json.get("details").is_none());
    }

    #[actix_web::test]
    async fn server_errors_hide_details() {
        let err = AppError::DbError(DbErr::Custom("connection refused at 10.0.0.3".to_string()));
        let resp = err.error_response();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "DB_ERROR");
        assert_eq!(json["message"], "Internal server error");
    }
}
