// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthError;
use crate::catalog::CatalogError;
use crate::storage::StoreError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::HandleTaken(_) => Self::conflict(e.to_string()),
            StoreError::InvalidHandle(_) => Self::bad_request(e.to_string()),
            other => {
                tracing::error!(error = %other, "Store operation failed");
                Self::internal("Storage error")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        Self::new(e.status_code(), e.to_string())
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        tracing::warn!(error = %e, "Catalog query failed");
        Self::service_unavailable(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "bad");

        let unp = ApiError::unprocessable("oops");
        assert_eq!(unp.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(unp.message, "oops");

        assert_eq!(ApiError::conflict("x").status, StatusCode::CONFLICT);
        assert_eq!(ApiError::unauthorized("x").status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn store_errors_map_to_statuses() {
        let taken: ApiError = StoreError::HandleTaken("alice".to_string()).into();
        assert_eq!(taken.status, StatusCode::CONFLICT);

        let invalid: ApiError = StoreError::InvalidHandle("empty".to_string()).into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

        let corrupt: ApiError = StoreError::Corrupt("bad seed".to_string()).into();
        assert_eq!(corrupt.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(corrupt.message, "Storage error");
    }

    #[test]
    fn catalog_errors_are_service_unavailable() {
        let ledger: ApiError = CatalogError::Ledger(crate::ledger::LedgerError::Status {
            status: 503,
            body: "catching up".to_string(),
        })
        .into();
        assert_eq!(ledger.status, StatusCode::SERVICE_UNAVAILABLE);

        let indexer: ApiError =
            CatalogError::Indexer(crate::indexer::IndexerError::Request("down".to_string())).into();
        assert_eq!(indexer.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }
}
