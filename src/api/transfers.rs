// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};

use super::operation_status;
use crate::{
    auth::Transactor,
    models::{OperationResponse, TransferRequest, TransferResponse},
    state::AppState,
    transfer::TransferReceipt,
};

/// Transfer an asset from the caller's account.
///
/// A custodied receiver that has not opted in is opted in atomically with
/// the transfer. External receivers must opt in themselves.
#[utoipa::path(
    post,
    path = "/v1/transfers",
    tag = "Transfers",
    security(("bearer_auth" = [])),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer confirmed", body = OperationResponse<TransferReceipt>),
        (status = 400, description = "Malformed receiver or amount", body = OperationResponse<TransferReceipt>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Identity may not transact"),
        (status = 404, description = "Unknown asset", body = OperationResponse<TransferReceipt>),
        (status = 422, description = "Balance or opt-in precondition failed", body = OperationResponse<TransferReceipt>)
    )
)]
pub async fn create_transfer(
    Transactor(identity): Transactor,
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> (StatusCode, Json<TransferResponse>) {
    let result = state
        .transfers
        .transfer(&identity, &request.receiver, request.asset_id, &request.amount)
        .await;

    let response = TransferResponse::from(result);
    let status = match &response.error_code {
        None => StatusCode::OK,
        Some(code) => operation_status(code),
    };
    (status, Json(response))
}
