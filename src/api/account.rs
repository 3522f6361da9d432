// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{
    auth::Auth,
    catalog::AccountSummary,
    error::ApiError,
    state::AppState,
    storage::{Account, Identity},
};

/// Custodied account of an authenticated identity.
pub(super) fn account_of(state: &AppState, identity: &Identity) -> Result<Account, ApiError> {
    state
        .custody
        .find_by_handle(&identity.handle)?
        .ok_or_else(|| ApiError::not_found(format!("No account for `{}`", identity.handle)))
}

/// Native balance and holdings of the caller's account.
///
/// Reports a zero balance with no holdings when the ledger is unreachable.
#[utoipa::path(
    get,
    path = "/v1/account",
    tag = "Account",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Account summary", body = AccountSummary),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_account(
    Auth(identity): Auth,
    State(state): State<AppState>,
) -> Result<Json<AccountSummary>, ApiError> {
    let account = account_of(&state, &identity)?;
    Ok(Json(state.catalog.account_summary(&account).await))
}
