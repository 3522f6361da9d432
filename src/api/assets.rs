// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Asset listing and creation endpoints.

use axum::{extract::State, http::StatusCode, Json};
use base64ct::{Base64, Encoding};

use super::{account::account_of, operation_status};
use crate::{
    auth::{Auth, Transactor},
    catalog::{AssetListing, HeldAsset},
    error::ApiError,
    minting::{FungibleSpec, MintReceipt, NftSpec},
    models::{CreateFungibleRequest, MintNftRequest, MintResponse, OperationResponse},
    state::AppState,
};

/// Holdings of the caller, split into fungible and non-fungible assets.
#[utoipa::path(
    get,
    path = "/v1/assets",
    tag = "Assets",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Classified holdings", body = AssetListing),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Indexer unavailable")
    )
)]
pub async fn list_assets(
    Auth(identity): Auth,
    State(state): State<AppState>,
) -> Result<Json<AssetListing>, ApiError> {
    let account = account_of(&state, &identity)?;
    let listing = state.catalog.list_account_assets(&account.address).await?;
    Ok(Json(listing))
}

/// Assets created by the caller, with the caller's own balance of each.
#[utoipa::path(
    get,
    path = "/v1/assets/created",
    tag = "Assets",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Created assets", body = Vec<HeldAsset>),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Indexer unavailable")
    )
)]
pub async fn list_created_assets(
    Auth(identity): Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<HeldAsset>>, ApiError> {
    let account = account_of(&state, &identity)?;
    let created = state.catalog.list_created_assets(&account.address).await?;
    Ok(Json(created))
}

/// Create a fungible token owned by the caller.
#[utoipa::path(
    post,
    path = "/v1/assets/fungible",
    tag = "Assets",
    security(("bearer_auth" = [])),
    request_body = CreateFungibleRequest,
    responses(
        (status = 201, description = "Asset created", body = OperationResponse<MintReceipt>),
        (status = 400, description = "Invalid parameters", body = OperationResponse<MintReceipt>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Identity may not transact")
    )
)]
pub async fn create_fungible(
    Transactor(identity): Transactor,
    State(state): State<AppState>,
    Json(request): Json<CreateFungibleRequest>,
) -> (StatusCode, Json<MintResponse>) {
    let spec = FungibleSpec {
        name: request.name,
        unit_name: request.unit_name,
        total_supply: request.total_supply,
        decimals: request.decimals,
    };
    let response = MintResponse::from(state.minter.create_fungible(&identity, &spec).await);
    created_or_failed(response)
}

/// Mint an ARC-3 NFT owned by the caller.
///
/// The image and its metadata document are uploaded to the blob store
/// before the asset is created.
#[utoipa::path(
    post,
    path = "/v1/assets/nft",
    tag = "Assets",
    security(("bearer_auth" = [])),
    request_body = MintNftRequest,
    responses(
        (status = 201, description = "NFT minted", body = OperationResponse<MintReceipt>),
        (status = 400, description = "Invalid parameters", body = OperationResponse<MintReceipt>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Identity may not transact"),
        (status = 502, description = "Blob store failure", body = OperationResponse<MintReceipt>)
    )
)]
pub async fn mint_nft(
    Transactor(identity): Transactor,
    State(state): State<AppState>,
    Json(request): Json<MintNftRequest>,
) -> (StatusCode, Json<MintResponse>) {
    let image = match Base64::decode_vec(request.image_base64.trim()) {
        Ok(image) => image,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(MintResponse::failure(
                    "invalid_params",
                    "image_base64 is not valid base64",
                )),
            )
        }
    };

    let spec = NftSpec {
        name: request.name,
        unit_name: request.unit_name,
        description: request.description,
        total_supply: request.total_supply.unwrap_or(1),
        decimals: request.decimals,
        image,
        image_name: request.image_name,
        image_mime_type: request.image_mime_type,
        properties: request.properties.into_iter().collect(),
    };
    let response = MintResponse::from(state.minter.mint_nft(&identity, &spec).await);
    created_or_failed(response)
}

fn created_or_failed(response: MintResponse) -> (StatusCode, Json<MintResponse>) {
    let status = match &response.error_code {
        None => StatusCode::CREATED,
        Some(code) => operation_status(code),
    };
    (status, Json(response))
}
