// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::IssuedSession,
    catalog::{AccountSummary, AssetListing, HeldAsset, NonFungibleAsset, OffChainMetadata},
    minting::MintReceipt,
    models::{CreateFungibleRequest, LoginRequest, MintNftRequest, SessionResponse, SignupRequest, TransferRequest},
    state::AppState,
    storage::Account,
    transfer::{TransferPath, TransferReceipt},
};

pub mod account;
pub mod assets;
pub mod auth;
pub mod health;
pub mod transfers;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/account", get(account::get_account))
        .route("/assets", get(assets::list_assets))
        .route("/assets/created", get(assets::list_created_assets))
        .route("/assets/fungible", post(assets::create_fungible))
        .route("/assets/nft", post(assets::mint_nft))
        .route("/transfers", post(transfers::create_transfer))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

/// HTTP status of a failed transfer or asset creation, by error code.
pub(crate) fn operation_status(error_code: &str) -> StatusCode {
    match error_code {
        "invalid_address" | "decimal_mismatch" | "invalid_amount" | "invalid_params"
        | "invalid_supply" => StatusCode::BAD_REQUEST,
        "identity_not_found" | "asset_not_found" => StatusCode::NOT_FOUND,
        "insufficient_balance" | "receiver_not_opted_in" | "submission_error" => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        "upload_failed" => StatusCode::BAD_GATEWAY,
        "timeout" => StatusCode::GATEWAY_TIMEOUT,
        "ledger_unavailable" | "indexer_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        auth::signup,
        auth::login,
        account::get_account,
        assets::list_assets,
        assets::list_created_assets,
        assets::create_fungible,
        assets::mint_nft,
        transfers::create_transfer
    ),
    components(
        schemas(
            Account,
            IssuedSession,
            SessionResponse,
            SignupRequest,
            LoginRequest,
            AccountSummary,
            AssetListing,
            HeldAsset,
            NonFungibleAsset,
            OffChainMetadata,
            CreateFungibleRequest,
            MintNftRequest,
            MintReceipt,
            TransferRequest,
            TransferReceipt,
            TransferPath
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Auth", description = "Registration and sessions"),
        (name = "Account", description = "Custodied account summary"),
        (name = "Assets", description = "Holdings, token creation and NFT minting"),
        (name = "Transfers", description = "Opt-in aware asset transfers")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, Response},
    };
    use tower::ServiceExt;

    use crate::ledger::AccountInfo;
    use crate::state::{test_state, test_state_with};
    use crate::testing::{descriptor, holding, MockIndexer, MockLedger};

    async fn json_body(response: Response<Body>) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn token_for(state: &AppState, handle: &str) -> String {
        state.sessions.issue(handle).unwrap().token
    }

    #[tokio::test]
    async fn liveness_and_readiness() {
        let (state, _dir) = test_state();
        let app = router(state);

        let response = app.clone().oneshot(get("/health/live", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get("/health/ready", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = json_body(response).await;
        assert_eq!(body["checks"]["database"], "ok");
        assert_eq!(body["checks"]["ledger"], "ok (round 100)");
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let (state, _dir) = test_state();
        let response = router(state)
            .oneshot(get("/api-doc/openapi.json", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["paths"]["/v1/transfers"].is_object());
    }

    #[tokio::test]
    async fn signup_login_and_account() {
        let (state, _dir) = test_state();
        let app = router(state);

        let signup = serde_json::json!({"handle": "Alice", "credential": "open sesame"});
        let response = app
            .clone()
            .oneshot(post_json("/v1/auth/signup", None, signup.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        assert!(cookie.starts_with("authid="));
        let body = json_body(response).await;
        assert_eq!(body["account"]["handle"], "alice");

        let response = app
            .clone()
            .oneshot(post_json("/v1/auth/signup", None, signup))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let wrong = serde_json::json!({"handle": "alice", "credential": "wrong guess"});
        let response = app
            .clone()
            .oneshot(post_json("/v1/auth/login", None, wrong))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let right = serde_json::json!({"handle": "ALICE", "credential": "open sesame"});
        let response = app
            .clone()
            .oneshot(post_json("/v1/auth/login", None, right))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let token = json_body(response).await["session"]["token"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .oneshot(get("/v1/account", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["handle"], "alice");
        assert_eq!(body["balance"], "0");
    }

    #[tokio::test]
    async fn short_credentials_are_rejected() {
        let (state, _dir) = test_state();
        let body = serde_json::json!({"handle": "bob", "credential": "short"});
        let response = router(state)
            .oneshot(post_json("/v1/auth/signup", None, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn protected_routes_require_a_session() {
        let (state, _dir) = test_state();
        let app = router(state);

        for uri in ["/v1/account", "/v1/assets", "/v1/assets/created"] {
            let response = app.clone().oneshot(get(uri, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn transfer_to_custodied_receiver_uses_group() {
        let ledger = Arc::new(MockLedger::new());
        let (state, _dir) = test_state_with(ledger.clone(), Arc::new(MockIndexer::default()));
        let sender = state.custody.create("sender", "h", true).unwrap();
        let receiver = state.custody.create("receiver", "h", true).unwrap();

        ledger
            .assets
            .lock()
            .unwrap()
            .insert(31, descriptor(31, 2, None, sender.address));
        ledger.accounts.lock().unwrap().insert(
            sender.address,
            AccountInfo {
                address: sender.address,
                balance: 1_000_000,
                holdings: vec![holding(31, 1000)],
            },
        );

        let token = token_for(&state, "sender");
        let body = serde_json::json!({
            "receiver": receiver.address.to_string(),
            "asset_id": 31,
            "amount": "1.50"
        });
        let response = router(state)
            .oneshot(post_json("/v1/transfers", Some(&token), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], true);
        assert_eq!(body["receipt"]["path"], "group");
        assert_eq!(ledger.holding_of(&receiver.address, 31).unwrap().amount, 150);
    }

    #[tokio::test]
    async fn transfer_failures_use_the_envelope() {
        let (state, _dir) = test_state();
        state.custody.create("sender", "h", true).unwrap();
        let token = token_for(&state, "sender");
        let app = router(state);

        let body = serde_json::json!({"receiver": "nope", "asset_id": 1, "amount": "1"});
        let response = app
            .clone()
            .oneshot(post_json("/v1/transfers", Some(&token), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["status"], false);
        assert_eq!(body["error_code"], "invalid_address");

        let receiver = crate::ledger::Keypair::generate().address().to_string();
        let body = serde_json::json!({"receiver": receiver, "asset_id": 404, "amount": "1"});
        let response = app
            .oneshot(post_json("/v1/transfers", Some(&token), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error_code"], "asset_not_found");
    }

    #[tokio::test]
    async fn transacting_requires_permission() {
        let (state, _dir) = test_state();
        state.custody.create("viewer", "h", false).unwrap();
        let token = token_for(&state, "viewer");
        let app = router(state);

        let transfer = serde_json::json!({"receiver": "x", "asset_id": 1, "amount": "1"});
        let response = app
            .clone()
            .oneshot(post_json("/v1/transfers", Some(&token), transfer))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let fungible = serde_json::json!({"name": "Coin", "unit_name": "CN", "total_supply": 10, "decimals": 0});
        let response = app
            .oneshot(post_json("/v1/assets/fungible", Some(&token), fungible))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn create_fungible_and_nft() {
        let (state, _dir) = test_state();
        state.custody.create("artist", "h", true).unwrap();
        let token = token_for(&state, "artist");
        let app = router(state);

        let fungible = serde_json::json!({"name": "Coin", "unit_name": "CN", "total_supply": 10, "decimals": 2});
        let response = app
            .clone()
            .oneshot(post_json("/v1/assets/fungible", Some(&token), fungible))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["status"], true);
        assert_eq!(body["receipt"]["asset_id"], 5000);

        let nft = serde_json::json!({
            "name": "Sunset",
            "unit_name": "SUN",
            "image_base64": "iVBORw==",
            "image_name": "sunset.png",
            "image_mime_type": "image/png",
            "properties": {"artist": "ana"}
        });
        let response = app
            .clone()
            .oneshot(post_json("/v1/assets/nft", Some(&token), nft))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["receipt"]["metadata_url"], "ipfs://bafycid2#arc3");

        let bad = serde_json::json!({
            "name": "Sunset",
            "unit_name": "SUN",
            "image_base64": "***",
            "image_name": "sunset.png",
            "image_mime_type": "image/png"
        });
        let response = app
            .oneshot(post_json("/v1/assets/nft", Some(&token), bad))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error_code"], "invalid_params");
    }

    #[test]
    fn failure_codes_map_to_statuses() {
        assert_eq!(operation_status("decimal_mismatch"), StatusCode::BAD_REQUEST);
        assert_eq!(operation_status("receiver_not_opted_in"), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(operation_status("timeout"), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(operation_status("store_unavailable"), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
