//! Rotas decididas antes do banco: autenticação, tenant, permissões,
//! validação de payload e documentação.

mod common;

use axum::{
    body,
    http::{Method, StatusCode},
};
use common::{expect_status, Caller, TestApp};
use serde_json::json;
use uuid::Uuid;
use warehouse_bins::models::auth::Role;

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::without_database();

    let response = app.request(Method::GET, "/api/health", None, None, None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = TestApp::without_database();

    let response = app
        .request(Method::GET, "/api/warehouse/bins", None, None, Some(Uuid::new_v4()), None)
        .await;

    let body = expect_status(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(body["code"], "invalid_token");
}

#[tokio::test]
async fn token_signed_with_another_secret_is_unauthorized() {
    let app = TestApp::without_database();
    let caller = Caller::new(Role::Organization);
    let forged = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &json!({
            "sub": caller.user_id,
            "tenant_id": caller.tenant_id,
            "role": "organization",
            "iat": 0,
            "exp": 4_000_000_000u64
        }),
        &jsonwebtoken::EncodingKey::from_secret(b"outro-segredo"),
    )
    .unwrap();

    let request = axum::http::Request::builder()
        .uri("/api/warehouses")
        .header("authorization", format!("Bearer {forged}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(warehouse_bins::build_router(app.state.clone()), request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tenant_header_is_required_on_bin_routes() {
    let app = TestApp::without_database();
    let caller = Caller::new(Role::Organization);

    let response = app
        .request(Method::GET, "/api/warehouse/bins", None, Some(&caller), None, None)
        .await;

    let body = expect_status(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["code"], "validation_error");
    assert!(body["details"]["x-tenant-id"].is_array());
}

#[tokio::test]
async fn tenant_header_must_match_the_session() {
    let app = TestApp::without_database();
    let caller = Caller::new(Role::Organization);

    let response = app
        .request(Method::GET, "/api/warehouse/bins", None, Some(&caller), Some(Uuid::new_v4()), None)
        .await;

    let body = expect_status(response, StatusCode::FORBIDDEN).await;
    assert_eq!(body["code"], "tenant_mismatch");
}

#[tokio::test]
async fn errors_follow_accept_language() {
    let app = TestApp::without_database();
    let caller = Caller::new(Role::Organization);

    let response = app
        .request(
            Method::GET,
            "/api/warehouse/bins",
            None,
            Some(&caller),
            Some(Uuid::new_v4()),
            Some("pt-BR,pt;q=0.9"),
        )
        .await;

    let body = expect_status(response, StatusCode::FORBIDDEN).await;
    assert_eq!(body["error"], "O cabeçalho X-Tenant-ID não corresponde à sua sessão.");
}

#[tokio::test]
async fn courier_cannot_read_bins() {
    let app = TestApp::without_database();
    let caller = Caller::new(Role::Courier);

    let uri = format!("/api/warehouse/bins?warehouse_id={}", Uuid::new_v4());
    let response = app.as_caller(&caller, Method::GET, &uri, None).await;

    let body = expect_status(response, StatusCode::FORBIDDEN).await;
    assert_eq!(body["code"], "permission_denied");
}

#[tokio::test]
async fn customer_cannot_allocate_or_create_warehouses() {
    let app = TestApp::without_database();
    let caller = Caller::new(Role::Customer);

    let allocate = json!({ "bin_id": Uuid::new_v4(), "product_id": Uuid::new_v4(), "quantity": 1 });
    let response = app
        .as_caller(&caller, Method::POST, "/api/warehouse/bins/allocate", Some(allocate))
        .await;
    let body = expect_status(response, StatusCode::FORBIDDEN).await;
    assert_eq!(body["code"], "permission_denied");

    let response = app
        .request(
            Method::POST,
            "/api/warehouses",
            Some(json!({ "name": "CD Norte" })),
            Some(&caller),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn zero_quantity_allocation_is_a_validation_error() {
    let app = TestApp::without_database();
    let caller = Caller::new(Role::Organization);

    let payload = json!({ "bin_id": Uuid::new_v4(), "product_id": Uuid::new_v4(), "quantity": 0 });
    let response = app
        .as_caller(&caller, Method::POST, "/api/warehouse/bins/allocate", Some(payload))
        .await;

    let body = expect_status(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["code"], "validation_error");
    assert!(body["details"]["quantity"].is_array());
}

#[tokio::test]
async fn combined_endpoint_validates_allocation_payload() {
    let app = TestApp::without_database();
    let caller = Caller::new(Role::Organization);

    let payload = json!({ "allocate": true, "bin_id": Uuid::new_v4(), "quantity": 2 });
    let response = app
        .as_caller(&caller, Method::POST, "/api/warehouse/bins", Some(payload))
        .await;

    let body = expect_status(response, StatusCode::BAD_REQUEST).await;
    assert!(body["details"]["product_id"].is_array());
}

#[tokio::test]
async fn bin_creation_requires_coordinates() {
    let app = TestApp::without_database();
    let caller = Caller::new(Role::Organization);

    let payload = json!({ "warehouse_id": Uuid::new_v4(), "x": 0, "y": 0 });
    let response = app
        .as_caller(&caller, Method::POST, "/api/warehouse/bins", Some(payload))
        .await;

    let body = expect_status(response, StatusCode::BAD_REQUEST).await;
    assert!(body["details"]["z"].is_array());
}

#[tokio::test]
async fn move_to_the_same_bin_is_rejected() {
    let app = TestApp::without_database();
    let caller = Caller::new(Role::Organization);
    let bin = Uuid::new_v4();

    let payload = json!({ "from_bin_id": bin, "to_bin_id": bin, "product_id": Uuid::new_v4(), "quantity": 1 });
    let response = app
        .as_caller(&caller, Method::POST, "/api/warehouse/bins/move", Some(payload))
        .await;

    let body = expect_status(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(
        body["details"]["to_bin_id"][0],
        "Source and destination bin must be different."
    );
}

#[tokio::test]
async fn listing_requires_a_warehouse() {
    let app = TestApp::without_database();
    let caller = Caller::new(Role::Customer);

    let response = app.as_caller(&caller, Method::GET, "/api/warehouse/bins", None).await;

    let body = expect_status(response, StatusCode::BAD_REQUEST).await;
    assert!(body["details"]["warehouse_id"].is_array());
}

#[tokio::test]
async fn invalid_json_is_a_malformed_body() {
    let app = TestApp::without_database();
    let caller = Caller::new(Role::Organization);

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/warehouse/bins/move")
        .header("authorization", format!("Bearer {}", caller.token()))
        .header("x-tenant-id", caller.tenant_id.to_string())
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{ nope"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(warehouse_bins::build_router(app.state.clone()), request)
        .await
        .unwrap();

    let body = expect_status(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["code"], "malformed_body");
}

#[tokio::test]
async fn openapi_document_lists_bin_routes() {
    let app = TestApp::without_database();

    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None, None, None, None)
        .await;

    let body = expect_status(response, StatusCode::OK).await;
    let paths = body["paths"].as_object().unwrap();
    for path in [
        "/api/warehouses",
        "/api/warehouse/bins",
        "/api/warehouse/bins/allocate",
        "/api/warehouse/bins/move",
        "/api/warehouse/bins/{bin_id}",
    ] {
        assert!(paths.contains_key(path), "faltando {path}");
    }
    assert!(body["components"]["securitySchemes"]["api_jwt"].is_object());
}
