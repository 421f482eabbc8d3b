use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use admin_cell::models::{AdminError, UserListQuery};
use admin_cell::services::UserAdminService;
use assert_matches::assert_matches;
use shared_utils::test_utils::TestConfig;

fn user_row(id: Uuid, role: &str, approved: bool) -> serde_json::Value {
    json!({
        "id": id,
        "name": "Aziza Karimova",
        "phone": "998901234567",
        "password_hash": "$argon2id$stub",
        "address": "Toshkent sh.",
        "role": role,
        "telegram_id": null,
        "is_approved": approved,
        "can_export": false,
        "created_at": "2026-01-01T00:00:00Z",
    })
}

#[tokio::test]
async fn approve_flips_the_flag_via_conditional_update() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());
    let id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", id)))
        .and(body_partial_json(json!({ "is_approved": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([user_row(id, "doctor", true)])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = UserAdminService::new(&config);
    let user = service.approve(id).await.unwrap();

    assert!(user.is_approved);
}

#[tokio::test]
async fn approving_a_missing_user_is_not_found() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = UserAdminService::new(&config);
    let err = service.approve(Uuid::new_v4()).await.unwrap_err();

    assert_matches!(err, AdminError::NotFound);
}

#[tokio::test]
async fn admin_accounts_cannot_be_deleted() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([user_row(id, "admin", true)])))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = UserAdminService::new(&config);
    let err = service.delete(id).await.unwrap_err();

    assert_matches!(err, AdminError::CannotDeleteAdmin);
}

#[tokio::test]
async fn pending_filter_narrows_the_listing() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("role", "eq.doctor"))
        .and(query_param("is_approved", "eq.false"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([user_row(Uuid::new_v4(), "doctor", false)])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = UserAdminService::new(&config);
    let users = service
        .list_doctors(&UserListQuery {
            status: Some("pending".to_string()),
            search: None,
        })
        .await
        .unwrap();

    assert_eq!(users.len(), 1);
    assert!(!users[0].is_approved);
}
