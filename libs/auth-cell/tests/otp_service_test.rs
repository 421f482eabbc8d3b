use chrono::{Duration, SecondsFormat, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use assert_matches::assert_matches;
use auth_cell::models::{AuthError, OtpPurpose, VerifiedOtp};
use auth_cell::services::OtpService;
use shared_utils::test_utils::TestConfig;

const PHONE: &str = "998901234567";

fn otp_row(code: &str, token: &str, purpose: &str, expires_in_secs: i64) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "phone": PHONE,
        "code": code,
        "session_token": token,
        "purpose": purpose,
        "pending": if purpose == "register" {
            json!({
                "name": "Aziza Karimova",
                "address": "Toshkent sh.",
                "password_hash": "$argon2id$stub"
            })
        } else {
            serde_json::Value::Null
        },
        "expires_at": (Utc::now() + Duration::seconds(expires_in_secs))
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        "created_at": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

#[tokio::test]
async fn issue_supersedes_prior_codes_for_the_same_phone_and_purpose() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/otp_codes"))
        .and(query_param("phone", format!("eq.{}", PHONE)))
        .and(query_param("purpose", "eq.register"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/otp_codes"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([otp_row("123456", "fresh-token", "register", 300)])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let otp = OtpService::new(&config);
    let (code, token) = otp
        .issue(
            PHONE,
            OtpPurpose::Register,
            Some(auth_cell::models::PendingRegistration {
                name: "Aziza Karimova".to_string(),
                address: "Toshkent sh.".to_string(),
                password_hash: "$argon2id$stub".to_string(),
            }),
        )
        .await
        .unwrap();

    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(token.len(), 43);
}

#[tokio::test]
async fn verify_returns_the_staged_registration_payload() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/otp_codes"))
        .and(query_param("phone", format!("eq.{}", PHONE)))
        .and(query_param("session_token", "eq.tok-1"))
        .and(query_param("code", "eq.123456"))
        .and(query_param("purpose", "eq.register"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([otp_row("123456", "tok-1", "register", 120)])),
        )
        .mount(&mock_server)
        .await;

    let otp = OtpService::new(&config);
    let verified = otp
        .verify(PHONE, "tok-1", "123456", OtpPurpose::Register)
        .await
        .unwrap();

    match verified {
        VerifiedOtp::Registration(pending) => {
            assert_eq!(pending.name, "Aziza Karimova");
            assert_eq!(pending.password_hash, "$argon2id$stub");
        }
        VerifiedOtp::Reset => panic!("expected a registration payload"),
    }
}

#[tokio::test]
async fn verify_fails_when_no_record_matches() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    // The store filters on expiry, so a stale or mismatched code comes back
    // as an empty result either way.
    Mock::given(method("GET"))
        .and(path("/rest/v1/otp_codes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let otp = OtpService::new(&config);
    let err = otp
        .verify(PHONE, "tok-1", "000000", OtpPurpose::Register)
        .await
        .unwrap_err();

    assert_matches!(err, AuthError::InvalidOrExpiredCode);
}

#[tokio::test]
async fn verify_rejects_a_record_that_expires_this_instant() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    // Even if the store's filter let a boundary row through, the exclusive
    // in-process check drops it.
    Mock::given(method("GET"))
        .and(path("/rest/v1/otp_codes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([otp_row("123456", "tok-1", "register", 0)])),
        )
        .mount(&mock_server)
        .await;

    let otp = OtpService::new(&config);
    let err = otp
        .verify(PHONE, "tok-1", "123456", OtpPurpose::Register)
        .await
        .unwrap_err();

    assert_matches!(err, AuthError::InvalidOrExpiredCode);
}

#[tokio::test]
async fn cross_purpose_codes_do_not_satisfy_each_other() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    // The reset record exists, but the register verification filters on
    // purpose and never sees it.
    Mock::given(method("GET"))
        .and(path("/rest/v1/otp_codes"))
        .and(query_param("purpose", "eq.register"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let otp = OtpService::new(&config);
    let err = otp
        .verify(PHONE, "reset-tok", "123456", OtpPurpose::Register)
        .await
        .unwrap_err();

    assert_matches!(err, AuthError::InvalidOrExpiredCode);
}

#[tokio::test]
async fn resend_requires_an_unexpired_session() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/otp_codes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let otp = OtpService::new(&config);
    let err = otp.resend(PHONE, "stale-token").await.unwrap_err();

    assert_matches!(err, AuthError::SessionExpired);
}

#[tokio::test]
async fn resend_supersedes_the_previous_code_and_token() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/otp_codes"))
        .and(query_param("session_token", "eq.old-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([otp_row("111111", "old-token", "register", 200)])),
        )
        .mount(&mock_server)
        .await;

    // The reissue deletes everything in the (phone, purpose) scope, which is
    // what invalidates the old code.
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/otp_codes"))
        .and(query_param("phone", format!("eq.{}", PHONE)))
        .and(query_param("purpose", "eq.register"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/otp_codes"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([otp_row("222222", "new-token", "register", 300)])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let otp = OtpService::new(&config);
    let (code, token, purpose) = otp.resend(PHONE, "old-token").await.unwrap();

    assert_eq!(purpose, OtpPurpose::Register);
    assert_ne!(token, "old-token");
    assert_eq!(code.len(), 6);
}

#[tokio::test]
async fn purge_deletes_expired_rows() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/otp_codes"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let otp = OtpService::new(&config);
    otp.purge_expired().await.unwrap();
}
