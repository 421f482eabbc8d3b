use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use assert_matches::assert_matches;
use patient_cell::models::PatientError;
use patient_cell::services::CodeAllocator;
use shared_utils::test_utils::TestConfig;

fn counter(value: i64) -> serde_json::Value {
    json!({ "name": "patient_code", "value": value })
}

#[tokio::test]
async fn first_allocation_on_a_fresh_store_yields_m1() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    // No counter row yet: the allocator seeds it, re-reads, and claims 1.
    Mock::given(method("GET"))
        .and(path("/rest/v1/counters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/counters"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([counter(0)])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/counters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([counter(0)])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/counters"))
        .and(query_param("value", "eq.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([counter(1)])))
        .mount(&mock_server)
        .await;

    let allocator = CodeAllocator::new(&config);
    assert_eq!(allocator.allocate().await.unwrap(), "M1");
}

#[tokio::test]
async fn losing_the_cas_race_retries_against_the_new_value() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    // First read sees 5, but another allocator advances the counter before
    // our conditional update lands, so the PATCH matches nothing.
    Mock::given(method("GET"))
        .and(path("/rest/v1/counters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([counter(5)])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/counters"))
        .and(query_param("value", "eq.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/counters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([counter(6)])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/counters"))
        .and(query_param("value", "eq.6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([counter(7)])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let allocator = CodeAllocator::new(&config);
    assert_eq!(allocator.allocate().await.unwrap(), "M7");
}

#[tokio::test]
async fn exhausted_retries_surface_allocation_failed() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/counters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([counter(1)])))
        .mount(&mock_server)
        .await;

    // Every conditional update loses.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/counters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(5)
        .mount(&mock_server)
        .await;

    let allocator = CodeAllocator::new(&config);
    let err = allocator.allocate().await.unwrap_err();

    assert_matches!(err, PatientError::AllocationFailed);
}
