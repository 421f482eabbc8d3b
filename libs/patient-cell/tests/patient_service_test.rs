use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use assert_matches::assert_matches;
use patient_cell::models::{CreatePatientRequest, PatientError, Region, Sex};
use patient_cell::services::PatientService;
use shared_utils::test_utils::TestConfig;

const PNFL: &str = "31505195710012";

fn patient_row(code: &str) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "patient_code": code,
        "name": "Malika Yusupova",
        "card_number": "",
        "sex": "female",
        "region": "toshkent_sh",
        "district": "Chilonzor",
        "birthday": "2019-05-15",
        "age": 7,
        "related_marriage": false,
        "child_pnfl": PNFL,
        "mother_name": "Nilufar Yusupova",
        "mother_id_number": "AB1234567",
        "mother_work_place": "",
        "father_name": "Botir Yusupov",
        "father_id_number": "AB7654321",
        "father_work_place": "",
        "full_address": "Toshkent sh., Chilonzor tumani",
        "phone_number": "998901112233",
        "second_number": "",
        "patient_add_date": "2026-01-15T09:00:00Z",
    })
}

fn create_request() -> CreatePatientRequest {
    CreatePatientRequest {
        name: "Malika Yusupova".to_string(),
        card_number: String::new(),
        sex: Sex::Female,
        region: Region::ToshkentSh,
        district: "Chilonzor".to_string(),
        birthday: "2019-05-15".parse().unwrap(),
        age: 7,
        related_marriage: false,
        child_pnfl: format!("{} ", PNFL),
        mother_name: "Nilufar Yusupova".to_string(),
        mother_id_number: "AB 1234567".to_string(),
        mother_work_place: String::new(),
        father_name: "Botir Yusupov".to_string(),
        father_id_number: "AB7654321".to_string(),
        father_work_place: String::new(),
        full_address: "Toshkent sh., Chilonzor tumani".to_string(),
        phone_number: "998901112233".to_string(),
        second_number: String::new(),
    }
}

#[tokio::test]
async fn create_allocates_a_code_and_persists_the_record() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("child_pnfl", format!("eq.{}", PNFL)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/counters"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "name": "patient_code", "value": 41 }])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/counters"))
        .and(query_param("value", "eq.41"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "name": "patient_code", "value": 42 }])),
        )
        .mount(&mock_server)
        .await;

    // The insert carries the allocated code and the cleaned PNFL.
    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .and(body_partial_json(json!({
            "patient_code": "M42",
            "child_pnfl": PNFL,
            "mother_id_number": "AB1234567"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([patient_row("M42")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = PatientService::new(&config);
    let patient = service.create(create_request()).await.unwrap();

    assert_eq!(patient.patient_code, "M42");
    assert_eq!(patient.child_pnfl, PNFL);
}

#[tokio::test]
async fn duplicate_pnfl_is_rejected_before_a_code_is_spent() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([patient_row("M7")])))
        .mount(&mock_server)
        .await;

    // The counter must not advance for a rejected request.
    Mock::given(method("GET"))
        .and(path("/rest/v1/counters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = PatientService::new(&config);
    let err = service.create(create_request()).await.unwrap_err();

    assert_matches!(err, PatientError::DuplicatePnfl);
}

#[tokio::test]
async fn constraint_violation_on_insert_translates_to_duplicate_pnfl() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/counters"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "name": "patient_code", "value": 0 }])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/counters"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "name": "patient_code", "value": 1 }])),
        )
        .mount(&mock_server)
        .await;

    // A concurrent creation slipped the same PNFL in after the check.
    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"patients_child_pnfl_key\""
        })))
        .mount(&mock_server)
        .await;

    let service = PatientService::new(&config);
    let err = service.create(create_request()).await.unwrap_err();

    assert_matches!(err, PatientError::DuplicatePnfl);
}

#[tokio::test]
async fn malformed_pnfl_never_reaches_the_store() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    let mut request = create_request();
    request.child_pnfl = "123".to_string();

    let service = PatientService::new(&config);
    let err = service.create(request).await.unwrap_err();

    assert_matches!(err, PatientError::InvalidPnfl);
}

#[tokio::test]
async fn lookup_matches_codes_case_insensitively() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("patient_code", "eq.M42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([patient_row("M42")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = PatientService::new(&config);
    let patient = service.lookup("m42").await.unwrap();

    assert_eq!(patient.patient_code, "M42");
}

#[tokio::test]
async fn lookup_by_pnfl_queries_the_pnfl_column() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_base_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("child_pnfl", format!("eq.{}", PNFL)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([patient_row("M42")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = PatientService::new(&config);
    let patient = service.lookup(PNFL).await.unwrap();

    assert_eq!(patient.child_pnfl, PNFL);
}
