use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_models::user::{SessionUser, UserRole};

use crate::models::{CreatePatientRequest, LookupQuery, PatientListQuery, UpdatePatientRequest};
use crate::services::PatientService;

#[axum::debug_handler]
pub async fn create_patient(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let patient = service.create(request).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn list_patients(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let page = query.page.unwrap_or(1).max(1);
    let patients = service.list(&query).await?;

    Ok(Json(json!({
        "patients": patients,
        "page": page,
        "per_page": 20,
    })))
}

#[axum::debug_handler]
pub async fn lookup_patient(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<Value>, AppError> {
    if query.q.trim().is_empty() {
        return Err(AppError::BadRequest("A search term is required".to_string()));
    }

    let service = PatientService::new(&config);
    let patient = service.lookup(&query.q).await?;

    Ok(Json(json!(patient)))
}

/// Full profile: record, diagnosis history and recent distributions.
#[axum::debug_handler]
pub async fn get_patient(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let (patient, diagnoses, distributions) = service.profile(patient_id).await?;

    Ok(Json(json!({
        "patient": patient,
        "diagnoses": diagnoses,
        "distributions": distributions,
    })))
}

#[axum::debug_handler]
pub async fn my_patients(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<SessionUser>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let page = query.page.unwrap_or(1).max(1);
    let patients = service.patients_of_doctor(user.id, page).await?;

    Ok(Json(json!({
        "patients": patients,
        "page": page,
        "per_page": 20,
    })))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<SessionUser>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    if user.role != UserRole::Admin {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    let service = PatientService::new(&config);
    let patient = service.update(patient_id, request).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<SessionUser>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if user.role != UserRole::Admin {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    let service = PatientService::new(&config);
    let patient = service.delete(patient_id).await?;

    Ok(Json(json!({
        "status": "deleted",
        "patient_code": patient.patient_code,
        "name": patient.name,
    })))
}
