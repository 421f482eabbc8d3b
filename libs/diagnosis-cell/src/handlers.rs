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

use crate::models::{
    CreateDiagnosisRequest, CreateDrugRequest, DiagnosisListQuery, UpdateDiagnosisRequest,
    UpdateDrugRequest,
};
use crate::services::{DiagnosisService, DrugService};

fn require_admin_role(user: &SessionUser) -> Result<(), AppError> {
    if user.role != UserRole::Admin {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    Ok(())
}

#[axum::debug_handler]
pub async fn create_diagnosis(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<SessionUser>,
    Json(request): Json<CreateDiagnosisRequest>,
) -> Result<Json<Value>, AppError> {
    let service = DiagnosisService::new(&config);
    let diagnosis = service.create(request, user.id).await?;

    Ok(Json(json!(diagnosis)))
}

#[axum::debug_handler]
pub async fn list_diagnoses(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<SessionUser>,
    Query(query): Query<DiagnosisListQuery>,
) -> Result<Json<Value>, AppError> {
    require_admin_role(&user)?;

    let service = DiagnosisService::new(&config);
    let page = query.page.unwrap_or(1).max(1);
    let diagnoses = service.list(&query).await?;

    Ok(Json(json!({
        "diagnoses": diagnoses,
        "page": page,
        "per_page": 20,
    })))
}

#[axum::debug_handler]
pub async fn get_diagnosis(
    State(config): State<Arc<AppConfig>>,
    Path(diagnosis_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DiagnosisService::new(&config);
    let diagnosis = service.get(diagnosis_id).await?;

    Ok(Json(json!(diagnosis)))
}

#[axum::debug_handler]
pub async fn update_diagnosis(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<SessionUser>,
    Path(diagnosis_id): Path<Uuid>,
    Json(request): Json<UpdateDiagnosisRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin_role(&user)?;

    let service = DiagnosisService::new(&config);
    let diagnosis = service.update(diagnosis_id, request).await?;

    Ok(Json(json!(diagnosis)))
}

#[axum::debug_handler]
pub async fn delete_diagnosis(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<SessionUser>,
    Path(diagnosis_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin_role(&user)?;

    let service = DiagnosisService::new(&config);
    service.delete(diagnosis_id).await?;

    Ok(Json(json!({ "status": "deleted" })))
}

#[axum::debug_handler]
pub async fn list_drugs(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = DrugService::new(&config);
    let drugs = service.list().await?;

    Ok(Json(json!({ "drugs": drugs })))
}

/// Drugs whose age range covers the given age, for prescription pickers.
#[axum::debug_handler]
pub async fn drugs_for_age(
    State(config): State<Arc<AppConfig>>,
    Path(age): Path<i32>,
) -> Result<Json<Value>, AppError> {
    let service = DrugService::new(&config);
    let drugs = service.for_age(age).await?;

    Ok(Json(json!({ "drugs": drugs })))
}

#[axum::debug_handler]
pub async fn create_drug(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<SessionUser>,
    Json(request): Json<CreateDrugRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin_role(&user)?;

    let service = DrugService::new(&config);
    let drug = service.create(request).await?;

    Ok(Json(json!(drug)))
}

#[axum::debug_handler]
pub async fn update_drug(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<SessionUser>,
    Path(drug_id): Path<Uuid>,
    Json(request): Json<UpdateDrugRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin_role(&user)?;

    let service = DrugService::new(&config);
    let drug = service.update(drug_id, request).await?;

    Ok(Json(json!(drug)))
}

#[axum::debug_handler]
pub async fn delete_drug(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<SessionUser>,
    Path(drug_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin_role(&user)?;

    let service = DrugService::new(&config);
    service.delete(drug_id).await?;

    Ok(Json(json!({ "status": "deleted" })))
}
