use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_models::user::SessionUser;

use crate::models::{
    CreateInventoryRequest, DistributeRequest, InventoryItem, InventoryListQuery, ItemKind,
    UpdateInventoryRequest,
};
use crate::services::{DistributionService, InventoryService};

fn with_status_flags(items: Vec<InventoryItem>) -> Vec<Value> {
    let now = Utc::now();
    items
        .into_iter()
        .map(|item| {
            let is_expired = item.is_expired_at(now);
            let is_expiring_soon = item.is_expiring_soon_at(now);
            json!({
                "item": item,
                "is_expired": is_expired,
                "is_expiring_soon": is_expiring_soon,
            })
        })
        .collect()
}

#[axum::debug_handler]
pub async fn list_inventory(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<InventoryListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = InventoryService::new(&config);
    let kind = query.kind.unwrap_or(ItemKind::Drug);
    let items = service.list(kind).await?;

    Ok(Json(json!({
        "kind": kind,
        "items": with_status_flags(items),
    })))
}

#[axum::debug_handler]
pub async fn create_item(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<SessionUser>,
    Json(request): Json<CreateInventoryRequest>,
) -> Result<Json<Value>, AppError> {
    let service = InventoryService::new(&config);
    let item = service.create(request, user.id).await?;

    Ok(Json(json!(item)))
}

#[axum::debug_handler]
pub async fn update_item(
    State(config): State<Arc<AppConfig>>,
    Path(item_id): Path<Uuid>,
    Json(request): Json<UpdateInventoryRequest>,
) -> Result<Json<Value>, AppError> {
    let service = InventoryService::new(&config);
    let item = service.update(item_id, request).await?;

    Ok(Json(json!(item)))
}

#[axum::debug_handler]
pub async fn delete_item(
    State(config): State<Arc<AppConfig>>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = InventoryService::new(&config);
    let item = service.delete(item_id).await?;

    Ok(Json(json!({
        "status": "deleted",
        "name": item.name,
    })))
}

/// Everything the distribution screen needs for one patient: the record,
/// what they may receive, and their recent history.
#[axum::debug_handler]
pub async fn eligible_for_patient(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let distributions = DistributionService::new(&config);
    let inventory = InventoryService::new(&config);

    let patient = distributions.patient_summary(patient_id).await?;
    let age = patient.get("age").and_then(Value::as_i64).unwrap_or(0) as i32;

    let drug_inventory = inventory.eligible_for_age(ItemKind::Drug, age).await?;
    let food_inventory = inventory.eligible_for_age(ItemKind::Food, age).await?;
    let history = distributions.history(patient_id, 20).await?;

    Ok(Json(json!({
        "patient": patient,
        "drug_inventory": drug_inventory,
        "food_inventory": food_inventory,
        "history": history,
    })))
}

#[axum::debug_handler]
pub async fn distribute(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<SessionUser>,
    Json(request): Json<DistributeRequest>,
) -> Result<Json<Value>, AppError> {
    let service = DistributionService::new(&config);
    let distribution = service.distribute(request, user.id).await?;

    Ok(Json(json!({
        "status": "distributed",
        "distribution": distribution,
    })))
}

#[axum::debug_handler]
pub async fn distribution_history(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DistributionService::new(&config);
    let history = service.history(patient_id, 20).await?;

    Ok(Json(json!({ "history": history })))
}
