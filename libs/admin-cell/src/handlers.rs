use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{ChangeRoleRequest, UserListQuery};
use crate::services::{StatsService, UserAdminService};

#[axum::debug_handler]
pub async fn list_users(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Value>, AppError> {
    let service = UserAdminService::new(&config);
    let users = service.list_doctors(&query).await?;

    Ok(Json(json!({ "users": users })))
}

#[axum::debug_handler]
pub async fn approve_user(
    State(config): State<Arc<AppConfig>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = UserAdminService::new(&config);
    let user = service.approve(user_id).await?;

    Ok(Json(json!({ "status": "approved", "user": user })))
}

#[axum::debug_handler]
pub async fn reject_user(
    State(config): State<Arc<AppConfig>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = UserAdminService::new(&config);
    let user = service.reject(user_id).await?;

    Ok(Json(json!({ "status": "rejected", "user": user })))
}

#[axum::debug_handler]
pub async fn change_role(
    State(config): State<Arc<AppConfig>>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<ChangeRoleRequest>,
) -> Result<Json<Value>, AppError> {
    let service = UserAdminService::new(&config);
    let user = service.change_role(user_id, request.role).await?;

    Ok(Json(json!({ "status": "role_changed", "user": user })))
}

#[axum::debug_handler]
pub async fn grant_export(
    State(config): State<Arc<AppConfig>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = UserAdminService::new(&config);
    let user = service.grant_export(user_id).await?;

    Ok(Json(json!({ "status": "export_granted", "user": user })))
}

#[axum::debug_handler]
pub async fn revoke_export(
    State(config): State<Arc<AppConfig>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = UserAdminService::new(&config);
    let user = service.revoke_export(user_id).await?;

    Ok(Json(json!({ "status": "export_revoked", "user": user })))
}

#[axum::debug_handler]
pub async fn delete_user(
    State(config): State<Arc<AppConfig>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = UserAdminService::new(&config);
    let user = service.delete(user_id).await?;

    Ok(Json(json!({ "status": "deleted", "name": user.name })))
}

#[axum::debug_handler]
pub async fn dashboard(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = StatsService::new(&config);
    let stats = service.dashboard().await?;

    Ok(Json(json!(stats)))
}

#[axum::debug_handler]
pub async fn demographics(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = StatsService::new(&config);
    let stats = service.demographics().await?;

    Ok(Json(json!(stats)))
}
