use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, require_admin};

use crate::handlers::*;

pub fn create_admin_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}/approve", post(approve_user))
        .route("/users/{id}/reject", post(reject_user))
        .route("/users/{id}/role", post(change_role))
        .route("/users/{id}/grant-export", post(grant_export))
        .route("/users/{id}/revoke-export", post(revoke_export))
        .route("/users/{id}", delete(delete_user))
        .route("/stats", get(dashboard))
        .route("/stats/demographics", get(demographics))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
