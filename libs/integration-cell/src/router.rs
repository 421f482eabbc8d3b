use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;

use crate::handlers::*;

pub fn create_integration_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/profile", get(profile))
        .route("/reset-password", post(reset_password))
        .route("/patients/{pnfl}", get(patient_by_pnfl))
        .route("/stats", get(stats))
        .layer(middleware::from_fn_with_state(config.clone(), api_key_guard))
        .with_state(config)
}
