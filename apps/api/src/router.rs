use std::sync::Arc;

use axum::{routing::get, Router};

use admin_cell::router::create_admin_router;
use auth_cell::router::create_auth_router;
use diagnosis_cell::router::{create_diagnosis_router, create_drug_router};
use integration_cell::router::create_integration_router;
use inventory_cell::router::create_inventory_router;
use patient_cell::router::create_patient_router;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "CF Registry API is running!" }))
        .nest("/auth", create_auth_router(state.clone()))
        .nest("/patients", create_patient_router(state.clone()))
        .nest("/inventory", create_inventory_router(state.clone()))
        .nest("/diagnoses", create_diagnosis_router(state.clone()))
        .nest("/drugs", create_drug_router(state.clone()))
        .nest("/admin", create_admin_router(state.clone()))
        .nest("/integration", create_integration_router(state))
}
