use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, require_doctor};

use crate::handlers::*;

pub fn create_diagnosis_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(create_diagnosis).get(list_diagnoses))
        .route(
            "/{id}",
            get(get_diagnosis).put(update_diagnosis).delete(delete_diagnosis),
        )
        .layer(middleware::from_fn(require_doctor))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}

pub fn create_drug_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(list_drugs).post(create_drug))
        .route("/for-age/{age}", get(drugs_for_age))
        .route("/{id}", axum::routing::put(update_drug).delete(delete_drug))
        .layer(middleware::from_fn(require_doctor))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
