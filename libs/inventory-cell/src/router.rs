use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, require_admin, require_doctor};

use crate::handlers::*;

pub fn create_inventory_router(config: Arc<AppConfig>) -> Router {
    let admin = Router::new()
        .route("/", post(create_item).get(list_inventory))
        .route("/{id}", axum::routing::put(update_item).delete(delete_item))
        .layer(middleware::from_fn(require_admin));

    let staff = Router::new()
        .route("/eligible/{patient_id}", get(eligible_for_patient))
        .route("/distribute", post(distribute))
        .route("/distributions/{patient_id}", get(distribution_history))
        .layer(middleware::from_fn(require_doctor));

    Router::new()
        .merge(admin)
        .merge(staff)
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
