use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_auth_router(config: Arc<AppConfig>) -> Router {
    let protected = Router::new()
        .route("/me", get(me))
        .route("/profile", put(update_profile))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware));

    Router::new()
        .route("/doctor/register", post(register))
        .route("/doctor/verify-otp", post(verify_otp))
        .route("/doctor/resend-otp", post(resend_otp))
        .route("/doctor/login", post(login_doctor))
        .route("/admin/login", post(login_admin))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .merge(protected)
        .with_state(config)
}
