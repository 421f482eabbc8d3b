use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_models::user::{SessionUser, UserRole};

use crate::jwt::validate_token;

/// Validates the bearer token and stores the session user in the request
/// extensions for downstream handlers and guards.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    let token = &auth_value[7..];

    let user = validate_token(token, &config.jwt_secret).map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Admin-only routes. Must run after `auth_middleware`.
pub async fn require_admin(
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = session_user(&request)?;
    if user.role != UserRole::Admin {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    Ok(next.run(request).await)
}

/// Doctor routes (admins pass as well). Unapproved doctors are held at the
/// pending state until an admin approves them.
pub async fn require_doctor(
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = session_user(&request)?;
    if user.role == UserRole::Doctor && !user.approved {
        return Err(AppError::Forbidden(
            "Account is pending admin approval".to_string(),
        ));
    }
    Ok(next.run(request).await)
}

fn session_user(request: &Request<Body>) -> Result<SessionUser, AppError> {
    request
        .extensions()
        .get::<SessionUser>()
        .cloned()
        .ok_or_else(|| AppError::Auth("User not found in request extensions".to_string()))
}
