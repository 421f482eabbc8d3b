use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::Request,
    middleware::Next,
    response::Response,
    Json,
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::PostgrestClient;
use shared_models::error::AppError;
use shared_models::user::User;
use shared_utils::password::hash_password;
use shared_utils::phone::{is_valid_phone, normalize_phone};

use crate::models::{BotRegisterRequest, BotResetPasswordRequest, ProfileQuery};

const MIN_PASSWORD_LEN: usize = 6;

/// Shared-secret gate for the Telegram bot. The comparison is constant-time
/// so the key cannot be probed byte by byte.
pub async fn api_key_guard(
    State(config): State<Arc<AppConfig>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if !keys_match(provided, &config.api_secret_key) {
        return Err(AppError::Auth("Unauthorized".to_string()));
    }

    Ok(next.run(request).await)
}

fn keys_match(provided: &str, expected: &str) -> bool {
    // An empty configured key disables the integration API entirely.
    if expected.is_empty() || provided.len() != expected.len() {
        return false;
    }
    provided
        .bytes()
        .zip(expected.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Bot-driven registration. The account starts unapproved with a random
/// password; the user logs in after resetting it through the bot.
#[axum::debug_handler]
pub async fn register(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<BotRegisterRequest>,
) -> Result<Json<Value>, AppError> {
    if request.name.trim().is_empty() || request.address.trim().is_empty() {
        return Err(AppError::ValidationError("All fields are required".to_string()));
    }
    if !is_valid_phone(&request.phone) {
        return Err(AppError::ValidationError("Invalid phone number format".to_string()));
    }

    let phone = normalize_phone(&request.phone);
    let db = PostgrestClient::new(&config);

    let existing: Vec<Value> = db
        .select(&format!(
            "/rest/v1/users?or=(phone.eq.{},telegram_id.eq.{})&select=id&limit=1",
            phone, request.telegram_id
        ))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    if !existing.is_empty() {
        return Err(AppError::Conflict(
            "A user with this phone or telegram id already exists".to_string(),
        ));
    }

    let initial_password: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    let password_hash =
        hash_password(&initial_password).map_err(|e| AppError::Internal(e.to_string()))?;

    let result: Result<Vec<User>, _> = db
        .insert_returning(
            "/rest/v1/users",
            json!({
                "name": request.name.trim(),
                "phone": phone,
                "password_hash": password_hash,
                "address": request.address.trim(),
                "role": "doctor",
                "telegram_id": request.telegram_id,
                "is_approved": false,
            }),
        )
        .await;

    match result {
        Ok(_) => {
            debug!("Registered bot user for telegram id {}", request.telegram_id);
            Ok(Json(json!({
                "status": "pending",
                "message": "Registered. Wait for admin approval.",
            })))
        }
        Err(e) if e.is_unique_violation() => Err(AppError::Conflict(
            "A user with this phone or telegram id already exists".to_string(),
        )),
        Err(e) => Err(AppError::Database(e.to_string())),
    }
}

#[axum::debug_handler]
pub async fn profile(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<Value>, AppError> {
    let db = PostgrestClient::new(&config);

    let users: Vec<User> = db
        .select(&format!(
            "/rest/v1/users?telegram_id=eq.{}&limit=1",
            query.telegram_id
        ))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let user = users
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "name": user.name,
        "phone": user.phone,
        "address": user.address,
        "role": user.role,
        "is_approved": user.is_approved,
    })))
}

/// Direct reset, authorized by possession of the bound Telegram account.
#[axum::debug_handler]
pub async fn reset_password(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<BotResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let password_hash =
        hash_password(&request.password).map_err(|e| AppError::Internal(e.to_string()))?;

    let db = PostgrestClient::new(&config);
    let updated: Vec<User> = db
        .update_where(
            &format!("/rest/v1/users?telegram_id=eq.{}", request.telegram_id),
            json!({ "password_hash": password_hash }),
        )
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    if updated.is_empty() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(Json(json!({
        "status": "password_changed",
        "message": "Password updated successfully",
    })))
}

#[axum::debug_handler]
pub async fn patient_by_pnfl(
    State(config): State<Arc<AppConfig>>,
    Path(pnfl): Path<String>,
) -> Result<Json<Value>, AppError> {
    if pnfl.len() != 14 || !pnfl.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::ValidationError(
            "PNFL must be exactly 14 digits".to_string(),
        ));
    }

    let db = PostgrestClient::new(&config);
    let patients: Vec<Value> = db
        .select(&format!("/rest/v1/patients?child_pnfl=eq.{}&limit=1", pnfl))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let patient = patients
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))?;

    Ok(Json(patient))
}

#[axum::debug_handler]
pub async fn stats(State(config): State<Arc<AppConfig>>) -> Result<Json<Value>, AppError> {
    let db = PostgrestClient::new(&config);

    let patients: Vec<Value> = db
        .select("/rest/v1/patients?select=id")
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    let doctors: Vec<Value> = db
        .select("/rest/v1/users?role=eq.doctor&is_approved=eq.true&select=id")
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    let pending: Vec<Value> = db
        .select("/rest/v1/users?is_approved=eq.false&select=id")
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!({
        "patients": patients.len(),
        "doctors": doctors.len(),
        "pending": pending.len(),
    })))
}

#[cfg(test)]
mod tests {
    use super::keys_match;

    #[test]
    fn key_comparison() {
        assert!(keys_match("secret", "secret"));
        assert!(!keys_match("secret", "secret2"));
        assert!(!keys_match("Secret", "secret"));
        // An unset key never matches, including the empty probe.
        assert!(!keys_match("", ""));
    }
}
