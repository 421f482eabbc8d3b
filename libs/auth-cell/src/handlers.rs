use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Map, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_models::user::{SessionUser, UserRole};
use shared_utils::jwt::sign_token;
use shared_utils::password::{hash_password, verify_password};
use shared_utils::phone::{is_valid_phone, normalize_phone};

use crate::models::{
    AuthError, ForgotPasswordRequest, LoginRequest, LoginResponse, OtpChallenge, OtpPurpose,
    PendingRegistration, RegisterRequest, ResendOtpRequest, ResetPasswordRequest,
    UpdateProfileRequest, VerifiedOtp, VerifyOtpRequest,
};
use crate::services::{AccountService, OtpService, SmsGateway};

const TOKEN_TTL_HOURS: i64 = 12;
const MIN_PASSWORD_LEN: usize = 6;

fn check_password_pair(password: &str, password2: &str) -> Result<(), AppError> {
    if password != password2 {
        return Err(AppError::ValidationError("Passwords do not match".to_string()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Registration step 1: validate the form, stage the account data inside an
/// OTP record and text the code to the phone being claimed.
#[axum::debug_handler]
pub async fn register(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<OtpChallenge>, AppError> {
    if request.name.trim().is_empty()
        || request.phone.trim().is_empty()
        || request.address.trim().is_empty()
    {
        return Err(AppError::ValidationError("All fields are required".to_string()));
    }
    check_password_pair(&request.password, &request.password2)?;
    if !is_valid_phone(&request.phone) {
        return Err(AppError::ValidationError("Invalid phone number format".to_string()));
    }

    let phone = normalize_phone(&request.phone);

    let accounts = AccountService::new(&config);
    if accounts.find_by_phone(&phone).await?.is_some() {
        return Err(AuthError::DuplicatePhone.into());
    }

    let password_hash =
        hash_password(&request.password).map_err(|e| AppError::Internal(e.to_string()))?;
    let pending = PendingRegistration {
        name: request.name.trim().to_string(),
        address: request.address.trim().to_string(),
        password_hash,
    };

    let otp = OtpService::new(&config);
    let (code, session_token) = otp.issue(&phone, OtpPurpose::Register, Some(pending)).await?;

    // Delivery failure aborts the step. The stored record stays behind and
    // the next attempt supersedes it.
    let sms = SmsGateway::new(&config);
    let message = config.sms_template.replace("{otp}", &code);
    sms.send(&phone, &message).await?;

    Ok(Json(OtpChallenge {
        phone,
        session_token,
    }))
}

/// Registration step 2: a matching code+token consumes the staged payload
/// and creates the (unapproved) doctor account.
#[axum::debug_handler]
pub async fn verify_otp(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Json<Value>, AppError> {
    let phone = normalize_phone(&request.phone);

    let otp = OtpService::new(&config);
    let verified = otp
        .verify(&phone, &request.session_token, &request.code, OtpPurpose::Register)
        .await?;

    let pending = match verified {
        VerifiedOtp::Registration(pending) => pending,
        VerifiedOtp::Reset => return Err(AuthError::InvalidOrExpiredCode.into()),
    };

    let accounts = AccountService::new(&config);
    let user = accounts.create_doctor(&phone, &pending).await?;

    otp.consume(&phone, OtpPurpose::Register).await?;

    debug!("Registered doctor {} ({})", user.name, user.id);
    Ok(Json(json!({
        "status": "registered",
        "message": "Registration complete. An administrator must approve the account.",
        "user_id": user.id,
    })))
}

#[axum::debug_handler]
pub async fn resend_otp(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<ResendOtpRequest>,
) -> Result<Json<OtpChallenge>, AppError> {
    let phone = normalize_phone(&request.phone);

    let otp = OtpService::new(&config);
    let (code, session_token, purpose) = otp.resend(&phone, &request.session_token).await?;

    let sms = SmsGateway::new(&config);
    let message = match purpose {
        OtpPurpose::Register => config.sms_template.replace("{otp}", &code),
        OtpPurpose::Reset => format!("Parolni tiklash kodi: {}", code),
    };
    sms.send(&phone, &message).await?;

    Ok(Json(OtpChallenge {
        phone,
        session_token,
    }))
}

#[axum::debug_handler]
pub async fn login_doctor(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    login(&config, request, UserRole::Doctor).await
}

#[axum::debug_handler]
pub async fn login_admin(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    login(&config, request, UserRole::Admin).await
}

async fn login(
    config: &AppConfig,
    request: LoginRequest,
    expected_role: UserRole,
) -> Result<Json<LoginResponse>, AppError> {
    let phone = normalize_phone(&request.phone);

    let accounts = AccountService::new(config);
    let user = accounts.authenticate(&phone, &request.password).await?;

    // Correct credentials on the wrong entry point are still rejected.
    if user.role != expected_role {
        return Err(AuthError::WrongRole.into());
    }

    let session = SessionUser::from_user(&user);
    let token = sign_token(&session, &config.jwt_secret, TOKEN_TTL_HOURS)
        .map_err(AppError::Internal)?;

    Ok(Json(LoginResponse {
        token,
        pending: !session.approved,
        user: session,
    }))
}

/// Password reset step 1: issue a reset code to a registered phone.
#[axum::debug_handler]
pub async fn forgot_password(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<OtpChallenge>, AppError> {
    let phone = normalize_phone(&request.phone);

    let accounts = AccountService::new(&config);
    if accounts.find_by_phone(&phone).await?.is_none() {
        return Err(AuthError::NotFound("Account".to_string()).into());
    }

    let otp = OtpService::new(&config);
    let (code, session_token) = otp.issue(&phone, OtpPurpose::Reset, None).await?;

    let sms = SmsGateway::new(&config);
    sms.send(&phone, &format!("Parolni tiklash kodi: {}", code)).await?;

    Ok(Json(OtpChallenge {
        phone,
        session_token,
    }))
}

/// Password reset step 2: a valid reset code replaces the stored hash.
#[axum::debug_handler]
pub async fn reset_password(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    check_password_pair(&request.password, &request.password2)?;

    let phone = normalize_phone(&request.phone);

    let otp = OtpService::new(&config);
    match otp
        .verify(&phone, &request.session_token, &request.code, OtpPurpose::Reset)
        .await?
    {
        VerifiedOtp::Reset => {}
        VerifiedOtp::Registration(_) => return Err(AuthError::InvalidOrExpiredCode.into()),
    }

    let password_hash =
        hash_password(&request.password).map_err(|e| AppError::Internal(e.to_string()))?;

    let accounts = AccountService::new(&config);
    accounts.update_password_by_phone(&phone, &password_hash).await?;

    otp.consume(&phone, OtpPurpose::Reset).await?;

    Ok(Json(json!({ "status": "password_changed" })))
}

#[axum::debug_handler]
pub async fn me(
    Extension(user): Extension<SessionUser>,
) -> Result<Json<SessionUser>, AppError> {
    Ok(Json(user))
}

/// Self-service profile update; a password change requires the current
/// password.
#[axum::debug_handler]
pub async fn update_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(session): Extension<SessionUser>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let accounts = AccountService::new(&config);

    let mut changes = Map::new();
    if let Some(name) = request.name.as_deref().map(str::trim) {
        if !name.is_empty() {
            changes.insert("name".to_string(), json!(name));
        }
    }
    if let Some(address) = request.address.as_deref().map(str::trim) {
        if !address.is_empty() {
            changes.insert("address".to_string(), json!(address));
        }
    }

    if let (Some(current), Some(new_password)) =
        (&request.current_password, &request.new_password)
    {
        let user = accounts.get(session.id).await?;
        let matches = verify_password(current, &user.password_hash)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        if !matches {
            return Err(AppError::ValidationError(
                "Current password is incorrect".to_string(),
            ));
        }
        check_password_pair(
            new_password,
            request.new_password2.as_deref().unwrap_or_default(),
        )?;

        let password_hash =
            hash_password(new_password).map_err(|e| AppError::Internal(e.to_string()))?;
        changes.insert("password_hash".to_string(), json!(password_hash));
    }

    if changes.is_empty() {
        return Err(AppError::ValidationError("Nothing to update".to_string()));
    }

    let updated = accounts.update_profile(session.id, changes).await?;
    Ok(Json(json!({
        "status": "updated",
        "user": updated,
    })))
}
