use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::DbError;
use shared_models::error::AppError;
use shared_models::user::SessionUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpPurpose {
    Register,
    Reset,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::Register => "register",
            OtpPurpose::Reset => "reset",
        }
    }
}

/// Registration data staged inside the OTP record until the phone is
/// confirmed. The password arrives here already hashed; the plaintext never
/// touches the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRegistration {
    pub name: String,
    pub address: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpRecord {
    pub id: Uuid,
    pub phone: String,
    pub code: String,
    pub session_token: String,
    pub purpose: OtpPurpose,
    #[serde(default)]
    pub pending: Option<PendingRegistration>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OtpRecord {
    /// Expiry is exclusive: a code presented at exactly `expires_at` is dead.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// What a successful verification entitles the caller to do, keyed by the
/// purpose the record was issued for.
#[derive(Debug, Clone)]
pub enum VerifiedOtp {
    Registration(PendingRegistration),
    Reset,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub phone: String,
    pub password: String,
    pub password2: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub phone: String,
    pub session_token: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendOtpRequest {
    pub phone: String,
    pub session_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub phone: String,
    pub session_token: String,
    pub code: String,
    pub password: String,
    pub password2: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub new_password2: Option<String>,
}

/// Returned after an OTP has been issued; the client holds the token, the
/// user receives the code out of band.
#[derive(Debug, Serialize)]
pub struct OtpChallenge {
    pub phone: String,
    pub session_token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub pending: bool,
    pub user: SessionUser,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid phone number or password")]
    InvalidCredentials,

    #[error("This login is not available for your role")]
    WrongRole,

    #[error("Code is invalid or has expired")]
    InvalidOrExpiredCode,

    #[error("Session has expired, please start over")]
    SessionExpired,

    #[error("This phone number is already registered")]
    DuplicatePhone,

    #[error("SMS delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::InvalidCredentials => AppError::Auth(message),
            AuthError::WrongRole => AppError::Forbidden(message),
            AuthError::InvalidOrExpiredCode | AuthError::SessionExpired => {
                AppError::BadRequest(message)
            }
            AuthError::DuplicatePhone => AppError::Conflict(message),
            AuthError::DeliveryFailed(_) => AppError::ExternalService(message),
            AuthError::NotFound(_) => AppError::NotFound(message),
            AuthError::Validation(_) => AppError::ValidationError(message),
            AuthError::Internal(_) => AppError::Internal(message),
            AuthError::Database(_) => AppError::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(expires_at: DateTime<Utc>) -> OtpRecord {
        OtpRecord {
            id: Uuid::new_v4(),
            phone: "998901234567".to_string(),
            code: "123456".to_string(),
            session_token: "token".to_string(),
            purpose: OtpPurpose::Register,
            pending: None,
            expires_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn expiry_bound_is_exclusive() {
        let now = Utc::now();
        assert!(record(now + Duration::seconds(1)).is_usable_at(now));
        assert!(!record(now).is_usable_at(now));
        assert!(!record(now - Duration::seconds(1)).is_usable_at(now));
    }
}
