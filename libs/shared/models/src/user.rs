use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Doctor,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Doctor => "doctor",
            UserRole::Admin => "admin",
        }
    }
}

/// A registered account. The password hash never leaves the server:
/// serialization skips it, so a `User` can be embedded in responses as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub address: String,
    pub role: UserRole,
    #[serde(default)]
    pub telegram_id: Option<i64>,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub can_export: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_doctor(&self) -> bool {
        self.role == UserRole::Doctor
    }
}

/// The authenticated identity carried through request extensions after the
/// JWT has been validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub role: UserRole,
    pub approved: bool,
}

impl SessionUser {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            role: user.role,
            // Admins never sit in the pending state.
            approved: user.is_approved || user.role == UserRole::Admin,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: Uuid,
    pub name: String,
    pub role: UserRole,
    pub approved: bool,
    pub iat: i64,
    pub exp: i64,
}
