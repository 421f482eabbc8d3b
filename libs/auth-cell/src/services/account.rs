use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::PostgrestClient;
use shared_models::user::User;
use shared_utils::password::verify_password;

use crate::models::{AuthError, PendingRegistration};

/// Credential-store operations for the auth flows: lookup, password
/// verification and account creation.
pub struct AccountService {
    db: PostgrestClient,
}

impl AccountService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, AuthError> {
        let users: Vec<User> = self
            .db
            .select(&format!("/rest/v1/users?phone=eq.{}&limit=1", phone))
            .await?;
        Ok(users.into_iter().next())
    }

    pub async fn get(&self, user_id: Uuid) -> Result<User, AuthError> {
        let users: Vec<User> = self
            .db
            .select(&format!("/rest/v1/users?id=eq.{}&limit=1", user_id))
            .await?;
        users
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::NotFound("User".to_string()))
    }

    /// Both an unknown phone and a wrong password collapse into the same
    /// `InvalidCredentials`, so responses do not reveal which phones are
    /// registered.
    pub async fn authenticate(&self, phone: &str, password: &str) -> Result<User, AuthError> {
        let user = self
            .find_by_phone(phone)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let matches = verify_password(password, &user.password_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        debug!("Authenticated user {}", user.id);
        Ok(user)
    }

    /// Create the doctor account staged during OTP registration. The store's
    /// unique constraint on phone backs the earlier application-level check.
    pub async fn create_doctor(
        &self,
        phone: &str,
        pending: &PendingRegistration,
    ) -> Result<User, AuthError> {
        let result: Result<Vec<User>, _> = self
            .db
            .insert_returning(
                "/rest/v1/users",
                json!({
                    "name": pending.name,
                    "phone": phone,
                    "password_hash": pending.password_hash,
                    "address": pending.address,
                    "role": "doctor",
                    "is_approved": false,
                }),
            )
            .await;

        match result {
            Ok(users) => users
                .into_iter()
                .next()
                .ok_or_else(|| AuthError::Internal("user insert returned no rows".to_string())),
            Err(e) if e.is_unique_violation() => Err(AuthError::DuplicatePhone),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_password_by_phone(
        &self,
        phone: &str,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        let updated: Vec<User> = self
            .db
            .update_where(
                &format!("/rest/v1/users?phone=eq.{}", phone),
                json!({ "password_hash": password_hash }),
            )
            .await?;

        if updated.is_empty() {
            return Err(AuthError::NotFound("User".to_string()));
        }
        Ok(())
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        changes: Map<String, Value>,
    ) -> Result<User, AuthError> {
        let updated: Vec<User> = self
            .db
            .update_where(
                &format!("/rest/v1/users?id=eq.{}", user_id),
                Value::Object(changes),
            )
            .await?;

        updated
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::NotFound("User".to_string()))
    }
}
