use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::PostgrestClient;
use shared_models::user::{User, UserRole};

use crate::models::{AdminError, UserListQuery};

/// Admin-side account management: approval, role changes, export
/// permission, deletion.
pub struct UserAdminService {
    db: PostgrestClient,
}

impl UserAdminService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub async fn list_doctors(&self, query: &UserListQuery) -> Result<Vec<User>, AdminError> {
        let mut parts = vec!["role=eq.doctor".to_string()];

        match query.status.as_deref() {
            Some("pending") => parts.push("is_approved=eq.false".to_string()),
            Some("approved") => parts.push("is_approved=eq.true".to_string()),
            _ => {}
        }
        if let Some(search) = query.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                parts.push(format!(
                    "or=(name.ilike.*{s}*,phone.ilike.*{s}*)",
                    s = search
                ));
            }
        }
        parts.push("order=created_at.desc".to_string());

        let users: Vec<User> = self
            .db
            .select(&format!("/rest/v1/users?{}", parts.join("&")))
            .await?;
        Ok(users)
    }

    pub async fn get(&self, id: Uuid) -> Result<User, AdminError> {
        let users: Vec<User> = self
            .db
            .select(&format!("/rest/v1/users?id=eq.{}&limit=1", id))
            .await?;
        users.into_iter().next().ok_or(AdminError::NotFound)
    }

    pub async fn approve(&self, id: Uuid) -> Result<User, AdminError> {
        self.set_flag(id, "is_approved", true).await
    }

    pub async fn reject(&self, id: Uuid) -> Result<User, AdminError> {
        self.set_flag(id, "is_approved", false).await
    }

    pub async fn grant_export(&self, id: Uuid) -> Result<User, AdminError> {
        self.set_flag(id, "can_export", true).await
    }

    pub async fn revoke_export(&self, id: Uuid) -> Result<User, AdminError> {
        self.set_flag(id, "can_export", false).await
    }

    pub async fn change_role(&self, id: Uuid, role: UserRole) -> Result<User, AdminError> {
        let users: Vec<User> = self
            .db
            .update_where(
                &format!("/rest/v1/users?id=eq.{}", id),
                json!({ "role": role }),
            )
            .await?;
        users.into_iter().next().ok_or(AdminError::NotFound)
    }

    pub async fn delete(&self, id: Uuid) -> Result<User, AdminError> {
        let user = self.get(id).await?;
        if user.role == UserRole::Admin {
            return Err(AdminError::CannotDeleteAdmin);
        }

        self.db
            .delete_where(&format!("/rest/v1/users?id=eq.{}", id))
            .await?;
        debug!("Deleted user {} ({})", user.name, id);
        Ok(user)
    }

    async fn set_flag(&self, id: Uuid, field: &str, value: bool) -> Result<User, AdminError> {
        let users: Vec<User> = self
            .db
            .update_where(
                &format!("/rest/v1/users?id=eq.{}", id),
                json!({ field: value }),
            )
            .await?;
        users.into_iter().next().ok_or(AdminError::NotFound)
    }
}
