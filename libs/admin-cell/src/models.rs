use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use shared_database::DbError;
use shared_models::error::AppError;
use shared_models::user::UserRole;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    /// `pending` or `approved`; anything else lists every doctor.
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub patients: usize,
    pub diagnoses: usize,
    pub users: usize,
    pub pending_users: usize,
    pub doctors: usize,
    pub drugs: usize,
    pub inventory: usize,
}

/// Demographic aggregation over the patient register.
#[derive(Debug, Serialize)]
pub struct PatientDemographics {
    pub region_stats: BTreeMap<String, u32>,
    pub male: u32,
    pub female: u32,
    pub consanguineous: u32,
    pub non_consanguineous: u32,
    pub registered_today: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("User not found")]
    NotFound,

    #[error("Admin accounts cannot be deleted")]
    CannotDeleteAdmin,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<AdminError> for AppError {
    fn from(err: AdminError) -> Self {
        let message = err.to_string();
        match err {
            AdminError::NotFound => AppError::NotFound(message),
            AdminError::CannotDeleteAdmin => AppError::Forbidden(message),
            AdminError::Validation(_) => AppError::ValidationError(message),
            AdminError::Database(_) => AppError::Database(message),
        }
    }
}
