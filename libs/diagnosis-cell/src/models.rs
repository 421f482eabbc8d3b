use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::DbError;
use shared_models::error::AppError;

/// A clinical visit record for a patient, written by a doctor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub complaint: String,
    pub diagnosis: String,
    pub weight_kg: f64,
    pub height_cm: i32,
    #[serde(default)]
    pub spirometry: String,
    #[serde(default)]
    pub irt: String,
    #[serde(default)]
    pub sweat_test: String,
    #[serde(default)]
    pub genetic_test: String,
    pub treatment: String,
    #[serde(default)]
    pub drug_ids: Vec<Uuid>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDiagnosisRequest {
    pub patient_id: Uuid,
    pub complaint: String,
    pub diagnosis: String,
    pub weight_kg: f64,
    pub height_cm: i32,
    #[serde(default)]
    pub spirometry: String,
    #[serde(default)]
    pub irt: String,
    #[serde(default)]
    pub sweat_test: String,
    #[serde(default)]
    pub genetic_test: String,
    pub treatment: String,
    #[serde(default)]
    pub drug_ids: Vec<Uuid>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDiagnosisRequest {
    pub complaint: Option<String>,
    pub diagnosis: Option<String>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<i32>,
    pub spirometry: Option<String>,
    pub irt: Option<String>,
    pub sweat_test: Option<String>,
    pub genetic_test: Option<String>,
    pub treatment: Option<String>,
    pub drug_ids: Option<Vec<Uuid>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiagnosisListQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
}

/// Catalog entry for a prescribable drug; stock lives in the inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drug {
    pub id: Uuid,
    pub name: String,
    pub min_age: i32,
    pub max_age: i32,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDrugRequest {
    pub name: String,
    #[serde(default)]
    pub min_age: Option<i32>,
    #[serde(default)]
    pub max_age: Option<i32>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDrugRequest {
    pub name: Option<String>,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DiagnosisError {
    #[error("Diagnosis not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Drug not found")]
    DrugNotFound,

    #[error("A drug with this name already exists")]
    DuplicateDrug,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<DiagnosisError> for AppError {
    fn from(err: DiagnosisError) -> Self {
        let message = err.to_string();
        match err {
            DiagnosisError::NotFound
            | DiagnosisError::PatientNotFound
            | DiagnosisError::DrugNotFound => AppError::NotFound(message),
            DiagnosisError::DuplicateDrug => AppError::Conflict(message),
            DiagnosisError::Validation(_) => AppError::ValidationError(message),
            DiagnosisError::Internal(_) => AppError::Internal(message),
            DiagnosisError::Database(_) => AppError::Database(message),
        }
    }
}
