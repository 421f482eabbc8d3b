use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::DbError;
use shared_models::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Andijon,
    Buxoro,
    Fargona,
    Jizzax,
    Xorazm,
    Namangan,
    Navoiy,
    Qashqadaryo,
    Samarqand,
    Sirdaryo,
    Surxondaryo,
    ToshkentVil,
    ToshkentSh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub patient_code: String,
    pub name: String,
    #[serde(default)]
    pub card_number: String,
    pub sex: Sex,
    pub region: Region,
    pub district: String,
    pub birthday: NaiveDate,
    pub age: i32,
    #[serde(default)]
    pub related_marriage: bool,
    pub child_pnfl: String,
    pub mother_name: String,
    pub mother_id_number: String,
    #[serde(default)]
    pub mother_work_place: String,
    pub father_name: String,
    pub father_id_number: String,
    #[serde(default)]
    pub father_work_place: String,
    pub full_address: String,
    pub phone_number: String,
    #[serde(default)]
    pub second_number: String,
    pub patient_add_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePatientRequest {
    pub name: String,
    #[serde(default)]
    pub card_number: String,
    pub sex: Sex,
    pub region: Region,
    pub district: String,
    pub birthday: NaiveDate,
    pub age: i32,
    #[serde(default)]
    pub related_marriage: bool,
    pub child_pnfl: String,
    pub mother_name: String,
    pub mother_id_number: String,
    #[serde(default)]
    pub mother_work_place: String,
    pub father_name: String,
    pub father_id_number: String,
    #[serde(default)]
    pub father_work_place: String,
    pub full_address: String,
    pub phone_number: String,
    #[serde(default)]
    pub second_number: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub card_number: Option<String>,
    pub sex: Option<Sex>,
    pub region: Option<Region>,
    pub district: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub age: Option<i32>,
    pub related_marriage: Option<bool>,
    pub child_pnfl: Option<String>,
    pub mother_name: Option<String>,
    pub mother_id_number: Option<String>,
    pub mother_work_place: Option<String>,
    pub father_name: Option<String>,
    pub father_id_number: Option<String>,
    pub father_work_place: Option<String>,
    pub full_address: Option<String>,
    pub phone_number: Option<String>,
    pub second_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientListQuery {
    pub search: Option<String>,
    pub region: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub q: String,
}

/// Row in the `counters` table backing code allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("A patient with this PNFL already exists")]
    DuplicatePnfl,

    #[error("PNFL must be exactly 14 digits")]
    InvalidPnfl,

    #[error("Could not allocate a patient code, please retry")]
    AllocationFailed,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        let message = err.to_string();
        match err {
            PatientError::NotFound => AppError::NotFound(message),
            PatientError::DuplicatePnfl => AppError::Conflict(message),
            PatientError::InvalidPnfl => AppError::ValidationError(message),
            PatientError::AllocationFailed => AppError::Internal(message),
            PatientError::Validation(_) => AppError::ValidationError(message),
            PatientError::Internal(_) => AppError::Internal(message),
            PatientError::Database(_) => AppError::Database(message),
        }
    }
}
