use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::DbError;
use shared_models::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Drug,
    Food,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Drug => "drug",
            ItemKind::Food => "food",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Uuid,
    pub kind: ItemKind,
    pub name: String,
    #[serde(default)]
    pub drug_id: Option<Uuid>,
    pub quantity: i64,
    pub unit: String,
    pub expiry_date: DateTime<Utc>,
    pub min_age: i32,
    pub max_age: i32,
    #[serde(default)]
    pub added_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry_date
    }

    pub fn is_expiring_soon_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired_at(now) && self.expiry_date - now < Duration::days(30)
    }

    /// Age bounds are inclusive on both ends.
    pub fn covers_age(&self, age: i32) -> bool {
        self.min_age <= age && age <= self.max_age
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInventoryRequest {
    pub kind: ItemKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub drug_id: Option<Uuid>,
    pub quantity: i64,
    #[serde(default)]
    pub unit: Option<String>,
    pub expiry_date: DateTime<Utc>,
    #[serde(default)]
    pub min_age: Option<i32>,
    #[serde(default)]
    pub max_age: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInventoryRequest {
    pub quantity: Option<i64>,
    pub unit: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryListQuery {
    pub kind: Option<ItemKind>,
}

/// One requested line of a distribution.
#[derive(Debug, Clone, Deserialize)]
pub struct DistributionLine {
    pub inventory_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DistributeRequest {
    pub patient_id: Uuid,
    pub kind: ItemKind,
    pub items: Vec<DistributionLine>,
    #[serde(default)]
    pub comment: String,
}

/// A line as recorded in the ledger: name and unit are snapshots taken at
/// issuance so later edits to the inventory item do not rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionItem {
    pub inventory_id: Uuid,
    pub name: String,
    pub quantity: i64,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Distribution {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub kind: ItemKind,
    pub items: Vec<DistributionItem>,
    #[serde(default)]
    pub comment: String,
    pub given_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Inventory item not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("{name} is not available in the requested amount (available: {available})")]
    InsufficientStock { name: String, available: i64 },

    #[error("{name} cannot be distributed: {reason}")]
    IneligibleItem { name: String, reason: String },

    #[error("{name} is being updated concurrently, please retry")]
    StockContention { name: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        let message = err.to_string();
        match err {
            InventoryError::NotFound | InventoryError::PatientNotFound => {
                AppError::NotFound(message)
            }
            InventoryError::InsufficientStock { .. } => AppError::Conflict(message),
            InventoryError::IneligibleItem { .. } => AppError::BadRequest(message),
            InventoryError::StockContention { .. } => AppError::Conflict(message),
            InventoryError::Validation(_) => AppError::ValidationError(message),
            InventoryError::Internal(_) => AppError::Internal(message),
            InventoryError::Database(_) => AppError::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(expiry: DateTime<Utc>, min_age: i32, max_age: i32) -> InventoryItem {
        InventoryItem {
            id: Uuid::new_v4(),
            kind: ItemKind::Drug,
            name: "Kreon".to_string(),
            drug_id: None,
            quantity: 10,
            unit: "dona".to_string(),
            expiry_date: expiry,
            min_age,
            max_age,
            added_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn expiry_flags() {
        let now = Utc::now();
        assert!(item(now - Duration::days(1), 0, 100).is_expired_at(now));
        assert!(item(now + Duration::days(10), 0, 100).is_expiring_soon_at(now));
        assert!(!item(now + Duration::days(40), 0, 100).is_expiring_soon_at(now));
        assert!(!item(now - Duration::days(1), 0, 100).is_expiring_soon_at(now));
    }

    #[test]
    fn age_bounds_are_inclusive() {
        let now = Utc::now();
        let item = item(now + Duration::days(40), 3, 7);
        assert!(!item.covers_age(2));
        assert!(item.covers_age(3));
        assert!(item.covers_age(7));
        assert!(!item.covers_age(8));
    }
}
