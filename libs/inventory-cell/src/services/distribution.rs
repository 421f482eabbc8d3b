use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::PostgrestClient;

use crate::models::{
    DistributeRequest, Distribution, DistributionItem, InventoryError, InventoryItem,
};

const CAS_ATTEMPTS: u32 = 3;

/// Records hand-outs of drugs and food to patients. Every stock decrement is
/// a conditional update filtered on the exact quantity the precondition was
/// checked against, and the whole request is all-or-nothing: if any line
/// fails, the decrements already applied are reversed before the error
/// returns. The same path serves doctors and admins.
pub struct DistributionService {
    db: PostgrestClient,
}

impl DistributionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub async fn patient_summary(&self, patient_id: Uuid) -> Result<Value, InventoryError> {
        let patients: Vec<Value> = self
            .db
            .select(&format!("/rest/v1/patients?id=eq.{}&limit=1", patient_id))
            .await?;
        patients
            .into_iter()
            .next()
            .ok_or(InventoryError::PatientNotFound)
    }

    pub async fn distribute(
        &self,
        request: DistributeRequest,
        given_by: Uuid,
    ) -> Result<Distribution, InventoryError> {
        if request.items.is_empty() {
            return Err(InventoryError::Validation(
                "At least one line item is required".to_string(),
            ));
        }
        if request.items.iter().any(|line| line.quantity <= 0) {
            return Err(InventoryError::Validation(
                "Line quantities must be positive".to_string(),
            ));
        }

        let patient = self.patient_summary(request.patient_id).await?;
        let age = patient.get("age").and_then(Value::as_i64).unwrap_or(0) as i32;

        let mut applied: Vec<(Uuid, i64)> = Vec::new();
        let mut snapshots: Vec<DistributionItem> = Vec::new();

        for line in &request.items {
            match self.decrement(line.inventory_id, line.quantity, age).await {
                Ok(item) => {
                    applied.push((line.inventory_id, line.quantity));
                    snapshots.push(DistributionItem {
                        inventory_id: line.inventory_id,
                        name: item.name,
                        quantity: line.quantity,
                        unit: item.unit,
                    });
                }
                Err(err) => {
                    self.compensate(&applied).await;
                    return Err(err);
                }
            }
        }

        let body = json!({
            "patient_id": request.patient_id,
            "kind": request.kind,
            "items": snapshots,
            "comment": request.comment.trim(),
            "given_by": given_by,
        });

        let inserted: Result<Vec<Distribution>, _> =
            self.db.insert_returning("/rest/v1/distributions", body).await;

        match inserted {
            Ok(rows) => match rows.into_iter().next() {
                Some(distribution) => {
                    debug!(
                        "Recorded distribution {} for patient {}",
                        distribution.id, request.patient_id
                    );
                    Ok(distribution)
                }
                None => {
                    self.compensate(&applied).await;
                    Err(InventoryError::Internal(
                        "distribution insert returned no rows".to_string(),
                    ))
                }
            },
            Err(e) => {
                self.compensate(&applied).await;
                Err(e.into())
            }
        }
    }

    pub async fn history(
        &self,
        patient_id: Uuid,
        limit: u32,
    ) -> Result<Vec<Distribution>, InventoryError> {
        let rows: Vec<Distribution> = self
            .db
            .select(&format!(
                "/rest/v1/distributions?patient_id=eq.{}&order=created_at.desc&limit={}",
                patient_id, limit
            ))
            .await?;
        Ok(rows)
    }

    /// Check-and-decrement one line. The eligibility and quantity checks run
    /// against a fresh read, and the PATCH is filtered on that exact
    /// quantity, so a concurrent decrement makes the update match nothing
    /// and the loop re-reads. The error names the item and the quantity
    /// actually available at check time.
    async fn decrement(
        &self,
        inventory_id: Uuid,
        amount: i64,
        patient_age: i32,
    ) -> Result<InventoryItem, InventoryError> {
        let now = Utc::now();
        let mut last_name = String::new();

        for attempt in 0..CAS_ATTEMPTS {
            let items: Vec<InventoryItem> = self
                .db
                .select(&format!("/rest/v1/inventory?id=eq.{}&limit=1", inventory_id))
                .await?;
            let item = items.into_iter().next().ok_or(InventoryError::NotFound)?;
            last_name = item.name.clone();

            if item.is_expired_at(now) {
                return Err(InventoryError::IneligibleItem {
                    name: item.name,
                    reason: "the item has expired".to_string(),
                });
            }
            if !item.covers_age(patient_age) {
                return Err(InventoryError::IneligibleItem {
                    name: item.name,
                    reason: format!(
                        "age {} is outside the {}-{} range",
                        patient_age, item.min_age, item.max_age
                    ),
                });
            }
            if item.quantity < amount {
                return Err(InventoryError::InsufficientStock {
                    name: item.name,
                    available: item.quantity,
                });
            }

            let updated: Vec<InventoryItem> = self
                .db
                .update_where(
                    &format!(
                        "/rest/v1/inventory?id=eq.{}&quantity=eq.{}",
                        inventory_id, item.quantity
                    ),
                    json!({ "quantity": item.quantity - amount }),
                )
                .await?;

            if let Some(updated) = updated.into_iter().next() {
                debug!(
                    "Decremented {} by {} (remaining {})",
                    updated.name, amount, updated.quantity
                );
                return Ok(updated);
            }

            debug!(
                "quantity CAS lost for {} (attempt {}), re-reading",
                inventory_id, attempt + 1
            );
        }

        Err(InventoryError::StockContention { name: last_name })
    }

    /// Reverse the decrements already applied in this request, newest first.
    /// There is nothing left to roll back to if this fails, so failures are
    /// only logged.
    async fn compensate(&self, applied: &[(Uuid, i64)]) {
        for (inventory_id, amount) in applied.iter().rev() {
            if let Err(e) = self.increment(*inventory_id, *amount).await {
                error!(
                    "failed to restore {} units to inventory item {}: {}",
                    amount, inventory_id, e
                );
            }
        }
    }

    async fn increment(&self, inventory_id: Uuid, amount: i64) -> Result<(), InventoryError> {
        for _ in 0..CAS_ATTEMPTS * 2 {
            let items: Vec<InventoryItem> = self
                .db
                .select(&format!("/rest/v1/inventory?id=eq.{}&limit=1", inventory_id))
                .await?;
            let item = items.into_iter().next().ok_or(InventoryError::NotFound)?;

            let updated: Vec<InventoryItem> = self
                .db
                .update_where(
                    &format!(
                        "/rest/v1/inventory?id=eq.{}&quantity=eq.{}",
                        inventory_id, item.quantity
                    ),
                    json!({ "quantity": item.quantity + amount }),
                )
                .await?;

            if !updated.is_empty() {
                return Ok(());
            }
        }

        Err(InventoryError::StockContention {
            name: inventory_id.to_string(),
        })
    }
}
