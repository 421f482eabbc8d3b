use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::PostgrestClient;

use crate::models::{
    CreateInventoryRequest, InventoryError, InventoryItem, ItemKind, UpdateInventoryRequest,
};

pub struct InventoryService {
    db: PostgrestClient,
}

impl InventoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub async fn list(&self, kind: ItemKind) -> Result<Vec<InventoryItem>, InventoryError> {
        let items: Vec<InventoryItem> = self
            .db
            .select(&format!(
                "/rest/v1/inventory?kind=eq.{}&order=name.asc",
                kind.as_str()
            ))
            .await?;
        Ok(items)
    }

    pub async fn get(&self, id: Uuid) -> Result<InventoryItem, InventoryError> {
        let items: Vec<InventoryItem> = self
            .db
            .select(&format!("/rest/v1/inventory?id=eq.{}&limit=1", id))
            .await?;
        items.into_iter().next().ok_or(InventoryError::NotFound)
    }

    /// Add stock. Drug-linked items take their name from the catalog entry
    /// and, when no explicit bounds are given, its age range too.
    pub async fn create(
        &self,
        request: CreateInventoryRequest,
        added_by: Uuid,
    ) -> Result<InventoryItem, InventoryError> {
        if request.quantity < 0 {
            return Err(InventoryError::Validation(
                "Quantity cannot be negative".to_string(),
            ));
        }

        let mut name = request.name.as_deref().unwrap_or_default().trim().to_string();
        let mut min_age = request.min_age;
        let mut max_age = request.max_age;

        if request.kind == ItemKind::Drug {
            if let Some(drug_id) = request.drug_id {
                let drugs: Vec<Value> = self
                    .db
                    .select(&format!("/rest/v1/drugs?id=eq.{}&limit=1", drug_id))
                    .await?;
                if let Some(drug) = drugs.into_iter().next() {
                    if let Some(drug_name) = drug.get("name").and_then(Value::as_str) {
                        name = drug_name.to_string();
                    }
                    if min_age.is_none() && max_age.is_none() {
                        min_age = drug.get("min_age").and_then(Value::as_i64).map(|v| v as i32);
                        max_age = drug.get("max_age").and_then(Value::as_i64).map(|v| v as i32);
                    }
                }
            }
        }

        if name.is_empty() {
            return Err(InventoryError::Validation("Item name is required".to_string()));
        }

        let body = json!({
            "kind": request.kind,
            "name": name,
            "drug_id": if request.kind == ItemKind::Drug { request.drug_id } else { None },
            "quantity": request.quantity,
            "unit": request.unit.as_deref().map(str::trim).filter(|u| !u.is_empty()).unwrap_or("dona"),
            "expiry_date": request.expiry_date,
            "min_age": min_age.unwrap_or(0),
            "max_age": max_age.unwrap_or(100),
            "added_by": added_by,
        });

        let rows: Vec<InventoryItem> = self.db.insert_returning("/rest/v1/inventory", body).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| InventoryError::Internal("inventory insert returned no rows".to_string()))
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateInventoryRequest,
    ) -> Result<InventoryItem, InventoryError> {
        let mut changes = Map::new();

        if let Some(quantity) = request.quantity {
            if quantity < 0 {
                return Err(InventoryError::Validation(
                    "Quantity cannot be negative".to_string(),
                ));
            }
            changes.insert("quantity".to_string(), json!(quantity));
        }
        if let Some(unit) = request.unit.as_deref().map(str::trim) {
            if !unit.is_empty() {
                changes.insert("unit".to_string(), json!(unit));
            }
        }
        if let Some(expiry_date) = request.expiry_date {
            changes.insert("expiry_date".to_string(), json!(expiry_date));
        }
        if let Some(min_age) = request.min_age {
            changes.insert("min_age".to_string(), json!(min_age));
        }
        if let Some(max_age) = request.max_age {
            changes.insert("max_age".to_string(), json!(max_age));
        }

        if changes.is_empty() {
            return Err(InventoryError::Validation("Nothing to update".to_string()));
        }

        let rows: Vec<InventoryItem> = self
            .db
            .update_where(
                &format!("/rest/v1/inventory?id=eq.{}", id),
                Value::Object(changes),
            )
            .await?;
        rows.into_iter().next().ok_or(InventoryError::NotFound)
    }

    pub async fn delete(&self, id: Uuid) -> Result<InventoryItem, InventoryError> {
        let item = self.get(id).await?;
        self.db
            .delete_where(&format!("/rest/v1/inventory?id=eq.{}", id))
            .await?;
        debug!("Deleted inventory item {} ({})", item.name, id);
        Ok(item)
    }

    /// Items a given patient may receive: in stock, unexpired, age range
    /// covering the patient.
    pub async fn eligible_for_age(
        &self,
        kind: ItemKind,
        age: i32,
    ) -> Result<Vec<InventoryItem>, InventoryError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let path = format!(
            "/rest/v1/inventory?kind=eq.{}&quantity=gt.0&expiry_date=gt.{}&min_age=lte.{}&max_age=gte.{}&order=name.asc",
            kind.as_str(),
            now,
            age,
            age
        );
        let items: Vec<InventoryItem> = self.db.select(&path).await?;
        Ok(items)
    }
}
