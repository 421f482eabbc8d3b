use serde_json::{json, Map, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::PostgrestClient;

use crate::models::{CreateDrugRequest, DiagnosisError, Drug, UpdateDrugRequest};

pub struct DrugService {
    db: PostgrestClient,
}

impl DrugService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub async fn list(&self) -> Result<Vec<Drug>, DiagnosisError> {
        let drugs: Vec<Drug> = self.db.select("/rest/v1/drugs?order=name.asc").await?;
        Ok(drugs)
    }

    pub async fn for_age(&self, age: i32) -> Result<Vec<Drug>, DiagnosisError> {
        let drugs: Vec<Drug> = self
            .db
            .select(&format!(
                "/rest/v1/drugs?min_age=lte.{}&max_age=gte.{}&order=name.asc",
                age, age
            ))
            .await?;
        Ok(drugs)
    }

    pub async fn create(&self, request: CreateDrugRequest) -> Result<Drug, DiagnosisError> {
        let name = request.name.trim();
        if name.len() < 2 {
            return Err(DiagnosisError::Validation(
                "Drug name must be at least 2 characters".to_string(),
            ));
        }

        // Case-insensitive existence check; the unique index is the backstop.
        let existing: Vec<Drug> = self
            .db
            .select(&format!("/rest/v1/drugs?name=ilike.{}&limit=1", name))
            .await?;
        if !existing.is_empty() {
            return Err(DiagnosisError::DuplicateDrug);
        }

        let body = json!({
            "name": name,
            "min_age": request.min_age.unwrap_or(0),
            "max_age": request.max_age.unwrap_or(100),
            "description": request.description.trim(),
        });

        let result: Result<Vec<Drug>, _> = self.db.insert_returning("/rest/v1/drugs", body).await;
        match result {
            Ok(rows) => rows
                .into_iter()
                .next()
                .ok_or_else(|| DiagnosisError::Internal("drug insert returned no rows".to_string())),
            Err(e) if e.is_unique_violation() => Err(DiagnosisError::DuplicateDrug),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update(&self, id: Uuid, request: UpdateDrugRequest) -> Result<Drug, DiagnosisError> {
        let mut changes = Map::new();

        if let Some(name) = request.name.as_deref().map(str::trim) {
            if name.len() < 2 {
                return Err(DiagnosisError::Validation(
                    "Drug name must be at least 2 characters".to_string(),
                ));
            }
            changes.insert("name".to_string(), json!(name));
        }
        if let Some(min_age) = request.min_age {
            changes.insert("min_age".to_string(), json!(min_age));
        }
        if let Some(max_age) = request.max_age {
            changes.insert("max_age".to_string(), json!(max_age));
        }
        if let Some(description) = request.description.as_deref() {
            changes.insert("description".to_string(), json!(description.trim()));
        }

        if changes.is_empty() {
            return Err(DiagnosisError::Validation("Nothing to update".to_string()));
        }

        let result: Result<Vec<Drug>, _> = self
            .db
            .update_where(&format!("/rest/v1/drugs?id=eq.{}", id), Value::Object(changes))
            .await;

        match result {
            Ok(rows) => rows.into_iter().next().ok_or(DiagnosisError::DrugNotFound),
            Err(e) if e.is_unique_violation() => Err(DiagnosisError::DuplicateDrug),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DiagnosisError> {
        let existing: Vec<Drug> = self
            .db
            .select(&format!("/rest/v1/drugs?id=eq.{}&limit=1", id))
            .await?;
        if existing.is_empty() {
            return Err(DiagnosisError::DrugNotFound);
        }

        self.db
            .delete_where(&format!("/rest/v1/drugs?id=eq.{}", id))
            .await?;
        Ok(())
    }
}
