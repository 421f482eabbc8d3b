use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::PostgrestClient;

use crate::models::{
    CreateDiagnosisRequest, Diagnosis, DiagnosisError, DiagnosisListQuery, UpdateDiagnosisRequest,
};

const PAGE_SIZE: u32 = 20;

pub struct DiagnosisService {
    db: PostgrestClient,
}

impl DiagnosisService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub async fn create(
        &self,
        request: CreateDiagnosisRequest,
        doctor_id: Uuid,
    ) -> Result<Diagnosis, DiagnosisError> {
        if request.complaint.trim().is_empty()
            || request.diagnosis.trim().is_empty()
            || request.treatment.trim().is_empty()
        {
            return Err(DiagnosisError::Validation(
                "Complaint, diagnosis and treatment are required".to_string(),
            ));
        }

        let patients: Vec<Value> = self
            .db
            .select(&format!(
                "/rest/v1/patients?id=eq.{}&select=id&limit=1",
                request.patient_id
            ))
            .await?;
        if patients.is_empty() {
            return Err(DiagnosisError::PatientNotFound);
        }

        let body = json!({
            "patient_id": request.patient_id,
            "doctor_id": doctor_id,
            "complaint": request.complaint.trim(),
            "diagnosis": request.diagnosis.trim(),
            "weight_kg": request.weight_kg,
            "height_cm": request.height_cm,
            "spirometry": request.spirometry.trim(),
            "irt": request.irt.trim(),
            "sweat_test": request.sweat_test.trim(),
            "genetic_test": request.genetic_test.trim(),
            "treatment": request.treatment.trim(),
            "drug_ids": request.drug_ids,
            "notes": request.notes.trim(),
        });

        let rows: Vec<Diagnosis> = self.db.insert_returning("/rest/v1/diagnoses", body).await?;
        let diagnosis = rows
            .into_iter()
            .next()
            .ok_or_else(|| DiagnosisError::Internal("diagnosis insert returned no rows".to_string()))?;

        debug!(
            "Recorded diagnosis {} for patient {}",
            diagnosis.id, request.patient_id
        );
        Ok(diagnosis)
    }

    pub async fn get(&self, id: Uuid) -> Result<Diagnosis, DiagnosisError> {
        let rows: Vec<Diagnosis> = self
            .db
            .select(&format!("/rest/v1/diagnoses?id=eq.{}&limit=1", id))
            .await?;
        rows.into_iter().next().ok_or(DiagnosisError::NotFound)
    }

    /// Admin listing; the search term matches patients (name, PNFL or code)
    /// and narrows to their diagnoses.
    pub async fn list(&self, query: &DiagnosisListQuery) -> Result<Vec<Diagnosis>, DiagnosisError> {
        let mut parts = Vec::new();

        if let Some(search) = query.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                let patients: Vec<Value> = self
                    .db
                    .select(&format!(
                        "/rest/v1/patients?or=(name.ilike.*{s}*,child_pnfl.ilike.*{s}*,patient_code.ilike.*{s}*)&select=id",
                        s = search
                    ))
                    .await?;

                let ids: Vec<String> = patients
                    .iter()
                    .filter_map(|row| row.get("id").and_then(Value::as_str))
                    .map(String::from)
                    .collect();

                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                parts.push(format!("patient_id=in.({})", ids.join(",")));
            }
        }

        let page = query.page.unwrap_or(1).max(1);
        parts.push("order=created_at.desc".to_string());
        parts.push(format!("limit={}", PAGE_SIZE));
        parts.push(format!("offset={}", (page - 1) * PAGE_SIZE));

        let rows: Vec<Diagnosis> = self
            .db
            .select(&format!("/rest/v1/diagnoses?{}", parts.join("&")))
            .await?;
        Ok(rows)
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateDiagnosisRequest,
    ) -> Result<Diagnosis, DiagnosisError> {
        let mut changes = Map::new();

        if let Some(complaint) = request.complaint.as_deref() {
            changes.insert("complaint".to_string(), json!(complaint.trim()));
        }
        if let Some(diagnosis) = request.diagnosis.as_deref() {
            changes.insert("diagnosis".to_string(), json!(diagnosis.trim()));
        }
        if let Some(weight_kg) = request.weight_kg {
            changes.insert("weight_kg".to_string(), json!(weight_kg));
        }
        if let Some(height_cm) = request.height_cm {
            changes.insert("height_cm".to_string(), json!(height_cm));
        }
        if let Some(spirometry) = request.spirometry.as_deref() {
            changes.insert("spirometry".to_string(), json!(spirometry.trim()));
        }
        if let Some(irt) = request.irt.as_deref() {
            changes.insert("irt".to_string(), json!(irt.trim()));
        }
        if let Some(sweat_test) = request.sweat_test.as_deref() {
            changes.insert("sweat_test".to_string(), json!(sweat_test.trim()));
        }
        if let Some(genetic_test) = request.genetic_test.as_deref() {
            changes.insert("genetic_test".to_string(), json!(genetic_test.trim()));
        }
        if let Some(treatment) = request.treatment.as_deref() {
            changes.insert("treatment".to_string(), json!(treatment.trim()));
        }
        if let Some(drug_ids) = request.drug_ids {
            changes.insert("drug_ids".to_string(), json!(drug_ids));
        }
        if let Some(notes) = request.notes.as_deref() {
            changes.insert("notes".to_string(), json!(notes.trim()));
        }

        if changes.is_empty() {
            return Err(DiagnosisError::Validation("Nothing to update".to_string()));
        }

        let rows: Vec<Diagnosis> = self
            .db
            .update_where(
                &format!("/rest/v1/diagnoses?id=eq.{}", id),
                Value::Object(changes),
            )
            .await?;
        rows.into_iter().next().ok_or(DiagnosisError::NotFound)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DiagnosisError> {
        // A missing id is a 404, not a silent no-op delete.
        self.get(id).await?;
        self.db
            .delete_where(&format!("/rest/v1/diagnoses?id=eq.{}", id))
            .await?;
        Ok(())
    }
}
