use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::PostgrestClient;

use crate::models::{CreatePatientRequest, Patient, PatientError, PatientListQuery, UpdatePatientRequest};
use crate::services::allocator::{parse_code, CodeAllocator};

const PAGE_SIZE: u32 = 20;

pub struct PatientService {
    db: PostgrestClient,
    allocator: CodeAllocator,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
            allocator: CodeAllocator::new(config),
        }
    }

    /// Register a new patient. The code is reserved through the allocator
    /// before the insert, so no two patients ever share one.
    pub async fn create(&self, request: CreatePatientRequest) -> Result<Patient, PatientError> {
        let pnfl = clean_pnfl(&request.child_pnfl)?;

        if self.find_by_pnfl(&pnfl).await?.is_some() {
            return Err(PatientError::DuplicatePnfl);
        }

        let patient_code = self.allocator.allocate().await?;
        debug!("Allocated code {} for PNFL {}", patient_code, pnfl);

        let body = json!({
            "patient_code": patient_code,
            "name": request.name.trim(),
            "card_number": request.card_number.trim(),
            "sex": request.sex,
            "region": request.region,
            "district": request.district.trim(),
            "birthday": request.birthday,
            "age": request.age,
            "related_marriage": request.related_marriage,
            "child_pnfl": pnfl,
            "mother_name": request.mother_name.trim(),
            "mother_id_number": strip_spaces(&request.mother_id_number),
            "mother_work_place": request.mother_work_place.trim(),
            "father_name": request.father_name.trim(),
            "father_id_number": strip_spaces(&request.father_id_number),
            "father_work_place": request.father_work_place.trim(),
            "full_address": request.full_address.trim(),
            "phone_number": request.phone_number.trim(),
            "second_number": request.second_number.trim(),
        });

        let result: Result<Vec<Patient>, _> =
            self.db.insert_returning("/rest/v1/patients", body).await;

        match result {
            Ok(rows) => rows
                .into_iter()
                .next()
                .ok_or_else(|| PatientError::Internal("patient insert returned no rows".to_string())),
            // The application-level check above races with concurrent
            // creations; the store's unique constraint is authoritative.
            Err(e) if e.is_unique_violation() => Err(PatientError::DuplicatePnfl),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_pnfl(&self, pnfl: &str) -> Result<Option<Patient>, PatientError> {
        let rows: Vec<Patient> = self
            .db
            .select(&format!("/rest/v1/patients?child_pnfl=eq.{}&limit=1", pnfl))
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Find one patient by PNFL or by patient code, as typed into the
    /// dashboard search box.
    pub async fn lookup(&self, query: &str) -> Result<Patient, PatientError> {
        let q = query.trim();

        let path = if is_pnfl(q) {
            format!("/rest/v1/patients?child_pnfl=eq.{}&limit=1", q)
        } else if parse_code(&q.to_uppercase()).is_some() {
            format!("/rest/v1/patients?patient_code=eq.{}&limit=1", q.to_uppercase())
        } else {
            return Err(PatientError::NotFound);
        };

        let rows: Vec<Patient> = self.db.select(&path).await?;
        rows.into_iter().next().ok_or(PatientError::NotFound)
    }

    pub async fn get(&self, id: Uuid) -> Result<Patient, PatientError> {
        let rows: Vec<Patient> = self
            .db
            .select(&format!("/rest/v1/patients?id=eq.{}&limit=1", id))
            .await?;
        rows.into_iter().next().ok_or(PatientError::NotFound)
    }

    pub async fn list(&self, query: &PatientListQuery) -> Result<Vec<Patient>, PatientError> {
        let mut parts = Vec::new();

        if let Some(search) = query.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                parts.push(format!(
                    "or=(name.ilike.*{s}*,child_pnfl.ilike.*{s}*,patient_code.ilike.*{s}*)",
                    s = search
                ));
            }
        }
        if let Some(region) = query.region.as_deref() {
            if !region.is_empty() {
                parts.push(format!("region=eq.{}", region));
            }
        }

        let page = query.page.unwrap_or(1).max(1);
        parts.push("order=patient_add_date.desc".to_string());
        parts.push(format!("limit={}", PAGE_SIZE));
        parts.push(format!("offset={}", (page - 1) * PAGE_SIZE));

        let path = format!("/rest/v1/patients?{}", parts.join("&"));
        let rows: Vec<Patient> = self.db.select(&path).await?;
        Ok(rows)
    }

    /// Patient profile: the record itself, the full diagnosis history in
    /// chronological order, and the most recent hand-outs.
    pub async fn profile(
        &self,
        id: Uuid,
    ) -> Result<(Patient, Vec<Value>, Vec<Value>), PatientError> {
        let patient = self.get(id).await?;

        let diagnoses: Vec<Value> = self
            .db
            .select(&format!(
                "/rest/v1/diagnoses?patient_id=eq.{}&order=created_at.asc",
                id
            ))
            .await?;

        let distributions: Vec<Value> = self
            .db
            .select(&format!(
                "/rest/v1/distributions?patient_id=eq.{}&order=created_at.desc&limit=10",
                id
            ))
            .await?;

        Ok((patient, diagnoses, distributions))
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdatePatientRequest,
    ) -> Result<Patient, PatientError> {
        let mut changes = Map::new();

        if let Some(pnfl) = request.child_pnfl.as_deref() {
            changes.insert("child_pnfl".to_string(), json!(clean_pnfl(pnfl)?));
        }
        if let Some(name) = request.name.as_deref() {
            changes.insert("name".to_string(), json!(name.trim()));
        }
        if let Some(card_number) = request.card_number.as_deref() {
            changes.insert("card_number".to_string(), json!(card_number.trim()));
        }
        if let Some(sex) = request.sex {
            changes.insert("sex".to_string(), json!(sex));
        }
        if let Some(region) = request.region {
            changes.insert("region".to_string(), json!(region));
        }
        if let Some(district) = request.district.as_deref() {
            changes.insert("district".to_string(), json!(district.trim()));
        }
        if let Some(birthday) = request.birthday {
            changes.insert("birthday".to_string(), json!(birthday));
        }
        if let Some(age) = request.age {
            changes.insert("age".to_string(), json!(age));
        }
        if let Some(related_marriage) = request.related_marriage {
            changes.insert("related_marriage".to_string(), json!(related_marriage));
        }
        if let Some(mother_name) = request.mother_name.as_deref() {
            changes.insert("mother_name".to_string(), json!(mother_name.trim()));
        }
        if let Some(mother_id) = request.mother_id_number.as_deref() {
            changes.insert("mother_id_number".to_string(), json!(strip_spaces(mother_id)));
        }
        if let Some(mother_work) = request.mother_work_place.as_deref() {
            changes.insert("mother_work_place".to_string(), json!(mother_work.trim()));
        }
        if let Some(father_name) = request.father_name.as_deref() {
            changes.insert("father_name".to_string(), json!(father_name.trim()));
        }
        if let Some(father_id) = request.father_id_number.as_deref() {
            changes.insert("father_id_number".to_string(), json!(strip_spaces(father_id)));
        }
        if let Some(father_work) = request.father_work_place.as_deref() {
            changes.insert("father_work_place".to_string(), json!(father_work.trim()));
        }
        if let Some(full_address) = request.full_address.as_deref() {
            changes.insert("full_address".to_string(), json!(full_address.trim()));
        }
        if let Some(phone_number) = request.phone_number.as_deref() {
            changes.insert("phone_number".to_string(), json!(phone_number.trim()));
        }
        if let Some(second_number) = request.second_number.as_deref() {
            changes.insert("second_number".to_string(), json!(second_number.trim()));
        }

        if changes.is_empty() {
            return Err(PatientError::Validation("Nothing to update".to_string()));
        }

        let result: Result<Vec<Patient>, _> = self
            .db
            .update_where(
                &format!("/rest/v1/patients?id=eq.{}", id),
                Value::Object(changes),
            )
            .await;

        match result {
            Ok(rows) => rows.into_iter().next().ok_or(PatientError::NotFound),
            Err(e) if e.is_unique_violation() => Err(PatientError::DuplicatePnfl),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a patient and every diagnosis recorded for them. The patient
    /// code is retired with the record, never reissued.
    pub async fn delete(&self, id: Uuid) -> Result<Patient, PatientError> {
        let patient = self.get(id).await?;

        self.db
            .delete_where(&format!("/rest/v1/diagnoses?patient_id=eq.{}", id))
            .await?;
        self.db
            .delete_where(&format!("/rest/v1/patients?id=eq.{}", id))
            .await?;

        debug!("Deleted patient {} ({})", patient.patient_code, id);
        Ok(patient)
    }

    /// Patients this doctor has diagnosed at least once.
    pub async fn patients_of_doctor(
        &self,
        doctor_id: Uuid,
        page: u32,
    ) -> Result<Vec<Patient>, PatientError> {
        let rows: Vec<Value> = self
            .db
            .select(&format!(
                "/rest/v1/diagnoses?doctor_id=eq.{}&select=patient_id",
                doctor_id
            ))
            .await?;

        let mut ids: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get("patient_id").and_then(Value::as_str))
            .map(String::from)
            .collect();
        ids.sort();
        ids.dedup();

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let page = page.max(1);
        let path = format!(
            "/rest/v1/patients?id=in.({})&order=patient_add_date.desc&limit={}&offset={}",
            ids.join(","),
            PAGE_SIZE,
            (page - 1) * PAGE_SIZE
        );
        let patients: Vec<Patient> = self.db.select(&path).await?;
        Ok(patients)
    }
}

fn strip_spaces(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

fn clean_pnfl(pnfl: &str) -> Result<String, PatientError> {
    let cleaned = strip_spaces(pnfl);
    if cleaned.len() != 14 || !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return Err(PatientError::InvalidPnfl);
    }
    Ok(cleaned)
}

fn is_pnfl(value: &str) -> bool {
    value.len() == 14 && value.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pnfl_must_be_fourteen_digits() {
        assert_eq!(clean_pnfl("12345678901234").unwrap(), "12345678901234");
        assert_eq!(clean_pnfl("12345 67890 1234").unwrap(), "12345678901234");
        assert!(clean_pnfl("1234567890123").is_err());
        assert!(clean_pnfl("123456789012345").is_err());
        assert!(clean_pnfl("1234567890123a").is_err());
    }

    #[test]
    fn lookup_distinguishes_pnfl_from_codes() {
        assert!(is_pnfl("12345678901234"));
        assert!(!is_pnfl("M12"));
        assert!(!is_pnfl("123"));
    }
}
