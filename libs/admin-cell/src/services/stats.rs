use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

use shared_config::AppConfig;
use shared_database::PostgrestClient;

use crate::models::{AdminError, DashboardStats, PatientDemographics};

pub struct StatsService {
    db: PostgrestClient,
}

impl StatsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub async fn dashboard(&self) -> Result<DashboardStats, AdminError> {
        Ok(DashboardStats {
            patients: self.count("/rest/v1/patients?select=id").await?,
            diagnoses: self.count("/rest/v1/diagnoses?select=id").await?,
            users: self.count("/rest/v1/users?select=id").await?,
            pending_users: self
                .count("/rest/v1/users?is_approved=eq.false&select=id")
                .await?,
            doctors: self.count("/rest/v1/users?role=eq.doctor&select=id").await?,
            drugs: self.count("/rest/v1/drugs?select=id").await?,
            inventory: self.count("/rest/v1/inventory?select=id").await?,
        })
    }

    /// Region / sex / consanguinity breakdown plus today's registrations,
    /// aggregated over the full register.
    pub async fn demographics(&self) -> Result<PatientDemographics, AdminError> {
        let rows: Vec<Value> = self
            .db
            .select("/rest/v1/patients?select=region,sex,related_marriage,patient_add_date")
            .await?;

        let mut region_stats: BTreeMap<String, u32> = BTreeMap::new();
        let mut male = 0;
        let mut female = 0;
        let mut consanguineous = 0;
        let mut non_consanguineous = 0;
        let mut registered_today = 0;

        let today = Utc::now().date_naive();

        for row in &rows {
            if let Some(region) = row.get("region").and_then(Value::as_str) {
                *region_stats.entry(region.to_string()).or_insert(0) += 1;
            }
            match row.get("sex").and_then(Value::as_str) {
                Some("male") => male += 1,
                Some("female") => female += 1,
                _ => {}
            }
            if row.get("related_marriage").and_then(Value::as_bool) == Some(true) {
                consanguineous += 1;
            } else {
                non_consanguineous += 1;
            }
            let added_today = row
                .get("patient_add_date")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<DateTime<Utc>>().ok())
                .is_some_and(|added| added.date_naive() == today);
            if added_today {
                registered_today += 1;
            }
        }

        Ok(PatientDemographics {
            region_stats,
            male,
            female,
            consanguineous,
            non_consanguineous,
            registered_today,
        })
    }

    async fn count(&self, path: &str) -> Result<usize, AdminError> {
        let rows: Vec<Value> = self.db.select(path).await?;
        Ok(rows.len())
    }
}
