use std::time::Duration;

use serde_json::json;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::PostgrestClient;

use crate::models::{Counter, PatientError};

const COUNTER_NAME: &str = "patient_code";
const MAX_ATTEMPTS: u32 = 5;
const BACKOFF_STEP_MS: u64 = 50;

/// Allocates the human-readable `M<N>` patient codes from a dedicated
/// counter row. The advance is a compare-and-swap: the PATCH is filtered on
/// the value we read, so of two concurrent allocators exactly one matches
/// and the loser retries against the new value. Codes are never reused,
/// even after a patient is deleted.
pub struct CodeAllocator {
    db: PostgrestClient,
}

impl CodeAllocator {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub async fn allocate(&self) -> Result<String, PatientError> {
        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                tokio::time::sleep(Duration::from_millis(
                    BACKOFF_STEP_MS * u64::from(attempt - 1),
                ))
                .await;
            }

            let counters: Vec<Counter> = self
                .db
                .select(&format!(
                    "/rest/v1/counters?name=eq.{}&limit=1",
                    COUNTER_NAME
                ))
                .await?;

            let Some(counter) = counters.into_iter().next() else {
                // Fresh store: seed the counter at zero. Losing the seed race
                // to a concurrent allocator just means another attempt.
                match self
                    .db
                    .insert_returning::<Vec<Counter>>(
                        "/rest/v1/counters",
                        json!({ "name": COUNTER_NAME, "value": 0 }),
                    )
                    .await
                {
                    Ok(_) => {}
                    Err(e) if e.is_unique_violation() => {}
                    Err(e) => return Err(e.into()),
                }
                continue;
            };

            let next = counter.value + 1;
            let claimed: Vec<Counter> = self
                .db
                .update_where(
                    &format!(
                        "/rest/v1/counters?name=eq.{}&value=eq.{}",
                        COUNTER_NAME, counter.value
                    ),
                    json!({ "value": next }),
                )
                .await?;

            if !claimed.is_empty() {
                return Ok(format_code(next));
            }

            debug!(
                "patient code CAS lost at value {} (attempt {}), retrying",
                counter.value, attempt
            );
        }

        Err(PatientError::AllocationFailed)
    }
}

pub fn format_code(n: i64) -> String {
    format!("M{}", n)
}

/// Inverse of `format_code`; ordering of codes is by this integer, not by
/// the string.
pub fn parse_code(code: &str) -> Option<i64> {
    code.strip_prefix('M')?.parse().ok()
}
