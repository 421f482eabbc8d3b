use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, SecondsFormat, Utc};
use rand::{Rng, RngCore};
use serde_json::json;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::PostgrestClient;

use crate::models::{AuthError, OtpPurpose, OtpRecord, PendingRegistration, VerifiedOtp};

const OTP_TTL_MINUTES: i64 = 5;

/// Issues, verifies and supersedes the short-lived SMS codes that gate
/// registration and password reset. The six-digit code is what the user
/// types; the session token is the actual secret binding the browser flow
/// to the stored record.
pub struct OtpService {
    db: PostgrestClient,
}

impl OtpService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    /// Create and store a fresh code for `(phone, purpose)`, superseding any
    /// previous ones in that scope. Records for other phones or the other
    /// purpose are untouched.
    pub async fn issue(
        &self,
        phone: &str,
        purpose: OtpPurpose,
        pending: Option<PendingRegistration>,
    ) -> Result<(String, String), AuthError> {
        let code = generate_code();
        let session_token = generate_session_token();
        let expires_at = Utc::now() + Duration::minutes(OTP_TTL_MINUTES);

        self.db
            .delete_where(&format!(
                "/rest/v1/otp_codes?phone=eq.{}&purpose=eq.{}",
                phone,
                purpose.as_str()
            ))
            .await?;

        let _: Vec<OtpRecord> = self
            .db
            .insert_returning(
                "/rest/v1/otp_codes",
                json!({
                    "phone": phone,
                    "code": code,
                    "session_token": session_token,
                    "purpose": purpose.as_str(),
                    "pending": pending,
                    "expires_at": expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                }),
            )
            .await?;

        debug!("Issued {} code for {}", purpose.as_str(), phone);
        Ok((code, session_token))
    }

    /// A code is accepted only while phone, token, code and purpose all match
    /// one stored record that has not yet expired. The record is NOT deleted
    /// here: the caller consumes it after the dependent operation succeeds,
    /// so a failed user insert leaves the code usable for another attempt.
    pub async fn verify(
        &self,
        phone: &str,
        session_token: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<VerifiedOtp, AuthError> {
        let now = Utc::now();
        let path = format!(
            "/rest/v1/otp_codes?phone=eq.{}&session_token=eq.{}&code=eq.{}&purpose=eq.{}&expires_at=gt.{}&limit=1",
            phone,
            session_token,
            code,
            purpose.as_str(),
            now.to_rfc3339_opts(SecondsFormat::Secs, true)
        );

        let records: Vec<OtpRecord> = self.db.select(&path).await?;
        let record = records
            .into_iter()
            .next()
            .ok_or(AuthError::InvalidOrExpiredCode)?;

        if !record.is_usable_at(now) {
            return Err(AuthError::InvalidOrExpiredCode);
        }

        match (record.purpose, record.pending) {
            (OtpPurpose::Register, Some(pending)) => Ok(VerifiedOtp::Registration(pending)),
            (OtpPurpose::Register, None) => {
                debug!("Register OTP for {} has no staged payload", phone);
                Err(AuthError::InvalidOrExpiredCode)
            }
            (OtpPurpose::Reset, _) => Ok(VerifiedOtp::Reset),
        }
    }

    /// Single-use consumption: drop the record once the operation it gated
    /// has completed.
    pub async fn consume(&self, phone: &str, purpose: OtpPurpose) -> Result<(), AuthError> {
        self.db
            .delete_where(&format!(
                "/rest/v1/otp_codes?phone=eq.{}&purpose=eq.{}",
                phone,
                purpose.as_str()
            ))
            .await?;
        Ok(())
    }

    /// Reissue against an existing unexpired flow. The staged payload is
    /// carried forward; the previous code and token stop working.
    pub async fn resend(
        &self,
        phone: &str,
        session_token: &str,
    ) -> Result<(String, String, OtpPurpose), AuthError> {
        let now = Utc::now();
        let path = format!(
            "/rest/v1/otp_codes?phone=eq.{}&session_token=eq.{}&expires_at=gt.{}&limit=1",
            phone,
            session_token,
            now.to_rfc3339_opts(SecondsFormat::Secs, true)
        );

        let records: Vec<OtpRecord> = self.db.select(&path).await?;
        let prior = records.into_iter().next().ok_or(AuthError::SessionExpired)?;

        let purpose = prior.purpose;
        let (code, token) = self.issue(phone, purpose, prior.pending).await?;
        Ok((code, token, purpose))
    }

    /// Drop expired records. Expiry is already enforced on every read; this
    /// keeps the table from accumulating dead rows.
    pub async fn purge_expired(&self) -> Result<(), AuthError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        self.db
            .delete_where(&format!("/rest/v1/otp_codes?expires_at=lte.{}", now))
            .await?;
        Ok(())
    }
}

fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(!code.starts_with('0'));
        }
    }

    #[test]
    fn session_tokens_are_unique_and_opaque() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_ne!(a, b);
        // 32 bytes of entropy, base64url without padding.
        assert_eq!(a.len(), 43);
    }
}
