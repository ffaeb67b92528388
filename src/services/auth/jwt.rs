use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Claims read from a JWT payload without verifying its signature.
///
/// Only used to estimate expiry and for coarse UI gating. Authorization decisions stay with the
/// API server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub issued_at: Option<i64>,
    pub expires_at: i64,
}

#[derive(Deserialize)]
struct RawClaims {
    #[serde(rename = "userId")]
    user_id: Option<String>,
    sub: Option<String>,
    email: Option<String>,
    role: Option<String>,
    iat: Option<i64>,
    exp: i64,
}

impl Claims {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now.timestamp()
    }

    /// Remaining lifetime, `None` once expired.
    pub fn expires_in(&self, now: DateTime<Utc>) -> Option<Duration> {
        let remaining = self.expires_at.checked_sub(now.timestamp())?;
        u64::try_from(remaining)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

pub fn decode_claims(token: &str) -> Option<Claims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let raw = decode::<RawClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()?
        .claims;

    let user_id = raw.user_id.or(raw.sub)?;

    Some(Claims {
        user_id,
        email: raw.email,
        role: raw.role,
        issued_at: raw.iat,
        expires_at: raw.exp,
    })
}
