//! Signed referral tokens handed out when a tracking link is resolved.
//!
//! Format: `base64url(json payload)` `.` `hex(HMAC-SHA256(payload part))`.
//! The token records when the click happened but does not expire by itself;
//! the attribution window is applied by whoever consumes it.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralClaims {
    pub affiliate_code: String,
    pub click_id: Option<i64>,
    /// Unix timestamp of the click, in seconds.
    pub timestamp: i64,
}

impl ReferralClaims {
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// Issues and verifies referral tokens with a server-side secret.
#[derive(Clone)]
pub struct ReferralTokenCodec {
    secret: String,
}

impl ReferralTokenCodec {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn sign(&self, payload: &str) -> Result<HmacSha256, AppError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|e| {
            AppError::internal("Invalid referral token key", json!({ "reason": e.to_string() }))
        })?;
        mac.update(payload.as_bytes());
        Ok(mac)
    }

    pub fn encode(&self, claims: &ReferralClaims) -> Result<String, AppError> {
        let raw = serde_json::to_vec(claims).map_err(|e| {
            AppError::internal("Failed to encode referral token", json!({ "reason": e.to_string() }))
        })?;
        let payload = URL_SAFE_NO_PAD.encode(raw);
        let signature = hex::encode(self.sign(&payload)?.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }

    /// Verifies the signature and returns the claims.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for malformed or tampered tokens.
    pub fn decode(&self, token: &str) -> Result<ReferralClaims, AppError> {
        let invalid = |reason: &str| {
            AppError::bad_request("Invalid referral token", json!({ "reason": reason }))
        };

        let (payload, signature) = token.split_once('.').ok_or_else(|| invalid("malformed"))?;
        let signature = hex::decode(signature).map_err(|_| invalid("malformed signature"))?;

        self.sign(payload)?
            .verify_slice(&signature)
            .map_err(|_| invalid("signature mismatch"))?;

        let raw = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| invalid("malformed payload"))?;

        serde_json::from_slice(&raw).map_err(|_| invalid("malformed payload"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> ReferralClaims {
        ReferralClaims {
            affiliate_code: "jane1234".to_string(),
            click_id: Some(42),
            timestamp: 1_760_000_000,
        }
    }

    #[test]
    fn test_encode_then_decode() {
        let codec = ReferralTokenCodec::new("secret");
        let token = codec.encode(&claims()).unwrap();

        assert_eq!(codec.decode(&token).unwrap(), claims());
    }

    #[test]
    fn test_rejects_other_secret() {
        let token = ReferralTokenCodec::new("secret").encode(&claims()).unwrap();
        let err = ReferralTokenCodec::new("other").decode(&token).unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_rejects_tampered_payload() {
        let codec = ReferralTokenCodec::new("secret");
        let token = codec.encode(&claims()).unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let forged_claims = ReferralClaims {
            affiliate_code: "mallory1".to_string(),
            ..claims()
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());

        assert!(codec.decode(&format!("{forged_payload}.{signature}")).is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        let codec = ReferralTokenCodec::new("secret");
        assert!(codec.decode("").is_err());
        assert!(codec.decode("no-dot-here").is_err());
        assert!(codec.decode("abc.zz").is_err());
    }

    #[test]
    fn test_issued_at() {
        let issued = claims().issued_at().unwrap();
        assert_eq!(issued.timestamp(), 1_760_000_000);
    }
}
