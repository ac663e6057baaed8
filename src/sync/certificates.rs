//! Certificate listing returned by the engine's `GET /pki/certificates`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    #[serde(default)]
    pub issuer: String,

    pub not_before: DateTime<Utc>,

    pub not_after: DateTime<Utc>,

    #[serde(default)]
    pub days_remaining: i64,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub auto_renew: bool,
}

impl Certificate {
    /// Whole days from `now` until expiry, negative once expired.
    #[must_use]
    pub fn days_left(&self, now: DateTime<Utc>) -> i64 {
        (self.not_after - now).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_engine_listing() {
        let certs: Vec<Certificate> = serde_json::from_str(
            r#"[{
                "issuer": "Local CA",
                "notBefore": "2026-01-01T00:00:00Z",
                "notAfter": "2026-04-01T00:00:00Z",
                "daysRemaining": 12,
                "status": "valid",
                "autoRenew": true
            }]"#,
        )
        .unwrap();
        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].issuer, "Local CA");
        assert_eq!(certs[0].days_remaining, 12);
        assert!(certs[0].auto_renew);
    }

    #[test]
    fn days_left_goes_negative_after_expiry() {
        let cert: Certificate = serde_json::from_str(
            r#"{"notBefore": "2026-01-01T00:00:00Z", "notAfter": "2026-01-11T00:00:00Z"}"#,
        )
        .unwrap();
        let now: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        assert_eq!(cert.days_left(now), 10);
        let later: DateTime<Utc> = "2026-01-21T00:00:00Z".parse().unwrap();
        assert_eq!(cert.days_left(later), -10);
        assert_eq!(cert.status, "");
    }
}
