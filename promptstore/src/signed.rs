//! Short-lived signed URL issuance for artifact reads
//!
//! Tokens are an HMAC-style SHA-256 over `path:expiry:secret`. Verification
//! recomputes the digest, so the signer is stateless and URLs survive process
//! restarts as long as the secret does.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

/// Default URL lifetime
pub const DEFAULT_URL_TTL_SECS: i64 = 60;

/// Errors from signing or verifying access URLs
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("Signed URL expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },

    #[error("Signature mismatch for path {path}")]
    BadSignature { path: String },

    #[error("Malformed signed URL: {reason}")]
    Malformed { reason: String },
}

/// A signed, time-limited access URL for one artifact path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    pub url: String,
    pub path: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies signed artifact URLs
pub struct UrlSigner {
    base_url: String,
    secret: String,
    ttl: Duration,
}

impl UrlSigner {
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret: secret.into(),
            ttl: Duration::seconds(DEFAULT_URL_TTL_SECS),
        }
    }

    /// Override the default 60 second lifetime
    pub fn with_ttl_secs(mut self, secs: i64) -> Self {
        self.ttl = Duration::seconds(secs);
        self
    }

    fn digest(&self, path: &str, expires_at: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(path.as_bytes());
        hasher.update(b":");
        hasher.update(expires_at.to_string().as_bytes());
        hasher.update(b":");
        hasher.update(self.secret.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Sign an artifact path, producing a URL valid for the configured TTL
    pub fn sign(&self, path: &str) -> SignedUrl {
        self.sign_at(path, Utc::now())
    }

    /// Sign with an explicit issue time (tests pin the clock)
    pub fn sign_at(&self, path: &str, now: DateTime<Utc>) -> SignedUrl {
        let expires_at = now + self.ttl;
        let token = self.digest(path, expires_at.timestamp());
        let url = format!(
            "{}/{}?expires={}&token={}",
            self.base_url,
            path,
            expires_at.timestamp(),
            token
        );
        debug!(%path, expires = %expires_at, "Signed artifact URL");
        SignedUrl {
            url,
            path: path.to_string(),
            expires_at,
        }
    }

    /// Verify a path + query-parameter pair produced by [`UrlSigner::sign`]
    pub fn verify(&self, path: &str, expires: i64, token: &str) -> Result<(), SignerError> {
        self.verify_at(path, expires, token, Utc::now())
    }

    /// Verify against an explicit clock
    pub fn verify_at(
        &self,
        path: &str,
        expires: i64,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SignerError> {
        let expected = self.digest(path, expires);
        if expected != token {
            return Err(SignerError::BadSignature {
                path: path.to_string(),
            });
        }
        let expired_at = DateTime::from_timestamp(expires, 0).ok_or(SignerError::Malformed {
            reason: format!("invalid expiry timestamp {}", expires),
        })?;
        if now > expired_at {
            return Err(SignerError::Expired { expired_at });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> UrlSigner {
        UrlSigner::new("http://localhost:8700/artifacts", "test-secret")
    }

    #[test]
    fn test_sign_embeds_path_and_expiry() {
        let now = Utc::now();
        let signed = signer().sign_at("clo_v3/user-1/abc.txt", now);

        assert!(signed.url.starts_with("http://localhost:8700/artifacts/clo_v3/user-1/abc.txt?"));
        assert_eq!(signed.expires_at, now + Duration::seconds(60));
    }

    #[test]
    fn test_round_trip_verifies() {
        let s = signer();
        let now = Utc::now();
        let signed = s.sign_at("clo_v3/user-1/abc.txt", now);

        let token = signed.url.split("token=").nth(1).unwrap();
        s.verify_at("clo_v3/user-1/abc.txt", signed.expires_at.timestamp(), token, now)
            .unwrap();
    }

    #[test]
    fn test_expired_url_rejected() {
        let s = signer();
        let issued = Utc::now();
        let signed = s.sign_at("a/b/c.txt", issued);
        let token = signed.url.split("token=").nth(1).unwrap();

        let later = issued + Duration::seconds(120);
        let err = s
            .verify_at("a/b/c.txt", signed.expires_at.timestamp(), token, later)
            .unwrap_err();
        assert!(matches!(err, SignerError::Expired { .. }));
    }

    #[test]
    fn test_tampered_path_rejected() {
        let s = signer();
        let now = Utc::now();
        let signed = s.sign_at("a/b/c.txt", now);
        let token = signed.url.split("token=").nth(1).unwrap();

        let err = s
            .verify_at("a/b/other.txt", signed.expires_at.timestamp(), token, now)
            .unwrap_err();
        assert!(matches!(err, SignerError::BadSignature { .. }));
    }

    #[test]
    fn test_two_signs_same_path_same_expiry_agree() {
        let s = signer();
        let now = Utc::now();
        assert_eq!(s.sign_at("a/b/c.txt", now), s.sign_at("a/b/c.txt", now));
    }
}
