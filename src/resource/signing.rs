//! # Object URL Signing
//!
//! Presigned download URLs for blobs referenced by collection documents.
//! The signature is SHA-256 over the secret and `bucket/key/expiry`,
//! URL-safe base64 encoded; the blob gateway verifies it with
//! [`ObjectSigner::verify`]. Key segments are percent-encoded in the URL
//! but signed as stored.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use url::Url;

/// Result type for URL verification
pub type SigningResult<T> = Result<T, SigningError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    #[error("Signed URL has expired")]
    Expired,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid object store base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// A presigned URL for one object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectUrlGrant {
    pub object_key: String,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues presigned URLs for one bucket
#[derive(Debug, Clone)]
pub struct ObjectSigner {
    bucket: String,
    base_url: Url,
    secret: Vec<u8>,
    ttl: Duration,
}

impl ObjectSigner {
    pub fn new(
        bucket: impl Into<String>,
        base_url: &str,
        secret: &[u8],
        ttl: Duration,
    ) -> SigningResult<Self> {
        let invalid = |reason: String| SigningError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };
        let parsed = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(invalid("cannot carry a path".to_string()));
        }
        Ok(Self {
            bucket: bucket.into(),
            base_url: parsed,
            secret: secret.to_vec(),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Grant valid for the configured TTL from now
    pub fn grant(&self, object_key: &str) -> ObjectUrlGrant {
        self.grant_at(object_key, Utc::now())
    }

    pub fn grant_at(&self, object_key: &str, now: DateTime<Utc>) -> ObjectUrlGrant {
        let expires_at = now + self.ttl;
        let expires_ts = expires_at.timestamp();
        let signature = self.sign(object_key, expires_ts);

        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(&self.bucket)
                .extend(object_key.split('/'));
        }
        url.query_pairs_mut()
            .append_pair("token", &signature)
            .append_pair("expires", &expires_ts.to_string());

        ObjectUrlGrant {
            object_key: object_key.to_string(),
            url: url.into(),
            // Whole seconds, matching the signed value
            expires_at: Utc
                .timestamp_opt(expires_ts, 0)
                .single()
                .unwrap_or(expires_at),
        }
    }

    /// Check a token presented for `object_key`
    pub fn verify(
        &self,
        object_key: &str,
        expires_ts: i64,
        token: &str,
        now: DateTime<Utc>,
    ) -> SigningResult<()> {
        if now.timestamp() > expires_ts {
            return Err(SigningError::Expired);
        }
        let expected = self.sign(object_key, expires_ts);
        if bool::from(expected.as_bytes().ct_eq(token.as_bytes())) {
            Ok(())
        } else {
            Err(SigningError::InvalidSignature)
        }
    }

    fn sign(&self, object_key: &str, expires_ts: i64) -> String {
        let message = format!("{}/{}/{}", self.bucket, object_key, expires_ts);
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update(message.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}
