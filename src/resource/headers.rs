//! # Header Processing
//!
//! Gateway headers in, gateway headers out:
//! - `X-Consumer-Id` is echoed on the response
//! - a caller in an unrestricted group gets `X-Bypass-Rate-Limit: ALL`
//! - on license-gated collections, callers outside the privileged groups
//!   only see documents carrying the permissive license
//!
//! The license criteria are merged after every operator, so no request
//! parameter can widen them.

use std::collections::BTreeSet;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use super::errors::ResourceError;
use crate::document::Document;

pub const CONSUMER_ID: &str = "x-consumer-id";
pub const AUTHENTICATED_GROUPS: &str = "x-authenticated-groups";
pub const CONSUMER_GROUPS: &str = "x-consumer-groups";
pub const BYPASS_RATE_LIMIT: &str = "x-bypass-rate-limit";

/// Who is calling, as asserted by the gateway
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerIdentity {
    pub consumer_id: Option<String>,
    pub groups: BTreeSet<String>,
}

impl CallerIdentity {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let consumer_id = headers
            .get(CONSUMER_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from);

        let groups = [AUTHENTICATED_GROUPS, CONSUMER_GROUPS]
            .iter()
            .flat_map(|name| headers.get_all(*name).into_iter())
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(String::from)
            .collect();

        Self {
            consumer_id,
            groups,
        }
    }

    pub fn in_any(&self, groups: &BTreeSet<String>) -> bool {
        self.groups.iter().any(|g| groups.contains(g))
    }
}

/// License restriction of a collection
#[derive(Debug, Clone, PartialEq)]
pub struct LicensePolicy {
    /// Dotted path of the license field
    pub field: String,
    pub permissive_value: Value,
    /// Groups that see every license
    pub privileged_groups: BTreeSet<String>,
}

impl LicensePolicy {
    pub fn new(field: impl Into<String>, permissive_value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            permissive_value: permissive_value.into(),
            privileged_groups: BTreeSet::new(),
        }
    }

    pub fn with_privileged_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.privileged_groups = groups.into_iter().map(Into::into).collect();
        self
    }
}

/// Per-resource header handling
#[derive(Debug, Clone, Default)]
pub struct HeaderProcessor {
    unrestricted_groups: BTreeSet<String>,
    license: Option<LicensePolicy>,
}

impl HeaderProcessor {
    pub fn new<I, S>(unrestricted_groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unrestricted_groups: unrestricted_groups.into_iter().map(Into::into).collect(),
            license: None,
        }
    }

    pub fn with_license(mut self, policy: LicensePolicy) -> Self {
        self.license = Some(policy);
        self
    }

    pub fn identity(&self, headers: &HeaderMap) -> CallerIdentity {
        CallerIdentity::from_headers(headers)
    }

    /// Criteria that must restrict every read by this caller
    pub fn injected_criteria(&self, caller: &CallerIdentity) -> Option<Document> {
        let policy = self.license.as_ref()?;
        if caller.in_any(&policy.privileged_groups) {
            return None;
        }
        let mut criteria = Document::new();
        criteria.insert(policy.field.clone(), policy.permissive_value.clone());
        Some(criteria)
    }

    /// Headers to add to the response for this caller
    pub fn response_headers(&self, caller: &CallerIdentity) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(id) = &caller.consumer_id {
            if let Ok(value) = HeaderValue::from_str(id) {
                headers.insert(HeaderName::from_static(CONSUMER_ID), value);
            }
        }
        if caller.in_any(&self.unrestricted_groups) {
            headers.insert(
                HeaderName::from_static(BYPASS_RATE_LIMIT),
                HeaderValue::from_static("ALL"),
            );
        }
        headers
    }

    /// Turn a handler result into a response carrying the caller headers
    pub fn respond<T: IntoResponse>(
        &self,
        caller: &CallerIdentity,
        result: Result<T, ResourceError>,
    ) -> Response {
        let mut response = match result {
            Ok(body) => body.into_response(),
            Err(err) => err.into_response(),
        };
        response.headers_mut().extend(self.response_headers(caller));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_identity_from_headers() {
        let caller = CallerIdentity::from_headers(&headers(&[
            (CONSUMER_ID, "consumer-7"),
            (AUTHENTICATED_GROUPS, "staff, beta"),
            (CONSUMER_GROUPS, "partners"),
        ]));
        assert_eq!(caller.consumer_id.as_deref(), Some("consumer-7"));
        assert_eq!(
            caller.groups.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["beta", "partners", "staff"]
        );
    }

    #[test]
    fn test_bypass_header_for_unrestricted_group() {
        let processor = HeaderProcessor::new(["staff"]);
        let caller = CallerIdentity::from_headers(&headers(&[
            (CONSUMER_ID, "c-1"),
            (CONSUMER_GROUPS, "staff"),
        ]));
        let out = processor.response_headers(&caller);
        assert_eq!(out.get(BYPASS_RATE_LIMIT).unwrap(), "ALL");
        assert_eq!(out.get(CONSUMER_ID).unwrap(), "c-1");

        let anonymous = CallerIdentity::default();
        assert!(processor.response_headers(&anonymous).is_empty());
    }

    #[test]
    fn test_license_injection() {
        let processor = HeaderProcessor::default().with_license(
            LicensePolicy::new("builder_meta.license", "BY-C").with_privileged_groups(["academic"]),
        );

        let public = CallerIdentity::default();
        assert_eq!(
            processor.injected_criteria(&public).map(Value::Object),
            Some(json!({"builder_meta.license": "BY-C"}))
        );

        let privileged = CallerIdentity::from_headers(&headers(&[(AUTHENTICATED_GROUPS, "academic")]));
        assert!(processor.injected_criteria(&privileged).is_none());

        assert!(HeaderProcessor::default().injected_criteria(&public).is_none());
    }
}
