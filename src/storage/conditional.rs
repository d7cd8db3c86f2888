//! Evaluation of conditional request headers against stored objects.
//!
//! Precedence follows RFC 7232 section 6: `If-Match` wins over
//! `If-Unmodified-Since`, and `If-None-Match` wins over `If-Modified-Since`.

use super::ObjectHead;
use crate::utils::{bare_etag, parse_http_date};
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditional {
    pub etag_matches: Option<Vec<String>>,
    pub etag_does_not_match: Option<Vec<String>>,
    pub uploaded_before: Option<DateTime<Utc>>,
    pub uploaded_after: Option<DateTime<Utc>>,
}

impl Conditional {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            etag_matches: etag_list(headers, header::IF_MATCH),
            etag_does_not_match: etag_list(headers, header::IF_NONE_MATCH),
            uploaded_before: date(headers, header::IF_UNMODIFIED_SINCE),
            uploaded_after: date(headers, header::IF_MODIFIED_SINCE),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Whether the object passes every applicable condition.
    pub fn is_satisfied_by(&self, head: &ObjectHead) -> bool {
        // HTTP dates carry whole seconds only.
        let uploaded = head.uploaded.timestamp();

        if let Some(tags) = &self.etag_matches {
            if !any_tag_matches(tags, &head.etag) {
                return false;
            }
        } else if let Some(before) = self.uploaded_before {
            if uploaded > before.timestamp() {
                return false;
            }
        }

        if let Some(tags) = &self.etag_does_not_match {
            if any_tag_matches(tags, &head.etag) {
                return false;
            }
        } else if let Some(after) = self.uploaded_after {
            if uploaded <= after.timestamp() {
                return false;
            }
        }

        true
    }
}

fn any_tag_matches(tags: &[String], etag: &str) -> bool {
    tags.iter().any(|tag| tag == "*" || tag == bare_etag(etag))
}

fn etag_list(headers: &HeaderMap, name: header::HeaderName) -> Option<Vec<String>> {
    let tags: Vec<String> = headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(bare_etag)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect();

    (!tags.is_empty()).then_some(tags)
}

fn date(headers: &HeaderMap, name: header::HeaderName) -> Option<DateTime<Utc>> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_http_date)
}
