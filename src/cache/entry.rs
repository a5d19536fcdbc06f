//! Cache Entry Module
//!
//! A captured response (status, headers, body) and its stored JSON form.

use std::collections::BTreeMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::intercept::ResponseSink;

// == Header Field ==
/// A stored header: one value, or every value of a repeated header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderField {
    Single(String),
    Multi(Vec<String>),
}

impl HeaderField {
    pub fn values(&self) -> &[String] {
        match self {
            HeaderField::Single(value) => std::slice::from_ref(value),
            HeaderField::Multi(values) => values,
        }
    }
}

// == Cache Entry ==
/// Snapshot of a finished response, immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub status_code: u16,
    pub headers: BTreeMap<String, HeaderField>,
    pub body: String,
}

impl CacheEntry {
    /// Captures status, headers and body of a response about to be finalized.
    ///
    /// Header values that are not valid UTF-8 are left out.
    pub fn snapshot(status: StatusCode, headers: &HeaderMap, body: String) -> Self {
        let mut stored = BTreeMap::new();

        for name in headers.keys() {
            let mut values: Vec<String> = headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(str::to_string)
                .collect();

            let field = match values.len() {
                0 => continue,
                1 => HeaderField::Single(values.remove(0)),
                _ => HeaderField::Multi(values),
            };
            stored.insert(name.as_str().to_string(), field);
        }

        Self {
            status_code: status.as_u16(),
            headers: stored,
            body,
        }
    }

    // == Codec ==
    /// Encodes the entry as the single string value kept in the store.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a stored value, rejecting status codes outside 100..=999.
    pub fn decode(raw: &str) -> Result<Self> {
        let entry: CacheEntry = serde_json::from_str(raw)?;
        if StatusCode::from_u16(entry.status_code).is_err() {
            let err = <serde_json::Error as serde::de::Error>::custom(format!(
                "invalid stored status code {}",
                entry.status_code
            ));
            return Err(err.into());
        }
        Ok(entry)
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK)
    }

    // == Replay ==
    /// Writes status, then headers, then finalizes `sink` with the stored body.
    pub async fn replay(&self, sink: &mut dyn ResponseSink) -> Result<()> {
        sink.set_status(self.status());

        let headers = sink.headers_mut();
        for (name, field) in &self.headers {
            let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
                continue;
            };
            headers.remove(&name);
            for value in field.values() {
                if let Ok(value) = HeaderValue::from_str(value) {
                    headers.append(name.clone(), value);
                }
            }
        }

        sink.finalize(Some(Bytes::from(self.body.clone()))).await
    }
}
