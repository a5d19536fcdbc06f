//! Request Context
//!
//! The parts of an inbound request the cache needs: path, query, route
//! parameters and headers.

use std::collections::BTreeMap;

use axum::{
    extract::{FromRequestParts, Query, RawPathParams},
    http::{request::Parts, HeaderMap, HeaderName, HeaderValue},
};
use serde_json::{Map, Value};

/// Request-scoped view used for tag derivation and error reporting.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    path: String,
    query: Vec<(String, String)>,
    params: BTreeMap<String, String>,
    headers: HeaderMap,
}

impl RequestContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Extracts the context from request parts.
    ///
    /// Route parameters are only present once the router has matched, so
    /// middleware should be installed with `route_layer`.
    pub async fn from_parts(parts: &mut Parts) -> Self {
        let query = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map(|Query(pairs)| pairs)
            .unwrap_or_default();

        let params = match RawPathParams::from_request_parts(parts, &()).await {
            Ok(raw) => raw
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            Err(_) => BTreeMap::new(),
        };

        Self {
            path: parts.uri.path().to_string(),
            query,
            params,
            headers: parts.headers.clone(),
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Route parameter captured by the router, e.g. `id` for `/items/:id`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// First value of a header, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Query parameters as a JSON object with sorted keys.
    ///
    /// Repeated parameters become arrays in arrival order. Empty string when
    /// the request has no query parameters.
    pub fn canonical_query(&self) -> String {
        if self.query.is_empty() {
            return String::new();
        }

        let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (name, value) in &self.query {
            grouped.entry(name).or_default().push(value);
        }

        let object: Map<String, Value> = grouped
            .into_iter()
            .map(|(name, mut values)| {
                let value = if values.len() == 1 {
                    Value::from(values.remove(0))
                } else {
                    Value::from(values)
                };
                (name.to_string(), value)
            })
            .collect();

        Value::Object(object).to_string()
    }
}
