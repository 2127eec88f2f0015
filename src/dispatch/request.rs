//! The request as seen by middlewares and handlers.

use std::str::FromStr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::Query;
use axum::http::{Extensions, HeaderMap, Method, Request, Uri};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::dispatch::error::{DispatchError, HandlerError};
use crate::routing::matcher::PathParams;
use crate::routing::RouteInfo;
use crate::validation::{
    validate_request, Location, RequestInput, RouteSchemas, ValidationFailure, ValidationIssue,
};

/// A buffered request matched to a route.
///
/// `params()`, `query()` and `body()` return the validated values when the
/// route declares schemas, the raw values otherwise. `raw()` always returns
/// the input as received.
#[derive(Debug)]
pub struct DispatchRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub extensions: Extensions,
    route: Arc<RouteInfo>,
    request_id: String,
    bytes: Bytes,
    body_error: Option<String>,
    query_error: Option<String>,
    raw: RequestInput,
    input: RequestInput,
    validated: bool,
}

impl DispatchRequest {
    /// Buffer the body and split the request into its JSON parts.
    pub(crate) async fn from_http(
        request: Request<Body>,
        route: Arc<RouteInfo>,
        params: PathParams,
        request_id: String,
        body_limit: usize,
    ) -> Result<Self, DispatchError> {
        let (parts, body) = request.into_parts();
        let bytes = axum::body::to_bytes(body, body_limit)
            .await
            .map_err(|e| DispatchError::BodyRead(e.to_string()))?;

        let (body, body_error) = parse_body(&bytes);
        let (query, query_error) = parse_query(&parts.uri);
        if let Some(error) = &query_error {
            tracing::debug!(uri = %parts.uri, error = %error, "Malformed query string");
        }
        let raw = RequestInput {
            params: Value::Object(
                params
                    .into_iter()
                    .map(|(name, value)| (name, Value::String(value)))
                    .collect(),
            ),
            query,
            body,
        };

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            extensions: parts.extensions,
            route,
            request_id,
            bytes,
            body_error,
            query_error,
            input: raw.clone(),
            raw,
            validated: false,
        })
    }

    /// Replace the parsed input with the schema-checked one.
    pub(crate) fn validate(&mut self, schemas: &RouteSchemas) -> Result<(), ValidationFailure> {
        let result = validate_request(schemas, &self.raw);
        let parse_issues: Vec<ValidationIssue> = [
            (Location::Query, schemas.query.is_some(), &self.query_error, "invalid query string"),
            (Location::Body, schemas.body.is_some(), &self.body_error, "invalid JSON"),
        ]
        .into_iter()
        .filter(|(_, declared, _, _)| *declared)
        .filter_map(|(location, _, error, label)| {
            error
                .as_ref()
                .map(|e| ValidationIssue::new(location, "", format!("{}: {}", label, e)))
        })
        .collect();

        match result {
            Ok(input) if parse_issues.is_empty() => {
                self.input = input;
                self.validated = true;
                Ok(())
            }
            Ok(_) => Err(ValidationFailure {
                issues: parse_issues,
            }),
            Err(mut failure) => {
                // The schema only saw an empty value there; report the parse error instead.
                failure
                    .issues
                    .retain(|i| parse_issues.iter().all(|p| p.location != i.location));
                failure.issues.extend(parse_issues);
                Err(failure)
            }
        }
    }

    pub fn route(&self) -> &RouteInfo {
        &self.route
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    pub fn params(&self) -> &Value {
        &self.input.params
    }

    pub fn query(&self) -> &Value {
        &self.input.query
    }

    pub fn body(&self) -> &Value {
        &self.input.body
    }

    pub fn raw(&self) -> &RequestInput {
        &self.raw
    }

    /// The body exactly as received.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Raw value of a path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.raw.params.get(name).and_then(Value::as_str)
    }

    pub fn param_as<T: FromStr>(&self, name: &str) -> Result<T, HandlerError> {
        self.param(name)
            .and_then(|value| value.parse().ok())
            .ok_or_else(|| HandlerError::bad_request(format!("Invalid path parameter: {}", name)))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        if self.body_error.is_some() {
            return Err(HandlerError::bad_request("Invalid JSON body"));
        }
        serde_json::from_value(self.input.body.clone())
            .map_err(|e| HandlerError::bad_request(format!("Invalid request body: {}", e)))
    }

    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        if let Some(error) = &self.query_error {
            return Err(HandlerError::bad_request(format!("Invalid query string: {}", error)));
        }
        serde_json::from_value(self.input.query.clone())
            .map_err(|e| HandlerError::bad_request(format!("Invalid query string: {}", e)))
    }
}

fn parse_body(bytes: &Bytes) -> (Value, Option<String>) {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return (Value::Null, None);
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => (value, None),
        Err(e) => (Value::Null, Some(e.to_string())),
    }
}

/// Query pairs as a JSON object; a repeated key collects into an array.
///
/// A query that fails to decode yields an empty object and the error.
fn parse_query(uri: &Uri) -> (Value, Option<String>) {
    let pairs = match Query::<Vec<(String, String)>>::try_from_uri(uri) {
        Ok(Query(pairs)) => pairs,
        Err(e) => return (Value::Object(Map::new()), Some(e.to_string())),
    };

    let mut query = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match query.get_mut(&key) {
            None => {
                query.insert(key, value);
            }
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
    (Value::Object(query), None)
}
