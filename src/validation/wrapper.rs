//! Request and response validation against a route's schema set.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::validation::schema::{Coercion, Schema, SchemaIssue};

/// Schemas declared for one route. Each part is checked only when present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteSchemas {
    pub params: Option<Schema>,
    pub query: Option<Schema>,
    pub body: Option<Schema>,
    pub response: Option<Schema>,
}

impl RouteSchemas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(mut self, schema: impl Into<Schema>) -> Self {
        self.params = Some(schema.into());
        self
    }

    pub fn with_query(mut self, schema: impl Into<Schema>) -> Self {
        self.query = Some(schema.into());
        self
    }

    pub fn with_body(mut self, schema: impl Into<Schema>) -> Self {
        self.body = Some(schema.into());
        self
    }

    pub fn with_response(mut self, schema: impl Into<Schema>) -> Self {
        self.response = Some(schema.into());
        self
    }

    /// True when at least one request part is checked.
    pub fn validates_request(&self) -> bool {
        self.params.is_some() || self.query.is_some() || self.body.is_some()
    }
}

/// The three request parts as JSON values.
///
/// `params` and `query` are objects of strings (a repeated query key becomes
/// an array). `body` is `Null` when the request carried none.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestInput {
    pub params: Value,
    pub query: Value,
    pub body: Value,
}

impl Default for RequestInput {
    fn default() -> Self {
        Self {
            params: Value::Object(Default::default()),
            query: Value::Object(Default::default()),
            body: Value::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Params,
    Query,
    Body,
    Response,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Params => "params",
            Location::Query => "query",
            Location::Body => "body",
            Location::Response => "response",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub location: Location,
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(location: Location, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location,
            path: path.into(),
            message: message.into(),
        }
    }

    fn from_schema(location: Location, issue: SchemaIssue) -> Self {
        Self::new(location, issue.path, issue.message)
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}: {}", self.location.as_str(), self.message)
        } else {
            write!(f, "{}.{}: {}", self.location.as_str(), self.path, self.message)
        }
    }
}

/// Rejected request input. Rendered as a 400 listing every issue.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("validation failed with {} issue(s)", issues.len())]
pub struct ValidationFailure {
    pub issues: Vec<ValidationIssue>,
}

impl IntoResponse for ValidationFailure {
    fn into_response(self) -> Response {
        let body = json!({
            "error": "Validation failed",
            "issues": self.issues,
        });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

fn check(
    schema: Option<&Schema>,
    value: &Value,
    coercion: Coercion,
    location: Location,
    issues: &mut Vec<ValidationIssue>,
) -> Value {
    let Some(schema) = schema else {
        return value.clone();
    };
    match schema.parse(value, coercion) {
        Ok(parsed) => parsed,
        Err(found) => {
            issues.extend(
                found
                    .into_iter()
                    .map(|issue| ValidationIssue::from_schema(location, issue)),
            );
            value.clone()
        }
    }
}

/// Parse params, query and body, collecting every issue across the three.
///
/// Parts without a schema are passed through unchanged.
pub fn validate_request(
    schemas: &RouteSchemas,
    input: &RequestInput,
) -> Result<RequestInput, ValidationFailure> {
    let mut issues = Vec::new();
    let params = check(
        schemas.params.as_ref(),
        &input.params,
        Coercion::FromStrings,
        Location::Params,
        &mut issues,
    );
    let query = check(
        schemas.query.as_ref(),
        &input.query,
        Coercion::FromStrings,
        Location::Query,
        &mut issues,
    );
    let body = check(
        schemas.body.as_ref(),
        &input.body,
        Coercion::Strict,
        Location::Body,
        &mut issues,
    );

    if issues.is_empty() {
        Ok(RequestInput {
            params,
            query,
            body,
        })
    } else {
        Err(ValidationFailure { issues })
    }
}

/// Check a handler's return value against the response schema.
///
/// Returns the value to serialize: parsed through the schema when one is
/// declared, otherwise the value itself.
pub fn validate_response(
    schemas: &RouteSchemas,
    value: Value,
) -> Result<Value, Vec<ValidationIssue>> {
    let Some(schema) = schemas.response.as_ref() else {
        return Ok(value);
    };
    schema.parse(&value, Coercion::Strict).map_err(|issues| {
        issues
            .into_iter()
            .map(|issue| ValidationIssue::from_schema(Location::Response, issue))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{FieldSchema, ObjectSchema};
    use serde_json::json;

    fn schemas() -> RouteSchemas {
        RouteSchemas::new()
            .with_params(ObjectSchema::new().field("id", FieldSchema::integer().required()))
            .with_query(ObjectSchema::new().field("verbose", FieldSchema::boolean()))
            .with_body(
                ObjectSchema::new()
                    .field("email", FieldSchema::string().required())
                    .field("age", FieldSchema::integer()),
            )
    }

    #[test]
    fn test_valid_request_is_parsed() {
        let input = RequestInput {
            params: json!({"id": "7"}),
            query: json!({"verbose": "true"}),
            body: json!({"email": "a@b.c"}),
        };
        let parsed = validate_request(&schemas(), &input).unwrap();
        assert_eq!(parsed.params, json!({"id": 7}));
        assert_eq!(parsed.query, json!({"verbose": true}));
        assert_eq!(parsed.body, json!({"email": "a@b.c"}));
    }

    #[test]
    fn test_issues_collected_from_every_part() {
        let input = RequestInput {
            params: json!({"id": "abc"}),
            query: json!({"verbose": "maybe"}),
            body: json!({"age": "old"}),
        };
        let failure = validate_request(&schemas(), &input).unwrap_err();
        let locations: Vec<Location> = failure.issues.iter().map(|i| i.location).collect();
        assert_eq!(
            locations,
            vec![Location::Params, Location::Query, Location::Body, Location::Body]
        );
    }

    #[test]
    fn test_parts_without_schema_pass_through() {
        let input = RequestInput {
            params: json!({"anything": "goes"}),
            ..Default::default()
        };
        let parsed = validate_request(&RouteSchemas::new(), &input).unwrap();
        assert_eq!(parsed, input);
    }

    #[test]
    fn test_failure_response_shape() {
        let failure = ValidationFailure {
            issues: vec![ValidationIssue::new(Location::Body, "email", "required")],
        };
        let json = serde_json::to_value(&failure.issues).unwrap();
        assert_eq!(
            json,
            json!([{"location": "body", "path": "email", "message": "required"}])
        );
        assert_eq!(failure.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_response_contract() {
        let schemas = RouteSchemas::new().with_response(
            ObjectSchema::new().field("id", FieldSchema::integer().required()),
        );
        assert_eq!(
            validate_response(&schemas, json!({"id": 1, "secret": "x"})).unwrap(),
            json!({"id": 1})
        );
        let issues = validate_response(&schemas, json!({"id": "1"})).unwrap_err();
        assert_eq!(issues[0].location, Location::Response);
        assert_eq!(issues[0].to_string(), "response.id: expected integer, received string");
    }
}
