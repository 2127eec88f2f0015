//! Schema validation for route input and output.
//!
//! # Responsibilities
//! - Evaluate declared schemas against params, query and body
//! - Collect every issue before rejecting, so clients see all problems at once
//! - Check handler return values against the response schema
//!
//! # Design Decisions
//! - Params and query arrive as strings and are coerced to the declared
//!   scalar type; bodies and responses are matched strictly
//! - Parsed values are kept apart from the raw input so handlers can read both
//! - Failures render as a single 400 body; non-schema failures (an unreadable
//!   body stream) are not validation issues and go to the error path

pub mod schema;
pub mod wrapper;

pub use schema::{Coercion, FieldSchema, FieldType, ObjectSchema, Schema, SchemaIssue};
pub use wrapper::{
    validate_request, validate_response, Location, RequestInput, RouteSchemas, ValidationFailure,
    ValidationIssue,
};
