//! Declarative schemas evaluated against untyped JSON input.
//!
//! A schema is a closed set of variants: objects of named fields, a single
//! typed field, or anything. Evaluation returns the parsed value (unknown
//! object keys dropped, strings coerced where allowed) or every issue found.

use serde::Serialize;
use serde_json::{Map, Number, Value};

/// How strictly scalar types are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// JSON types must match exactly (request bodies, responses).
    Strict,
    /// Strings are converted to the declared scalar type (path and query
    /// parameters, which always arrive as strings).
    FromStrings,
}

/// A single problem found while evaluating a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaIssue {
    /// Dotted path to the offending value; empty for the root.
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Array(Box<FieldSchema>),
    Object(ObjectSchema),
    Any,
}

impl FieldType {
    fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array(_) => "array",
            FieldType::Object(_) => "object",
            FieldType::Any => "any",
        }
    }
}

/// A typed field with optional constraints.
///
/// `min`/`max` bound the value for numbers and the length for strings and
/// arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub ty: FieldType,
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub one_of: Option<Vec<Value>>,
}

impl FieldSchema {
    pub fn new(ty: FieldType) -> Self {
        Self {
            ty,
            required: false,
            min: None,
            max: None,
            one_of: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn array(item: FieldSchema) -> Self {
        Self::new(FieldType::Array(Box::new(item)))
    }

    pub fn object(schema: ObjectSchema) -> Self {
        Self::new(FieldType::Object(schema))
    }

    pub fn any() -> Self {
        Self::new(FieldType::Any)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.one_of = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// Named fields of an object. Unknown keys are dropped unless `strict`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    pub fields: Vec<(String, FieldSchema)>,
    pub strict: bool,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        self.fields.push((name.into(), schema));
        self
    }

    /// Report unknown keys as issues instead of dropping them.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Object(ObjectSchema),
    Field(FieldSchema),
    Any,
}

impl From<ObjectSchema> for Schema {
    fn from(schema: ObjectSchema) -> Self {
        Schema::Object(schema)
    }
}

impl From<FieldSchema> for Schema {
    fn from(schema: FieldSchema) -> Self {
        Schema::Field(schema)
    }
}

impl Schema {
    pub fn parse(&self, input: &Value, coercion: Coercion) -> Result<Value, Vec<SchemaIssue>> {
        let mut parser = Parser {
            coercion,
            issues: Vec::new(),
        };
        let parsed = match self {
            Schema::Any => Some(input.clone()),
            Schema::Object(schema) => parser.object(schema, input, ""),
            Schema::Field(field) => {
                if input.is_null() && !field.required {
                    Some(Value::Null)
                } else {
                    parser.field(field, input, "")
                }
            }
        };

        match parsed {
            Some(value) if parser.issues.is_empty() => Ok(value),
            _ => Err(parser.issues),
        }
    }
}

struct Parser {
    coercion: Coercion,
    issues: Vec<SchemaIssue>,
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

impl Parser {
    fn issue(&mut self, path: &str, message: impl Into<String>) {
        self.issues.push(SchemaIssue {
            path: path.to_string(),
            message: message.into(),
        });
    }

    fn object(&mut self, schema: &ObjectSchema, input: &Value, path: &str) -> Option<Value> {
        let Some(map) = input.as_object() else {
            self.issue(path, format!("expected object, received {}", type_name(input)));
            return None;
        };

        let mut out = Map::new();
        for (name, field) in &schema.fields {
            let field_path = child_path(path, name);
            match map.get(name) {
                None | Some(Value::Null) => {
                    if field.required {
                        self.issue(&field_path, "required");
                    }
                }
                Some(value) => {
                    if let Some(parsed) = self.field(field, value, &field_path) {
                        out.insert(name.clone(), parsed);
                    }
                }
            }
        }

        if schema.strict {
            for key in map.keys() {
                if !schema.fields.iter().any(|(name, _)| name == key) {
                    self.issue(&child_path(path, key), "unrecognized key");
                }
            }
        }

        Some(Value::Object(out))
    }

    fn field(&mut self, field: &FieldSchema, value: &Value, path: &str) -> Option<Value> {
        let parsed = match &field.ty {
            FieldType::Any => Some(value.clone()),
            FieldType::String => self.string(field, value, path),
            FieldType::Integer => self.integer(value, path),
            FieldType::Number => self.number(value, path),
            FieldType::Boolean => self.boolean(value, path),
            FieldType::Array(item) => self.array(field, item, value, path),
            FieldType::Object(schema) => self.object(schema, value, path),
        }?;

        if let Some(n) = parsed.as_f64() {
            self.check_range(field, n, path, "");
        }

        if let Some(allowed) = &field.one_of {
            if !allowed.contains(&parsed) {
                let list: Vec<String> = allowed.iter().map(Value::to_string).collect();
                self.issue(path, format!("expected one of {}", list.join(", ")));
                return None;
            }
        }

        Some(parsed)
    }

    fn check_range(&mut self, field: &FieldSchema, n: f64, path: &str, what: &str) {
        if let Some(min) = field.min {
            if n < min {
                self.issue(path, format!("{}must be >= {}", what, min));
            }
        }
        if let Some(max) = field.max {
            if n > max {
                self.issue(path, format!("{}must be <= {}", what, max));
            }
        }
    }

    fn mismatch(&mut self, expected: &FieldType, value: &Value, path: &str) -> Option<Value> {
        self.issue(
            path,
            format!("expected {}, received {}", expected.name(), type_name(value)),
        );
        None
    }

    fn coerced_str<'v>(&self, value: &'v Value) -> Option<&'v str> {
        match self.coercion {
            Coercion::FromStrings => value.as_str(),
            Coercion::Strict => None,
        }
    }

    fn string(&mut self, field: &FieldSchema, value: &Value, path: &str) -> Option<Value> {
        let Some(s) = value.as_str() else {
            return self.mismatch(&FieldType::String, value, path);
        };
        self.check_range(field, s.chars().count() as f64, path, "length ");
        Some(value.clone())
    }

    fn integer(&mut self, value: &Value, path: &str) -> Option<Value> {
        if value.is_i64() || value.is_u64() {
            return Some(value.clone());
        }
        if let Some(n) = self.coerced_str(value).and_then(|s| s.trim().parse::<i64>().ok()) {
            return Some(Value::from(n));
        }
        self.mismatch(&FieldType::Integer, value, path)
    }

    fn number(&mut self, value: &Value, path: &str) -> Option<Value> {
        if value.is_number() {
            return Some(value.clone());
        }
        let coerced = self
            .coerced_str(value)
            .and_then(|s| s.trim().parse::<f64>().ok())
            .and_then(Number::from_f64);
        match coerced {
            Some(n) => Some(Value::Number(n)),
            None => self.mismatch(&FieldType::Number, value, path),
        }
    }

    fn boolean(&mut self, value: &Value, path: &str) -> Option<Value> {
        if value.is_boolean() {
            return Some(value.clone());
        }
        match self.coerced_str(value) {
            Some("true") | Some("1") => Some(Value::Bool(true)),
            Some("false") | Some("0") => Some(Value::Bool(false)),
            _ => self.mismatch(&FieldType::Boolean, value, path),
        }
    }

    fn array(
        &mut self,
        field: &FieldSchema,
        item: &FieldSchema,
        value: &Value,
        path: &str,
    ) -> Option<Value> {
        // A repeated query key arrives as an array, a single one as a string.
        let single;
        let items = match (value.as_array(), self.coerced_str(value)) {
            (Some(items), _) => items,
            (None, Some(_)) => {
                single = vec![value.clone()];
                &single
            }
            (None, None) => return self.mismatch(&field.ty, value, path),
        };

        self.check_range(field, items.len() as f64, path, "length ");
        let before = self.issues.len();
        let parsed: Vec<Value> = items
            .iter()
            .enumerate()
            .filter_map(|(i, v)| self.field(item, v, &format!("{}[{}]", path, i)))
            .collect();
        (self.issues.len() == before).then_some(Value::Array(parsed))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
