//! Structural validation of tool argument bags.
//!
//! Each tool declares its input as a typed field list; the same declaration
//! validates what the model sends and renders the JSON capability form the
//! model sees, so the two can never drift.

use serde::Serialize;
use serde_json::{json, Map, Value};

/// One field-level schema violation, tagged with the offending path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    String,
    /// A string drawn from a fixed set of values.
    Enum(&'static [&'static str]),
    Object,
    Any,
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Filled into the argument bag when the field is absent.
    pub default: Option<Value>,
    pub description: &'static str,
}

impl FieldSpec {
    pub fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            description: "",
        }
    }

    pub fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            description: "",
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn describe(mut self, text: &'static str) -> Self {
        self.description = text;
        self
    }
}

#[derive(Debug, Clone)]
pub struct InputSchema {
    fields: Vec<FieldSpec>,
}

impl InputSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Validate an argument bag. Returns the bag with defaults filled, or
    /// every violation found, not just the first.
    pub fn validate(&self, input: &Value) -> Result<Value, Vec<Violation>> {
        let Some(object) = input.as_object() else {
            return Err(vec![Violation::new("$", "input must be an object")]);
        };

        let mut merged = object.clone();
        let mut violations = Vec::new();

        for field in &self.fields {
            let value = merged.get(field.name).filter(|v| !v.is_null()).cloned();
            match value {
                Some(value) => {
                    if let Err(violation) = check_kind(field, &value) {
                        violations.push(violation);
                    }
                }
                None => {
                    if let Some(ref default) = field.default {
                        merged.insert(field.name.to_string(), default.clone());
                    } else if field.required {
                        violations.push(Violation::new(field.name, "required field is missing"));
                    } else {
                        // normalize explicit nulls away
                        merged.remove(field.name);
                    }
                }
            }
        }

        if violations.is_empty() {
            Ok(Value::Object(merged))
        } else {
            Err(violations)
        }
    }

    /// JSON Schema form sent to the model as part of the capability list.
    pub fn to_wire(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in &self.fields {
            let mut property = match field.kind {
                FieldKind::String => json!({ "type": "string" }),
                FieldKind::Enum(values) => json!({ "type": "string", "enum": values }),
                FieldKind::Object => json!({ "type": "object" }),
                FieldKind::Any => json!({}),
            };
            if !field.description.is_empty() {
                property["description"] = json!(field.description);
            }
            properties.insert(field.name.to_string(), property);
            if field.required {
                required.push(field.name);
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

fn check_kind(field: &FieldSpec, value: &Value) -> Result<(), Violation> {
    match field.kind {
        FieldKind::String => {
            if !value.is_string() {
                return Err(Violation::new(field.name, "expected a string"));
            }
        }
        FieldKind::Enum(allowed) => {
            let Some(s) = value.as_str() else {
                return Err(Violation::new(field.name, "expected a string"));
            };
            if !allowed.contains(&s) {
                return Err(Violation::new(
                    field.name,
                    format!("must be one of: {}", allowed.join(", ")),
                ));
            }
        }
        FieldKind::Object => {
            if !value.is_object() {
                return Err(Violation::new(field.name, "expected an object"));
            }
        }
        FieldKind::Any => {}
    }
    Ok(())
}
