//! Validation capability used to gate repository writes.
//!
//! A [`Validator`] maps a create/update mode to a [`Schema`] and checks a
//! payload against it. Any `Fn(bool) -> Schema` closure is a validator:
//!
//! ```ignore
//! let repository = Repository::new(&models, "User")?
//!     .with_validator(|create_mode: bool| {
//!         let schema = Schema::new().optional("bio", FieldKind::String);
//!         if create_mode {
//!             schema.required("email", FieldKind::String)
//!         } else {
//!             schema.optional("email", FieldKind::String)
//!         }
//!     })
//!     .with_auto_validation(true);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::FieldError;
use crate::models::Payload;

/// JSON type a field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Any,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
            FieldKind::Any => "any",
        }
    }

    fn accepts(&self, value: &JsonValue) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Array => value.is_array(),
            FieldKind::Object => value.is_object(),
            FieldKind::Any => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub kind: FieldKind,
    pub required: bool,
    pub nullable: bool,
}

/// Ordered set of field rules for one validation mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<(String, FieldRule)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.rule(
            name,
            FieldRule {
                kind,
                required: true,
                nullable: false,
            },
        )
    }

    pub fn optional(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.rule(
            name,
            FieldRule {
                kind,
                required: false,
                nullable: true,
            },
        )
    }

    /// Adds a rule, replacing any rule for the same field.
    pub fn rule(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, existing)) => *existing = rule,
            None => self.fields.push((name, rule)),
        }
        self
    }

    /// Field names the schema knows about, in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&FieldRule> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, rule)| rule)
    }

    /// Checks a payload: required fields, JSON types, and unknown keys.
    pub fn check(&self, payload: &Payload) -> Validation {
        let mut errors = Vec::new();

        for (name, rule) in &self.fields {
            match payload.get(name) {
                None if rule.required => errors.push(
                    FieldError::new(name.clone(), format!("\"{}\" is required", name))
                        .with_kind("required"),
                ),
                None => {}
                Some(JsonValue::Null) if rule.nullable => {}
                Some(value) if !rule.kind.accepts(value) => errors.push(
                    FieldError::new(
                        name.clone(),
                        format!("\"{}\" must be of type {}", name, rule.kind.as_str()),
                    )
                    .with_kind("type"),
                ),
                Some(_) => {}
            }
        }

        for key in payload.keys() {
            if self.get(key).is_none() {
                errors.push(
                    FieldError::new(key.clone(), format!("\"{}\" is not allowed", key))
                        .with_kind("unknown"),
                );
            }
        }

        let error = if errors.is_empty() {
            None
        } else {
            Some(ValidationFailure {
                message: errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join(". "),
                errors,
            })
        };

        Validation {
            error,
            value: payload.clone(),
        }
    }
}

/// Why a payload failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub message: String,
    pub errors: Vec<FieldError>,
}

/// Result of a validation: the failure, if any, and the validated value.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub error: Option<ValidationFailure>,
    pub value: Payload,
}

impl Validation {
    /// A passing validation of `value`.
    pub fn ok(value: Payload) -> Self {
        Self { error: None, value }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Validation-schema capability.
pub trait Validator: Send + Sync {
    /// Schema for creation (`true`) or update (`false`).
    fn schema(&self, create_mode: bool) -> Schema;

    fn validate(&self, payload: &Payload, schema: &Schema) -> Validation {
        schema.check(payload)
    }
}

impl<F> Validator for F
where
    F: Fn(bool) -> Schema + Send + Sync,
{
    fn schema(&self, create_mode: bool) -> Schema {
        self(create_mode)
    }
}
