//! Schema checks for untrusted outbound request bodies
//!
//! Diagnostics are collected per field rather than failing on the first
//! problem, so a client gets every mistake in one round trip.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Field-level and form-level diagnostics for a rejected request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrors {
    /// Problems with the body as a whole
    pub form_errors: Vec<String>,
    /// Problems keyed by field path (`customer.number`)
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.form_errors.is_empty() && self.field_errors.is_empty()
    }

    /// Diagnostics recorded for one field path
    #[must_use]
    pub fn field(&self, path: &str) -> Option<&[String]> {
        self.field_errors.get(path).map(Vec::as_slice)
    }

    pub(crate) fn add_form(&mut self, message: impl Into<String>) {
        self.form_errors.push(message.into());
    }

    pub(crate) fn add_field(&mut self, path: &str, message: impl Into<String>) {
        self.field_errors
            .entry(path.to_string())
            .or_default()
            .push(message.into());
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.form_errors.clone();
        for (path, messages) in &self.field_errors {
            for message in messages {
                parts.push(format!("{path}: {message}"));
            }
        }
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Reads typed fields out of a JSON object, recording diagnostics as it goes
pub(crate) struct FieldReader<'a> {
    object: Option<&'a Map<String, Value>>,
    prefix: &'a str,
}

impl<'a> FieldReader<'a> {
    /// Reader over the top-level body; non-objects are a form error
    pub(crate) fn root(body: &'a Value, errors: &mut ValidationErrors) -> Self {
        let object = body.as_object();
        if object.is_none() {
            errors.add_form(format!("Expected object, received {}", type_name(body)));
        }
        Self { object, prefix: "" }
    }

    /// Reader over a required nested object; `None` if absent or mistyped
    pub(crate) fn nested(&self, key: &'a str, errors: &mut ValidationErrors) -> Option<Self> {
        let object = self.object?;
        let path = self.path(key);
        match object.get(key) {
            None => {
                errors.add_field(&path, "Required");
                None
            }
            Some(Value::Object(inner)) => Some(Self {
                object: Some(inner),
                prefix: key,
            }),
            Some(other) => {
                errors.add_field(&path, format!("Expected object, received {}", type_name(other)));
                None
            }
        }
    }

    /// Required string with a minimum length
    pub(crate) fn required_str(
        &self,
        key: &str,
        min_len: usize,
        message: &str,
        errors: &mut ValidationErrors,
    ) -> Option<String> {
        let object = self.object?;
        let path = self.path(key);
        match object.get(key) {
            None => {
                errors.add_field(&path, "Required");
                None
            }
            Some(value) => string_with_min(value, &path, min_len, message, errors),
        }
    }

    /// Optional string; absent is fine, a present value must be a string
    /// meeting the minimum length
    pub(crate) fn optional_str(
        &self,
        key: &str,
        min_len: usize,
        message: &str,
        errors: &mut ValidationErrors,
    ) -> Option<String> {
        let value = self.object?.get(key)?;
        let path = self.path(key);
        string_with_min(value, &path, min_len, message, errors)
    }

    fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.prefix)
        }
    }
}

fn string_with_min(
    value: &Value,
    path: &str,
    min_len: usize,
    message: &str,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let Value::String(s) = value else {
        errors.add_field(path, format!("Expected string, received {}", type_name(value)));
        return None;
    };
    if s.chars().count() < min_len {
        errors.add_field(path, message);
        return None;
    }
    Some(s.clone())
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
