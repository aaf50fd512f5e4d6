//! Posted form validation
//!
//! Every failing check appends a message under the field's name; the form is
//! valid when no message was recorded.

use std::collections::HashMap;

use serde::Serialize;
use validator::ValidateEmail;

/// Field-keyed validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors(HashMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    /// First message recorded for `field`
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(|m| m.first()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Form {
    values: HashMap<String, String>,
    pub errors: FormErrors,
}

impl Form {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self {
            values,
            errors: FormErrors::default(),
        }
    }

    /// Form over `values` with surrounding whitespace stripped, so checks
    /// and stored values agree
    pub fn trimmed(values: HashMap<String, String>) -> Self {
        Self::new(
            values
                .into_iter()
                .map(|(field, value)| (field, value.trim().to_string()))
                .collect(),
        )
    }

    /// Value of `field`, empty when absent
    pub fn get(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or("")
    }

    /// Whether `field` was posted with a non-empty value
    pub fn has(&mut self, field: &str) -> bool {
        if self.get(field).is_empty() {
            self.errors.add(field, "This field cannot be blank");
            return false;
        }
        true
    }

    pub fn required(&mut self, fields: &[&str]) {
        for field in fields {
            if self.get(field).trim().is_empty() {
                self.errors.add(field, "This field cannot be blank");
            }
        }
    }

    pub fn min_length(&mut self, field: &str, length: usize) -> bool {
        if self.get(field).chars().count() < length {
            self.errors
                .add(field, format!("This field must be at least {} characters long", length));
            return false;
        }
        true
    }

    pub fn is_email(&mut self, field: &str) {
        if !self.get(field).validate_email() {
            self.errors.add(field, "Invalid email address");
        }
    }

    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }
}
