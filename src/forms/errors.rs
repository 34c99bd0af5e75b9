//! Form error collection

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::service::user::UserServiceError;

/// Field-level and form-level messages produced by a failed validation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
    non_field: Vec<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field error set
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Replaces any messages on `field` with `message`
    pub fn replace(&mut self, field: &str, message: impl Into<String>) {
        self.fields.insert(field.to_string(), vec![message.into()]);
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn merge(&mut self, other: FormErrors) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
        self.non_field.extend(other.non_field);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    pub fn field(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    /// Template view with an entry for every name in `fields`, present or not,
    /// plus `non_field` for form-level messages.
    pub fn to_context(&self, fields: &[&str]) -> BTreeMap<String, Vec<String>> {
        let mut view: BTreeMap<String, Vec<String>> = fields
            .iter()
            .map(|name| (name.to_string(), self.field(name).to_vec()))
            .collect();
        view.insert("non_field".to_string(), self.non_field.clone());
        view
    }

    /// `Ok(value)` when no error was collected
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(err: ValidationErrors) -> Self {
        let mut errors = FormErrors::new();

        for (field, field_errors) in err.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for field '{}'", field));
                errors.add(&field, message);
            }
        }

        errors
    }
}

/// Outcome of cleaning a form that needs storage access
#[derive(Debug, Error)]
pub enum FormError {
    #[error("The submitted form is invalid")]
    Invalid(FormErrors),

    #[error(transparent)]
    Service(#[from] UserServiceError),
}

impl From<FormErrors> for FormError {
    fn from(errors: FormErrors) -> Self {
        FormError::Invalid(errors)
    }
}
