use std::collections::BTreeMap;
use std::fmt;

pub mod attachment;
pub mod filter;
pub mod session;
pub mod submission;
pub mod task;

#[cfg(test)]
pub mod test_util;

/// Field-scoped error messages, keyed by the form field they belong to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message for a field. The first message recorded for a field wins.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(field, message)| (field.as_str(), message.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }

        Ok(())
    }
}

/// Error state shown on a screen: per-field messages from validation plus one global message
/// for failures that aren't tied to a field (authentication and repository errors)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorState {
    pub field_errors: FieldErrors,
    pub global_error: Option<String>,
}

impl ErrorState {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn has_errors(&self) -> bool {
        !self.field_errors.is_empty() || self.global_error.is_some()
    }
}
