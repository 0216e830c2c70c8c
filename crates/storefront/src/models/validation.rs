//! Field-level validation errors for request bodies.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Validation failures keyed by field name.
///
/// Request types collect every failing field before giving up, so a client
/// can show all messages next to the form at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A single failing field.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a failure. The first message for a field wins.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    /// Keep the value of `result`, or record its error under `field`.
    pub fn check<T, E: fmt::Display>(&mut self, field: &str, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.add(field, e.to_string());
                None
            }
        }
    }

    /// Trimmed, non-empty text.
    pub fn required(&mut self, field: &str, label: &str, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            self.add(field, format!("{label} is required"));
            None
        } else {
            Some(value.to_owned())
        }
    }

    /// Trimmed text of at least `min` characters.
    pub fn min_chars(&mut self, field: &str, label: &str, value: &str, min: usize) -> Option<String> {
        let value = self.required(field, label, value)?;
        if value.chars().count() < min {
            self.add(field, format!("{label} must be at least {min} characters"));
            return None;
        }
        Some(value)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Prefix every field, e.g. `itemAddresses[0].`.
    #[must_use]
    pub fn nested(self, prefix: &str) -> Self {
        Self(
            self.0
                .into_iter()
                .map(|(k, v)| (format!("{prefix}{k}"), v))
                .collect(),
        )
    }

    pub fn extend(&mut self, other: Self) {
        for (field, message) in other.0 {
            self.add(field, message);
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_each_field_once() {
        let mut errors = FieldErrors::new();
        assert!(errors.required("city", "City", "  ").is_none());
        errors.add("city", "second message");
        assert_eq!(errors.get("city"), Some("City is required"));
    }

    #[test]
    fn test_min_chars() {
        let mut errors = FieldErrors::new();
        assert_eq!(
            errors.min_chars("address", "Address", " 12 Main Road ", 10).as_deref(),
            Some("12 Main Road")
        );
        assert!(errors.min_chars("address", "Address", "short", 10).is_none());
        assert_eq!(
            errors.get("address"),
            Some("Address must be at least 10 characters")
        );
    }

    #[test]
    fn test_display_and_nested() {
        let errors = FieldErrors::single("pincode", "bad").nested("itemAddresses[0].");
        assert_eq!(errors.to_string(), "itemAddresses[0].pincode: bad");
    }
}
