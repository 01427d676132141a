//! Field level validation of payloads and query strings
//!
//! Every check records its problem in [`FieldErrors`](FieldErrors) instead of bailing out, so a
//! single response can name every offending field.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;

use crate::choices::Choice;
use crate::choices::invalid_choice_message;

use super::Error;
use super::datetime::parse_datetime;

pub const REQUIRED: &str = "This field is required.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const BLANK: &str = "This field may not be blank.";
pub const NOT_A_BOOLEAN: &str = "Must be a valid boolean.";
pub const WRONG_DATETIME: &str = "Datetime has wrong format. Use one of these formats instead: \
     YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z].";

/// Problems per field
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem with a field
    pub fn add<M>(&mut self, field: &'static str, message: M)
    where
        M: Into<String>,
    {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.0.get(field)
    }

    /// The value when nothing went wrong, a validation error otherwise
    pub fn into_result<T>(self, value: T) -> Result<T, Error> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(Error::validation(self))
        }
    }
}

/// Parse a boolean flag the way forms and query strings spell them
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "True" | "TRUE" | "1" => Some(true),
        "false" | "False" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

/// Check a text field
///
/// `max_length` counts characters, not bytes
pub fn text(
    errors: &mut FieldErrors,
    field: &'static str,
    value: Option<Value>,
    allow_blank: bool,
    max_length: Option<usize>,
) -> Option<String> {
    match value? {
        Value::String(text) => {
            if !allow_blank && text.trim().is_empty() {
                errors.add(field, BLANK);
                None
            } else if max_length.is_some_and(|max_length| text.chars().count() > max_length) {
                errors.add(
                    field,
                    format!(
                        "Ensure this field has no more than {} characters.",
                        max_length.unwrap_or_default()
                    ),
                );
                None
            } else {
                Some(text)
            }
        }
        _ => {
            errors.add(field, NOT_A_STRING);
            None
        }
    }
}

/// Check a boolean field
pub fn flag(errors: &mut FieldErrors, field: &'static str, value: Option<Value>) -> Option<bool> {
    let parsed = match value? {
        Value::Bool(flag) => Some(flag),
        Value::String(raw) => parse_flag(&raw),
        Value::Number(number) => match number.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    };

    if parsed.is_none() {
        errors.add(field, NOT_A_BOOLEAN);
    }

    parsed
}

/// Check a date/time field
pub fn datetime(
    errors: &mut FieldErrors,
    field: &'static str,
    value: Option<Value>,
) -> Option<NaiveDateTime> {
    let parsed = match value? {
        Value::String(raw) => parse_datetime(&raw),
        _ => None,
    };

    if parsed.is_none() {
        errors.add(field, WRONG_DATETIME);
    }

    parsed
}

/// Check a choice field, given as number or numeric string
pub fn choice<C: Choice>(
    errors: &mut FieldErrors,
    field: &'static str,
    value: Option<Value>,
) -> Option<C> {
    let value = value?;

    let parsed = match &value {
        Value::Number(number) => number.as_i64().and_then(C::from_value),
        Value::String(raw) => C::parse(raw),
        _ => None,
    };

    if parsed.is_none() {
        let raw = match value {
            Value::String(raw) => raw,
            other => other.to_string(),
        };

        errors.add(field, invalid_choice_message(&raw));
    }

    parsed
}

/// Check every value of a repeated query parameter against a choice
pub fn choices<C: Choice>(errors: &mut FieldErrors, field: &'static str, raw: &[String]) -> Vec<C> {
    raw.iter()
        .filter_map(|raw| {
            let parsed = C::parse(raw);

            if parsed.is_none() {
                errors.add(field, invalid_choice_message(raw));
            }

            parsed
        })
        .collect()
}

/// Check an optional query flag, absent (or empty) means "no preference"
pub fn query_flag(errors: &mut FieldErrors, field: &'static str, raw: Option<&str>) -> Option<bool> {
    let raw = raw.filter(|raw| !raw.is_empty())?;
    let parsed = parse_flag(raw);

    if parsed.is_none() {
        errors.add(field, NOT_A_BOOLEAN);
    }

    parsed
}
