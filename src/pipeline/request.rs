//! Prediction request validation.

use crate::interpreter::format_timestamp;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;

const MISSING_FIELD: &str = "Missing data for required field.";
const INVALID_DATETIME: &str = "Not a valid datetime.";

/// Field-level validation failures, keyed by field name.
///
/// Renders as a JSON object of field to messages so it can be stored as a
/// task status message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_owned()).or_default().push(message.into());
    }

    /// Returns the messages recorded for `field`.
    #[must_use]
    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` when no field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates failing fields and their messages.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

impl std::error::Error for ValidationErrors {}

/// Validated prediction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRequest {
    name: Option<String>,
    features: Vec<String>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

impl PredictionRequest {
    /// Validates a raw request document.
    ///
    /// `features` must be a non-empty list of strings, `start_time` and
    /// `end_time` dates or datetimes with `end_time >= start_time`, and
    /// `name`, when present, a string. A single-day window is valid.
    ///
    /// # Errors
    ///
    /// Returns every field failure at once as [`ValidationErrors`].
    pub fn validate(document: &Value) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let Some(fields) = document.as_object() else {
            errors.add("_schema", "Invalid input type.");
            return Err(errors);
        };

        let name = match fields.get("name") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name.clone()),
            Some(_) => {
                errors.add("name", "Not a valid string.");
                None
            }
        };
        let features = parse_features(fields, &mut errors);
        let start_time = parse_field_timestamp(fields, "start_time", &mut errors);
        let end_time = parse_field_timestamp(fields, "end_time", &mut errors);

        match (features, start_time, end_time) {
            (Some(features), Some(start_time), Some(end_time)) if errors.is_empty() => {
                if end_time < start_time {
                    errors.add("end_time", "Must not be earlier than start_time.");
                    return Err(errors);
                }
                Ok(Self {
                    name,
                    features,
                    start_time,
                    end_time,
                })
            }
            _ => Err(errors),
        }
    }

    /// Returns the requested task name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the requested features.
    #[must_use]
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Returns the first forecast instant, also used as the oracle's
    /// `as_of`.
    #[must_use]
    pub const fn as_of(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Returns the last forecast instant.
    #[must_use]
    pub const fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    /// Returns the normalised document stored on the task.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut document = json!({
            "features": self.features,
            "start_time": format_timestamp(self.start_time.naive_utc()),
            "end_time": format_timestamp(self.end_time.naive_utc()),
        });
        if let (Some(name), Some(object)) = (&self.name, document.as_object_mut()) {
            object.insert("name".to_owned(), Value::String(name.clone()));
        }
        document
    }
}

fn parse_features(fields: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<Vec<String>> {
    let Some(raw) = fields.get("features") else {
        errors.add("features", MISSING_FIELD);
        return None;
    };
    let parsed: Option<Vec<String>> = raw.as_array().and_then(|items| {
        items
            .iter()
            .map(|item| item.as_str().map(str::to_owned))
            .collect()
    });
    match parsed {
        Some(features) if !features.is_empty() => Some(features),
        Some(_) => {
            errors.add("features", "Shorter than minimum length 1.");
            None
        }
        None => {
            errors.add("features", "Not a valid list of strings.");
            None
        }
    }
}

fn parse_field_timestamp(
    fields: &Map<String, Value>,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<DateTime<Utc>> {
    let Some(raw) = fields.get(field) else {
        errors.add(field, MISSING_FIELD);
        return None;
    };
    let parsed = raw.as_str().and_then(parse_timestamp);
    if parsed.is_none() {
        errors.add(field, INVALID_DATETIME);
    }
    parsed
}

/// Parses `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, or
/// RFC 3339 input. Naive values are taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN).and_utc());
    }
    if let Ok(moment) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(moment.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|moment| moment.and_utc())
}
