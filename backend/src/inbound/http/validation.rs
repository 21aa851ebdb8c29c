//! Shared validation helpers for inbound HTTP adapters.
//!
//! Body and query validation failures are `422` with
//! `details {field, value?, code}`. Identity failures (headers and path
//! identifiers) are `400`.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;

use crate::domain::aggregation::{DateRange, ParseAggregationError};
use crate::domain::{Error, UserId};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidValue,
    InvalidUserId,
    InvalidTimestamp,
    InvalidDate,
    InvertedRange,
    OutOfRange,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidValue => "invalid_value",
            ErrorCode::InvalidUserId => "invalid_user_id",
            ErrorCode::InvalidTimestamp => "invalid_timestamp",
            ErrorCode::InvalidDate => "invalid_date",
            ErrorCode::InvertedRange => "inverted_range",
            ErrorCode::OutOfRange => "out_of_range",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

/// Builder for validation errors with field context.
struct ValidationError {
    field: &'static str,
    message: String,
}

impl ValidationError {
    fn new(field: FieldName, message: impl Into<String>) -> Self {
        Self {
            field: field.as_str(),
            message: message.into(),
        }
    }

    fn with_code(self, code: ErrorCode) -> Error {
        Error::unprocessable(self.message).with_details(json!({
            "field": self.field,
            "code": code.as_str(),
        }))
    }

    fn with_value(self, code: ErrorCode, value: impl Into<String>) -> Error {
        Error::unprocessable(self.message).with_details(json!({
            "field": self.field,
            "value": value.into(),
            "code": code.as_str(),
        }))
    }
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let name = field.as_str();
    ValidationError::new(field, format!("missing required field: {name}"))
        .with_code(ErrorCode::MissingField)
}

pub(crate) fn invalid_value_error(field: FieldName, value: &str, message: impl Into<String>) -> Error {
    ValidationError::new(field, message).with_value(ErrorCode::InvalidValue, value)
}

/// Parse an optional enum-like parameter, falling back to `default`.
pub(crate) fn parse_choice<T>(
    value: Option<&str>,
    field: FieldName,
    default: T,
) -> Result<T, Error>
where
    T: FromStr<Err = ParseAggregationError>,
{
    match value.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|err: ParseAggregationError| invalid_value_error(field, raw, err.to_string())),
    }
}

/// Check that an optional paging value lies within `min..=max`.
pub(crate) fn bounded(
    value: Option<u32>,
    field: FieldName,
    min: u32,
    max: u32,
    default: u32,
) -> Result<u32, Error> {
    let Some(raw) = value else {
        return Ok(default);
    };
    if (min..=max).contains(&raw) {
        Ok(raw)
    } else {
        let name = field.as_str();
        Err(ValidationError::new(field, format!("{name} must be between {min} and {max}"))
            .with_value(ErrorCode::OutOfRange, raw.to_string()))
    }
}

pub(crate) fn invalid_timestamp_error(field: FieldName, value: &str) -> Error {
    let name = field.as_str();
    ValidationError::new(field, format!("{name} must be an RFC 3339 timestamp"))
        .with_value(ErrorCode::InvalidTimestamp, value)
}

pub(crate) fn parse_optional_rfc3339_timestamp(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<DateTime<Utc>>, Error> {
    value
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|timestamp| timestamp.with_timezone(&Utc))
                .map_err(|_| invalid_timestamp_error(field, raw))
        })
        .transpose()
}

fn parse_optional_date(value: Option<&str>, field: FieldName) -> Result<Option<NaiveDate>, Error> {
    value
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                let name = field.as_str();
                ValidationError::new(field, format!("{name} must be YYYY-MM-DD"))
                    .with_value(ErrorCode::InvalidDate, raw)
            })
        })
        .transpose()
}

/// Parse `start_date`/`end_date` query values into a [`DateRange`].
pub(crate) fn parse_date_range(start: Option<&str>, end: Option<&str>) -> Result<DateRange, Error> {
    let start = parse_optional_date(start, FieldName::new("start_date"))?;
    let end = parse_optional_date(end, FieldName::new("end_date"))?;
    DateRange::new(start, end).map_err(|err| {
        ValidationError::new(FieldName::new("start_date"), err.to_string())
            .with_code(ErrorCode::InvertedRange)
    })
}

/// Parse a comma-separated list of group identifiers.
pub(crate) fn parse_id_list(raw: Option<&str>, field: FieldName) -> Result<Vec<i64>, Error> {
    let mut ids = Vec::new();
    for part in raw.unwrap_or_default().split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id = part
            .parse::<i64>()
            .map_err(|_| invalid_value_error(field, part, "identifiers must be integers"))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        return Err(missing_field_error(field));
    }
    Ok(ids)
}

/// Parse a user identifier from a path segment or header.
pub(crate) fn parse_user_id(value: &str, field: FieldName) -> Result<UserId, Error> {
    UserId::new(value).map_err(|err| {
        Error::invalid_request(err.to_string()).with_details(json!({
            "field": field.as_str(),
            "value": value,
            "code": ErrorCode::InvalidUserId.as_str(),
        }))
    })
}
