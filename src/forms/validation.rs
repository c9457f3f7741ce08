use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::types::TaxFormDetails;

pub const MAX_ASSESSED_VALUE: i64 = 100_000;
pub const MAX_APPRAISED_VALUE: i64 = 100_000;
pub const MAX_COMMENTS_CHARS: usize = 500;

/// Details payload as received at the boundary, before any checks run.
///
/// Required fields are optional here so a missing value is reported as a
/// violation instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxFormDetailsRequest {
    pub assessed_value: Option<i64>,
    pub appraised_value: Option<i64>,
    pub ratio: Option<f64>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid tax form details: {}", format_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

fn format_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn check_range(
    violations: &mut Vec<FieldViolation>,
    field: &'static str,
    value: i64,
    max: i64,
) {
    if value < 0 {
        violations.push(FieldViolation::new(field, "must be greater than or equal to 0"));
    } else if value > max {
        violations.push(FieldViolation::new(
            field,
            format!("must be less than or equal to {max}"),
        ));
    }
}

impl TaxFormDetailsRequest {
    /// Collect every field-level violation in the request
    pub fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();

        match self.assessed_value {
            None => violations.push(FieldViolation::new("assessedValue", "must not be null")),
            Some(value) => check_range(&mut violations, "assessedValue", value, MAX_ASSESSED_VALUE),
        }

        if let Some(value) = self.appraised_value {
            check_range(&mut violations, "appraisedValue", value, MAX_APPRAISED_VALUE);
        }

        match self.ratio {
            None => violations.push(FieldViolation::new("ratio", "must not be null")),
            Some(ratio) if !(0.0..=1.0).contains(&ratio) => violations.push(FieldViolation::new(
                "ratio",
                "must be between 0.0 and 1.0",
            )),
            Some(_) => {}
        }

        if let Some(comments) = &self.comments {
            if comments.chars().count() > MAX_COMMENTS_CHARS {
                violations.push(FieldViolation::new(
                    "comments",
                    format!("size must be at most {MAX_COMMENTS_CHARS} characters"),
                ));
            }
        }

        violations
    }

    /// Validate and convert into the stored details shape
    pub fn into_details(self) -> Result<TaxFormDetails, ValidationError> {
        let violations = self.validate();
        if !violations.is_empty() {
            return Err(ValidationError { violations });
        }

        match (self.assessed_value, self.ratio) {
            (Some(assessed_value), Some(ratio)) => Ok(TaxFormDetails {
                // range checked above
                assessed_value: assessed_value as i32,
                appraised_value: self.appraised_value,
                ratio,
                comments: self.comments,
            }),
            _ => Err(ValidationError { violations }),
        }
    }
}
