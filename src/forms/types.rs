use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type FormId = i64;
pub type HistoryId = i64;

/// Workflow status of a tax form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxFormStatus {
    NotStarted,
    InProgress,
    Submitted,
    Returned,
    Accepted,
}

impl TaxFormStatus {
    pub const ALL: [TaxFormStatus; 5] = [
        TaxFormStatus::NotStarted,
        TaxFormStatus::InProgress,
        TaxFormStatus::Submitted,
        TaxFormStatus::Returned,
        TaxFormStatus::Accepted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxFormStatus::NotStarted => "NOT_STARTED",
            TaxFormStatus::InProgress => "IN_PROGRESS",
            TaxFormStatus::Submitted => "SUBMITTED",
            TaxFormStatus::Returned => "RETURNED",
            TaxFormStatus::Accepted => "ACCEPTED",
        }
    }
}

impl fmt::Display for TaxFormStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxFormStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaxFormStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown tax form status: {s}"))
    }
}

/// Kind of audit record written for a workflow transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxFormHistoryType {
    Submitted,
    Returned,
    Accepted,
}

impl TaxFormHistoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxFormHistoryType::Submitted => "SUBMITTED",
            TaxFormHistoryType::Returned => "RETURNED",
            TaxFormHistoryType::Accepted => "ACCEPTED",
        }
    }
}

impl fmt::Display for TaxFormHistoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxFormHistoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUBMITTED" => Ok(TaxFormHistoryType::Submitted),
            "RETURNED" => Ok(TaxFormHistoryType::Returned),
            "ACCEPTED" => Ok(TaxFormHistoryType::Accepted),
            other => Err(format!("unknown tax form history type: {other}")),
        }
    }
}

/// Editable appraisal payload attached to a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxFormDetails {
    pub assessed_value: i32,
    pub appraised_value: Option<i64>,
    pub ratio: f64,
    pub comments: Option<String>,
}

/// Immutable audit record of one workflow transition.
///
/// The owning form is referenced by id only; a form's history is rebuilt by
/// querying entries with a matching `tax_form_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxFormHistory {
    pub id: HistoryId,
    pub tax_form_id: FormId,
    pub created_at: DateTime<Utc>,
    pub kind: TaxFormHistoryType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    pub tax_form_id: FormId,
    pub created_at: DateTime<Utc>,
    pub kind: TaxFormHistoryType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaxForm {
    pub id: FormId,
    pub form_year: i32,
    pub form_name: String,
    pub status: TaxFormStatus,
    pub details: Option<TaxFormDetails>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Audit entries in insertion order
    pub history: Vec<TaxFormHistory>,
}

/// Seed data for a form that has not been worked on yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTaxForm {
    pub form_year: i32,
    pub form_name: String,
}

impl NewTaxForm {
    pub fn new(form_year: i32, form_name: impl Into<String>) -> Self {
        Self {
            form_year,
            form_name: form_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxFormHistoryView {
    pub id: HistoryId,
    pub tax_form_id: FormId,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: TaxFormHistoryType,
}

/// Read shape of a form handed back to callers of the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxFormView {
    pub id: FormId,
    pub form_year: i32,
    pub form_name: String,
    pub status: TaxFormStatus,
    pub details: Option<TaxFormDetails>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub history: Vec<TaxFormHistoryView>,
}

impl From<&TaxFormHistory> for TaxFormHistoryView {
    fn from(entry: &TaxFormHistory) -> Self {
        Self {
            id: entry.id,
            tax_form_id: entry.tax_form_id,
            created_at: entry.created_at,
            kind: entry.kind,
        }
    }
}

impl From<TaxForm> for TaxFormView {
    fn from(form: TaxForm) -> Self {
        let history = form.history.iter().map(TaxFormHistoryView::from).collect();
        Self {
            id: form.id,
            form_year: form.form_year,
            form_name: form.form_name,
            status: form.status,
            details: form.details,
            created_at: form.created_at,
            updated_at: form.updated_at,
            history,
        }
    }
}
