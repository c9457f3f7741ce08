// Tax form status workflow
//
// Legality of every status change lives in a single table so the matrix can be
// inspected and tested directly. A missing row means the operation is rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::types::{FormId, TaxFormHistoryType, TaxFormStatus};

/// Operations that move a form through its workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormOperation {
    Save,
    Submit,
    Return,
    Accept,
}

impl FormOperation {
    pub const ALL: [FormOperation; 4] = [
        FormOperation::Save,
        FormOperation::Submit,
        FormOperation::Return,
        FormOperation::Accept,
    ];

    /// Audit record written when the operation succeeds. Saves are not audited.
    pub fn history_type(&self) -> Option<TaxFormHistoryType> {
        match self {
            FormOperation::Save => None,
            FormOperation::Submit => Some(TaxFormHistoryType::Submitted),
            FormOperation::Return => Some(TaxFormHistoryType::Returned),
            FormOperation::Accept => Some(TaxFormHistoryType::Accepted),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormOperation::Save => "save",
            FormOperation::Submit => "submit",
            FormOperation::Return => "return",
            FormOperation::Accept => "accept",
        }
    }
}

impl fmt::Display for FormOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejection of an operation that is not legal from the form's current status
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Tax form {form_id} cannot {attempted_operation} while in status {current_status}")]
pub struct StatusConflict {
    pub form_id: FormId,
    pub current_status: TaxFormStatus,
    pub attempted_operation: FormOperation,
}

/// `(from, operation, to)` rows. RETURNED and ACCEPTED have no outgoing rows.
pub const TRANSITIONS: &[(TaxFormStatus, FormOperation, TaxFormStatus)] = &[
    (TaxFormStatus::NotStarted, FormOperation::Save, TaxFormStatus::InProgress),
    (TaxFormStatus::InProgress, FormOperation::Save, TaxFormStatus::InProgress),
    (TaxFormStatus::InProgress, FormOperation::Submit, TaxFormStatus::Submitted),
    (TaxFormStatus::Submitted, FormOperation::Return, TaxFormStatus::Returned),
    (TaxFormStatus::Submitted, FormOperation::Accept, TaxFormStatus::Accepted),
];

fn lookup(current: TaxFormStatus, operation: FormOperation) -> Option<TaxFormStatus> {
    TRANSITIONS
        .iter()
        .find(|(from, op, _)| *from == current && *op == operation)
        .map(|(_, _, to)| *to)
}

/// Compute the status a form moves to, or reject the operation.
pub fn next_status(
    form_id: FormId,
    current: TaxFormStatus,
    operation: FormOperation,
) -> Result<TaxFormStatus, StatusConflict> {
    lookup(current, operation).ok_or(StatusConflict {
        form_id,
        current_status: current,
        attempted_operation: operation,
    })
}

/// Operations that are legal from `status`, in table order
pub fn allowed_operations(status: TaxFormStatus) -> Vec<FormOperation> {
    TRANSITIONS
        .iter()
        .filter(|(from, _, _)| *from == status)
        .map(|(_, op, _)| *op)
        .collect()
}

pub fn is_terminal(status: TaxFormStatus) -> bool {
    allowed_operations(status).is_empty()
}
