use thiserror::Error;

use super::types::{FormId, TaxFormStatus};
use super::workflow::StatusConflict;

/// Errors raised by a `TaxFormStore` implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Tax form {form_id} is no longer in status {expected}")]
    StatusChanged {
        form_id: FormId,
        expected: TaxFormStatus,
    },

    #[error("Tax form {form_id} does not exist")]
    FormNotFound { form_id: FormId },

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt tax form record: {reason}")]
    Corrupt { reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by `TaxFormService`.
///
/// A missing form is not an error; the service returns `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum TaxFormError {
    #[error(transparent)]
    StatusConflict(#[from] StatusConflict),

    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),
}

impl TaxFormError {
    pub fn as_status_conflict(&self) -> Option<&StatusConflict> {
        match self {
            TaxFormError::StatusConflict(conflict) => Some(conflict),
            TaxFormError::Store(_) => None,
        }
    }
}
