// Persistence seam for the tax form service
//
// Implementations must treat every method as a synchronous, consistent
// operation from the caller's point of view.

use async_trait::async_trait;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use super::errors::StoreError;
use super::types::{FormId, NewHistoryEntry, NewTaxForm, TaxForm, TaxFormHistory, TaxFormStatus};

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait TaxFormStore: Send + Sync {
    /// Create a form in `NOT_STARTED` with no details and no history
    async fn insert_form(&self, form: NewTaxForm) -> Result<TaxForm, StoreError>;

    /// Load a form with its history in insertion order
    async fn load_form_by_id(&self, id: FormId) -> Result<Option<TaxForm>, StoreError>;

    /// All forms for `year` in id order, each with its history
    async fn list_forms_by_year(&self, year: i32) -> Result<Vec<TaxForm>, StoreError>;

    /// Write status, details and `updated_at` of `form`.
    ///
    /// The write only applies while the stored status still equals
    /// `expected_status`; otherwise `StoreError::StatusChanged` is returned and
    /// nothing is written.
    async fn persist_form(
        &self,
        form: &TaxForm,
        expected_status: TaxFormStatus,
    ) -> Result<(), StoreError>;

    async fn append_history(&self, entry: NewHistoryEntry) -> Result<TaxFormHistory, StoreError>;

    /// `persist_form` and `append_history` in one transaction. Either both
    /// writes land or neither does.
    async fn record_transition(
        &self,
        form: &TaxForm,
        expected_status: TaxFormStatus,
        entry: NewHistoryEntry,
    ) -> Result<TaxFormHistory, StoreError>;
}
