use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

use super::errors::{StoreError, TaxFormError};
use super::store::TaxFormStore;
use super::types::{
    FormId, NewHistoryEntry, NewTaxForm, TaxForm, TaxFormDetails, TaxFormStatus, TaxFormView,
};
use super::workflow::{self, FormOperation, StatusConflict};
use crate::telemetry::{create_form_span, generate_correlation_id};

/// Writes lost to a concurrent status change are retried this many times in
/// total while the operation stays legal.
const MAX_WRITE_ATTEMPTS: u32 = 2;

/// Orchestrates lookups, workflow decisions and persistence for tax forms.
///
/// Every lookup-by-id operation returns `Ok(None)` when no form has that id.
/// A `StatusConflict` on an existing form is always returned as an error.
#[derive(Clone)]
pub struct TaxFormService {
    store: Arc<dyn TaxFormStore>,
}

impl std::fmt::Debug for TaxFormService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaxFormService").finish_non_exhaustive()
    }
}

impl TaxFormService {
    pub fn new(store: Arc<dyn TaxFormStore>) -> Self {
        Self { store }
    }

    pub async fn create_form(&self, form: NewTaxForm) -> Result<TaxFormView, TaxFormError> {
        let span = create_form_span("create", None, &generate_correlation_id());
        async {
            let created = self.store.insert_form(form).await?;
            info!(form_id = created.id, form_year = created.form_year, "Created tax form");
            Ok(created.into())
        }
        .instrument(span)
        .await
    }

    pub async fn find_all_by_year(&self, year: i32) -> Result<Vec<TaxFormView>, TaxFormError> {
        let span = create_form_span("find_all_by_year", None, &generate_correlation_id());
        async {
            let forms = self.store.list_forms_by_year(year).await?;
            Ok(forms.into_iter().map(TaxFormView::from).collect())
        }
        .instrument(span)
        .await
    }

    pub async fn find_by_id(&self, id: FormId) -> Result<Option<TaxFormView>, TaxFormError> {
        let span = create_form_span("find_by_id", Some(id), &generate_correlation_id());
        async { Ok(self.store.load_form_by_id(id).await?.map(TaxFormView::from)) }
            .instrument(span)
            .await
    }

    /// Replace a form's details wholesale. No history entry is written.
    pub async fn save(
        &self,
        id: FormId,
        details: TaxFormDetails,
    ) -> Result<Option<TaxFormView>, TaxFormError> {
        self.apply(id, FormOperation::Save, Some(details)).await
    }

    pub async fn submit_form(&self, id: FormId) -> Result<Option<TaxFormView>, TaxFormError> {
        self.apply(id, FormOperation::Submit, None).await
    }

    pub async fn return_form(&self, id: FormId) -> Result<Option<TaxFormView>, TaxFormError> {
        self.apply(id, FormOperation::Return, None).await
    }

    pub async fn accept_form(&self, id: FormId) -> Result<Option<TaxFormView>, TaxFormError> {
        self.apply(id, FormOperation::Accept, None).await
    }

    /// Load, decide, write. Audited operations write status and history in one
    /// store transaction; a rejected operation writes nothing.
    async fn apply(
        &self,
        id: FormId,
        operation: FormOperation,
        details: Option<TaxFormDetails>,
    ) -> Result<Option<TaxFormView>, TaxFormError> {
        let span = create_form_span(operation.as_str(), Some(id), &generate_correlation_id());
        async {
            let Some(mut form) = self.store.load_form_by_id(id).await? else {
                return Ok(None);
            };

            let mut attempt = 1;
            loop {
                match self.write(form, operation, details.clone()).await {
                    Ok(written) => return Ok(Some(written.into())),
                    Err(TaxFormError::Store(StoreError::StatusChanged { expected, .. })) => {
                        let Some(fresh) = self.store.load_form_by_id(id).await? else {
                            return Ok(None);
                        };
                        warn!(
                            form_id = id,
                            expected = %expected,
                            current = %fresh.status,
                            operation = %operation,
                            attempt,
                            "Tax form status changed concurrently"
                        );

                        // Still legal from the new status: retry against it.
                        self.decide(id, fresh.status, operation)?;
                        if attempt >= MAX_WRITE_ATTEMPTS {
                            return Err(StoreError::StatusChanged {
                                form_id: id,
                                expected,
                            }
                            .into());
                        }
                        attempt += 1;
                        form = fresh;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        .instrument(span)
        .await
    }

    /// One compare-and-set write of `operation` against the status `form` was
    /// loaded with.
    async fn write(
        &self,
        mut form: TaxForm,
        operation: FormOperation,
        details: Option<TaxFormDetails>,
    ) -> Result<TaxForm, TaxFormError> {
        let id = form.id;
        let previous = form.status;
        form.status = self.decide(id, previous, operation)?;
        if details.is_some() {
            form.details = details;
        }
        let now = Utc::now();
        form.updated_at = now;

        match operation.history_type() {
            Some(kind) => {
                let entry = NewHistoryEntry {
                    tax_form_id: id,
                    created_at: now,
                    kind,
                };
                let recorded = self.store.record_transition(&form, previous, entry).await?;
                form.history.push(recorded);
            }
            None => self.store.persist_form(&form, previous).await?,
        }

        info!(
            form_id = id,
            operation = %operation,
            from = %previous,
            to = %form.status,
            history_entries = form.history.len(),
            "Tax form updated"
        );
        Ok(form)
    }

    fn decide(
        &self,
        id: FormId,
        current: TaxFormStatus,
        operation: FormOperation,
    ) -> Result<TaxFormStatus, StatusConflict> {
        workflow::next_status(id, current, operation).inspect_err(|conflict| {
            warn!(
                form_id = conflict.form_id,
                status = %conflict.current_status,
                operation = %conflict.attempted_operation,
                "Rejected tax form status change"
            );
        })
    }
}
