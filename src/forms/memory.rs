use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use super::errors::StoreError;
use super::store::TaxFormStore;
use super::types::{
    FormId, HistoryId, NewHistoryEntry, NewTaxForm, TaxForm, TaxFormHistory, TaxFormStatus,
};

#[derive(Debug, Default)]
struct MemoryTables {
    /// Forms are kept without history; entries live in `history`
    forms: BTreeMap<FormId, TaxForm>,
    history: Vec<TaxFormHistory>,
    last_form_id: FormId,
    last_history_id: HistoryId,
}

impl MemoryTables {
    fn hydrate(&self, form: &TaxForm) -> TaxForm {
        let mut form = form.clone();
        form.history = self
            .history
            .iter()
            .filter(|entry| entry.tax_form_id == form.id)
            .cloned()
            .collect();
        form
    }

    fn check_status(
        &self,
        form_id: FormId,
        expected_status: TaxFormStatus,
    ) -> Result<(), StoreError> {
        let stored = self
            .forms
            .get(&form_id)
            .ok_or(StoreError::FormNotFound { form_id })?;
        if stored.status != expected_status {
            return Err(StoreError::StatusChanged {
                form_id,
                expected: expected_status,
            });
        }
        Ok(())
    }

    fn write_form(&mut self, form: &TaxForm) {
        if let Some(stored) = self.forms.get_mut(&form.id) {
            stored.status = form.status;
            stored.details = form.details.clone();
            stored.updated_at = form.updated_at;
        }
    }

    fn push_history(&mut self, entry: NewHistoryEntry) -> Result<TaxFormHistory, StoreError> {
        if !self.forms.contains_key(&entry.tax_form_id) {
            return Err(StoreError::FormNotFound {
                form_id: entry.tax_form_id,
            });
        }
        self.last_history_id += 1;
        let recorded = TaxFormHistory {
            id: self.last_history_id,
            tax_form_id: entry.tax_form_id,
            created_at: entry.created_at,
            kind: entry.kind,
        };
        self.history.push(recorded.clone());
        Ok(recorded)
    }
}

/// Process-local store. Every call holds one lock for its whole duration, so
/// each operation is atomic with respect to the others.
#[derive(Debug, Default)]
pub struct InMemoryTaxFormStore {
    tables: Mutex<MemoryTables>,
}

impl InMemoryTaxFormStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn form_count(&self) -> usize {
        self.tables.lock().await.forms.len()
    }

    pub async fn history_count(&self) -> usize {
        self.tables.lock().await.history.len()
    }

    /// Overwrite a form's status directly, bypassing the workflow
    #[cfg(any(test, feature = "testing"))]
    pub async fn force_status(
        &self,
        form_id: FormId,
        status: TaxFormStatus,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .forms
            .get_mut(&form_id)
            .ok_or(StoreError::FormNotFound { form_id })?;
        stored.status = status;
        Ok(())
    }
}

#[async_trait]
impl TaxFormStore for InMemoryTaxFormStore {
    async fn insert_form(&self, form: NewTaxForm) -> Result<TaxForm, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.last_form_id += 1;
        let now = Utc::now();
        let created = TaxForm {
            id: tables.last_form_id,
            form_year: form.form_year,
            form_name: form.form_name,
            status: TaxFormStatus::NotStarted,
            details: None,
            created_at: now,
            updated_at: now,
            history: Vec::new(),
        };
        tables.forms.insert(created.id, created.clone());
        Ok(created)
    }

    async fn load_form_by_id(&self, id: FormId) -> Result<Option<TaxForm>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.forms.get(&id).map(|form| tables.hydrate(form)))
    }

    async fn list_forms_by_year(&self, year: i32) -> Result<Vec<TaxForm>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .forms
            .values()
            .filter(|form| form.form_year == year)
            .map(|form| tables.hydrate(form))
            .collect())
    }

    async fn persist_form(
        &self,
        form: &TaxForm,
        expected_status: TaxFormStatus,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.check_status(form.id, expected_status)?;
        tables.write_form(form);
        Ok(())
    }

    async fn append_history(&self, entry: NewHistoryEntry) -> Result<TaxFormHistory, StoreError> {
        self.tables.lock().await.push_history(entry)
    }

    async fn record_transition(
        &self,
        form: &TaxForm,
        expected_status: TaxFormStatus,
        entry: NewHistoryEntry,
    ) -> Result<TaxFormHistory, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.check_status(form.id, expected_status)?;
        let recorded = tables.push_history(entry)?;
        tables.write_form(form);
        Ok(recorded)
    }
}
