// Tax form service behaviour against the in-process store
// Covers the workflow scenarios end to end: details edits, transitions and
// audit history bookkeeping.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Barrier, Mutex};

use tax_forms::forms::{
    FormId, FormOperation, InMemoryTaxFormStore, NewHistoryEntry, NewTaxForm, StoreError,
    TaxForm, TaxFormDetails, TaxFormError, TaxFormHistory, TaxFormHistoryType, TaxFormService,
    TaxFormStatus, TaxFormStore,
};

struct Harness {
    store: Arc<InMemoryTaxFormStore>,
    service: TaxFormService,
    form_id: i64,
}

async fn harness() -> Harness {
    let store = Arc::new(InMemoryTaxFormStore::new());
    let form = store
        .insert_form(NewTaxForm::new(2024, "Test Form 1"))
        .await
        .unwrap();
    let service = TaxFormService::new(store.clone());
    Harness {
        store,
        service,
        form_id: form.id,
    }
}

fn details_a() -> TaxFormDetails {
    TaxFormDetails {
        assessed_value: 100,
        appraised_value: Some(200),
        ratio: 0.5,
        comments: Some("Testing".to_string()),
    }
}

fn details_b() -> TaxFormDetails {
    TaxFormDetails {
        assessed_value: 5_000,
        appraised_value: None,
        ratio: 0.25,
        comments: None,
    }
}

fn expect_conflict(result: Result<Option<tax_forms::TaxFormView>, TaxFormError>) -> TaxFormStatus {
    match result {
        Err(TaxFormError::StatusConflict(conflict)) => conflict.current_status,
        other => panic!("expected a status conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_find_all_by_year() {
    let h = harness().await;

    let forms = h.service.find_all_by_year(2024).await.unwrap();
    assert_eq!(forms.len(), 1);
    assert_eq!(forms[0].id, h.form_id);
    assert_eq!(forms[0].form_name, "Test Form 1");

    assert!(h.service.find_all_by_year(2025).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_find_by_id() {
    let h = harness().await;

    let view = h.service.find_by_id(h.form_id).await.unwrap().unwrap();
    assert_eq!(view.status, TaxFormStatus::NotStarted);
    assert!(view.history.is_empty());

    assert!(h.service.find_by_id(0).await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_from_editable_statuses() {
    for status in [TaxFormStatus::NotStarted, TaxFormStatus::InProgress] {
        let h = harness().await;
        h.store.force_status(h.form_id, status).await.unwrap();

        let view = h.service.save(h.form_id, details_a()).await.unwrap().unwrap();
        assert_eq!(view.status, TaxFormStatus::InProgress);
        assert_eq!(view.details, Some(details_a()));
        assert!(view.history.is_empty());
    }
}

#[tokio::test]
async fn test_save_replaces_details_wholesale() {
    let h = harness().await;
    h.service.save(h.form_id, details_a()).await.unwrap();
    let view = h.service.save(h.form_id, details_b()).await.unwrap().unwrap();

    assert_eq!(view.details, Some(details_b()));
    let stored = h.service.find_by_id(h.form_id).await.unwrap().unwrap();
    assert_eq!(stored.details, Some(details_b()));
    assert_eq!(h.store.history_count().await, 0);
}

#[tokio::test]
async fn test_save_rejected_outside_editable_statuses() {
    for status in [
        TaxFormStatus::Submitted,
        TaxFormStatus::Returned,
        TaxFormStatus::Accepted,
    ] {
        let h = harness().await;
        h.store.force_status(h.form_id, status).await.unwrap();

        let current = expect_conflict(h.service.save(h.form_id, details_a()).await);
        assert_eq!(current, status);

        let stored = h.service.find_by_id(h.form_id).await.unwrap().unwrap();
        assert_eq!(stored.status, status);
        assert!(stored.details.is_none());
    }
}

#[tokio::test]
async fn test_submit_form() {
    let h = harness().await;
    h.store
        .force_status(h.form_id, TaxFormStatus::InProgress)
        .await
        .unwrap();

    let view = h.service.submit_form(h.form_id).await.unwrap().unwrap();
    assert_eq!(view.status, TaxFormStatus::Submitted);
    assert_eq!(view.history.len(), 1);
    assert_eq!(view.history[0].kind, TaxFormHistoryType::Submitted);
    assert_eq!(view.history[0].tax_form_id, h.form_id);
    assert_eq!(h.store.history_count().await, 1);
}

#[tokio::test]
async fn test_submit_form_invalid_workflow() {
    let h = harness().await;

    let current = expect_conflict(h.service.submit_form(h.form_id).await);
    assert_eq!(current, TaxFormStatus::NotStarted);

    let stored = h.service.find_by_id(h.form_id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaxFormStatus::NotStarted);
    assert_eq!(h.store.history_count().await, 0);
}

#[tokio::test]
async fn test_return_and_accept_require_submitted() {
    for status in [
        TaxFormStatus::NotStarted,
        TaxFormStatus::InProgress,
        TaxFormStatus::Returned,
        TaxFormStatus::Accepted,
    ] {
        let h = harness().await;
        h.store.force_status(h.form_id, status).await.unwrap();

        assert_eq!(expect_conflict(h.service.return_form(h.form_id).await), status);
        assert_eq!(expect_conflict(h.service.accept_form(h.form_id).await), status);
        assert_eq!(h.store.history_count().await, 0);
    }
}

#[tokio::test]
async fn test_return_form() {
    let h = harness().await;
    h.store
        .force_status(h.form_id, TaxFormStatus::Submitted)
        .await
        .unwrap();

    let view = h.service.return_form(h.form_id).await.unwrap().unwrap();
    assert_eq!(view.status, TaxFormStatus::Returned);
    assert_eq!(view.history.len(), 1);
    assert_eq!(view.history[0].kind, TaxFormHistoryType::Returned);
}

#[tokio::test]
async fn test_unknown_id_is_absent_for_every_operation() {
    let h = harness().await;

    assert!(h.service.find_by_id(0).await.unwrap().is_none());
    assert!(h.service.save(0, details_a()).await.unwrap().is_none());
    assert!(h.service.submit_form(0).await.unwrap().is_none());
    assert!(h.service.return_form(0).await.unwrap().is_none());
    assert!(h.service.accept_form(0).await.unwrap().is_none());
}

#[tokio::test]
async fn test_full_workflow_scenario() {
    let h = harness().await;

    let saved = h.service.save(h.form_id, details_a()).await.unwrap().unwrap();
    assert_eq!(saved.status, TaxFormStatus::InProgress);
    assert_eq!(saved.details, Some(details_a()));
    assert!(saved.history.is_empty());

    let submitted = h.service.submit_form(h.form_id).await.unwrap().unwrap();
    assert_eq!(submitted.status, TaxFormStatus::Submitted);
    let kinds: Vec<_> = submitted.history.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![TaxFormHistoryType::Submitted]);

    let accepted = h.service.accept_form(h.form_id).await.unwrap().unwrap();
    assert_eq!(accepted.status, TaxFormStatus::Accepted);
    let kinds: Vec<_> = accepted.history.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![TaxFormHistoryType::Submitted, TaxFormHistoryType::Accepted]
    );

    let err = h.service.save(h.form_id, details_b()).await.unwrap_err();
    let conflict = err.as_status_conflict().unwrap();
    assert_eq!(conflict.current_status, TaxFormStatus::Accepted);
    assert_eq!(conflict.attempted_operation, FormOperation::Save);

    let stored = h.service.find_by_id(h.form_id).await.unwrap().unwrap();
    assert_eq!(stored.details, Some(details_a()));
    assert_eq!(stored.history.len(), 2);
    assert!(stored.history[0].id < stored.history[1].id);
    assert!(stored.history.iter().all(|e| e.tax_form_id == h.form_id));
}

#[tokio::test]
async fn test_listing_includes_history_per_form() {
    let h = harness().await;
    let other = h
        .store
        .insert_form(NewTaxForm::new(2024, "Test Form 2"))
        .await
        .unwrap();

    h.service.save(h.form_id, details_a()).await.unwrap();
    h.service.submit_form(h.form_id).await.unwrap();

    let forms = h.service.find_all_by_year(2024).await.unwrap();
    assert_eq!(forms.len(), 2);
    assert_eq!(forms[0].history.len(), 1);
    assert_eq!(forms[1].id, other.id);
    assert!(forms[1].history.is_empty());
}

/// Holds the first `gated` loads at a barrier so that concurrent operations
/// both read the same status before either writes.
struct InterleavingStore {
    inner: Arc<InMemoryTaxFormStore>,
    barrier: Barrier,
    gated: AtomicUsize,
    transitions: Mutex<Vec<Result<(), StoreError>>>,
}

impl InterleavingStore {
    fn new(inner: Arc<InMemoryTaxFormStore>, writers: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(writers),
            gated: AtomicUsize::new(writers),
            transitions: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TaxFormStore for InterleavingStore {
    async fn insert_form(&self, form: NewTaxForm) -> Result<TaxForm, StoreError> {
        self.inner.insert_form(form).await
    }

    async fn load_form_by_id(&self, id: FormId) -> Result<Option<TaxForm>, StoreError> {
        let form = self.inner.load_form_by_id(id).await?;
        let gate = self
            .gated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if gate.is_ok() {
            self.barrier.wait().await;
        }
        Ok(form)
    }

    async fn list_forms_by_year(&self, year: i32) -> Result<Vec<TaxForm>, StoreError> {
        self.inner.list_forms_by_year(year).await
    }

    async fn persist_form(
        &self,
        form: &TaxForm,
        expected_status: TaxFormStatus,
    ) -> Result<(), StoreError> {
        self.inner.persist_form(form, expected_status).await
    }

    async fn append_history(&self, entry: NewHistoryEntry) -> Result<TaxFormHistory, StoreError> {
        self.inner.append_history(entry).await
    }

    async fn record_transition(
        &self,
        form: &TaxForm,
        expected_status: TaxFormStatus,
        entry: NewHistoryEntry,
    ) -> Result<TaxFormHistory, StoreError> {
        let result = self.inner.record_transition(form, expected_status, entry).await;
        let outcome = match &result {
            Ok(_) => Ok(()),
            Err(StoreError::StatusChanged { form_id, expected }) => {
                Err(StoreError::StatusChanged {
                    form_id: *form_id,
                    expected: *expected,
                })
            }
            Err(_) => Err(StoreError::Corrupt {
                reason: "unexpected store failure".to_string(),
            }),
        };
        self.transitions.lock().await.push(outcome);
        result
    }
}

#[tokio::test]
async fn test_concurrent_submits_only_one_wins() {
    let h = harness().await;
    h.service.save(h.form_id, details_a()).await.unwrap();

    let store = Arc::new(InterleavingStore::new(h.store.clone(), 2));
    let service = TaxFormService::new(store.clone());

    let (first, second) = tokio::join!(
        service.submit_form(h.form_id),
        service.submit_form(h.form_id)
    );

    // Both loads saw IN_PROGRESS, so both reached the store write.
    let transitions = store.transitions.lock().await;
    assert_eq!(transitions.len(), 2);
    assert_eq!(transitions.iter().filter(|t| t.is_ok()).count(), 1);
    assert_eq!(
        transitions
            .iter()
            .filter(|t| matches!(
                t,
                Err(StoreError::StatusChanged {
                    expected: TaxFormStatus::InProgress,
                    ..
                })
            ))
            .count(),
        1
    );

    let (winner, loser) = if first.is_ok() {
        (first, second)
    } else {
        (second, first)
    };
    assert_eq!(winner.unwrap().unwrap().status, TaxFormStatus::Submitted);
    assert_eq!(expect_conflict(loser), TaxFormStatus::Submitted);

    assert_eq!(h.store.history_count().await, 1);
}
