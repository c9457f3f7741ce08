use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use tracing::debug;

use super::errors::StoreError;
use super::store::TaxFormStore;
use super::types::{
    FormId, NewHistoryEntry, NewTaxForm, TaxForm, TaxFormDetails, TaxFormHistory,
    TaxFormHistoryType, TaxFormStatus,
};

/// Tax form tables in SQLite, see `migrations/`
#[derive(Debug, Clone)]
pub struct SqliteTaxFormStore {
    pool: SqlitePool,
}

fn encode_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            reason: format!("invalid timestamp {raw:?}: {e}"),
        })
}

fn encode_details(details: Option<&TaxFormDetails>) -> Result<Option<String>, StoreError> {
    Ok(details.map(serde_json::to_string).transpose()?)
}

fn form_from_row(row: &SqliteRow) -> Result<TaxForm, StoreError> {
    let status: String = row.try_get("status")?;
    let details: Option<String> = row.try_get("details")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(TaxForm {
        id: row.try_get("id")?,
        form_year: row.try_get("form_year")?,
        form_name: row.try_get("form_name")?,
        status: status
            .parse::<TaxFormStatus>()
            .map_err(|reason| StoreError::Corrupt { reason })?,
        details: details
            .as_deref()
            .map(serde_json::from_str::<TaxFormDetails>)
            .transpose()?,
        created_at: decode_timestamp(&created_at)?,
        updated_at: decode_timestamp(&updated_at)?,
        history: Vec::new(),
    })
}

fn history_from_row(row: &SqliteRow) -> Result<TaxFormHistory, StoreError> {
    let kind: String = row.try_get("type")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(TaxFormHistory {
        id: row.try_get("id")?,
        tax_form_id: row.try_get("tax_form_id")?,
        created_at: decode_timestamp(&created_at)?,
        kind: kind
            .parse::<TaxFormHistoryType>()
            .map_err(|reason| StoreError::Corrupt { reason })?,
    })
}

impl SqliteTaxFormStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn update_form(
        tx: &mut Transaction<'_, Sqlite>,
        form: &TaxForm,
        expected_status: TaxFormStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE tax_forms
            SET status = ?1, details = ?2, updated_at = ?3
            WHERE id = ?4 AND status = ?5
            "#,
        )
        .bind(form.status.as_str())
        .bind(encode_details(form.details.as_ref())?)
        .bind(encode_timestamp(&form.updated_at))
        .bind(form.id)
        .bind(expected_status.as_str())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists = sqlx::query("SELECT 1 FROM tax_forms WHERE id = ?1")
            .bind(form.id)
            .fetch_optional(&mut **tx)
            .await?
            .is_some();

        if exists {
            Err(StoreError::StatusChanged {
                form_id: form.id,
                expected: expected_status,
            })
        } else {
            Err(StoreError::FormNotFound { form_id: form.id })
        }
    }

    async fn insert_history(
        tx: &mut Transaction<'_, Sqlite>,
        entry: NewHistoryEntry,
    ) -> Result<TaxFormHistory, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO tax_form_history (tax_form_id, created_at, type)
            SELECT ?1, ?2, ?3
            WHERE EXISTS (SELECT 1 FROM tax_forms WHERE id = ?1)
            "#,
        )
        .bind(entry.tax_form_id)
        .bind(encode_timestamp(&entry.created_at))
        .bind(entry.kind.as_str())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::FormNotFound {
                form_id: entry.tax_form_id,
            });
        }

        Ok(TaxFormHistory {
            id: result.last_insert_rowid(),
            tax_form_id: entry.tax_form_id,
            created_at: entry.created_at,
            kind: entry.kind,
        })
    }

    async fn load_history(
        tx: &mut Transaction<'_, Sqlite>,
        form_id: FormId,
    ) -> Result<Vec<TaxFormHistory>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, tax_form_id, created_at, type
            FROM tax_form_history
            WHERE tax_form_id = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(form_id)
        .fetch_all(&mut **tx)
        .await?;

        rows.iter().map(history_from_row).collect()
    }
}

#[async_trait]
impl TaxFormStore for SqliteTaxFormStore {
    async fn insert_form(&self, form: NewTaxForm) -> Result<TaxForm, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO tax_forms (form_year, form_name, status, details, created_at, updated_at)
            VALUES (?1, ?2, ?3, NULL, ?4, ?4)
            "#,
        )
        .bind(form.form_year)
        .bind(&form.form_name)
        .bind(TaxFormStatus::NotStarted.as_str())
        .bind(encode_timestamp(&now))
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(form_id = id, form_year = form.form_year, "Inserted tax form");

        Ok(TaxForm {
            id,
            form_year: form.form_year,
            form_name: form.form_name,
            status: TaxFormStatus::NotStarted,
            details: None,
            created_at: now,
            updated_at: now,
            history: Vec::new(),
        })
    }

    async fn load_form_by_id(&self, id: FormId) -> Result<Option<TaxForm>, StoreError> {
        // Form row and history are read from one snapshot.
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            r#"
            SELECT id, form_year, form_name, status, details, created_at, updated_at
            FROM tax_forms
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        let mut form = form_from_row(&row)?;
        form.history = Self::load_history(&mut tx, form.id).await?;
        tx.commit().await?;
        Ok(Some(form))
    }

    async fn list_forms_by_year(&self, year: i32) -> Result<Vec<TaxForm>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let form_rows = sqlx::query(
            r#"
            SELECT id, form_year, form_name, status, details, created_at, updated_at
            FROM tax_forms
            WHERE form_year = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(year)
        .fetch_all(&mut *tx)
        .await?;

        let history_rows = sqlx::query(
            r#"
            SELECT h.id, h.tax_form_id, h.created_at, h.type
            FROM tax_form_history h
            JOIN tax_forms f ON f.id = h.tax_form_id
            WHERE f.form_year = ?1
            ORDER BY h.tax_form_id ASC, h.id ASC
            "#,
        )
        .bind(year)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let mut history_by_form: HashMap<FormId, Vec<TaxFormHistory>> = HashMap::new();
        for row in &history_rows {
            let entry = history_from_row(row)?;
            history_by_form.entry(entry.tax_form_id).or_default().push(entry);
        }

        form_rows
            .iter()
            .map(|row| {
                let mut form = form_from_row(row)?;
                form.history = history_by_form.remove(&form.id).unwrap_or_default();
                Ok(form)
            })
            .collect()
    }

    async fn persist_form(
        &self,
        form: &TaxForm,
        expected_status: TaxFormStatus,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::update_form(&mut tx, form, expected_status).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn append_history(&self, entry: NewHistoryEntry) -> Result<TaxFormHistory, StoreError> {
        let mut tx = self.pool.begin().await?;
        let recorded = Self::insert_history(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(recorded)
    }

    async fn record_transition(
        &self,
        form: &TaxForm,
        expected_status: TaxFormStatus,
        entry: NewHistoryEntry,
    ) -> Result<TaxFormHistory, StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::update_form(&mut tx, form, expected_status).await?;
        let recorded = Self::insert_history(&mut tx, entry).await?;
        tx.commit().await?;

        debug!(
            form_id = form.id,
            status = %form.status,
            history_id = recorded.id,
            "Recorded tax form transition"
        );
        Ok(recorded)
    }
}
