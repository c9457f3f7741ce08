use std::sync::Arc;
use thiserror::Error;

use crate::config::TaxFormsConfig;
use crate::forms::{
    FormId, StatusConflict, TaxFormError, TaxFormService, TaxFormStore, ValidationError,
};

use super::Cli;

pub mod forms;

pub use forms::FormsCommand;

/// Transport-level failures with stable process exit codes
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    InvalidInput(#[from] ValidationError),

    #[error("Tax form {0} not found")]
    NotFound(FormId),

    #[error("Conflict: {0}")]
    Conflict(StatusConflict),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidInput(_) => 2,
            CliError::NotFound(_) => 3,
            CliError::Conflict(_) => 4,
            CliError::Output(_) | CliError::Other(_) => 1,
        }
    }
}

impl From<TaxFormError> for CliError {
    fn from(err: TaxFormError) -> Self {
        match err {
            TaxFormError::StatusConflict(conflict) => CliError::Conflict(conflict),
            TaxFormError::Store(store) => CliError::Other(store.into()),
        }
    }
}

#[cfg(feature = "database")]
async fn open_store(
    cli: &Cli,
    config: &TaxFormsConfig,
) -> anyhow::Result<(Arc<dyn TaxFormStore>, Option<crate::database::DatabaseManager>)> {
    let mut db_config = config.database.clone();
    if let Some(url) = &cli.database {
        db_config.url = url.clone();
    }

    let manager = crate::database::DatabaseManager::from_config(&db_config).await?;
    Ok((Arc::new(manager.store()), Some(manager)))
}

#[cfg(not(feature = "database"))]
async fn open_store(
    _cli: &Cli,
    _config: &TaxFormsConfig,
) -> anyhow::Result<(Arc<dyn TaxFormStore>, Option<()>)> {
    tracing::warn!("Database feature not enabled, using a process-local store");
    Ok((Arc::new(crate::forms::InMemoryTaxFormStore::new()), None))
}

/// Run one CLI command to completion and return its rendered output
pub async fn execute(cli: Cli, config: &TaxFormsConfig) -> Result<String, CliError> {
    let (store, manager) = open_store(&cli, config).await?;
    let command = FormsCommand::new(TaxFormService::new(store));

    let output = command.run(cli.command).await;

    #[cfg(feature = "database")]
    if let Some(manager) = manager {
        manager.shutdown().await;
    }
    #[cfg(not(feature = "database"))]
    let _ = manager;

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{FormOperation, StoreError, TaxFormStatus};

    #[test]
    fn test_exit_codes() {
        let conflict = StatusConflict {
            form_id: 1,
            current_status: TaxFormStatus::Accepted,
            attempted_operation: FormOperation::Save,
        };

        assert_eq!(CliError::NotFound(1).exit_code(), 3);
        assert_eq!(CliError::Conflict(conflict.clone()).exit_code(), 4);
        assert_eq!(
            CliError::InvalidInput(ValidationError { violations: vec![] }).exit_code(),
            2
        );
        assert_eq!(
            CliError::from(TaxFormError::StatusConflict(conflict)).exit_code(),
            4
        );
        assert_eq!(
            CliError::from(TaxFormError::Store(StoreError::FormNotFound { form_id: 1 }))
                .exit_code(),
            1
        );
    }
}
