// Tax Forms Library - property tax form records and approval workflow
// This exposes the core components for testing and integration

pub mod cli;
pub mod config;
#[cfg(feature = "database")]
pub mod database;
pub mod forms;
pub mod telemetry;

// Re-export key types for easy access
pub use config::{config, TaxFormsConfig};
#[cfg(feature = "database")]
pub use database::DatabaseManager;
pub use forms::{
    FormOperation, InMemoryTaxFormStore, StatusConflict, TaxFormError, TaxFormService,
    TaxFormStatus, TaxFormStore, TaxFormView,
};
pub use telemetry::{create_form_span, generate_correlation_id, init_telemetry};
