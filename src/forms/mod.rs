// Tax form records, status workflow and audit history

pub mod errors;
pub mod memory;
pub mod service;
#[cfg(feature = "database")]
pub mod sqlite;
pub mod store;
pub mod types;
pub mod validation;
pub mod workflow;

pub use errors::{StoreError, TaxFormError};
pub use memory::InMemoryTaxFormStore;
pub use service::TaxFormService;
#[cfg(feature = "database")]
pub use sqlite::SqliteTaxFormStore;
#[cfg(any(test, feature = "testing"))]
pub use store::MockTaxFormStore;
pub use store::TaxFormStore;
pub use types::{
    FormId, HistoryId, NewHistoryEntry, NewTaxForm, TaxForm, TaxFormDetails, TaxFormHistory,
    TaxFormHistoryType, TaxFormHistoryView, TaxFormStatus, TaxFormView,
};
pub use validation::{FieldViolation, TaxFormDetailsRequest, ValidationError};
pub use workflow::{FormOperation, StatusConflict};
