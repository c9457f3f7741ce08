use serde::Serialize;

use crate::forms::workflow::{self, FormOperation};
use crate::forms::{FormId, NewTaxForm, TaxFormDetailsRequest, TaxFormService, TaxFormView};

use super::super::Commands;
use super::CliError;

/// `show` output: the form plus the operations it currently accepts
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShowView {
    #[serde(flatten)]
    form: TaxFormView,
    allowed_operations: Vec<FormOperation>,
}

/// Turns service results into CLI responses: JSON on success, a typed
/// `CliError` for missing forms, invalid details and workflow conflicts.
pub struct FormsCommand {
    service: TaxFormService,
}

fn render<T: Serialize>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn found(id: FormId, view: Option<TaxFormView>) -> Result<String, CliError> {
    match view {
        Some(view) => render(&view),
        None => Err(CliError::NotFound(id)),
    }
}

impl FormsCommand {
    pub fn new(service: TaxFormService) -> Self {
        Self { service }
    }

    pub async fn run(&self, command: Commands) -> Result<String, CliError> {
        match command {
            Commands::List { year } => render(&self.service.find_all_by_year(year).await?),
            Commands::Show { id } => match self.service.find_by_id(id).await? {
                Some(form) => render(&ShowView {
                    allowed_operations: workflow::allowed_operations(form.status),
                    form,
                }),
                None => Err(CliError::NotFound(id)),
            },
            Commands::Save {
                id,
                assessed_value,
                appraised_value,
                ratio,
                comments,
            } => {
                let request = TaxFormDetailsRequest {
                    assessed_value,
                    appraised_value,
                    ratio,
                    comments,
                };
                self.save(id, request).await
            }
            Commands::Submit { id } => found(id, self.service.submit_form(id).await?),
            Commands::Return { id } => found(id, self.service.return_form(id).await?),
            Commands::Accept { id } => found(id, self.service.accept_form(id).await?),
            Commands::Create { year, name } => {
                render(&self.service.create_form(NewTaxForm::new(year, name)).await?)
            }
        }
    }

    /// Details are validated here, before the service is invoked
    pub async fn save(&self, id: FormId, request: TaxFormDetailsRequest) -> Result<String, CliError> {
        let details = request.into_details()?;
        found(id, self.service.save(id, details).await?)
    }
}
