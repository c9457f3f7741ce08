use clap::{Parser, Subcommand};

pub mod commands;

pub use commands::{execute, CliError};

#[derive(Parser)]
#[command(name = "tax-forms")]
#[command(about = "Property tax form records and approval workflow")]
#[command(long_about = "Manage per-year property tax forms: edit appraisal details, then move each \
                       form through submit and return/accept. Every workflow transition is recorded \
                       in the form's audit history. Output is JSON on stdout.")]
pub struct Cli {
    /// Database URL, overrides configuration
    #[arg(long, global = true, help = "SQLite URL, e.g. sqlite://tax-forms.db")]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// List every form for a year, including its history
    List {
        #[arg(long, help = "Form year to list")]
        year: i32,
    },
    /// Show a single form with details and history
    Show { id: i64 },
    /// Replace a form's appraisal details (only while NOT_STARTED or IN_PROGRESS)
    Save {
        id: i64,
        #[arg(long, allow_negative_numbers = true, help = "Assessed value, 0-100000 (required)")]
        assessed_value: Option<i64>,
        #[arg(long, allow_negative_numbers = true, help = "Appraised value, 0-100000")]
        appraised_value: Option<i64>,
        #[arg(long, allow_negative_numbers = true, help = "Assessment ratio, 0.0-1.0 (required)")]
        ratio: Option<f64>,
        #[arg(long, help = "Free-text comments, at most 500 characters")]
        comments: Option<String>,
    },
    /// Submit an in-progress form for review
    Submit { id: i64 },
    /// Return a submitted form
    Return { id: i64 },
    /// Accept a submitted form
    Accept { id: i64 },
    /// Create a new NOT_STARTED form
    Create {
        #[arg(long, help = "Form year")]
        year: i32,
        #[arg(long, help = "Form name")]
        name: String,
    },
}
