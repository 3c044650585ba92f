//! Server group creation wizard for the yandex cloud provider.
//!
//! The [`wizard`] module holds the wizard itself: template-selection gate,
//! account-scoped reference-data loading and the submission dispatcher. The
//! [`api`] module defines the collaborators it talks to and implements them
//! over the gate REST API; [`tasks`] follows submitted create/clone tasks.
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;
pub mod utils;
pub mod wizard;

pub use error::{ApiError, Result, WizardError};
pub use wizard::{ServerGroupWizard, WizardProps, WizardServices};
