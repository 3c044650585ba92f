pub mod application;
pub mod command;
pub mod image;
pub mod server_group;
pub mod service_account;
pub mod task;

pub use application::Application;
pub use command::{
    DeployPolicy, DiskSpec, HealthCheckSpec, InstanceTemplate, ResourcesSpec, ServerGroupCommand,
    TargetGroupSpec, ViewState, WizardMode,
};
pub use image::Image;
pub use server_group::ServerGroupSummary;
pub use service_account::ServiceAccount;
pub use task::{Task, TaskRef, TaskStatus};
