//! Admin-side configuration: settings validation, problem details and the
//! metadata services controller.

pub mod metadata_services;
pub mod problem;
pub mod validator;

pub use metadata_services::{MetadataServicesController, Saved, SiteRegistrar, WranglerRegistrar};
pub use problem::ProblemDetail;
pub use validator::{FieldKind, FormData, SettingField, SubmittedContent, Validator};
