// Public fallible APIs in this crate share one concrete error contract (`PlandocError`).
// Repeating per-function `# Errors` boilerplate obscures behavior more than it clarifies.
#![allow(
    clippy::missing_errors_doc,
    reason = "crate-wide fallible API uses one explicit error type; per-item boilerplate would duplicate contract"
)]

pub mod deep_copy;
pub mod error;
pub mod links;
pub mod models;
pub mod store;
pub mod templates;
pub(crate) mod visibility;

pub use error::{PlandocError, Result, ValidationErrors};
pub use links::validate_links;
pub use models::{
    NewTemplate, OrgKind, OrgRef, Phase, Plan, Relation, Template, TemplateGraph, Visibility,
};
pub use store::SqliteTemplateStore;
pub use templates::TemplateService;
