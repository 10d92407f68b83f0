mod children;
mod org;
mod template;

pub use children::{Phase, Plan, Relation};
pub use org::{OrgKind, OrgRef};
pub use template::{NewTemplate, Template, TemplateGraph, Visibility};
