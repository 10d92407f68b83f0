use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Explicit classification of an owning organization. Consumed only by the
/// visibility policy; orgs themselves are an external collaborator and are
/// not persisted by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgKind {
    Funder,
    Organisation,
    Institution,
    FunderAndOrganisation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgRef {
    pub id: Uuid,
    pub kind: OrgKind,
}

impl OrgRef {
    #[must_use]
    pub fn new(id: Uuid, kind: OrgKind) -> Self {
        Self { id, kind }
    }
}
