use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{OrgRef, Phase, Plan};

/// Visibility classification assigned once at creation and propagated
/// unchanged across version bumps (ownership does not change with a bump).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    OrganisationallyVisible,
    PubliclyVisible,
}

impl Visibility {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OrganisationallyVisible => "organisationally_visible",
            Self::PubliclyVisible => "publicly_visible",
        }
    }

    pub(crate) fn from_db(value: &str) -> Option<Self> {
        match value {
            "organisationally_visible" => Some(Self::OrganisationallyVisible),
            "publicly_visible" => Some(Self::PubliclyVisible),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: i64,
    /// Shared by every version of one logical template; assigned at the
    /// creation of version 0 and copied, never regenerated, thereafter.
    pub family_id: Uuid,
    /// Source family this template customizes, when it is a fork.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customization_of: Option<Uuid>,
    pub org_id: Uuid,
    pub published: bool,
    pub archived: bool,
    pub is_default: bool,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    #[must_use]
    pub fn publicly_visible(&self) -> bool {
        self.visibility == Visibility::PubliclyVisible
    }

    #[must_use]
    pub fn organisationally_visible(&self) -> bool {
        self.visibility == Visibility::OrganisationallyVisible
    }

    #[must_use]
    pub fn is_customization(&self) -> bool {
        self.customization_of.is_some()
    }
}

/// A template together with its cloneable nested children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateGraph {
    pub template: Template,
    pub phases: Vec<Phase>,
    pub plans: Vec<Plan>,
}

/// Creation request. `version` defaults to 0 and `customization_of` lets a
/// caller record a fork against a source family directly.
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub title: String,
    pub description: Option<String>,
    pub org: OrgRef,
    pub version: Option<i64>,
    pub customization_of: Option<Uuid>,
    pub links: Option<serde_json::Value>,
    pub is_default: bool,
}

impl NewTemplate {
    #[must_use]
    pub fn new(title: impl Into<String>, org: OrgRef) -> Self {
        Self {
            title: title.into(),
            description: None,
            org,
            version: None,
            customization_of: None,
            links: None,
            is_default: false,
        }
    }
}
