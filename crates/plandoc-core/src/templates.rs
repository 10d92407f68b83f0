use std::path::Path;

use tracing::{debug, info};
use uuid::Uuid;

use crate::deep_copy::deep_copy;
use crate::error::{PlandocError, Result};
use crate::links::validate_links;
use crate::models::{NewTemplate, OrgRef, Relation, Template, TemplateGraph, Visibility};
use crate::store::SqliteTemplateStore;

/// Lifecycle facade over the template store: creation, version bumps,
/// customization forks and publish/archive transitions. Validation runs
/// fully before any write; uniqueness races surface as `Conflict`.
#[derive(Clone)]
pub struct TemplateService {
    pub store: SqliteTemplateStore,
}

impl std::fmt::Debug for TemplateService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateService").finish_non_exhaustive()
    }
}

impl TemplateService {
    #[must_use]
    pub fn new(store: SqliteTemplateStore) -> Self {
        Self { store }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(SqliteTemplateStore::open(path)?))
    }

    /// Creates an original template: fresh family, version 0, unpublished,
    /// unarchived, visibility derived from the owning org's kind.
    pub fn create(&self, request: NewTemplate) -> Result<Template> {
        validate_new(&request)?;

        let now = chrono::Utc::now();
        let template = Template {
            id: Uuid::new_v4(),
            title: request.title,
            description: request.description,
            version: request.version.unwrap_or(0),
            family_id: Uuid::new_v4(),
            customization_of: request.customization_of,
            org_id: request.org.id,
            published: false,
            archived: false,
            is_default: request.is_default,
            visibility: Visibility::for_org(request.org.kind),
            links: request.links,
            created_at: now,
            updated_at: now,
        };
        let stored = self.store.insert_template(template)?;
        info!(
            template_id = %stored.id,
            family_id = %stored.family_id,
            visibility = stored.visibility.as_str(),
            "created template"
        );
        Ok(stored)
    }

    pub fn get(&self, id: Uuid) -> Result<Template> {
        self.store
            .get_template(id)?
            .ok_or_else(|| PlandocError::NotFound(format!("template {id}")))
    }

    /// Structural clone of a template and the named nested relations; the
    /// result is unpersisted so callers can adjust version/family/fork
    /// attributes before committing the graph atomically.
    pub fn deep_copy(&self, id: Uuid, relations: &[Relation]) -> Result<TemplateGraph> {
        let source = self
            .store
            .load_graph(id)?
            .ok_or_else(|| PlandocError::NotFound(format!("template {id}")))?;
        Ok(deep_copy(&source, relations))
    }

    /// Clones the template as the next version of its family. The clone
    /// starts unarchived regardless of the source; family, visibility,
    /// default flag and published state carry over. A racing bump of the
    /// same family loses with a `Conflict`.
    pub fn new_version(&self, id: Uuid) -> Result<Template> {
        let mut graph = self.deep_copy(id, &[Relation::Phases, Relation::Plans])?;
        graph.template.version += 1;
        graph.template.archived = false;
        let stored = self.store.insert_graph(graph)?;
        debug!(
            template_id = %stored.id,
            family_id = %stored.family_id,
            version = stored.version,
            "created new template version"
        );
        Ok(stored)
    }

    /// Forks a source template as a customization owned by `org`: fresh
    /// family for the fork's own lineage, `customization_of` pointing at the
    /// source family, version reset to 0, visibility derived from the
    /// forking org's own kind. One customization per org per source version
    /// is enforced by storage.
    pub fn customize(&self, source_id: Uuid, org: OrgRef) -> Result<Template> {
        let mut graph = self.deep_copy(source_id, &[Relation::Phases, Relation::Plans])?;
        let source_family = graph.template.family_id;

        graph.template.family_id = Uuid::new_v4();
        graph.template.customization_of = Some(source_family);
        graph.template.version = 0;
        graph.template.published = false;
        graph.template.archived = false;
        graph.template.is_default = false;
        graph.template.org_id = org.id;
        graph.template.visibility = Visibility::for_org(org.kind);

        let stored = self.store.insert_graph(graph)?;
        info!(
            template_id = %stored.id,
            customization_of = %source_family,
            org_id = %org.id,
            "customized template"
        );
        Ok(stored)
    }

    pub fn publish(&self, id: Uuid) -> Result<Template> {
        let stored = self.store.set_published(id, true)?;
        info!(template_id = %id, "published template");
        Ok(stored)
    }

    pub fn unpublish(&self, id: Uuid) -> Result<Template> {
        let stored = self.store.set_published(id, false)?;
        info!(template_id = %id, "unpublished template");
        Ok(stored)
    }

    pub fn archive(&self, id: Uuid) -> Result<Template> {
        let stored = self.store.set_archived(id, true)?;
        info!(template_id = %id, "archived template");
        Ok(stored)
    }

    pub fn unarchive(&self, id: Uuid) -> Result<Template> {
        let stored = self.store.set_archived(id, false)?;
        info!(template_id = %id, "unarchived template");
        Ok(stored)
    }

    /// Pre-publication attribute edit for the links metadata; runs the same
    /// schema validation as creation.
    pub fn update_links(&self, id: Uuid, links: Option<&serde_json::Value>) -> Result<Template> {
        if let Some(value) = links {
            let messages = validate_links(value);
            if !messages.is_empty() {
                return Err(PlandocError::validation(messages));
            }
        }
        self.store.update_links(id, links)
    }
}

fn validate_new(request: &NewTemplate) -> Result<()> {
    let mut messages = Vec::new();
    if request.title.trim().is_empty() {
        messages.push("A title is expected for template".to_string());
    }
    if request.version.is_some_and(|version| version < 0) {
        messages.push("A non-negative version is expected for template".to_string());
    }
    if let Some(links) = &request.links {
        messages.extend(validate_links(links));
    }
    if messages.is_empty() {
        Ok(())
    } else {
        Err(PlandocError::validation(messages))
    }
}
