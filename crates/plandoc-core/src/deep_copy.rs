use chrono::Utc;
use uuid::Uuid;

use crate::models::{Phase, Plan, Relation, Template, TemplateGraph};

/// Produces a structurally independent clone of a template and the nested
/// relations named in `relations`. Scalars are copied verbatim, identities
/// are fresh, children are re-parented to the clone, and timestamps are
/// reset. The result is unpersisted: callers adjust version/family/fork
/// attributes as needed and commit the whole graph in one transaction.
#[must_use]
pub fn deep_copy(source: &TemplateGraph, relations: &[Relation]) -> TemplateGraph {
    let now = Utc::now();
    let template = Template {
        id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        ..source.template.clone()
    };

    let phases = if relations.contains(&Relation::Phases) {
        source
            .phases
            .iter()
            .map(|phase| Phase {
                id: Uuid::new_v4(),
                template_id: template.id,
                created_at: now,
                updated_at: now,
                ..phase.clone()
            })
            .collect()
    } else {
        Vec::new()
    };

    let plans = if relations.contains(&Relation::Plans) {
        source
            .plans
            .iter()
            .map(|plan| Plan {
                id: Uuid::new_v4(),
                template_id: template.id,
                created_at: now,
                updated_at: now,
                ..plan.clone()
            })
            .collect()
    } else {
        Vec::new()
    };

    TemplateGraph {
        template,
        phases,
        plans,
    }
}
