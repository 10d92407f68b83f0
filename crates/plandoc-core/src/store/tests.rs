use chrono::Utc;
use serde_json::json;
use tempfile::{TempDir, tempdir};
use uuid::Uuid;

use crate::models::{Phase, Template, TemplateGraph, Visibility};

use super::*;

fn store() -> (TempDir, SqliteTemplateStore) {
    let temp = tempdir().expect("tempdir");
    let store = SqliteTemplateStore::open(temp.path().join("plandoc.db")).expect("open failed");
    (temp, store)
}

fn template(org_id: Uuid, title: &str, version: i64, family_id: Uuid) -> Template {
    let now = Utc::now();
    Template {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: None,
        version,
        family_id,
        customization_of: None,
        org_id,
        published: false,
        archived: false,
        is_default: false,
        visibility: Visibility::OrganisationallyVisible,
        links: None,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn open_is_idempotent() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("plandoc.db");
    let first = SqliteTemplateStore::open(&path).expect("first open failed");
    let stored = first
        .insert_template(template(Uuid::new_v4(), "Tester", 0, Uuid::new_v4()))
        .expect("insert failed");

    // Re-opening runs the migration batch again against the same file.
    let second = SqliteTemplateStore::open(&path).expect("second open failed");
    let found = second
        .get_template(stored.id)
        .expect("get failed")
        .expect("expected the template to survive reopen");
    assert_eq!(found.title, "Tester");
}

#[test]
fn insert_and_get_roundtrip() {
    let (_temp, store) = store();
    let family_id = Uuid::new_v4();
    let source_family = Uuid::new_v4();
    let mut draft = template(Uuid::new_v4(), "Roundtrip", 2, family_id);
    draft.description = Some("a template".to_string());
    draft.customization_of = Some(source_family);
    draft.visibility = Visibility::PubliclyVisible;
    draft.links = Some(json!({ "funder": [], "sample_plan": [] }));

    let stored = store.insert_template(draft).expect("insert failed");
    let found = store
        .get_template(stored.id)
        .expect("get failed")
        .expect("expected the template");

    assert_eq!(found, stored);
    assert_eq!(found.customization_of, Some(source_family));
    assert_eq!(found.links, Some(json!({ "funder": [], "sample_plan": [] })));
}

#[test]
fn get_missing_template_is_none() {
    let (_temp, store) = store();
    assert!(store.get_template(Uuid::new_v4()).expect("get failed").is_none());
}

#[test]
fn duplicate_family_version_is_a_conflict() {
    let (_temp, store) = store();
    let org_id = Uuid::new_v4();
    let family_id = Uuid::new_v4();

    store
        .insert_template(template(org_id, "First", 0, family_id))
        .expect("first insert failed");
    let err = store
        .insert_template(template(org_id, "Second", 0, family_id))
        .expect_err("expected a uniqueness conflict");
    assert!(err.is_conflict(), "expected Conflict, got {err:?}");
}

#[test]
fn same_version_in_different_families_is_allowed() {
    let (_temp, store) = store();
    let org_id = Uuid::new_v4();
    store
        .insert_template(template(org_id, "First", 0, Uuid::new_v4()))
        .expect("first insert failed");
    store
        .insert_template(template(org_id, "Second", 0, Uuid::new_v4()))
        .expect("second insert failed");
}

#[test]
fn duplicate_customization_version_org_is_a_conflict() {
    let (_temp, store) = store();
    let source_family = Uuid::new_v4();
    let org_id = Uuid::new_v4();
    let other_org = Uuid::new_v4();

    let mut first = template(org_id, "Fork", 0, Uuid::new_v4());
    first.customization_of = Some(source_family);
    store.insert_template(first).expect("first insert failed");

    let mut duplicate = template(org_id, "Fork again", 0, Uuid::new_v4());
    duplicate.customization_of = Some(source_family);
    let err = store
        .insert_template(duplicate)
        .expect_err("expected a uniqueness conflict");
    assert!(err.is_conflict(), "expected Conflict, got {err:?}");

    // A different org may hold its own customization at the same version.
    let mut by_other = template(other_org, "Other fork", 0, Uuid::new_v4());
    by_other.customization_of = Some(source_family);
    store.insert_template(by_other).expect("other org insert failed");
}

#[test]
fn insert_graph_is_atomic_on_conflict() {
    let (_temp, store) = store();
    let org_id = Uuid::new_v4();
    let family_id = Uuid::new_v4();
    store
        .insert_template(template(org_id, "Existing", 1, family_id))
        .expect("seed insert failed");

    let now = Utc::now();
    let clone = template(org_id, "Loser", 1, family_id);
    let clone_id = clone.id;
    let graph = TemplateGraph {
        template: clone,
        phases: vec![Phase {
            id: Uuid::new_v4(),
            template_id: clone_id,
            title: "Phase 1".to_string(),
            number: 1,
            modifiable: true,
            created_at: now,
            updated_at: now,
        }],
        plans: Vec::new(),
    };

    let err = store
        .insert_graph(graph)
        .expect_err("expected a uniqueness conflict");
    assert!(err.is_conflict(), "expected Conflict, got {err:?}");

    // Nothing from the losing graph may have been committed.
    assert!(store.get_template(clone_id).expect("get").is_none());
    assert!(store.phases_of(clone_id).expect("phases query").is_empty());
}

#[test]
fn insert_graph_persists_children() {
    let (_temp, store) = store();
    let draft = template(Uuid::new_v4(), "Parent", 0, Uuid::new_v4());
    let template_id = draft.id;
    let now = Utc::now();
    let graph = TemplateGraph {
        template: draft,
        phases: vec![Phase {
            id: Uuid::new_v4(),
            template_id,
            title: "Phase 1".to_string(),
            number: 1,
            modifiable: false,
            created_at: now,
            updated_at: now,
        }],
        plans: Vec::new(),
    };

    let stored = store.insert_graph(graph).expect("insert_graph failed");
    let loaded = store
        .load_graph(stored.id)
        .expect("load_graph failed")
        .expect("expected the graph");
    assert_eq!(loaded.template.id, stored.id);
    assert_eq!(loaded.phases.len(), 1);
    assert!(!loaded.phases[0].modifiable);
    assert!(loaded.plans.is_empty());
}

#[test]
fn latest_version_number_is_none_for_an_empty_family() {
    let (_temp, store) = store();
    assert_eq!(
        store
            .latest_version_number(Uuid::new_v4())
            .expect("query failed"),
        None
    );
}

#[test]
fn latest_version_number_is_the_family_maximum() {
    let (_temp, store) = store();
    let org_id = Uuid::new_v4();
    let family_id = Uuid::new_v4();
    store
        .insert_template(template(org_id, "v0", 0, family_id))
        .expect("insert v0");
    store
        .insert_template(template(org_id, "v3", 3, family_id))
        .expect("insert v3");
    store
        .insert_template(template(org_id, "v1", 1, family_id))
        .expect("insert v1");

    assert_eq!(
        store.latest_version_number(family_id).expect("query failed"),
        Some(3)
    );
    let latest = store
        .latest_version(family_id)
        .expect("query failed")
        .expect("expected a latest version");
    assert_eq!(latest.title, "v3");
}

#[test]
fn unarchived_returns_only_unarchived_templates() {
    let (_temp, store) = store();
    let org_id = Uuid::new_v4();
    let kept = store
        .insert_template(template(org_id, "Kept", 0, Uuid::new_v4()))
        .expect("insert kept");
    let archived = store
        .insert_template(template(org_id, "Archived", 0, Uuid::new_v4()))
        .expect("insert archived");
    store.set_archived(archived.id, true).expect("archive failed");

    let results = store.unarchived().expect("query failed");
    assert_eq!(results.len(), 1, "expected only one unarchived template");
    assert_eq!(results[0].id, kept.id);
}

#[test]
fn archived_returns_only_archived_templates() {
    let (_temp, store) = store();
    let org_id = Uuid::new_v4();
    store
        .insert_template(template(org_id, "Kept", 0, Uuid::new_v4()))
        .expect("insert kept");
    let archived = store
        .insert_template(template(org_id, "Archived", 0, Uuid::new_v4()))
        .expect("insert archived");
    store.set_archived(archived.id, true).expect("archive failed");

    let results = store.archived().expect("query failed");
    assert_eq!(results.len(), 1, "expected only one archived template");
    assert_eq!(results[0].id, archived.id);
}

#[test]
fn published_returns_only_published_templates() {
    let (_temp, store) = store();
    let org_id = Uuid::new_v4();
    store
        .insert_template(template(org_id, "Draft", 0, Uuid::new_v4()))
        .expect("insert draft");
    let published = store
        .insert_template(template(org_id, "Published", 0, Uuid::new_v4()))
        .expect("insert published");
    store.set_published(published.id, true).expect("publish failed");

    let results = store.published().expect("query failed");
    assert_eq!(results.len(), 1, "expected only one published template");
    assert_eq!(results[0].id, published.id);
}

#[test]
fn org_customizations_pick_the_highest_version_per_family() {
    let (_temp, store) = store();
    let org_id = Uuid::new_v4();
    let family_a = Uuid::new_v4();
    let family_b = Uuid::new_v4();
    let uncustomized = Uuid::new_v4();

    let mut a0 = template(org_id, "A v0", 0, Uuid::new_v4());
    a0.customization_of = Some(family_a);
    store.insert_template(a0).expect("insert a0");
    let mut a1 = template(org_id, "A v1", 1, Uuid::new_v4());
    a1.customization_of = Some(family_a);
    let a1 = store.insert_template(a1).expect("insert a1");

    let mut b0 = template(org_id, "B v0", 0, Uuid::new_v4());
    b0.customization_of = Some(family_b);
    b0.published = true;
    let b0 = store.insert_template(b0).expect("insert b0");

    let results = store
        .org_customizations(&[family_a, family_b, uncustomized], org_id)
        .expect("query failed");

    assert_eq!(results.len(), 2, "expected one row per customized family");
    let ids: Vec<Uuid> = results.iter().map(|row| row.id).collect();
    assert!(ids.contains(&a1.id), "expected the highest version for family A");
    assert!(ids.contains(&b0.id), "expected the only version for family B");
}

#[test]
fn set_published_bumps_updated_at() {
    let (_temp, store) = store();
    let stored = store
        .insert_template(template(Uuid::new_v4(), "Tester", 0, Uuid::new_v4()))
        .expect("insert failed");

    let published = store.set_published(stored.id, true).expect("publish failed");
    assert!(published.published);
    assert!(published.updated_at > stored.updated_at);
    assert_eq!(published.created_at, stored.created_at);
}

#[test]
fn flag_updates_on_missing_templates_are_not_found() {
    let (_temp, store) = store();
    let err = store
        .set_published(Uuid::new_v4(), true)
        .expect_err("expected not found");
    assert!(matches!(err, crate::error::PlandocError::NotFound(_)));

    let err = store
        .set_archived(Uuid::new_v4(), true)
        .expect_err("expected not found");
    assert!(matches!(err, crate::error::PlandocError::NotFound(_)));
}

#[test]
fn add_phase_and_add_plan_roundtrip() {
    let (_temp, store) = store();
    let stored = store
        .insert_template(template(Uuid::new_v4(), "Parent", 0, Uuid::new_v4()))
        .expect("insert failed");

    let phase = store
        .add_phase(stored.id, "Test Phase", 2, true)
        .expect("add_phase failed");
    let plan = store
        .add_plan(stored.id, "Test Plan", "is_test")
        .expect("add_plan failed");

    let phases = store.phases_of(stored.id).expect("phases query");
    assert_eq!(phases.len(), 1);
    assert_eq!(phases[0].id, phase.id);
    assert_eq!(phases[0].number, 2);

    let plans = store.plans_of(stored.id).expect("plans query");
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].id, plan.id);
    assert_eq!(plans[0].visibility, "is_test");
}

#[test]
fn add_phase_to_missing_template_is_not_found() {
    let (_temp, store) = store();
    let err = store
        .add_phase(Uuid::new_v4(), "Orphan", 1, true)
        .expect_err("expected not found");
    assert!(matches!(err, crate::error::PlandocError::NotFound(_)));
}

#[test]
fn update_links_replaces_the_stored_value() {
    let (_temp, store) = store();
    let stored = store
        .insert_template(template(Uuid::new_v4(), "Tester", 0, Uuid::new_v4()))
        .expect("insert failed");
    assert_eq!(stored.links, None);

    let value = json!({ "funder": [{ "link": "foo", "text": "bar" }], "sample_plan": [] });
    let updated = store
        .update_links(stored.id, Some(&value))
        .expect("update failed");
    assert_eq!(updated.links, Some(value));

    let cleared = store.update_links(stored.id, None).expect("clear failed");
    assert_eq!(cleared.links, None);
}
