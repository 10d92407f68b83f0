use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use crate::error::{PlandocError, Result};
use crate::models::{Phase, Plan, Template, TemplateGraph};

mod migration;
mod queries;

#[cfg(test)]
mod tests;

pub(crate) const TEMPLATE_COLUMNS: &str = "id, title, description, version, family_id, \
     customization_of, org_id, published, archived, is_default, visibility, links, \
     created_at, updated_at";

/// SQLite-backed template store. The two lineage uniqueness constraints
/// (`(family_id, version)` and `(customization_of, version, org_id)`) live in
/// the schema; racing writers lose at commit time with a `Conflict`.
#[derive(Clone)]
pub struct SqliteTemplateStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteTemplateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTemplateStore").finish_non_exhaustive()
    }
}

impl SqliteTemplateStore {
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| PlandocError::mutex_poisoned("sqlite"))?;
        f(&conn)
    }

    fn with_tx<T>(&self, f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| PlandocError::mutex_poisoned("sqlite"))?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        drop(conn);
        Ok(value)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Persists a single template row. Timestamps are stamped by the store;
    /// whatever the caller put there is overwritten.
    pub fn insert_template(&self, template: Template) -> Result<Template> {
        let now = Utc::now();
        let template = Template {
            created_at: now,
            updated_at: now,
            ..template
        };
        self.with_conn(|conn| insert_template_row(conn, &template))?;
        Ok(template)
    }

    /// Persists a template together with its cloned children as one atomic
    /// unit: either the whole graph commits or none of it does.
    pub fn insert_graph(&self, graph: TemplateGraph) -> Result<Template> {
        let now = Utc::now();
        let template = Template {
            created_at: now,
            updated_at: now,
            ..graph.template
        };
        self.with_tx(|tx| {
            insert_template_row(tx, &template)?;
            for phase in &graph.phases {
                let phase = Phase {
                    created_at: now,
                    updated_at: now,
                    ..phase.clone()
                };
                insert_phase_row(tx, &phase)?;
            }
            for plan in &graph.plans {
                let plan = Plan {
                    created_at: now,
                    updated_at: now,
                    ..plan.clone()
                };
                insert_plan_row(tx, &plan)?;
            }
            Ok(())
        })?;
        Ok(template)
    }

    pub fn get_template(&self, id: Uuid) -> Result<Option<Template>> {
        self.with_conn(|conn| get_template_conn(conn, id))
    }

    /// Loads a template with all of its cloneable children.
    pub fn load_graph(&self, id: Uuid) -> Result<Option<TemplateGraph>> {
        self.with_conn(|conn| {
            let Some(template) = get_template_conn(conn, id)? else {
                return Ok(None);
            };
            let phases = phases_of_conn(conn, template.id)?;
            let plans = plans_of_conn(conn, template.id)?;
            Ok(Some(TemplateGraph {
                template,
                phases,
                plans,
            }))
        })
    }

    pub fn set_published(&self, id: Uuid, published: bool) -> Result<Template> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE templates SET published = ?1, updated_at = ?2 WHERE id = ?3",
                params![published, Utc::now().to_rfc3339(), id.to_string()],
            )?;
            if affected == 0 {
                return Err(PlandocError::NotFound(format!("template {id}")));
            }
            get_template_conn(conn, id)?
                .ok_or_else(|| PlandocError::NotFound(format!("template {id}")))
        })
    }

    pub fn set_archived(&self, id: Uuid, archived: bool) -> Result<Template> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE templates SET archived = ?1, updated_at = ?2 WHERE id = ?3",
                params![archived, Utc::now().to_rfc3339(), id.to_string()],
            )?;
            if affected == 0 {
                return Err(PlandocError::NotFound(format!("template {id}")));
            }
            get_template_conn(conn, id)?
                .ok_or_else(|| PlandocError::NotFound(format!("template {id}")))
        })
    }

    pub fn update_links(&self, id: Uuid, links: Option<&serde_json::Value>) -> Result<Template> {
        let payload = links.map(serde_json::to_string).transpose()?;
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE templates SET links = ?1, updated_at = ?2 WHERE id = ?3",
                params![payload, Utc::now().to_rfc3339(), id.to_string()],
            )?;
            if affected == 0 {
                return Err(PlandocError::NotFound(format!("template {id}")));
            }
            get_template_conn(conn, id)?
                .ok_or_else(|| PlandocError::NotFound(format!("template {id}")))
        })
    }

    pub fn add_phase(
        &self,
        template_id: Uuid,
        title: &str,
        number: i64,
        modifiable: bool,
    ) -> Result<Phase> {
        let now = Utc::now();
        let phase = Phase {
            id: Uuid::new_v4(),
            template_id,
            title: title.to_string(),
            number,
            modifiable,
            created_at: now,
            updated_at: now,
        };
        self.with_conn(|conn| {
            if get_template_conn(conn, template_id)?.is_none() {
                return Err(PlandocError::NotFound(format!("template {template_id}")));
            }
            insert_phase_row(conn, &phase)
        })?;
        Ok(phase)
    }

    pub fn add_plan(&self, template_id: Uuid, title: &str, visibility: &str) -> Result<Plan> {
        let now = Utc::now();
        let plan = Plan {
            id: Uuid::new_v4(),
            template_id,
            title: title.to_string(),
            visibility: visibility.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.with_conn(|conn| {
            if get_template_conn(conn, template_id)?.is_none() {
                return Err(PlandocError::NotFound(format!("template {template_id}")));
            }
            insert_plan_row(conn, &plan)
        })?;
        Ok(plan)
    }

    pub fn phases_of(&self, template_id: Uuid) -> Result<Vec<Phase>> {
        self.with_conn(|conn| phases_of_conn(conn, template_id))
    }

    pub fn plans_of(&self, template_id: Uuid) -> Result<Vec<Plan>> {
        self.with_conn(|conn| plans_of_conn(conn, template_id))
    }
}

pub(crate) struct RawTemplate {
    id: String,
    title: String,
    description: Option<String>,
    version: i64,
    family_id: String,
    customization_of: Option<String>,
    org_id: String,
    published: bool,
    archived: bool,
    is_default: bool,
    visibility: String,
    links: Option<String>,
    created_at: String,
    updated_at: String,
}

pub(crate) fn raw_template_from_row(row: &Row<'_>) -> rusqlite::Result<RawTemplate> {
    Ok(RawTemplate {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        version: row.get(3)?,
        family_id: row.get(4)?,
        customization_of: row.get(5)?,
        org_id: row.get(6)?,
        published: row.get(7)?,
        archived: row.get(8)?,
        is_default: row.get(9)?,
        visibility: row.get(10)?,
        links: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

impl RawTemplate {
    pub(crate) fn into_template(self) -> Result<Template> {
        let visibility =
            crate::models::Visibility::from_db(&self.visibility).ok_or_else(|| {
                PlandocError::Internal(format!("unknown visibility in storage: {}", self.visibility))
            })?;
        Ok(Template {
            id: parse_uuid(&self.id)?,
            title: self.title,
            description: self.description,
            version: self.version,
            family_id: parse_uuid(&self.family_id)?,
            customization_of: self
                .customization_of
                .as_deref()
                .map(parse_uuid)
                .transpose()?,
            org_id: parse_uuid(&self.org_id)?,
            published: self.published,
            archived: self.archived,
            is_default: self.is_default,
            visibility,
            links: self
                .links
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn get_template_conn(conn: &Connection, id: Uuid) -> Result<Option<Template>> {
    let raw = conn
        .query_row(
            &format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = ?1"),
            params![id.to_string()],
            raw_template_from_row,
        )
        .optional()?;
    raw.map(RawTemplate::into_template).transpose()
}

fn insert_template_row(conn: &Connection, template: &Template) -> Result<()> {
    let links = template
        .links
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    conn.execute(
        r"
        INSERT INTO templates (
            id, title, description, version, family_id, customization_of, org_id,
            published, archived, is_default, visibility, links, created_at, updated_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        ",
        params![
            template.id.to_string(),
            template.title,
            template.description,
            template.version,
            template.family_id.to_string(),
            template.customization_of.map(|id| id.to_string()),
            template.org_id.to_string(),
            template.published,
            template.archived,
            template.is_default,
            template.visibility.as_str(),
            links,
            template.created_at.to_rfc3339(),
            template.updated_at.to_rfc3339(),
        ],
    )
    .map_err(unique_conflict)?;
    Ok(())
}

fn insert_phase_row(conn: &Connection, phase: &Phase) -> Result<()> {
    conn.execute(
        r"
        INSERT INTO phases (id, template_id, title, number, modifiable, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
        params![
            phase.id.to_string(),
            phase.template_id.to_string(),
            phase.title,
            phase.number,
            phase.modifiable,
            phase.created_at.to_rfc3339(),
            phase.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn insert_plan_row(conn: &Connection, plan: &Plan) -> Result<()> {
    conn.execute(
        r"
        INSERT INTO plans (id, template_id, title, visibility, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ",
        params![
            plan.id.to_string(),
            plan.template_id.to_string(),
            plan.title,
            plan.visibility,
            plan.created_at.to_rfc3339(),
            plan.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn phases_of_conn(conn: &Connection, template_id: Uuid) -> Result<Vec<Phase>> {
    let mut stmt = conn.prepare(
        r"
        SELECT id, template_id, title, number, modifiable, created_at, updated_at
        FROM phases
        WHERE template_id = ?1
        ORDER BY number ASC, id ASC
        ",
    )?;
    let rows = stmt.query_map(params![template_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, bool>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (id, template_id, title, number, modifiable, created_at, updated_at) = row?;
        out.push(Phase {
            id: parse_uuid(&id)?,
            template_id: parse_uuid(&template_id)?,
            title,
            number,
            modifiable,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        });
    }
    Ok(out)
}

fn plans_of_conn(conn: &Connection, template_id: Uuid) -> Result<Vec<Plan>> {
    let mut stmt = conn.prepare(
        r"
        SELECT id, template_id, title, visibility, created_at, updated_at
        FROM plans
        WHERE template_id = ?1
        ORDER BY created_at ASC, id ASC
        ",
    )?;
    let rows = stmt.query_map(params![template_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (id, template_id, title, visibility, created_at, updated_at) = row?;
        out.push(Plan {
            id: parse_uuid(&id)?,
            template_id: parse_uuid(&template_id)?,
            title,
            visibility,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        });
    }
    Ok(out)
}

pub(crate) fn query_templates<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Template>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, raw_template_from_row)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?.into_template()?);
    }
    Ok(out)
}

fn unique_conflict(err: rusqlite::Error) -> PlandocError {
    match err {
        rusqlite::Error::SqliteFailure(code, message)
            if code.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            PlandocError::Conflict(
                message.unwrap_or_else(|| "storage uniqueness constraint violated".to_string()),
            )
        }
        other => other.into(),
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|err| PlandocError::Internal(format!("invalid uuid in storage: {err}")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| PlandocError::Internal(format!("invalid timestamp in storage: {err}")))
}
