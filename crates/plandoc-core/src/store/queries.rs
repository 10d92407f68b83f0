use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use crate::error::Result;
use crate::models::Template;

use super::{RawTemplate, SqliteTemplateStore, TEMPLATE_COLUMNS, query_templates,
    raw_template_from_row};

impl SqliteTemplateStore {
    /// Highest version number in the family; `None` when the family has no
    /// members.
    pub fn latest_version_number(&self, family_id: Uuid) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let value = conn.query_row(
                "SELECT MAX(version) FROM templates WHERE family_id = ?1",
                params![family_id.to_string()],
                |row| row.get::<_, Option<i64>>(0),
            )?;
            Ok(value)
        })
    }

    /// The single template at the family's highest version. Uniqueness of
    /// `(family_id, version)` guarantees at most one row.
    pub fn latest_version(&self, family_id: Uuid) -> Result<Option<Template>> {
        self.with_conn(|conn| {
            let raw = conn
                .query_row(
                    &format!(
                        "SELECT {TEMPLATE_COLUMNS} FROM templates \
                         WHERE family_id = ?1 ORDER BY version DESC LIMIT 1"
                    ),
                    params![family_id.to_string()],
                    raw_template_from_row,
                )
                .optional()?;
            raw.map(RawTemplate::into_template).transpose()
        })
    }

    /// Same lookup as `latest_version`, exposed as a collection (zero or one
    /// rows) for callers iterating query results uniformly.
    pub fn latest_version_per_family(&self, family_id: Uuid) -> Result<Vec<Template>> {
        self.with_conn(|conn| {
            query_templates(
                conn,
                &format!(
                    "SELECT {TEMPLATE_COLUMNS} FROM templates \
                     WHERE family_id = ?1 ORDER BY version DESC LIMIT 1"
                ),
                params![family_id.to_string()],
            )
        })
    }

    pub fn unarchived(&self) -> Result<Vec<Template>> {
        self.with_conn(|conn| {
            query_templates(
                conn,
                &format!(
                    "SELECT {TEMPLATE_COLUMNS} FROM templates \
                     WHERE archived = 0 ORDER BY created_at ASC, id ASC"
                ),
                [],
            )
        })
    }

    pub fn archived(&self) -> Result<Vec<Template>> {
        self.with_conn(|conn| {
            query_templates(
                conn,
                &format!(
                    "SELECT {TEMPLATE_COLUMNS} FROM templates \
                     WHERE archived = 1 ORDER BY created_at ASC, id ASC"
                ),
                [],
            )
        })
    }

    pub fn published(&self) -> Result<Vec<Template>> {
        self.with_conn(|conn| {
            query_templates(
                conn,
                &format!(
                    "SELECT {TEMPLATE_COLUMNS} FROM templates \
                     WHERE published = 1 ORDER BY created_at ASC, id ASC"
                ),
                [],
            )
        })
    }

    /// For each input family, the org's customization with the greatest
    /// version (ties by most recent update). Families the org never
    /// customized are omitted; published state is irrelevant.
    pub fn org_customizations(&self, family_ids: &[Uuid], org_id: Uuid) -> Result<Vec<Template>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TEMPLATE_COLUMNS} FROM templates \
                 WHERE customization_of = ?1 AND org_id = ?2 \
                 ORDER BY version DESC, updated_at DESC LIMIT 1"
            ))?;

            let mut out = Vec::new();
            for family_id in family_ids {
                let raw = stmt
                    .query_row(
                        params![family_id.to_string(), org_id.to_string()],
                        raw_template_from_row,
                    )
                    .optional()?;
                if let Some(raw) = raw {
                    out.push(raw.into_template()?);
                }
            }
            Ok(out)
        })
    }
}
