use crate::error::{PlandocError, Result};

use super::SqliteTemplateStore;

const MIGRATION_SCHEMA_SQL: &str = r"
    PRAGMA journal_mode = WAL;
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS templates (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT,
        version INTEGER NOT NULL,
        family_id TEXT NOT NULL,
        customization_of TEXT,
        org_id TEXT NOT NULL,
        published INTEGER NOT NULL DEFAULT 0,
        archived INTEGER NOT NULL DEFAULT 0,
        is_default INTEGER NOT NULL DEFAULT 0,
        visibility TEXT NOT NULL
            CHECK(visibility IN ('organisationally_visible', 'publicly_visible')),
        links TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_templates_family_version
    ON templates(family_id, version);

    CREATE UNIQUE INDEX IF NOT EXISTS idx_templates_customization_version_org
    ON templates(customization_of, version, org_id)
    WHERE customization_of IS NOT NULL;

    CREATE INDEX IF NOT EXISTS idx_templates_customization_org
    ON templates(customization_of, org_id);

    CREATE TABLE IF NOT EXISTS phases (
        id TEXT PRIMARY KEY,
        template_id TEXT NOT NULL,
        title TEXT NOT NULL,
        number INTEGER NOT NULL,
        modifiable INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (template_id) REFERENCES templates(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_phases_template ON phases(template_id, number);

    CREATE TABLE IF NOT EXISTS plans (
        id TEXT PRIMARY KEY,
        template_id TEXT NOT NULL,
        title TEXT NOT NULL,
        visibility TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (template_id) REFERENCES templates(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_plans_template ON plans(template_id);
";

impl SqliteTemplateStore {
    pub fn migrate(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| PlandocError::mutex_poisoned("sqlite"))?;
        conn.execute_batch(MIGRATION_SCHEMA_SQL)?;
        drop(conn);
        Ok(())
    }
}
