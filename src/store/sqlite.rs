//! SQLite-backed report store.
//!
//! Column names follow the existing report table contract:
//!
//! ```text
//! name, description, module, base_table, selected_fields, filters,
//! chart_type, aggregation, group_by, date_grouping, is_public, created_by
//! ```
//!
//! plus `id`, `created_at` and `value_field`. `module` repeats `base_table`
//! so definitions written by older clients keep loading. List-valued columns
//! hold JSON text.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row as SqlRow};
use uuid::Uuid;

use super::{ReportStore, StoreError, StoreResult};
use crate::model::{
    ChartConfig, ColumnRef, Filter, ReportDefinition, ReportId,
};

/// Current store schema version. Bump this when the table layout changes.
const STORE_VERSION: i32 = 1;

const SELECT_COLUMNS: &str = "id, name, description, module, base_table, selected_fields, \
     filters, chart_type, aggregation, group_by, date_grouping, value_field, is_public, \
     created_by, created_at";

/// One `reports` row, as stored.
#[derive(Debug, Clone)]
struct StoredReport {
    id: String,
    name: String,
    description: Option<String>,
    module: String,
    base_table: String,
    selected_fields: String,
    filters: String,
    chart_type: String,
    aggregation: Option<String>,
    group_by: Option<String>,
    date_grouping: Option<String>,
    value_field: Option<String>,
    is_public: bool,
    created_by: String,
    created_at: String,
}

impl StoredReport {
    fn encode(id: ReportId, def: &ReportDefinition) -> StoreResult<Self> {
        Ok(Self {
            id: id.to_string(),
            name: def.name.clone(),
            description: def.description.clone(),
            module: def.module_key().to_string(),
            base_table: def.base_entity.clone(),
            selected_fields: serde_json::to_string(&def.selected_columns)?,
            filters: serde_json::to_string(&def.filters)?,
            chart_type: def.chart.chart_type.to_string(),
            aggregation: def.chart.aggregation.map(|a| a.to_string()),
            group_by: def.chart.group_by.as_ref().map(|c| c.qualified_name()),
            date_grouping: def.chart.date_grouping.map(|d| d.to_string()),
            value_field: def.chart.value_field.as_ref().map(|c| c.qualified_name()),
            is_public: def.is_public,
            created_by: def.owner_id.clone(),
            created_at: def.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        })
    }

    fn from_row(row: &SqlRow<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            module: row.get(3)?,
            base_table: row.get(4)?,
            selected_fields: row.get(5)?,
            filters: row.get(6)?,
            chart_type: row.get(7)?,
            aggregation: row.get(8)?,
            group_by: row.get(9)?,
            date_grouping: row.get(10)?,
            value_field: row.get(11)?,
            is_public: row.get(12)?,
            created_by: row.get(13)?,
            created_at: row.get(14)?,
        })
    }

    fn decode(self) -> StoreResult<ReportDefinition> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: self.id.clone(),
            reason,
        };

        let id = Uuid::parse_str(&self.id).map_err(|e| corrupt(e.to_string()))?;
        // Older rows may only carry `module`.
        let base_entity = if self.base_table.is_empty() {
            self.module.clone()
        } else {
            self.base_table.clone()
        };
        let selected_columns: Vec<ColumnRef> =
            serde_json::from_str(&self.selected_fields).map_err(|e| corrupt(e.to_string()))?;
        let filters: Vec<Filter> =
            serde_json::from_str(&self.filters).map_err(|e| corrupt(e.to_string()))?;
        let column = |text: &Option<String>| -> StoreResult<Option<ColumnRef>> {
            text.as_deref()
                .map(ColumnRef::parse)
                .transpose()
                .map_err(|e| corrupt(e.to_string()))
        };

        let chart = ChartConfig {
            chart_type: self.chart_type.parse().map_err(corrupt)?,
            aggregation: self
                .aggregation
                .as_deref()
                .map(str::parse)
                .transpose()
                .map_err(corrupt)?,
            group_by: column(&self.group_by)?,
            date_grouping: self
                .date_grouping
                .as_deref()
                .map(str::parse)
                .transpose()
                .map_err(corrupt)?,
            value_field: column(&self.value_field)?,
        };
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| corrupt(e.to_string()))?
            .with_timezone(&Utc);

        Ok(ReportDefinition {
            id: Some(id),
            name: self.name.clone(),
            description: self.description.clone(),
            base_entity,
            selected_columns,
            filters,
            chart,
            is_public: self.is_public,
            owner_id: self.created_by.clone(),
            created_at,
        })
    }
}

/// SQLite-based report store.
pub struct SqliteReportStore {
    conn: Connection,
}

impl SqliteReportStore {
    /// Open or create the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self {
            conn: Connection::open(path)?,
        };
        store.init()?;
        Ok(store)
    }

    /// Open the store at `~/.dossier/reports.db`.
    pub fn open_default() -> StoreResult<Self> {
        Self::open(Self::default_path()?)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init()?;
        Ok(store)
    }

    pub fn default_path() -> StoreResult<PathBuf> {
        let base = dirs::home_dir().ok_or(StoreError::NoStoreDir)?;
        Ok(base.join(".dossier").join("reports.db"))
    }

    fn init(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS reports (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                module TEXT NOT NULL,
                base_table TEXT NOT NULL,
                selected_fields TEXT NOT NULL,
                filters TEXT NOT NULL,
                chart_type TEXT NOT NULL,
                aggregation TEXT,
                group_by TEXT,
                date_grouping TEXT,
                value_field TEXT,
                is_public INTEGER NOT NULL DEFAULT 0,
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS reports_created_by ON reports (created_by);

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;

        let stored_version: Option<i32> = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = 'version'", [], |row| {
                let s: String = row.get(0)?;
                Ok(s.parse().unwrap_or(0))
            })
            .optional()?;

        match stored_version {
            Some(v) if v == STORE_VERSION => {}
            Some(v) => {
                // Definitions are user data; never drop them on a version bump.
                tracing::warn!(found = v, expected = STORE_VERSION, "report store version mismatch");
                self.set_version()?;
            }
            None => self.set_version()?,
        }
        Ok(())
    }

    fn set_version(&self) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('version', ?)",
            params![STORE_VERSION.to_string()],
        )?;
        Ok(())
    }

    /// Number of stored reports.
    pub fn count(&self) -> StoreResult<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

impl ReportStore for SqliteReportStore {
    fn save(&self, definition: &ReportDefinition) -> StoreResult<ReportId> {
        definition.validate()?;
        let id = definition.id.unwrap_or_else(Uuid::new_v4);
        let r = StoredReport::encode(id, definition)?;

        // Ownership and creation time are fixed at first save.
        self.conn.execute(
            "INSERT INTO reports (id, name, description, module, base_table, selected_fields,
                filters, chart_type, aggregation, group_by, date_grouping, value_field,
                is_public, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                module = excluded.module,
                base_table = excluded.base_table,
                selected_fields = excluded.selected_fields,
                filters = excluded.filters,
                chart_type = excluded.chart_type,
                aggregation = excluded.aggregation,
                group_by = excluded.group_by,
                date_grouping = excluded.date_grouping,
                value_field = excluded.value_field,
                is_public = excluded.is_public",
            params![
                r.id,
                r.name,
                r.description,
                r.module,
                r.base_table,
                r.selected_fields,
                r.filters,
                r.chart_type,
                r.aggregation,
                r.group_by,
                r.date_grouping,
                r.value_field,
                r.is_public,
                r.created_by,
                r.created_at,
            ],
        )?;

        tracing::debug!(%id, name = %definition.name, "saved report");
        Ok(id)
    }

    fn load(&self, id: ReportId) -> StoreResult<ReportDefinition> {
        let sql = format!("SELECT {} FROM reports WHERE id = ?1", SELECT_COLUMNS);
        let stored = self
            .conn
            .query_row(&sql, params![id.to_string()], StoredReport::from_row)
            .optional()?
            .ok_or(StoreError::NotFound(id))?;
        stored.decode()
    }

    fn list_for(&self, owner: &str, include_public: bool) -> StoreResult<Vec<ReportDefinition>> {
        let sql = format!(
            "SELECT {} FROM reports
             WHERE created_by = ?1 OR (?2 AND is_public = 1)
             ORDER BY created_at DESC, id",
            SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let stored = stmt
            .query_map(params![owner, include_public], StoredReport::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        stored.into_iter().map(StoredReport::decode).collect()
    }
}
