// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use pitlane_app::{
    FieldError, FieldErrorKind, FieldErrors, ListKind, ListProvider, Row, RowId, RowPatch,
    RowSchema, RowUpdater, relocation_target,
};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Value, json};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

pub const APP_NAME: &str = "pitlane";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[(
    "rows",
    &["id", "list", "position", "body", "created_at", "updated_at"],
)];

struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[RequiredIndex {
    name: "idx_rows_list_position",
    create_sql: "CREATE INDEX IF NOT EXISTS idx_rows_list_position ON rows (list, position);",
}];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub inserted: Vec<RowId>,
    pub rejected: Vec<(usize, FieldErrors)>,
}

pub struct Store {
    conn: Connection,
    schema: RowSchema,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self {
            conn,
            schema: RowSchema::default(),
        })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self {
            conn,
            schema: RowSchema::default(),
        })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }

        ensure_required_indexes(&self.conn)
    }

    /// Stores a row at the end of `list` after running it through the
    /// standard schema.
    pub fn insert_row(&self, list: ListKind, row: &Row) -> Result<RowId> {
        let row = self
            .schema
            .normalize(row)
            .map_err(|errors| anyhow!("row {} is invalid: {errors}", row.id))?;
        insert_canonical(&self.conn, list, &row)?;
        Ok(row.id)
    }

    /// Parses raw rows with `schema` and stores the valid ones. Invalid rows
    /// and rows whose id is already stored are reported back by input index;
    /// they never abort the batch.
    pub fn import_batch(
        &mut self,
        list: ListKind,
        raws: &[Value],
        schema: &RowSchema,
    ) -> Result<ImportReport> {
        let tx = self.conn.transaction().context("begin import")?;
        let mut inserted = Vec::new();
        let mut rejected = Vec::new();
        for (index, raw) in raws.iter().enumerate() {
            let row = match schema.parse(raw) {
                Ok(row) => row,
                Err(errors) => {
                    rejected.push((index, errors));
                    continue;
                }
            };
            if row_exists(&tx, &row.id)? {
                debug!(id = %row.id, index, "skipping imported row with stored id");
                rejected.push((
                    index,
                    FieldError::new(
                        "id",
                        FieldErrorKind::Domain,
                        format!("row id {} is already stored", row.id),
                    )
                    .into(),
                ));
                continue;
            }
            insert_canonical(&tx, list, &row)?;
            inserted.push(row.id);
        }
        tx.commit().context("commit import")?;

        info!(
            list = list.label(),
            inserted = inserted.len(),
            rejected = rejected.len(),
            "imported rows"
        );
        Ok(ImportReport { inserted, rejected })
    }

    pub fn get_row(&self, row_id: &RowId) -> Result<Option<(ListKind, Row)>> {
        load_row(&self.conn, &self.schema, row_id)
    }

    pub fn list_rows(&self, list: ListKind) -> Result<Vec<Row>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, body FROM rows WHERE list = ? ORDER BY position ASC, id ASC")
            .context("prepare rows query")?;
        let bodies = stmt
            .query_map(params![list.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .with_context(|| format!("query rows in {}", list.label()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("collect rows in {}", list.label()))?;

        bodies
            .iter()
            .map(|(id, body)| decode_row(&self.schema, id, body))
            .collect()
    }

    pub fn counts(&self) -> Result<Vec<(ListKind, usize)>> {
        ListKind::RADAR_ORDER
            .into_iter()
            .map(|list| {
                let count: i64 = self
                    .conn
                    .query_row(
                        "SELECT COUNT(*) FROM rows WHERE list = ?",
                        params![list.as_str()],
                        |row| row.get(0),
                    )
                    .with_context(|| format!("count rows in {}", list.label()))?;
                Ok((list, usize::try_from(count).unwrap_or_default()))
            })
            .collect()
    }

    /// Moves a row to the end of `to`. Returns false for unknown ids.
    pub fn move_row(&self, row_id: &RowId, to: ListKind) -> Result<bool> {
        let position = next_position(&self.conn, to)?;
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "UPDATE rows SET list = ?, position = ?, updated_at = ? WHERE id = ?",
                params![to.as_str(), position, now, row_id.as_str()],
            )
            .with_context(|| format!("move row {row_id} to {}", to.label()))?;
        Ok(rows_affected > 0)
    }

    pub fn delete_row(&self, row_id: &RowId) -> Result<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM rows WHERE id = ?", params![row_id.as_str()])
            .with_context(|| format!("delete row {row_id}"))?;
        Ok(rows_affected > 0)
    }

    pub fn seed_demo_data(&self) -> Result<()> {
        for (list, raw) in demo_rows() {
            let row = self
                .schema
                .parse(&raw)
                .map_err(|errors| anyhow!("demo row is invalid: {errors}"))?;
            insert_canonical(&self.conn, list, &row)?;
        }
        Ok(())
    }
}

impl ListProvider for Store {
    fn rows(&self, list: ListKind) -> Result<Cow<'_, [Row]>> {
        self.list_rows(list).map(Cow::Owned)
    }
}

impl RowUpdater for Store {
    fn update(&mut self, row_id: &RowId, patch: &RowPatch) -> Result<()> {
        let tx = self.conn.transaction().context("begin row update")?;
        let Some((list, mut row)) = load_row(&tx, &self.schema, row_id)? else {
            debug!(row = %row_id, "update for unknown row ignored");
            return Ok(());
        };

        patch.apply(&mut row);
        let body = serde_json::to_string(&row).context("encode row")?;
        let now = now_rfc3339()?;
        tx.execute(
            "UPDATE rows SET body = ?, updated_at = ? WHERE id = ?",
            params![body, now, row_id.as_str()],
        )
        .with_context(|| format!("update row {row_id}"))?;

        if let Some(target) = relocation_target(list, row.status) {
            let position = next_position(&tx, target)?;
            tx.execute(
                "UPDATE rows SET list = ?, position = ? WHERE id = ?",
                params![target.as_str(), position, row_id.as_str()],
            )
            .with_context(|| format!("relocate row {row_id} to {}", target.label()))?;
            debug!(row = %row_id, from = list.label(), to = target.label(), "row relocated");
        }

        tx.commit().context("commit row update")
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("PITLANE_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set PITLANE_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("pitlane.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn insert_canonical(conn: &Connection, list: ListKind, row: &Row) -> Result<()> {
    let body = serde_json::to_string(row).context("encode row")?;
    let position = next_position(conn, list)?;
    let now = now_rfc3339()?;
    conn.execute(
        "
        INSERT INTO rows (id, list, position, body, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ",
        params![row.id.as_str(), list.as_str(), position, body, now, now],
    )
    .with_context(|| {
        format!(
            "insert row {} into {} -- row ids must be unique across all lists",
            row.id,
            list.label()
        )
    })?;
    Ok(())
}

fn load_row(
    conn: &Connection,
    schema: &RowSchema,
    row_id: &RowId,
) -> Result<Option<(ListKind, Row)>> {
    let stored = conn
        .query_row(
            "SELECT list, body FROM rows WHERE id = ?",
            params![row_id.as_str()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()
        .with_context(|| format!("load row {row_id}"))?;

    let Some((list_raw, body)) = stored else {
        return Ok(None);
    };
    let list = ListKind::parse(&list_raw)
        .ok_or_else(|| anyhow!("row {row_id} is filed under unknown list {list_raw:?}"))?;
    let row = decode_row(schema, row_id.as_str(), &body)?;
    Ok(Some((list, row)))
}

fn decode_row(schema: &RowSchema, id: &str, body: &str) -> Result<Row> {
    let raw: Value =
        serde_json::from_str(body).with_context(|| format!("decode stored row {id}"))?;
    schema
        .parse(&raw)
        .map_err(|errors| anyhow!("stored row {id} failed validation: {errors}"))
}

fn next_position(conn: &Connection, list: ListKind) -> Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(position), 0) + 1 FROM rows WHERE list = ?",
        params![list.as_str()],
        |row| row.get(0),
    )
    .with_context(|| format!("next position in {}", list.label()))
}

fn demo_rows() -> Vec<(ListKind, Value)> {
    vec![
        (
            ListKind::MainSheet,
            json!({
                "id": "demo-1",
                "trackingId": "TRK-1001",
                "customerName": "Huda Saleh",
                "vin": "VF1ABC",
                "mobile": "0551234567",
                "model": "Duster",
                "cntrRdg": 48200,
                "repairSystem": "Paid",
                "company": "Renault",
                "sabNumber": "SAB-5521",
                "requester": "Omar",
                "acceptedBy": "Lina",
                "parts": [{ "partNumber": "7711", "description": "Headlamp" }],
            }),
        ),
        (
            ListKind::Orders,
            json!({
                "id": "demo-2",
                "customerName": "Khalid Nasser",
                "vin": "WDB123",
                "model": "Megane",
                "cntrRdg": 102000,
                "repairSystem": pitlane_app::WARRANTY_REPAIR_SYSTEM,
                "status": "Ordered",
                "parts": [
                    { "partNumber": "9090", "description": "Brake Pad" },
                    { "partNumber": "9091", "description": "Brake Disc" },
                ],
            }),
        ),
        (
            ListKind::CallList,
            json!({
                "id": "demo-3",
                "customerName": "Maha Ali",
                "vin": "KNA777",
                "model": "Koleos",
                "status": "Call",
                "partNumber": "4410",
                "description": "Wiper Blade",
                "reminder": { "date": "2026-01-05", "time": "09:00", "subject": "Call about wiper" },
            }),
        ),
        (
            ListKind::Booking,
            json!({
                "id": "demo-4",
                "customerName": "Yousef Hamad",
                "vin": "VF1XYZ",
                "model": "Clio",
                "status": "Booked",
                "bookingDate": "2026-01-12",
                "parts": [{ "partNumber": "8200", "description": "Oil Filter" }],
            }),
        ),
        (
            ListKind::Archive,
            json!({
                "id": "demo-5",
                "customerName": "Huda Saleh",
                "vin": "VF1ABC",
                "model": "Duster",
                "status": "Archived",
                "archiveReason": "Delivered",
                "archivedAt": "2025-12-01T10:00:00Z",
                "parts": [{ "partNumber": "7711", "description": "Headlamp (old)" }],
            }),
        ),
    ]
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; use a pitlane database or point [storage].db_path elsewhere"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; run migration before launching",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("ensure required index `{}`", index.name))?;
    }

    let existing_indexes = index_names(conn)?;
    let missing = REQUIRED_INDEXES
        .iter()
        .filter(|index| !existing_indexes.contains(index.name))
        .map(|index| index.name)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        bail!(
            "database is missing required indexes: {}; run migration before launching",
            missing.join(", ")
        );
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn row_exists(conn: &Connection, row_id: &RowId) -> Result<bool> {
    let exists = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM rows WHERE id = ?)",
            params![row_id.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check row existence for {row_id}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn index_names(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(
            "
            SELECT name
            FROM sqlite_master
            WHERE type = 'index'
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name ASC
            ",
        )
        .context("prepare index names query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query index names")?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .context("collect index names")
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}
