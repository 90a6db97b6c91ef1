// used for persistence
use rusqlite::types::ValueRef;
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, trace};

use crate::error::{PimError, Result};
use crate::provider::{ColumnValue, ContentProvider, ContentQuery, Record};

// ------------- Store -------------
/// SQLite stand-in for the device's calendar and contacts providers.
///
/// Tables carry the same column names the catalogs project, so a selection
/// written for the device store runs here unchanged.
pub struct SqliteStore {
    db: Mutex<Connection>,
}
impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = Self { db: Mutex::new(Connection::open(path)?) };
        store.install_schema()?;
        Ok(store)
    }
    pub fn open_in_memory() -> Result<Self> {
        let store = Self { db: Mutex::new(Connection::open_in_memory()?) };
        store.install_schema()?;
        Ok(store)
    }
    fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|e| PimError::Provider(format!("store lock poisoned: {e}")))
    }
    pub fn install_schema(&self) -> Result<()> {
        self.connection()?.execute_batch(
            "
            create table if not exists events (
                _id integer primary key,
                title text,
                dtstart integer,
                dtend integer,
                description text,
                eventLocation text
            );
            create table if not exists phones (
                _id integer primary key,
                display_name text,
                data1 text
            );
            create table if not exists emails (
                _id integer primary key,
                display_name text,
                data1 text
            );
            create table if not exists reminders (
                _id integer primary key,
                event_id integer not null,
                minutes integer,
                method integer
            );
            ",
        )?;
        Ok(())
    }
    pub fn add_event(
        &self,
        title: &str,
        dtstart: i64,
        dtend: Option<i64>,
        description: Option<&str>,
        location: Option<&str>,
    ) -> Result<i64> {
        let db = self.connection()?;
        db.execute(
            "insert into events (title, dtstart, dtend, description, eventLocation) values (?, ?, ?, ?, ?)",
            params![title, dtstart, dtend, description, location],
        )?;
        Ok(db.last_insert_rowid())
    }
    pub fn add_phone(&self, display_name: &str, number: &str) -> Result<i64> {
        let db = self.connection()?;
        db.execute("insert into phones (display_name, data1) values (?, ?)", params![display_name, number])?;
        Ok(db.last_insert_rowid())
    }
    pub fn add_email(&self, display_name: &str, address: &str) -> Result<i64> {
        let db = self.connection()?;
        db.execute("insert into emails (display_name, data1) values (?, ?)", params![display_name, address])?;
        Ok(db.last_insert_rowid())
    }
    pub fn add_reminder(&self, event_id: i64, minutes: i64, method: i64) -> Result<i64> {
        let db = self.connection()?;
        db.execute(
            "insert into reminders (event_id, minutes, method) values (?, ?, ?)",
            params![event_id, minutes, method],
        )?;
        Ok(db.last_insert_rowid())
    }
    /// Runs arbitrary SQL, for seeding fixtures with shapes the helpers don't cover.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.connection()?.execute_batch(sql)?;
        Ok(())
    }
}

fn build_sql(query: &ContentQuery) -> String {
    let mut sql = format!("select {} from {}", query.projection.join(", "), query.source.table());
    if !query.selection.trim().is_empty() {
        sql.push_str(" where ");
        sql.push_str(&query.selection);
    }
    if !query.sort_order.trim().is_empty() {
        sql.push_str(" order by ");
        sql.push_str(&query.sort_order);
    }
    sql
}

fn column_value(value: ValueRef<'_>) -> ColumnValue {
    match value {
        ValueRef::Null => ColumnValue::Null,
        ValueRef::Integer(i) => ColumnValue::Integer(i),
        ValueRef::Real(f) => ColumnValue::Float(f),
        ValueRef::Text(t) => ColumnValue::Text(Some(String::from_utf8_lossy(t).into_owned())),
        ValueRef::Blob(b) => ColumnValue::Other(String::from_utf8(b.to_vec()).ok()),
    }
}

impl ContentProvider for SqliteStore {
    fn query(&self, query: &ContentQuery) -> Result<Vec<Record>> {
        let sql = build_sql(query);
        debug!(%sql, args = ?query.arguments, "store query");
        let db = self.connection()?;
        let mut statement = db.prepare(&sql)?;
        let names: Vec<String> = statement.column_names().into_iter().map(String::from).collect();
        let mut rows = statement.query(params_from_iter(query.arguments.iter()))?;
        let mut records = Vec::new();
        while records.len() < query.limit {
            let Some(row) = rows.next()? else { break };
            let mut record = Record::default();
            for (i, name) in names.iter().enumerate() {
                record.push(name.clone(), column_value(row.get_ref(i)?));
            }
            records.push(record);
        }
        trace!(count = records.len(), "store rows");
        Ok(records)
    }
}

