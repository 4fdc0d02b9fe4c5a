//! Entity sources: where index builds read (id, name) pairs from
//!
//! `Database` reads the category tables of a SQLite catalog through an r2d2
//! pool; reads run on tokio's blocking pool. `StaticEntitySource` serves
//! in-memory lists and can be told to fail, for tests and benchmarks.

use crate::interface::{Category, EntityId, IdKind, YomiError, YomiResult};
use crate::models::Entity;
use async_trait::async_trait;
use parking_lot::RwLock;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{Value, ValueRef};
use rusqlite::params;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Anything an index can be built from
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// Every (id, name) pair of `category`, in a stable scan order
    async fn load_entities(&self, category: Category) -> YomiResult<Vec<Entity>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLITE
// ─────────────────────────────────────────────────────────────────────────────

/// Thread-safe catalog reader using connection pooling
///
/// WAL mode lets index builds for different categories read concurrently.
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open or create a catalog at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                PRAGMA mmap_size=67108864;
                PRAGMA cache_size=-32000;
            ",
            )?;
            Ok(())
        });

        let pool = Pool::builder().max_size(8).build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Open an in-memory catalog (tests, benchmarks)
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::memory();

        // In-memory needs single connection to maintain state
        let pool = Pool::builder().max_size(1).build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    fn get_conn(&self) -> DatabaseResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Create every category table that does not exist yet
    pub fn setup_schema(&self) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        for category in Category::ALL {
            let layout = category.table();
            let id_type = match layout.id_kind {
                IdKind::Integer => "INTEGER",
                IdKind::Text => "TEXT",
            };
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    {id} {id_type} PRIMARY KEY,
                    {name} TEXT
                );",
                table = layout.table,
                id = layout.id_column,
                name = layout.name_column,
            ))?;
        }
        Ok(())
    }

    /// Insert or replace one entity
    pub fn insert_entity(&self, category: Category, entity: &Entity) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute(&insert_sql(category), params![id_value(&entity.id), entity.name])?;
        Ok(())
    }

    /// Insert or replace a batch of entities in one transaction.
    /// Returns the number of rows written.
    pub fn insert_entities(
        &self,
        category: Category,
        entities: &[Entity],
    ) -> DatabaseResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(&insert_sql(category))?;
            for entity in entities {
                written += stmt.execute(params![id_value(&entity.id), entity.name])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// Every entity of `category` in rowid order. Rows with a NULL or empty
    /// name, or an id that is neither integer nor text, are skipped.
    pub fn fetch_entities(&self, category: Category) -> DatabaseResult<Vec<Entity>> {
        let layout = category.table();
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {id}, {name} FROM {table} ORDER BY rowid",
            id = layout.id_column,
            name = layout.name_column,
            table = layout.table,
        ))?;

        let rows = stmt.query_map([], |row| {
            let id = match row.get_ref(0)? {
                ValueRef::Integer(i) => Some(EntityId::Int(i)),
                ValueRef::Text(t) => Some(EntityId::Text(String::from_utf8_lossy(t).into_owned())),
                _ => None,
            };
            let name: Option<String> = row.get(1)?;
            Ok(id.zip(name.filter(|n| !n.is_empty())))
        })?;

        let mut entities = Vec::new();
        for row in rows {
            if let Some((id, name)) = row? {
                entities.push(Entity { id, name });
            }
        }
        Ok(entities)
    }

    /// Number of rows in a category table
    pub fn count(&self, category: Category) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", category.table().table),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn insert_sql(category: Category) -> String {
    let layout = category.table();
    format!(
        "INSERT OR REPLACE INTO {table} ({id}, {name}) VALUES (?1, ?2)",
        table = layout.table,
        id = layout.id_column,
        name = layout.name_column,
    )
}

fn id_value(id: &EntityId) -> Value {
    match id {
        EntityId::Int(i) => Value::Integer(*i),
        EntityId::Text(s) => Value::Text(s.clone()),
    }
}

#[async_trait]
impl EntitySource for Database {
    async fn load_entities(&self, category: Category) -> YomiResult<Vec<Entity>> {
        let db = self.clone();
        let entities = tokio::task::spawn_blocking(move || db.fetch_entities(category))
            .await
            .map_err(|_| YomiError::Cancelled)??;
        debug!(category = %category, rows = entities.len(), "loaded entities from sqlite");
        Ok(entities)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// IN-MEMORY
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory entity lists per category. Unknown categories load as empty.
#[derive(Default)]
pub struct StaticEntitySource {
    entities: RwLock<HashMap<Category, Vec<Entity>>>,
    failing: AtomicBool,
    loads: AtomicUsize,
}

impl StaticEntitySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, category: Category, entities: Vec<Entity>) -> Self {
        self.replace(category, entities);
        self
    }

    /// Swap the list served for `category`; picked up by the next load
    pub fn replace(&self, category: Category, entities: Vec<Entity>) {
        self.entities.write().insert(category, entities);
    }

    /// Make every subsequent load fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `load_entities` calls so far, failed ones included
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntitySource for StaticEntitySource {
    async fn load_entities(&self, category: Category) -> YomiResult<Vec<Entity>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(YomiError::Load(format!("source unavailable for {category}")));
        }
        Ok(self
            .entities
            .read()
            .get(&category)
            .cloned()
            .unwrap_or_default())
    }
}
