use crate::domain::model::{Branch, Photo, ProfileUpdate, Workshop};
use crate::domain::ports::{PageRows, PhotoSwap, WorkshopStore};
use crate::server::pagination::PageWindow;
use crate::server::query::Predicate;
use crate::utils::error::{HubError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior,
};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const WORKSHOP_COLUMNS: &str = "w.id, w.workshop_name, w.description, w.phone, w.services, w.cars, \
     w.rating_count, w.rating_total, w.photo_url, w.photo_public_id, w.created_at";

/// rusqlite 是同步 API，所有查詢都在 `spawn_blocking` 執行緒上進行
#[derive(Debug)]
pub struct SqliteWorkshopStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteWorkshopStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let connection = Connection::open(path)?;
        connection.busy_timeout(Duration::from_secs(5))?;
        let store = Self {
            connection: Arc::new(Mutex::new(connection)),
        };
        store.initialize_schema()?;
        tracing::debug!(path = %path.display(), "opened sqlite workshop store");
        Ok(store)
    }

    pub fn new_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory()?;
        let store = Self {
            connection: Arc::new(Mutex::new(connection)),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.connection.lock().map_err(|_| lock_poisoned())
    }

    async fn blocking<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let mut conn = connection.lock().map_err(|_| lock_poisoned())?;
            work(&mut conn)
        })
        .await
        .map_err(std::io::Error::from)?
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS workshops (
                id TEXT PRIMARY KEY,
                workshop_name TEXT NOT NULL,
                description TEXT,
                phone TEXT,
                services TEXT NOT NULL DEFAULT '[]',
                cars TEXT NOT NULL DEFAULT '[]',
                rating_count INTEGER NOT NULL DEFAULT 0,
                rating_total INTEGER NOT NULL DEFAULT 0,
                photo_url TEXT,
                photo_public_id TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_workshops_order
            ON workshops(created_at, id);

            CREATE TABLE IF NOT EXISTS workshop_branches (
                workshop_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                province TEXT NOT NULL,
                city TEXT NOT NULL,
                PRIMARY KEY (workshop_id, position)
            );

            CREATE INDEX IF NOT EXISTS idx_branches_province
            ON workshop_branches(province, workshop_id);
            ",
        )?;
        Ok(())
    }
}

fn lock_poisoned() -> HubError {
    HubError::ConfigError {
        message: "sqlite workshop store lock poisoned".to_string(),
    }
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    // 固定寬度，字串排序即時間排序
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    index: usize,
    error: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
}

fn read_workshop_row(row: &Row<'_>) -> rusqlite::Result<Workshop> {
    let services: String = row.get(4)?;
    let cars: String = row.get(5)?;
    let photo_url: Option<String> = row.get(8)?;
    let photo_public_id: Option<String> = row.get(9)?;
    let created_at: String = row.get(10)?;

    Ok(Workshop {
        id: row.get(0)?,
        workshop_name: row.get(1)?,
        description: row.get(2)?,
        phone: row.get(3)?,
        branches: Vec::new(),
        services: serde_json::from_str(&services).map_err(|e| conversion_error(4, e))?,
        cars: serde_json::from_str(&cars).map_err(|e| conversion_error(5, e))?,
        rating_count: row.get(6)?,
        rating_total: row.get(7)?,
        photo: match (photo_url, photo_public_id) {
            (Some(url), Some(public_id)) => Some(Photo { url, public_id }),
            _ => None,
        },
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| conversion_error(10, e))?
            .with_timezone(&Utc),
    })
}

fn load_branches(conn: &Connection, workshop: &mut Workshop) -> Result<()> {
    let mut statement = conn.prepare_cached(
        "SELECT province, city FROM workshop_branches WHERE workshop_id = ?1 ORDER BY position",
    )?;
    let branches = statement
        .query_map(params![workshop.id], |row| {
            Ok(Branch {
                province: row.get(0)?,
                city: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    workshop.branches = branches;
    Ok(())
}

fn select_workshop(conn: &Connection, id: &str) -> Result<Option<Workshop>> {
    let sql = format!("SELECT {} FROM workshops w WHERE w.id = ?1", WORKSHOP_COLUMNS);
    let workshop = conn
        .query_row(&sql, params![id], read_workshop_row)
        .optional()?;
    match workshop {
        Some(mut workshop) => {
            load_branches(conn, &mut workshop)?;
            Ok(Some(workshop))
        }
        None => Ok(None),
    }
}

fn write_workshop(conn: &Connection, workshop: &Workshop) -> Result<()> {
    conn.execute(
        "INSERT INTO workshops (
            id, workshop_name, description, phone, services, cars,
            rating_count, rating_total, photo_url, photo_public_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(id) DO UPDATE SET
            workshop_name = excluded.workshop_name,
            description = excluded.description,
            phone = excluded.phone,
            services = excluded.services,
            cars = excluded.cars,
            rating_count = excluded.rating_count,
            rating_total = excluded.rating_total,
            photo_url = excluded.photo_url,
            photo_public_id = excluded.photo_public_id,
            created_at = excluded.created_at",
        params![
            workshop.id,
            workshop.workshop_name,
            workshop.description,
            workshop.phone,
            serde_json::to_string(&workshop.services)?,
            serde_json::to_string(&workshop.cars)?,
            workshop.rating_count,
            workshop.rating_total,
            workshop.photo.as_ref().map(|p| p.url.clone()),
            workshop.photo.as_ref().map(|p| p.public_id.clone()),
            format_timestamp(&workshop.created_at),
        ],
    )?;

    conn.execute(
        "DELETE FROM workshop_branches WHERE workshop_id = ?1",
        params![workshop.id],
    )?;
    let mut statement = conn.prepare_cached(
        "INSERT INTO workshop_branches (workshop_id, position, province, city)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, branch) in workshop.branches.iter().enumerate() {
        statement.execute(params![
            workshop.id,
            position as i64,
            branch.province,
            branch.city
        ])?;
    }
    Ok(())
}

#[async_trait]
impl WorkshopStore for SqliteWorkshopStore {
    async fn query_page(&self, predicate: &Predicate, window: PageWindow) -> Result<PageRows> {
        let (where_clause, where_params) = predicate.to_sql();
        self.blocking(move |conn| {
            // 計數與分頁在同一個讀取交易內，看到的是同一份快照
            let tx = conn.transaction()?;

            let count_sql = format!("SELECT COUNT(*) FROM workshops w WHERE {}", where_clause);
            let total_count: i64 =
                tx.query_row(&count_sql, params_from_iter(where_params.iter()), |row| {
                    row.get(0)
                })?;

            let page_sql = format!(
                "SELECT {} FROM workshops w WHERE {} ORDER BY w.created_at ASC, w.id ASC LIMIT {} OFFSET {}",
                WORKSHOP_COLUMNS, where_clause, window.limit, window.skip
            );
            let mut items = {
                let mut statement = tx.prepare(&page_sql)?;
                let rows = statement
                    .query_map(params_from_iter(where_params.iter()), read_workshop_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            };
            for workshop in &mut items {
                load_branches(&tx, workshop)?;
            }
            tx.commit()?;

            Ok(PageRows {
                items,
                total_count: total_count.max(0) as u64,
            })
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<Workshop>> {
        let id = id.to_string();
        self.blocking(move |conn| select_workshop(conn, &id)).await
    }

    async fn insert(&self, workshop: Workshop) -> Result<()> {
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            write_workshop(&tx, &workshop)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<Option<Workshop>> {
        let id = id.to_string();
        let update = update.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let Some(mut workshop) = select_workshop(&tx, &id)? else {
                return Ok(None);
            };
            workshop.apply_update(&update);
            write_workshop(&tx, &workshop)?;
            tx.commit()?;
            Ok(Some(workshop))
        })
        .await
    }

    async fn set_photo(&self, id: &str, photo: Option<Photo>) -> Result<Option<PhotoSwap>> {
        let id = id.to_string();
        self.blocking(move |conn| {
            // 舊照片的讀取與替換在同一個寫入交易內
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(previous) = select_workshop(&tx, &id)?.map(|w| w.photo) else {
                return Ok(None);
            };
            tx.execute(
                "UPDATE workshops SET photo_url = ?1, photo_public_id = ?2 WHERE id = ?3",
                params![
                    photo.as_ref().map(|p| p.url.clone()),
                    photo.as_ref().map(|p| p.public_id.clone()),
                    id
                ],
            )?;
            let workshop = select_workshop(&tx, &id)?;
            tx.commit()?;
            Ok(workshop.map(|workshop| PhotoSwap { workshop, previous }))
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM workshop_branches WHERE workshop_id = ?1",
                params![id],
            )?;
            let removed = tx.execute("DELETE FROM workshops WHERE id = ?1", params![id])?;
            tx.commit()?;
            Ok(removed > 0)
        })
        .await
    }

    async fn count(&self) -> Result<u64> {
        self.blocking(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM workshops", [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }
}
