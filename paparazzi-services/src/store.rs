//! News Store
//!
//! SQLite-backed storage for news records and push subscriptions. One table
//! per category plus a shared subscriptions table. Timestamps are stored as
//! RFC 3339 text so lexicographic comparison matches chronological order.

use chrono::{DateTime, Utc};
use paparazzi_core::{Category, NewsRecord, PushSubscription};
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

pub struct NewsStore {
    conn: Mutex<Connection>,
}

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Failed to acquire lock")]
    LockError,
}

/// Insert failures caused by a table predating the optional columns are
/// recoverable by stripping those columns. Anything else is fatal.
fn is_missing_column_error(message: &str) -> bool {
    if message.contains("no column named") {
        return true;
    }
    Regex::new(r"(?i)column.*does not exist")
        .expect("missing column regex is valid")
        .is_match(message)
}

fn is_unique_violation(message: &str) -> bool {
    message.contains("UNIQUE constraint failed")
}

/// Column list for record reads. The reduced list matches tables created
/// before the optional columns existed.
fn select_columns(reduced: bool) -> &'static str {
    if reduced {
        "id, person_name, news_text, image_url, search_query, created_at"
    } else {
        "id, person_name, news_text, news_body, image_url, youtube_url, search_query, created_at"
    }
}

fn parse_created_at(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl NewsStore {
    /// Open (or create) the database file and initialize the schema
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Io(format!("Failed to create database directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path).map_err(StoreError::Database)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory store for tests
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::Database)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    #[cfg(test)]
    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;

        for category in Category::ALL {
            let table = category.table_name();
            conn.execute_batch(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    id TEXT PRIMARY KEY,
                    person_name TEXT NOT NULL,
                    news_text TEXT NOT NULL,
                    news_body TEXT,
                    image_url TEXT NOT NULL,
                    youtube_url TEXT,
                    search_query TEXT,
                    created_at TEXT NOT NULL,
                    UNIQUE(person_name, news_text)
                );

                CREATE INDEX IF NOT EXISTS idx_{table}_created_at
                ON {table}(created_at);
                "#
            ))
            .map_err(StoreError::Database)?;
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS push_subscriptions (
                endpoint TEXT PRIMARY KEY,
                p256dh TEXT,
                auth TEXT,
                user_agent TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(StoreError::Database)?;

        Ok(())
    }

    /// Insert a batch of records. Unique-constraint hits are skipped; a
    /// missing optional column triggers a reduced-column retry for the rest
    /// of the batch. Returns the number actually inserted.
    pub fn insert_records(
        &self,
        category: Category,
        records: &[NewsRecord],
    ) -> Result<usize, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;
        let table = category.table_name();

        let mut inserted = 0;
        let mut reduced = false;
        for record in records {
            let result = if reduced {
                Self::insert_reduced(&conn, &table, record)
            } else {
                Self::insert_full(&conn, &table, record)
            };

            match result {
                Ok(_) => inserted += 1,
                Err(e) => {
                    let message = e.to_string();
                    if !reduced && is_missing_column_error(&message) {
                        warn!(
                            "Table {} is missing optional columns, retrying without them",
                            table
                        );
                        reduced = true;
                        match Self::insert_reduced(&conn, &table, record) {
                            Ok(_) => inserted += 1,
                            Err(e2) if is_unique_violation(&e2.to_string()) => {
                                debug!("Skipping duplicate record for {}", record.person_name);
                            }
                            Err(e2) => return Err(StoreError::Database(e2)),
                        }
                    } else if is_unique_violation(&message) {
                        debug!("Skipping duplicate record for {}", record.person_name);
                    } else {
                        return Err(StoreError::Database(e));
                    }
                }
            }
        }

        Ok(inserted)
    }

    fn insert_full(
        conn: &Connection,
        table: &str,
        record: &NewsRecord,
    ) -> Result<usize, rusqlite::Error> {
        conn.execute(
            &format!(
                r#"
                INSERT INTO {table}
                    (id, person_name, news_text, news_body, image_url, youtube_url, search_query, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#
            ),
            params![
                record.id,
                record.person_name,
                record.news_text,
                record.news_body,
                record.image_url,
                record.youtube_url,
                record.search_query,
                record.created_at.to_rfc3339(),
            ],
        )
    }

    fn insert_reduced(
        conn: &Connection,
        table: &str,
        record: &NewsRecord,
    ) -> Result<usize, rusqlite::Error> {
        conn.execute(
            &format!(
                r#"
                INSERT INTO {table}
                    (id, person_name, news_text, image_url, search_query, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#
            ),
            params![
                record.id,
                record.person_name,
                record.news_text,
                record.image_url,
                record.search_query,
                record.created_at.to_rfc3339(),
            ],
        )
    }

    /// Delete rows older than the cutoff, returning the number removed
    pub fn evict_older_than(
        &self,
        category: Category,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;
        let removed = conn
            .execute(
                &format!(
                    "DELETE FROM {} WHERE created_at < ?1",
                    category.table_name()
                ),
                params![cutoff.to_rfc3339()],
            )
            .map_err(StoreError::Database)?;
        Ok(removed)
    }

    /// Most recent records for a category, newest first. A legacy table
    /// without the optional columns is read with a reduced column list, same
    /// as the insert path.
    pub fn latest(&self, category: Category, limit: usize) -> Result<Vec<NewsRecord>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;
        match Self::select_latest(&conn, category, limit, false) {
            Err(e) if is_missing_column_error(&e.to_string()) => {
                Self::select_latest(&conn, category, limit, true).map_err(StoreError::Database)
            }
            other => other.map_err(StoreError::Database),
        }
    }

    fn select_latest(
        conn: &Connection,
        category: Category,
        limit: usize,
        reduced: bool,
    ) -> Result<Vec<NewsRecord>, rusqlite::Error> {
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM {}
            ORDER BY created_at DESC
            LIMIT ?1
            "#,
            select_columns(reduced),
            category.table_name()
        ))?;

        let records = stmt
            .query_map(params![limit as i64], |row| {
                Self::row_to_record(row, category, reduced)
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(records)
    }

    /// Look up one record by its exact headline
    pub fn find_by_headline(
        &self,
        category: Category,
        person_name: &str,
        news_text: &str,
    ) -> Result<Option<NewsRecord>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;
        match Self::select_by_headline(&conn, category, person_name, news_text, false) {
            Err(e) if is_missing_column_error(&e.to_string()) => {
                Self::select_by_headline(&conn, category, person_name, news_text, true)
                    .map_err(StoreError::Database)
            }
            other => other.map_err(StoreError::Database),
        }
    }

    fn select_by_headline(
        conn: &Connection,
        category: Category,
        person_name: &str,
        news_text: &str,
        reduced: bool,
    ) -> Result<Option<NewsRecord>, rusqlite::Error> {
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM {}
            WHERE person_name = ?1 AND news_text = ?2
            LIMIT 1
            "#,
            select_columns(reduced),
            category.table_name()
        ))?;

        stmt.query_row(params![person_name, news_text], |row| {
            Self::row_to_record(row, category, reduced)
        })
        .optional()
    }

    pub fn delete_by_id(&self, category: Category, id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;
        let removed = conn
            .execute(
                &format!("DELETE FROM {} WHERE id = ?1", category.table_name()),
                params![id],
            )
            .map_err(StoreError::Database)?;
        Ok(removed > 0)
    }

    pub fn update_body(
        &self,
        category: Category,
        id: &str,
        body: &str,
    ) -> Result<bool, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;
        let updated = conn
            .execute(
                &format!(
                    "UPDATE {} SET news_body = ?1 WHERE id = ?2",
                    category.table_name()
                ),
                params![body, id],
            )
            .map_err(StoreError::Database)?;
        Ok(updated > 0)
    }

    fn row_to_record(
        row: &rusqlite::Row<'_>,
        category: Category,
        reduced: bool,
    ) -> Result<NewsRecord, rusqlite::Error> {
        if reduced {
            let created_at_raw: String = row.get(5)?;
            return Ok(NewsRecord {
                id: row.get(0)?,
                category,
                person_name: row.get(1)?,
                news_text: row.get(2)?,
                news_body: None,
                image_url: row.get(3)?,
                youtube_url: None,
                search_query: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                created_at: parse_created_at(&created_at_raw),
            });
        }

        let created_at_raw: String = row.get(7)?;
        Ok(NewsRecord {
            id: row.get(0)?,
            category,
            person_name: row.get(1)?,
            news_text: row.get(2)?,
            news_body: row.get(3)?,
            image_url: row.get(4)?,
            youtube_url: row.get(5)?,
            search_query: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            created_at: parse_created_at(&created_at_raw),
        })
    }

    /// Insert or refresh a subscription, keyed by endpoint
    pub fn upsert_subscription(&self, sub: &PushSubscription) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;
        conn.execute(
            r#"
            INSERT INTO push_subscriptions (endpoint, p256dh, auth, user_agent, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(endpoint) DO UPDATE SET
                p256dh = excluded.p256dh,
                auth = excluded.auth,
                user_agent = excluded.user_agent
            "#,
            params![
                sub.endpoint,
                sub.p256dh,
                sub.auth,
                sub.user_agent,
                sub.created_at.to_rfc3339(),
            ],
        )
        .map_err(StoreError::Database)?;
        Ok(())
    }

    pub fn list_subscriptions(&self) -> Result<Vec<PushSubscription>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;
        let mut stmt = conn
            .prepare(
                "SELECT endpoint, p256dh, auth, user_agent, created_at FROM push_subscriptions",
            )
            .map_err(StoreError::Database)?;

        let subs = stmt
            .query_map([], |row| {
                let created_at_raw: String = row.get(4)?;
                let created_at = parse_created_at(&created_at_raw);
                Ok(PushSubscription {
                    endpoint: row.get(0)?,
                    p256dh: row.get(1)?,
                    auth: row.get(2)?,
                    user_agent: row.get(3)?,
                    created_at,
                })
            })
            .map_err(StoreError::Database)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(subs)
    }

    pub fn delete_subscription(&self, endpoint: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockError)?;
        let removed = conn
            .execute(
                "DELETE FROM push_subscriptions WHERE endpoint = ?1",
                params![endpoint],
            )
            .map_err(StoreError::Database)?;
        Ok(removed > 0)
    }
}
