//! Database connection and table management.
//!
//! SQLite through sqlx. Tables are created on startup if missing.

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Main database handle.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

/// Row counts reported at startup.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DatabaseStats {
    pub users: i64,
    pub universities: i64,
    pub documents: i64,
    pub payments: i64,
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        username      TEXT    NOT NULL UNIQUE COLLATE NOCASE,
        email         TEXT    NOT NULL DEFAULT '',
        password_hash TEXT    NOT NULL,
        is_staff      INTEGER NOT NULL DEFAULT 0,
        date_joined   TEXT    NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS student_profiles (
        user_id              INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
        marks                TEXT,
        stored_aps_score     INTEGER,
        subscription_package TEXT    NOT NULL DEFAULT 'basic',
        subscription_status  INTEGER NOT NULL DEFAULT 0,
        subscription_date    TEXT,
        application_count    INTEGER NOT NULL DEFAULT 0,
        phone_number         TEXT,
        whatsapp_enabled     INTEGER NOT NULL DEFAULT 0,
        last_chat_date       TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        token_hash TEXT    PRIMARY KEY,
        user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        expires_at TEXT    NOT NULL,
        flash      TEXT    NOT NULL DEFAULT '[]'
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS universities (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        name            TEXT    NOT NULL UNIQUE,
        minimum_aps     INTEGER NOT NULL,
        province        TEXT    NOT NULL DEFAULT '',
        description     TEXT    NOT NULL DEFAULT '',
        application_fee TEXT    NOT NULL DEFAULT '',
        due_date        TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS selections (
        user_id       INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        university_id INTEGER NOT NULL REFERENCES universities(id) ON DELETE CASCADE,
        selected_at   TEXT    NOT NULL,
        PRIMARY KEY (user_id, university_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id           INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        document_type     TEXT    NOT NULL,
        file_path         TEXT    NOT NULL,
        original_name     TEXT    NOT NULL,
        uploaded_at       TEXT    NOT NULL,
        verified          INTEGER NOT NULL DEFAULT 0,
        verification_date TEXT,
        notes             TEXT,
        university_id     INTEGER REFERENCES universities(id) ON DELETE SET NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS application_statuses (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id          INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        university_id    INTEGER NOT NULL REFERENCES universities(id) ON DELETE CASCADE,
        status           TEXT    NOT NULL DEFAULT 'not_started',
        payment_verified INTEGER NOT NULL DEFAULT 0,
        tracking_number  TEXT,
        application_date TEXT    NOT NULL,
        last_updated     TEXT    NOT NULL,
        UNIQUE (user_id, university_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS payments (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id       INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        university_id INTEGER REFERENCES universities(id) ON DELETE SET NULL,
        amount        INTEGER NOT NULL,
        status        TEXT    NOT NULL DEFAULT 'pending',
        document_id   INTEGER REFERENCES documents(id) ON DELETE SET NULL,
        created_at    TEXT    NOT NULL,
        verified_at   TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_documents_user ON documents(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_documents_unverified ON documents(verified, uploaded_at)",
    "CREATE INDEX IF NOT EXISTS idx_payments_status ON payments(status)",
    "CREATE INDEX IF NOT EXISTS idx_sessions_expiry ON sessions(expires_at)",
];

impl Database {
    /// Open or create a database at `url`.
    pub async fn open(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = url.contains(":memory:");
        let mut pool = SqlitePoolOptions::new();
        if in_memory {
            // Every connection to :memory: is its own database, so keep
            // exactly one alive for the life of the pool.
            pool = pool.max_connections(1).idle_timeout(None).max_lifetime(None);
        } else {
            pool = pool.max_connections(max_connections.max(1));
        }

        let pool = pool.connect_with(options).await?;
        tracing::debug!("Connected to database at {}", url);

        Ok(Self { pool })
    }

    /// Fresh in-memory database with all tables created.
    pub async fn in_memory() -> Result<Self> {
        let db = Self::open("sqlite::memory:", 1).await?;
        db.initialize().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all tables and indexes that don't exist yet.
    pub async fn initialize(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("Database schema ready");
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn stats(&self) -> Result<DatabaseStats> {
        let (users, universities, documents, payments): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM universities),
                (SELECT COUNT(*) FROM documents),
                (SELECT COUNT(*) FROM payments)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DatabaseStats { users, universities, documents, payments })
    }
}
