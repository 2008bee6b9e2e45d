pub mod models;

use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;

use crate::state::DbPool;

pub const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_initial",
        include_str!("../../migrations/001_initial.sql"),
    ),
    (
        "002_account_tokens",
        include_str!("../../migrations/002_account_tokens.sql"),
    ),
    (
        "003_notification_outbox",
        include_str!("../../migrations/003_notification_outbox.sql"),
    ),
];

pub fn create_pool(db_path: &Path) -> anyhow::Result<DbPool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Per-connection pragmas; foreign_keys and busy_timeout do not persist in the file
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )
    });
    let pool = Pool::builder().max_size(8).build(manager)?;

    let conn = pool.get()?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        ",
    )?;

    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;

    // Create migrations tracking table
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_version WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        if !already_applied {
            tracing::info!("Applying migration: {}", name);
            let batch = format!(
                "BEGIN;\n{}\nINSERT INTO schema_version (name) VALUES ('{}');\nCOMMIT;",
                sql, name
            );
            if let Err(e) = conn.execute_batch(&batch) {
                let _ = conn.execute_batch("ROLLBACK;");
                return Err(anyhow::anyhow!("migration {} failed: {}", name, e));
            }
        }
    }

    tracing::info!("Database migrations complete");
    Ok(())
}

/// Create the configured bootstrap admin if no user with that email exists yet.
/// Returns true when a new account was inserted.
pub fn ensure_admin(
    pool: &DbPool,
    email: &str,
    full_name: &str,
    password: &str,
    bcrypt_cost: u32,
) -> anyhow::Result<bool> {
    let conn = pool.get()?;

    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )
        .optional()?;

    if existing.is_some() {
        return Ok(false);
    }

    let hash = crate::auth::password::hash_password(password, bcrypt_cost)?;
    let now = to_db_time(Utc::now());
    conn.execute(
        "INSERT INTO users (email, password_hash, full_name, role, is_active, email_verified, created_at, updated_at)
         VALUES (?1, ?2, ?3, 'admin', 1, 1, ?4, ?4)",
        params![email, hash, full_name, now],
    )?;

    tracing::info!("Created bootstrap admin account {}", email);
    Ok(true)
}

/// Fixed-width RFC 3339 in UTC, so stored timestamps compare correctly as text.
pub fn to_db_time(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn to_db_time_opt(dt: Option<DateTime<Utc>>) -> Option<String> {
    dt.map(to_db_time)
}

fn parse_db_time(row: &Row<'_>, column: &str, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            let idx = row.as_ref().column_index(column).unwrap_or(0);
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub fn get_time(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    parse_db_time(row, column, &raw)
}

pub fn get_opt_time(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(column)?;
    raw.map(|s| parse_db_time(row, column, &s)).transpose()
}

/// Run `f` under `BEGIN IMMEDIATE`. Commits on success; any error, a failed
/// COMMIT included, rolls back so the pooled connection is left in autocommit.
pub fn immediate_transaction<T, E>(
    conn: &Connection,
    f: impl FnOnce() -> Result<T, E>,
) -> Result<T, E>
where
    E: From<rusqlite::Error>,
{
    conn.execute_batch("BEGIN IMMEDIATE")?;
    let outcome = f().and_then(|value| {
        conn.execute_batch("COMMIT")?;
        Ok(value)
    });
    if outcome.is_err() && !conn.is_autocommit() {
        if let Err(e) = conn.execute_batch("ROLLBACK") {
            tracing::error!("Rollback failed: {}", e);
        }
    }
    outcome
}

/// True when the error is a UNIQUE (or PRIMARY KEY) constraint violation.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}
