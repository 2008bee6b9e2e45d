use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::{User, UserRole};
use crate::db::to_db_time;

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<User>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", User::COLUMNS),
        params![id],
        User::from_row,
    )
    .optional()
}

/// Lookup is case-insensitive through the column's NOCASE collation.
pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<User>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE email = ?1", User::COLUMNS),
        params![email],
        User::from_row,
    )
    .optional()
}

pub fn insert(
    conn: &Connection,
    email: &str,
    password_hash: &str,
    full_name: &str,
    role: UserRole,
    now: DateTime<Utc>,
) -> Result<User, rusqlite::Error> {
    let now = to_db_time(now);
    conn.execute(
        "INSERT INTO users (email, password_hash, full_name, role, is_active, email_verified, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 1, 0, ?5, ?5)",
        params![email, password_hash, full_name, role.as_str(), now],
    )?;
    let id = conn.last_insert_rowid();
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", User::COLUMNS),
        params![id],
        User::from_row,
    )
}

pub fn update_full_name(
    conn: &Connection,
    id: i64,
    full_name: &str,
    now: DateTime<Utc>,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "UPDATE users SET full_name = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, full_name, to_db_time(now)],
    )?;
    Ok(())
}

pub fn update_password(
    conn: &Connection,
    id: i64,
    password_hash: &str,
    now: DateTime<Utc>,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, password_hash, to_db_time(now)],
    )?;
    Ok(())
}

pub fn update_role_and_status(
    conn: &Connection,
    id: i64,
    role: UserRole,
    is_active: bool,
    now: DateTime<Utc>,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "UPDATE users SET role = ?2, is_active = ?3, updated_at = ?4 WHERE id = ?1",
        params![id, role.as_str(), is_active, to_db_time(now)],
    )?;
    Ok(())
}

pub fn list(conn: &Connection, skip: i64, limit: i64) -> Result<Vec<User>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users ORDER BY id ASC LIMIT ?1 OFFSET ?2",
        User::COLUMNS
    ))?;
    let users = stmt
        .query_map(params![limit, skip], User::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

/// Returns whether a row was removed. Dependents go with it through `ON DELETE CASCADE`.
pub fn delete(conn: &Connection, id: i64) -> Result<bool, rusqlite::Error> {
    let removed = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}

/// Email addresses of every active account.
pub fn active_emails(conn: &Connection) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT email FROM users WHERE is_active = 1 ORDER BY id")?;
    let emails = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(emails)
}
