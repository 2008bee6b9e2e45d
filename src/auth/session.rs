use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::User;
use crate::db::to_db_time;

/// Create a new session for a user. Returns the session token.
pub fn create_session(
    conn: &Connection,
    user_id: i64,
    hours: u64,
    now: DateTime<Utc>,
) -> Result<String, rusqlite::Error> {
    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();
    let expires_at = now + Duration::hours(hours as i64);

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, user_id, token, to_db_time(expires_at), to_db_time(now)],
    )?;

    Ok(token)
}

/// Delete a session by token.
pub fn delete_session(conn: &Connection, token: &str) -> Result<(), rusqlite::Error> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Resolve a live session token to its user.
pub fn find_session_user(
    conn: &Connection,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<User>, rusqlite::Error> {
    conn.query_row(
        "SELECT u.id AS id, u.email AS email, u.password_hash AS password_hash,
                u.full_name AS full_name, u.role AS role, u.is_active AS is_active,
                u.email_verified AS email_verified, u.created_at AS created_at,
                u.updated_at AS updated_at
         FROM sessions s
         JOIN users u ON u.id = s.user_id
         WHERE s.token = ?1 AND s.expires_at > ?2",
        params![token, to_db_time(now)],
        User::from_row,
    )
    .optional()
}

/// Drop every expired session. Returns how many were removed.
pub fn purge_expired(conn: &Connection, now: DateTime<Utc>) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "DELETE FROM sessions WHERE expires_at <= ?1",
        params![to_db_time(now)],
    )
}

/// Generate a cryptographically random 32-byte hex token.
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use r2d2::Pool;
    use r2d2_sqlite::SqliteConnectionManager;

    fn conn_with_user() -> (r2d2::PooledConnection<SqliteConnectionManager>, i64) {
        let pool = Pool::builder()
            .max_size(1)
            .build(SqliteConnectionManager::memory())
            .unwrap();
        db::run_migrations(&pool).unwrap();
        let conn = pool.get().unwrap();
        let now = to_db_time(Utc::now());
        conn.execute(
            "INSERT INTO users (email, password_hash, full_name, created_at, updated_at)
             VALUES ('s@campus.edu', 'x', 'Sam', ?1, ?1)",
            params![now],
        )
        .unwrap();
        let id = conn.last_insert_rowid();
        (conn, id)
    }

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn session_resolves_until_expiry() {
        let (conn, user_id) = conn_with_user();
        let now = Utc::now();
        let token = create_session(&conn, user_id, 1, now).unwrap();

        let user = find_session_user(&conn, &token, now).unwrap().unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.email, "s@campus.edu");

        let later = now + Duration::hours(2);
        assert!(find_session_user(&conn, &token, later).unwrap().is_none());
        assert_eq!(purge_expired(&conn, later).unwrap(), 1);
    }

    #[test]
    fn deleted_session_no_longer_resolves() {
        let (conn, user_id) = conn_with_user();
        let now = Utc::now();
        let token = create_session(&conn, user_id, 1, now).unwrap();
        delete_session(&conn, &token).unwrap();
        assert!(find_session_user(&conn, &token, now).unwrap().is_none());
    }
}
