// Password-reset and email-verification tokens. Issuing a new token for a
// user replaces any earlier ones.
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::auth::session::generate_token;
use crate::db::{get_time, to_db_time};

#[derive(Debug, Clone, PartialEq)]
pub struct PasswordReset {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

impl PasswordReset {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailVerification {
    pub token: String,
    pub user_id: i64,
    pub email: String,
    pub is_verified: bool,
    pub expires_at: DateTime<Utc>,
}

impl EmailVerification {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

pub fn issue_password_reset(
    conn: &Connection,
    user_id: i64,
    valid_hours: i64,
    now: DateTime<Utc>,
) -> Result<String, rusqlite::Error> {
    conn.execute(
        "DELETE FROM password_resets WHERE user_id = ?1",
        params![user_id],
    )?;

    let token = generate_token();
    conn.execute(
        "INSERT INTO password_resets (token, user_id, expires_at, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            token,
            user_id,
            to_db_time(now + Duration::hours(valid_hours)),
            to_db_time(now)
        ],
    )?;
    Ok(token)
}

pub fn find_password_reset(
    conn: &Connection,
    token: &str,
) -> Result<Option<PasswordReset>, rusqlite::Error> {
    conn.query_row(
        "SELECT token, user_id, expires_at FROM password_resets WHERE token = ?1",
        params![token],
        |row| {
            Ok(PasswordReset {
                token: row.get("token")?,
                user_id: row.get("user_id")?,
                expires_at: get_time(row, "expires_at")?,
            })
        },
    )
    .optional()
}

pub fn delete_password_reset(conn: &Connection, token: &str) -> Result<(), rusqlite::Error> {
    conn.execute("DELETE FROM password_resets WHERE token = ?1", params![token])?;
    Ok(())
}

pub fn issue_email_verification(
    conn: &Connection,
    user_id: i64,
    email: &str,
    valid_hours: i64,
    now: DateTime<Utc>,
) -> Result<String, rusqlite::Error> {
    conn.execute(
        "DELETE FROM email_verifications WHERE user_id = ?1",
        params![user_id],
    )?;

    let token = generate_token();
    conn.execute(
        "INSERT INTO email_verifications (token, user_id, email, is_verified, expires_at, created_at)
         VALUES (?1, ?2, ?3, 0, ?4, ?5)",
        params![
            token,
            user_id,
            email,
            to_db_time(now + Duration::hours(valid_hours)),
            to_db_time(now)
        ],
    )?;
    Ok(token)
}

pub fn find_email_verification(
    conn: &Connection,
    token: &str,
) -> Result<Option<EmailVerification>, rusqlite::Error> {
    conn.query_row(
        "SELECT token, user_id, email, is_verified, expires_at FROM email_verifications WHERE token = ?1",
        params![token],
        |row| {
            Ok(EmailVerification {
                token: row.get("token")?,
                user_id: row.get("user_id")?,
                email: row.get("email")?,
                is_verified: row.get("is_verified")?,
                expires_at: get_time(row, "expires_at")?,
            })
        },
    )
    .optional()
}

/// Whether the user already holds an unexpired, unused verification token.
pub fn has_pending_verification(
    conn: &Connection,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM email_verifications
         WHERE user_id = ?1 AND is_verified = 0 AND expires_at > ?2",
        params![user_id, to_db_time(now)],
        |row| row.get(0),
    )
}

/// Mark the token used and the owning user's email verified.
pub fn complete_email_verification(
    conn: &Connection,
    verification: &EmailVerification,
    now: DateTime<Utc>,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "UPDATE email_verifications SET is_verified = 1 WHERE token = ?1",
        params![verification.token],
    )?;
    conn.execute(
        "UPDATE users SET email_verified = 1, updated_at = ?2 WHERE id = ?1",
        params![verification.user_id, to_db_time(now)],
    )?;
    Ok(())
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
             VALUES ('t@campus.edu', 'x', 'Tia', ?1, ?1)",
            params![now],
        )
        .unwrap();
        let id = conn.last_insert_rowid();
        (conn, id)
    }

    #[test]
    fn new_reset_token_replaces_old_one() {
        let (conn, user_id) = conn_with_user();
        let now = Utc::now();
        let first = issue_password_reset(&conn, user_id, 24, now).unwrap();
        let second = issue_password_reset(&conn, user_id, 24, now).unwrap();

        assert!(find_password_reset(&conn, &first).unwrap().is_none());
        let reset = find_password_reset(&conn, &second).unwrap().unwrap();
        assert_eq!(reset.user_id, user_id);
        assert!(reset.is_valid(now));
        assert!(!reset.is_valid(now + Duration::hours(24)));
    }

    #[test]
    fn verification_marks_user_verified() {
        let (conn, user_id) = conn_with_user();
        let now = Utc::now();
        let token = issue_email_verification(&conn, user_id, "t@campus.edu", 48, now).unwrap();
        assert!(has_pending_verification(&conn, user_id, now).unwrap());

        let verification = find_email_verification(&conn, &token).unwrap().unwrap();
        complete_email_verification(&conn, &verification, now).unwrap();

        let verified: bool = conn
            .query_row(
                "SELECT email_verified FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .unwrap();
        assert!(verified);
        assert!(!has_pending_verification(&conn, user_id, now).unwrap());
        assert!(find_email_verification(&conn, &token).unwrap().unwrap().is_verified);
    }

    #[test]
    fn expired_verification_is_not_pending() {
        let (conn, user_id) = conn_with_user();
        let issued = Utc::now() - Duration::hours(72);
        issue_email_verification(&conn, user_id, "t@campus.edu", 48, issued).unwrap();
        assert!(!has_pending_verification(&conn, user_id, Utc::now()).unwrap());
    }
}
