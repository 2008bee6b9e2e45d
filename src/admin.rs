use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::db::models::{User, UserRole};
use crate::db::to_db_time;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::users;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryCount {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_events: i64,
    pub upcoming_events: i64,
    pub total_users: i64,
    pub total_registrations: i64,
    pub events_by_category: Vec<CategoryCount>,
    pub registrations_by_status: Vec<StatusCount>,
}

fn count(conn: &Connection, sql: &str, args: impl rusqlite::Params) -> Result<i64, rusqlite::Error> {
    conn.query_row(sql, args, |row| row.get(0))
}

pub fn stats(conn: &Connection, now: DateTime<Utc>) -> Result<AdminStats, rusqlite::Error> {
    let mut by_category = conn.prepare(
        "SELECT category, COUNT(*) FROM events GROUP BY category ORDER BY COUNT(*) DESC, category",
    )?;
    let events_by_category = by_category
        .query_map([], |row| {
            Ok(CategoryCount {
                name: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut by_status =
        conn.prepare("SELECT status, COUNT(*) FROM registrations GROUP BY status ORDER BY status")?;
    let registrations_by_status = by_status
        .query_map([], |row| {
            Ok(StatusCount {
                status: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AdminStats {
        total_events: count(conn, "SELECT COUNT(*) FROM events", [])?,
        upcoming_events: count(
            conn,
            "SELECT COUNT(*) FROM events WHERE start_datetime >= ?1",
            params![to_db_time(now)],
        )?,
        total_users: count(conn, "SELECT COUNT(*) FROM users", [])?,
        total_registrations: count(conn, "SELECT COUNT(*) FROM registrations", [])?,
        events_by_category,
        registrations_by_status,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserAdminUpdate {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

pub fn update_user(
    conn: &Connection,
    admin: &CurrentUser,
    user_id: i64,
    update: UserAdminUpdate,
    now: DateTime<Utc>,
) -> AppResult<User> {
    let target = users::find_by_id(conn, user_id)?.ok_or(AppError::NotFound("User"))?;
    if target.id == admin.id && update.is_active == Some(false) {
        return Err(AppError::BadRequest("You cannot deactivate your own account".into()));
    }

    let role = update.role.unwrap_or(target.role);
    let is_active = update.is_active.unwrap_or(target.is_active);
    users::update_role_and_status(conn, user_id, role, is_active, now)?;
    tracing::info!(admin_id = admin.id, user_id, role = %role, is_active, "Updated user");

    users::find_by_id(conn, user_id)?.ok_or(AppError::NotFound("User"))
}

pub fn delete_user(conn: &Connection, admin: &CurrentUser, user_id: i64) -> AppResult<()> {
    if user_id == admin.id {
        return Err(AppError::BadRequest("You cannot delete your own account".into()));
    }
    if !users::delete(conn, user_id)? {
        return Err(AppError::NotFound("User"));
    }
    tracing::info!(admin_id = admin.id, user_id, "Deleted user");
    Ok(())
}
