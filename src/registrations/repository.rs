use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::domain::{check_can_register, Attendee, RegistrationWithEvent};
use crate::db::models::{Event, Registration, RegistrationStatus};
use crate::db::{immediate_transaction, is_unique_violation, to_db_time};
use crate::error::{AppError, AppResult};
use crate::events::repository as events;

pub fn find(conn: &Connection, id: i64) -> Result<Option<Registration>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {} FROM registrations r WHERE r.id = ?1", Registration::COLUMNS),
        params![id],
        Registration::from_row,
    )
    .optional()
}

/// Check-and-insert under `BEGIN IMMEDIATE`, so the seat count cannot change
/// between the capacity check and the insert.
pub fn create(
    conn: &Connection,
    user_id: i64,
    event_id: i64,
    now: DateTime<Utc>,
) -> AppResult<(Registration, Event)> {
    immediate_transaction(conn, || {
        let event = events::find(conn, event_id)?.ok_or(AppError::NotFound("Event"))?;
        let active = events::active_registration_count(conn, event_id)?;
        let already = events::is_registered(conn, event_id, user_id)?;
        check_can_register(&event, active, already, now)?;

        conn.execute(
            "INSERT INTO registrations (status, registration_date, attended, user_id, event_id)
             VALUES (?1, ?2, 0, ?3, ?4)",
            params![
                RegistrationStatus::Confirmed.as_str(),
                to_db_time(now),
                user_id,
                event_id
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::AlreadyRegistered
            } else {
                AppError::Database(e)
            }
        })?;

        let id = conn.last_insert_rowid();
        let registration = find(conn, id)?.ok_or(AppError::NotFound("Registration"))?;
        Ok((registration, event))
    })
}

pub fn delete(conn: &Connection, id: i64) -> Result<bool, rusqlite::Error> {
    let removed = conn.execute("DELETE FROM registrations WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}

/// A user's registrations, newest first, each with its event.
pub fn for_user(
    conn: &Connection,
    user_id: i64,
    skip: i64,
    limit: i64,
) -> Result<Vec<RegistrationWithEvent>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM registrations r
         WHERE r.user_id = ?1
         ORDER BY r.registration_date DESC, r.id DESC
         LIMIT ?2 OFFSET ?3",
        Registration::COLUMNS
    ))?;
    let registrations = stmt
        .query_map(params![user_id, limit, skip], Registration::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Vec::with_capacity(registrations.len());
    for registration in registrations {
        if let Some(event) = events::find(conn, registration.event_id)? {
            out.push(RegistrationWithEvent {
                registration,
                event,
            });
        }
    }
    Ok(out)
}

/// Everyone registered for an event, oldest signup first.
pub fn for_event(conn: &Connection, event_id: i64) -> Result<Vec<Attendee>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, u.full_name AS user_name, u.email AS user_email
         FROM registrations r
         JOIN users u ON u.id = r.user_id
         WHERE r.event_id = ?1
         ORDER BY r.registration_date ASC, r.id ASC",
        Registration::COLUMNS
    ))?;
    let attendees = stmt
        .query_map(params![event_id], |row| {
            Ok(Attendee {
                registration: Registration::from_row(row)?,
                user_name: row.get("user_name")?,
                user_email: row.get("user_email")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(attendees)
}

pub fn set_status(
    conn: &Connection,
    id: i64,
    status: RegistrationStatus,
) -> Result<Option<Registration>, rusqlite::Error> {
    let attended = status == RegistrationStatus::Attended;
    let changed = conn.execute(
        "UPDATE registrations SET status = ?2, attended = ?3 WHERE id = ?1",
        params![id, status.as_str(), attended],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    find(conn, id)
}
