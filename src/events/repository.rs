// Event persistence. Callers pass `now` explicitly so queries stay testable.
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::domain::EventDraft;
use crate::db::models::Event;
use crate::db::{to_db_time, to_db_time_opt};

#[derive(Debug, Clone)]
pub struct EventFilter {
    pub category: Option<String>,
    pub upcoming_only: bool,
    pub skip: i64,
    pub limit: i64,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            category: None,
            upcoming_only: true,
            skip: 0,
            limit: 100,
        }
    }
}

pub fn find(conn: &Connection, id: i64) -> Result<Option<Event>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {} FROM events e WHERE e.id = ?1", Event::COLUMNS),
        params![id],
        Event::from_row,
    )
    .optional()
}

pub fn insert(
    conn: &Connection,
    draft: &EventDraft,
    organizer_id: i64,
    now: DateTime<Utc>,
) -> Result<Event, rusqlite::Error> {
    let now = to_db_time(now);
    conn.execute(
        "INSERT INTO events (title, description, category, location, start_datetime, end_datetime,
                             registration_deadline, max_participants, registration_link, image_url,
                             status, is_featured, organizer_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
        params![
            draft.title,
            draft.description,
            draft.category,
            draft.location,
            to_db_time(draft.start_datetime),
            to_db_time(draft.end_datetime),
            to_db_time_opt(draft.registration_deadline),
            draft.max_participants,
            draft.registration_link,
            draft.image_url,
            draft.status.as_str(),
            draft.is_featured,
            organizer_id,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();
    conn.query_row(
        &format!("SELECT {} FROM events e WHERE e.id = ?1", Event::COLUMNS),
        params![id],
        Event::from_row,
    )
}

/// Overwrite every editable column. Returns `None` if the event vanished.
pub fn update(
    conn: &Connection,
    id: i64,
    draft: &EventDraft,
    now: DateTime<Utc>,
) -> Result<Option<Event>, rusqlite::Error> {
    let changed = conn.execute(
        "UPDATE events SET title = ?2, description = ?3, category = ?4, location = ?5,
                start_datetime = ?6, end_datetime = ?7, registration_deadline = ?8,
                max_participants = ?9, registration_link = ?10, image_url = ?11,
                status = ?12, is_featured = ?13, updated_at = ?14
         WHERE id = ?1",
        params![
            id,
            draft.title,
            draft.description,
            draft.category,
            draft.location,
            to_db_time(draft.start_datetime),
            to_db_time(draft.end_datetime),
            to_db_time_opt(draft.registration_deadline),
            draft.max_participants,
            draft.registration_link,
            draft.image_url,
            draft.status.as_str(),
            draft.is_featured,
            to_db_time(now),
        ],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    find(conn, id)
}

pub fn delete(conn: &Connection, id: i64) -> Result<bool, rusqlite::Error> {
    let removed = conn.execute("DELETE FROM events WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}

/// Escape LIKE wildcards so a category filter matches literally.
fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

pub fn list(
    conn: &Connection,
    filter: &EventFilter,
    now: DateTime<Utc>,
) -> Result<Vec<Event>, rusqlite::Error> {
    let category = filter
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(like_pattern);
    let since = filter.upcoming_only.then(|| to_db_time(now));

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM events e
         WHERE (?1 IS NULL OR lower(e.category) LIKE ?1 ESCAPE '\\')
           AND (?2 IS NULL OR e.start_datetime >= ?2)
         ORDER BY e.start_datetime ASC, e.id ASC
         LIMIT ?3 OFFSET ?4",
        Event::COLUMNS
    ))?;
    let events = stmt
        .query_map(
            params![category, since, filter.limit, filter.skip],
            Event::from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}

/// Registrations that hold a seat: everything except cancelled.
pub fn active_registration_count(conn: &Connection, event_id: i64) -> Result<i64, rusqlite::Error> {
    conn.query_row(
        "SELECT COUNT(*) FROM registrations WHERE event_id = ?1 AND status != 'cancelled'",
        params![event_id],
        |row| row.get(0),
    )
}

pub fn comment_count(conn: &Connection, event_id: i64) -> Result<i64, rusqlite::Error> {
    conn.query_row(
        "SELECT COUNT(*) FROM comments WHERE event_id = ?1",
        params![event_id],
        |row| row.get(0),
    )
}

pub fn is_registered(conn: &Connection, event_id: i64, user_id: i64) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM registrations
         WHERE event_id = ?1 AND user_id = ?2 AND status != 'cancelled'",
        params![event_id, user_id],
        |row| row.get(0),
    )
}
