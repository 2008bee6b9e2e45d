pub mod domain;
pub mod repository;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

pub use domain::{EventDetail, EventDraft, EventPatch, NewEvent, Timestamp};
pub use repository::EventFilter;

use crate::auth::Actor;
use crate::db;
use crate::db::models::Event;
use crate::error::{AppError, AppResult};

pub fn get(conn: &Connection, id: i64) -> AppResult<Event> {
    repository::find(conn, id)?.ok_or(AppError::NotFound("Event"))
}

pub fn create(conn: &Connection, actor: Actor, new: NewEvent, now: DateTime<Utc>) -> AppResult<Event> {
    if !actor.is_admin() {
        return Err(AppError::forbidden("Only administrators can create events"));
    }
    let draft = new.into_draft()?;
    let event = repository::insert(conn, &draft, actor.id, now)?;
    tracing::info!(event_id = event.id, organizer_id = actor.id, "Created event {}", event.title);
    Ok(event)
}

pub fn update(
    conn: &Connection,
    actor: Actor,
    id: i64,
    patch: EventPatch,
    now: DateTime<Utc>,
) -> AppResult<Event> {
    let current = get(conn, id)?;
    if !actor.can_manage(current.organizer_id) {
        return Err(AppError::forbidden("Not enough permissions to update this event"));
    }
    let draft = patch.apply(&current)?;

    // Seats already held bound how far capacity can shrink.
    db::immediate_transaction(conn, || {
        if let Some(max) = draft.max_participants {
            let held = repository::active_registration_count(conn, id)?;
            if max < held {
                return Err(AppError::validation(format!(
                    "max_participants cannot be lower than the {} existing registrations",
                    held
                )));
            }
        }
        repository::update(conn, id, &draft, now)?.ok_or(AppError::NotFound("Event"))
    })
}

pub fn delete(conn: &Connection, actor: Actor, id: i64) -> AppResult<()> {
    let current = get(conn, id)?;
    if !actor.can_manage(current.organizer_id) {
        return Err(AppError::forbidden("Not enough permissions to delete this event"));
    }
    repository::delete(conn, id)?;
    tracing::info!(event_id = id, "Deleted event");
    Ok(())
}

/// Event with its counters, from the point of view of `viewer` (if any).
pub fn detail(
    conn: &Connection,
    event: Event,
    viewer: Option<i64>,
    now: DateTime<Utc>,
) -> AppResult<EventDetail> {
    let registrations_count = repository::active_registration_count(conn, event.id)?;
    let comments_count = repository::comment_count(conn, event.id)?;
    let is_registered = match viewer {
        Some(user_id) => repository::is_registered(conn, event.id, user_id)?,
        None => false,
    };

    Ok(EventDetail {
        comments_count,
        registrations_count,
        available_slots: event.available_slots(registrations_count),
        is_registration_open: event.is_registration_open(now),
        is_cancelled: event.is_cancelled(),
        is_registered,
        event,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, models::UserRole, to_db_time};
    use chrono::Duration;
    use r2d2::Pool;
    use r2d2_sqlite::SqliteConnectionManager;
    use rusqlite::params;
    use serde_json::json;

    fn setup() -> (r2d2::PooledConnection<SqliteConnectionManager>, Actor, Actor) {
        let manager = SqliteConnectionManager::memory()
            .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(1).build(manager).unwrap();
        db::run_migrations(&pool).unwrap();
        let conn = pool.get().unwrap();
        let now = to_db_time(Utc::now());
        conn.execute(
            "INSERT INTO users (email, password_hash, full_name, role, created_at, updated_at)
             VALUES ('admin@campus.edu', 'x', 'Admin', 'admin', ?1, ?1),
                    ('stu@campus.edu', 'x', 'Stu', 'student', ?1, ?1)",
            params![now],
        )
        .unwrap();
        (
            conn,
            Actor::new(1, UserRole::Admin),
            Actor::new(2, UserRole::Student),
        )
    }

    fn new_event(max: Option<i64>) -> NewEvent {
        let start = Utc::now() + Duration::days(5);
        serde_json::from_value(json!({
            "title": "Career fair",
            "description": "Meet employers",
            "category": "career",
            "location": "Gym",
            "start_datetime": start.to_rfc3339(),
            "end_datetime": (start + Duration::hours(4)).to_rfc3339(),
            "max_participants": max,
        }))
        .unwrap()
    }

    #[test]
    fn only_admins_create_events() {
        let (conn, admin, student) = setup();
        let now = Utc::now();
        assert!(matches!(
            create(&conn, student, new_event(None), now),
            Err(AppError::Forbidden(_))
        ));
        let event = create(&conn, admin, new_event(None), now).unwrap();
        assert_eq!(event.organizer_id, admin.id);
    }

    #[test]
    fn non_owner_cannot_update_or_delete() {
        let (conn, admin, student) = setup();
        let now = Utc::now();
        let event = create(&conn, admin, new_event(None), now).unwrap();
        assert!(matches!(
            update(&conn, student, event.id, EventPatch::default(), now),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(delete(&conn, student, event.id), Err(AppError::Forbidden(_))));
        delete(&conn, admin, event.id).unwrap();
        assert!(matches!(get(&conn, event.id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn capacity_cannot_drop_below_held_seats() {
        let (conn, admin, student) = setup();
        let now = Utc::now();
        let event = create(&conn, admin, new_event(Some(5)), now).unwrap();
        conn.execute(
            "INSERT INTO registrations (status, registration_date, user_id, event_id)
             VALUES ('confirmed', ?1, ?2, ?3), ('confirmed', ?1, ?4, ?3)",
            params![to_db_time(now), student.id, event.id, admin.id],
        )
        .unwrap();

        let shrink: EventPatch = serde_json::from_value(json!({ "max_participants": 1 })).unwrap();
        assert!(matches!(
            update(&conn, admin, event.id, shrink, now),
            Err(AppError::Validation(_))
        ));
        assert_eq!(get(&conn, event.id).unwrap().max_participants, Some(5));
        assert!(conn.is_autocommit());

        let exact: EventPatch = serde_json::from_value(json!({ "max_participants": 2 })).unwrap();
        let updated = update(&conn, admin, event.id, exact, now).unwrap();
        assert_eq!(updated.max_participants, Some(2));

        let unlimited: EventPatch =
            serde_json::from_value(json!({ "max_participants": null })).unwrap();
        let updated = update(&conn, admin, event.id, unlimited, now).unwrap();
        assert_eq!(updated.max_participants, None);
    }

    #[test]
    fn detail_reports_slots_and_viewer_registration() {
        let (conn, admin, student) = setup();
        let now = Utc::now();
        let event = create(&conn, admin, new_event(Some(3)), now).unwrap();
        conn.execute(
            "INSERT INTO registrations (status, registration_date, user_id, event_id)
             VALUES ('confirmed', ?1, ?2, ?3)",
            params![to_db_time(now), student.id, event.id],
        )
        .unwrap();

        let seen_by_student = detail(&conn, event.clone(), Some(student.id), now).unwrap();
        assert_eq!(seen_by_student.registrations_count, 1);
        assert_eq!(seen_by_student.available_slots, Some(2));
        assert!(seen_by_student.is_registered);
        assert!(seen_by_student.is_registration_open);

        let anonymous = detail(&conn, event, None, now).unwrap();
        assert!(!anonymous.is_registered);
    }
}
