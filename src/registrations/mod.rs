pub mod domain;
pub mod repository;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

pub use domain::{AttendanceUpdate, Attendee, RegistrationWithEvent};

use crate::auth::Actor;
use crate::db::models::Registration;
use crate::error::{AppError, AppResult};
use crate::events;
use crate::notify::{self, NotificationDispatcher};
use crate::users;

/// Register `actor` for an event and tell the organizer.
///
/// The organizer notice is queued after commit; a failure to build or send
/// it never undoes the registration.
pub fn register(
    conn: &Connection,
    notifier: &NotificationDispatcher,
    frontend_url: &str,
    actor: Actor,
    event_id: i64,
    now: DateTime<Utc>,
) -> AppResult<Registration> {
    let (registration, event) = repository::create(conn, actor.id, event_id, now)?;
    tracing::info!(
        registration_id = registration.id,
        event_id,
        user_id = actor.id,
        "Registered user for event"
    );

    let people = users::find_by_id(conn, event.organizer_id)
        .and_then(|organizer| Ok((organizer, users::find_by_id(conn, actor.id)?)));
    match people {
        Ok((Some(organizer), Some(registrant))) => notifier.dispatch(notify::registration_notice(
            frontend_url,
            &organizer.email,
            &event,
            &registrant,
            &registration,
        )),
        Ok(_) => tracing::warn!(event_id, "Organizer or registrant missing, no notice sent"),
        Err(e) => tracing::error!(event_id, "Could not prepare registration notice: {}", e),
    }

    Ok(registration)
}

pub fn cancel(conn: &Connection, actor: Actor, registration_id: i64, now: DateTime<Utc>) -> AppResult<()> {
    let registration =
        repository::find(conn, registration_id)?.ok_or(AppError::NotFound("Registration"))?;
    let event = events::get(conn, registration.event_id)?;
    domain::check_can_cancel(actor, &registration, &event, now)?;

    repository::delete(conn, registration_id)?;
    tracing::info!(registration_id, user_id = actor.id, "Cancelled registration");
    Ok(())
}

pub fn for_event(conn: &Connection, actor: Actor, event_id: i64) -> AppResult<Vec<Attendee>> {
    let event = events::get(conn, event_id)?;
    domain::check_can_view_attendees(actor, &event)?;
    Ok(repository::for_event(conn, event_id)?)
}

pub fn mark_attendance(
    conn: &Connection,
    actor: Actor,
    registration_id: i64,
    update: AttendanceUpdate,
) -> AppResult<Registration> {
    let registration =
        repository::find(conn, registration_id)?.ok_or(AppError::NotFound("Registration"))?;
    let event = events::get(conn, registration.event_id)?;
    domain::check_can_view_attendees(actor, &event)?;

    repository::set_status(conn, registration_id, update.status())?
        .ok_or(AppError::NotFound("Registration"))
}
