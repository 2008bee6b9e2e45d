use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;

use crate::db::models::Event;
use crate::error::AppResult;
use crate::events::{self, EventDetail, EventFilter, EventPatch, NewEvent};
use crate::extractors::{CurrentUser, Json, MaybeUser, Path, Query};
use crate::notify;
use crate::registrations::{self, Attendee};
use crate::routes::Pagination;
use crate::state::AppState;
use crate::users;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/events", get(list_events).post(create_event))
        .route(
            "/api/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/api/events/{id}/registrations", get(event_registrations))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    category: Option<String>,
    upcoming_only: Option<bool>,
    skip: Option<i64>,
    limit: Option<i64>,
}

async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Event>>> {
    let defaults = Pagination::default();
    let page = Pagination {
        skip: query.skip.unwrap_or(defaults.skip),
        limit: query.limit.unwrap_or(defaults.limit),
    };
    let filter = EventFilter {
        category: query.category,
        upcoming_only: query.upcoming_only.unwrap_or(true),
        skip: page.skip(),
        limit: page.limit(),
    };
    let conn = state.db.get()?;
    Ok(Json(events::repository::list(&conn, &filter, Utc::now())?))
}

async fn create_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(new): Json<NewEvent>,
) -> AppResult<(StatusCode, Json<Event>)> {
    let conn = state.db.get()?;
    let event = events::create(&conn, user.actor(), new, Utc::now())?;

    // Announcement is best-effort; the event already exists.
    match users::active_emails(&conn) {
        Ok(recipients) => {
            let frontend = &state.config.notifications.frontend_url;
            for recipient in &recipients {
                state
                    .notifier
                    .dispatch(notify::event_announcement(frontend, &event, recipient));
            }
            tracing::debug!(event_id = event.id, recipients = recipients.len(), "Queued announcements");
        }
        Err(e) => tracing::error!(event_id = event.id, "Could not load announcement recipients: {}", e),
    }

    Ok((StatusCode::CREATED, Json(event)))
}

async fn get_event(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Path(id): Path<i64>,
) -> AppResult<Json<EventDetail>> {
    let conn = state.db.get()?;
    let event = events::get(&conn, id)?;
    let viewer = maybe_user.0.map(|u| u.id);
    Ok(Json(events::detail(&conn, event, viewer, Utc::now())?))
}

async fn update_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(patch): Json<EventPatch>,
) -> AppResult<Json<Event>> {
    let conn = state.db.get()?;
    Ok(Json(events::update(&conn, user.actor(), id, patch, Utc::now())?))
}

async fn delete_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    events::delete(&conn, user.actor(), id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn event_registrations(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<Attendee>>> {
    let conn = state.db.get()?;
    Ok(Json(registrations::for_event(&conn, user.actor(), id)?))
}
