use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::Router;
use chrono::Utc;
use serde::Deserialize;

use crate::db::models::Registration;
use crate::error::AppResult;
use crate::extractors::{CurrentUser, Json, Path, Query};
use crate::registrations::{self, repository, AttendanceUpdate, RegistrationWithEvent};
use crate::routes::Pagination;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/registrations", post(register))
        .route("/api/registrations/my-registrations", get(my_registrations))
        .route("/api/registrations/{id}", delete(cancel))
        .route("/api/registrations/{id}/attendance", put(attendance))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    event_id: i64,
}

async fn register(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<Registration>)> {
    let conn = state.db.get()?;
    let registration = registrations::register(
        &conn,
        &state.notifier,
        &state.config.notifications.frontend_url,
        user.actor(),
        req.event_id,
        Utc::now(),
    )?;
    Ok((StatusCode::CREATED, Json(registration)))
}

async fn my_registrations(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<RegistrationWithEvent>>> {
    let conn = state.db.get()?;
    Ok(Json(repository::for_user(
        &conn,
        user.id,
        page.skip(),
        page.limit(),
    )?))
}

async fn cancel(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    registrations::cancel(&conn, user.actor(), id, Utc::now())?;
    Ok(StatusCode::NO_CONTENT)
}

async fn attendance(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(update): Json<AttendanceUpdate>,
) -> AppResult<Json<Registration>> {
    let conn = state.db.get()?;
    Ok(Json(registrations::mark_attendance(
        &conn,
        user.actor(),
        id,
        update,
    )?))
}
