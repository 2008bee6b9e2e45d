use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::Router;
use chrono::Utc;

use crate::admin::{self, AdminStats, UserAdminUpdate};
use crate::db::models::User;
use crate::error::AppResult;
use crate::extractors::{AdminUser, Json, Path, Query};
use crate::routes::Pagination;
use crate::state::AppState;
use crate::users;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/stats", get(stats))
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/{id}", put(update_user).delete(delete_user))
}

async fn stats(State(state): State<AppState>, _admin: AdminUser) -> AppResult<Json<AdminStats>> {
    let conn = state.db.get()?;
    Ok(Json(admin::stats(&conn, Utc::now())?))
}

async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<User>>> {
    let conn = state.db.get()?;
    Ok(Json(users::list(&conn, page.skip(), page.limit())?))
}

async fn update_user(
    State(state): State<AppState>,
    AdminUser(me): AdminUser,
    Path(id): Path<i64>,
    Json(update): Json<UserAdminUpdate>,
) -> AppResult<Json<User>> {
    let conn = state.db.get()?;
    Ok(Json(admin::update_user(&conn, &me, id, update, Utc::now())?))
}

async fn delete_user(
    State(state): State<AppState>,
    AdminUser(me): AdminUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    admin::delete_user(&conn, &me, id)?;
    Ok(StatusCode::NO_CONTENT)
}
