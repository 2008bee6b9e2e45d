use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Router;
use chrono::Utc;

use crate::comments::{self, CommentPatch, CommentWithAuthor, NewComment};
use crate::db::models::Comment;
use crate::error::AppResult;
use crate::extractors::{CurrentUser, Json, Path, Query};
use crate::routes::Pagination;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/comments", post(create_comment))
        .route("/api/comments/event/{event_id}", get(event_comments))
        .route(
            "/api/comments/{id}",
            put(update_comment).delete(delete_comment),
        )
}

async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(new): Json<NewComment>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let conn = state.db.get()?;
    let comment = comments::create(&conn, user.actor(), new, Utc::now())?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn event_comments(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<CommentWithAuthor>>> {
    let conn = state.db.get()?;
    Ok(Json(comments::list_for_event(
        &conn,
        event_id,
        page.skip(),
        page.limit(),
    )?))
}

async fn update_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(patch): Json<CommentPatch>,
) -> AppResult<Json<Comment>> {
    let conn = state.db.get()?;
    Ok(Json(comments::update(&conn, user.actor(), id, patch, Utc::now())?))
}

async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    comments::delete(&conn, user.actor(), id)?;
    Ok(StatusCode::NO_CONTENT)
}
