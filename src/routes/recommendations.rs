use axum::extract::State;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;

use crate::db::models::Event;
use crate::error::AppResult;
use crate::extractors::{CurrentUser, Json, Path, Query};
use crate::recommendations::{self, DEFAULT_LIMIT, DEFAULT_SIMILAR_LIMIT};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/recommendations/events", get(recommended))
        .route("/api/recommendations/similar-events/{id}", get(similar))
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

async fn recommended(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<Event>>> {
    let conn = state.db.get()?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(recommendations::recommend(&conn, user.id, limit, Utc::now())?))
}

async fn similar(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<Event>>> {
    let conn = state.db.get()?;
    let limit = query.limit.unwrap_or(DEFAULT_SIMILAR_LIMIT);
    Ok(Json(recommendations::similar(&conn, id, limit, Utc::now())?))
}
