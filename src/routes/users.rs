use axum::extract::State;
use axum::routing::get;
use axum::Router;

use crate::auth::handlers;
use crate::error::AppResult;
use crate::extractors::{CurrentUser, Json, Query};
use crate::registrations::{repository, RegistrationWithEvent};
use crate::routes::Pagination;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users/me", get(handlers::me))
        .route("/api/users/me/registrations", get(my_registrations))
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
