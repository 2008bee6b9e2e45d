pub mod admin;
pub mod auth;
pub mod comments;
pub mod events;
pub mod home;
pub mod recommendations;
pub mod registrations;
pub mod users;

use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

const MAX_PAGE_SIZE: i64 = 1000;

/// `?skip=&limit=` with the usual defaults of 0 and 100.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub skip: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { skip: 0, limit: 100 }
    }
}

impl Pagination {
    pub fn skip(&self) -> i64 {
        self.skip.max(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.clamp(0, MAX_PAGE_SIZE)
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::index))
        .merge(auth::router())
        .merge(events::router())
        .merge(registrations::router())
        .merge(comments::router())
        .merge(recommendations::router())
        .merge(users::router())
        .merge(admin::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
