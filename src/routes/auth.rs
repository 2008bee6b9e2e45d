use axum::routing::{get, post};
use axum::Router;

use crate::auth::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/auth/me", get(handlers::me).put(handlers::update_me))
        .route("/api/auth/change-password", post(handlers::change_password))
        .route("/api/auth/forgot-password", post(handlers::forgot_password))
        .route(
            "/api/auth/reset-password/validate/{token}",
            get(handlers::validate_reset_token),
        )
        .route("/api/auth/reset-password/{token}", post(handlers::reset_password))
        .route("/api/auth/verify-email/send", post(handlers::send_verification))
        .route("/api/auth/verify-email/{token}", get(handlers::verify_email))
}
