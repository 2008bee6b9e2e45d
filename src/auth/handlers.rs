use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::{normalize_email, password, session, tokens, validate_email, validate_full_name};
use crate::db::models::{User, UserRole};
use crate::db::is_unique_violation;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, Json, Path};
use crate::notify;
use crate::state::AppState;
use crate::users;

// -- Request / response types --

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdateMeRequest {
    pub full_name: Option<String>,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: User,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name,
        token,
        max_age_hours * 3600
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", name)
}

fn message(text: &str) -> Json<serde_json::Value> {
    Json(json!({ "message": text }))
}

/// Session token in the body and as a cookie.
fn token_response(state: &AppState, status: StatusCode, token: String, user: User) -> Response {
    let cookie = session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );
    (
        status,
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(TokenResponse {
            access_token: token,
            token_type: "bearer",
            user,
        }),
    )
        .into_response()
}

// -- Registration & login --

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Response> {
    let email = normalize_email(&req.email);
    validate_email(&email).map_err(AppError::Validation)?;
    validate_full_name(&req.full_name).map_err(AppError::Validation)?;
    password::validate_password(&req.password).map_err(AppError::Validation)?;
    let full_name = req.full_name.trim().to_string();

    let auth = &state.config.auth;
    let hash = password::hash_password(&req.password, auth.bcrypt_cost)?;
    let now = Utc::now();

    let conn = state.db.get()?;
    if users::find_by_email(&conn, &email)?.is_some() {
        return Err(AppError::Conflict("Email already registered".into()));
    }
    let user = users::insert(&conn, &email, &hash, &full_name, UserRole::General, now).map_err(
        |e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Email already registered".into())
            } else {
                AppError::Database(e)
            }
        },
    )?;

    let verify_token = tokens::issue_email_verification(
        &conn,
        user.id,
        &user.email,
        auth.email_verification_hours,
        now,
    )?;
    let token = session::create_session(&conn, user.id, auth.session_hours, now)?;
    tracing::info!(user_id = user.id, "Registered new account {}", user.email);

    let frontend = &state.config.notifications.frontend_url;
    state.notifier.dispatch(notify::email_verification(
        frontend,
        &user.email,
        &user.full_name,
        &verify_token,
        auth.email_verification_hours,
    ));
    state
        .notifier
        .dispatch(notify::welcome(frontend, &user.email, &user.full_name));

    Ok(token_response(&state, StatusCode::CREATED, token, user))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Response> {
    let email = normalize_email(&req.email);
    let now = Utc::now();
    let conn = state.db.get()?;

    let user = users::find_by_email(&conn, &email)?.ok_or(AppError::Unauthorized)?;
    if !password::verify_password(&req.password, &user.password_hash) {
        tracing::warn!("Failed login attempt for {}", email);
        return Err(AppError::Unauthorized);
    }
    if !user.is_active {
        return Err(AppError::BadRequest("Inactive user".into()));
    }

    let auth = &state.config.auth;
    if auth.require_email_verification && !user.email_verified {
        if !tokens::has_pending_verification(&conn, user.id, now)? {
            let verify_token = tokens::issue_email_verification(
                &conn,
                user.id,
                &user.email,
                auth.email_verification_hours,
                now,
            )?;
            state.notifier.dispatch(notify::email_verification(
                &state.config.notifications.frontend_url,
                &user.email,
                &user.full_name,
                &verify_token,
                auth.email_verification_hours,
            ));
        }
        return Err(AppError::forbidden(
            "Email not verified. Please check your inbox for the verification link",
        ));
    }

    let token = session::create_session(&conn, user.id, auth.session_hours, now)?;
    tracing::info!(user_id = user.id, "User logged in");
    Ok(token_response(&state, StatusCode::OK, token, user))
}

pub async fn logout(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    let conn = state.db.get()?;
    session::delete_session(&conn, &user.token)?;

    Ok((
        StatusCode::NO_CONTENT,
        AppendHeaders([(
            header::SET_COOKIE,
            clear_session_cookie(&state.config.auth.cookie_name),
        )]),
    )
        .into_response())
}

// -- Profile --

pub async fn me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<User>> {
    let conn = state.db.get()?;
    let profile = users::find_by_id(&conn, user.id)?.ok_or(AppError::NotFound("User"))?;
    Ok(Json(profile))
}

pub async fn update_me(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<UpdateMeRequest>,
) -> AppResult<Json<User>> {
    let conn = state.db.get()?;
    if let Some(full_name) = req.full_name {
        validate_full_name(&full_name).map_err(AppError::Validation)?;
        users::update_full_name(&conn, user.id, full_name.trim(), Utc::now())?;
    }
    let profile = users::find_by_id(&conn, user.id)?.ok_or(AppError::NotFound("User"))?;
    Ok(Json(profile))
}

pub async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    let account = users::find_by_id(&conn, user.id)?.ok_or(AppError::NotFound("User"))?;

    if !password::verify_password(&req.current_password, &account.password_hash) {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }
    password::validate_password(&req.new_password).map_err(AppError::Validation)?;

    let hash = password::hash_password(&req.new_password, state.config.auth.bcrypt_cost)?;
    users::update_password(&conn, user.id, &hash, Utc::now())?;
    Ok(message("Password updated successfully"))
}

// -- Password reset --

/// Always 204 so the endpoint does not reveal which addresses have accounts.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> AppResult<StatusCode> {
    let email = normalize_email(&req.email);
    let conn = state.db.get()?;

    match users::find_by_email(&conn, &email)? {
        Some(user) if user.is_active => {
            let hours = state.config.auth.password_reset_hours;
            let token = tokens::issue_password_reset(&conn, user.id, hours, Utc::now())?;
            state.notifier.dispatch(notify::password_reset(
                &state.config.notifications.frontend_url,
                &user.email,
                &user.full_name,
                &token,
                hours,
            ));
        }
        _ => tracing::debug!("Password reset requested for unknown or inactive account"),
    }

    Ok(StatusCode::NO_CONTENT)
}

fn valid_reset(
    conn: &rusqlite::Connection,
    token: &str,
) -> AppResult<tokens::PasswordReset> {
    tokens::find_password_reset(conn, token)?
        .filter(|reset| reset.is_valid(Utc::now()))
        .ok_or_else(|| AppError::BadRequest("Invalid or expired token".into()))
}

pub async fn validate_reset_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    valid_reset(&conn, &token)?;
    Ok(Json(json!({ "valid": true })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    let reset = valid_reset(&conn, &token)?;
    password::validate_password(&req.new_password).map_err(AppError::Validation)?;

    let hash = password::hash_password(&req.new_password, state.config.auth.bcrypt_cost)?;
    users::update_password(&conn, reset.user_id, &hash, Utc::now())?;
    tokens::delete_password_reset(&conn, &reset.token)?;
    tracing::info!(user_id = reset.user_id, "Password reset completed");

    Ok(message("Password has been reset successfully"))
}

// -- Email verification --

pub async fn send_verification(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let email = normalize_email(&req.email);
    let conn = state.db.get()?;
    let user = users::find_by_email(&conn, &email)?.ok_or(AppError::NotFound("User"))?;

    if user.email_verified {
        return Ok(message("Email already verified"));
    }

    let hours = state.config.auth.email_verification_hours;
    let token = tokens::issue_email_verification(&conn, user.id, &user.email, hours, Utc::now())?;
    state.notifier.dispatch(notify::email_verification(
        &state.config.notifications.frontend_url,
        &user.email,
        &user.full_name,
        &token,
        hours,
    ));
    Ok(message("Verification email sent"))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    let verification = tokens::find_email_verification(&conn, &token)?
        .ok_or_else(|| AppError::BadRequest("Invalid verification token".into()))?;

    if verification.is_verified {
        return Ok(message("Email already verified"));
    }
    let now = Utc::now();
    if !verification.is_valid(now) {
        return Err(AppError::BadRequest("Verification token has expired".into()));
    }

    tokens::complete_email_verification(&conn, &verification, now)?;
    tracing::info!(user_id = verification.user_id, "Email verified");
    Ok(message("Email verified successfully"))
}
