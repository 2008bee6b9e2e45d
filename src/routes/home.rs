use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::state::AppState;

pub async fn index(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let event_count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;

    Ok(Json(json!({
        "name": "EventNow API",
        "version": env!("CARGO_PKG_VERSION"),
        "events": event_count,
    })))
}
