// Naive recommendations: categories from recent registration history, with
// popularity as the fallback and the backfill.
use chrono::{DateTime, Duration, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

use crate::db::models::Event;
use crate::db::to_db_time;
use crate::error::AppResult;
use crate::events;

/// How far back registration history counts, measured on event start.
pub const HISTORY_DAYS: i64 = 180;
pub const MAX_LIMIT: usize = 100;
pub const DEFAULT_LIMIT: usize = 10;
pub const DEFAULT_SIMILAR_LIMIT: usize = 5;

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Categories of events the user registered for (not cancelled) that started
/// within the history window.
pub fn recent_categories(
    conn: &Connection,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<String>, rusqlite::Error> {
    let since = to_db_time(now - Duration::days(HISTORY_DAYS));
    let mut stmt = conn.prepare(
        "SELECT DISTINCT e.category
         FROM registrations r
         JOIN events e ON e.id = r.event_id
         WHERE r.user_id = ?1 AND r.status != 'cancelled' AND e.start_datetime > ?2
         ORDER BY e.category",
    )?;
    let categories = stmt
        .query_map(params![user_id, since], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(categories)
}

/// Upcoming events ranked by live registration count (desc), then start (asc), then id.
pub fn popular(
    conn: &Connection,
    limit: usize,
    exclude: &[i64],
    now: DateTime<Utc>,
) -> Result<Vec<Event>, rusqlite::Error> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let exclusion = if exclude.is_empty() {
        String::new()
    } else {
        format!("AND e.id NOT IN ({})", placeholders(exclude.len()))
    };
    let sql = format!(
        "SELECT {}
         FROM events e
         LEFT JOIN registrations r ON r.event_id = e.id AND r.status != 'cancelled'
         WHERE e.start_datetime > ? {}
         GROUP BY e.id
         ORDER BY COUNT(r.id) DESC, e.start_datetime ASC, e.id ASC
         LIMIT ?",
        Event::COLUMNS,
        exclusion
    );

    let mut values: Vec<Value> = Vec::with_capacity(exclude.len() + 2);
    values.push(Value::Text(to_db_time(now)));
    values.extend(exclude.iter().map(|id| Value::Integer(*id)));
    values.push(Value::Integer(limit as i64));

    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map(params_from_iter(values.iter()), Event::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}

fn upcoming_in_categories(
    conn: &Connection,
    categories: &[String],
    limit: usize,
    now: DateTime<Utc>,
) -> Result<Vec<Event>, rusqlite::Error> {
    let sql = format!(
        "SELECT {} FROM events e
         WHERE e.category IN ({}) AND e.start_datetime > ?
         ORDER BY e.start_datetime ASC, e.id ASC
         LIMIT ?",
        Event::COLUMNS,
        placeholders(categories.len())
    );

    let mut values: Vec<Value> = categories.iter().map(|c| Value::Text(c.clone())).collect();
    values.push(Value::Text(to_db_time(now)));
    values.push(Value::Integer(limit as i64));

    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map(params_from_iter(values.iter()), Event::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}

/// Up to `limit` upcoming events for the user, without duplicates.
pub fn recommend(
    conn: &Connection,
    user_id: i64,
    limit: usize,
    now: DateTime<Utc>,
) -> Result<Vec<Event>, rusqlite::Error> {
    let limit = limit.min(MAX_LIMIT);
    if limit == 0 {
        return Ok(Vec::new());
    }

    let categories = recent_categories(conn, user_id, now)?;
    if categories.is_empty() {
        return popular(conn, limit, &[], now);
    }

    let mut picked = upcoming_in_categories(conn, &categories, limit * 2, now)?;
    if picked.len() < limit {
        let taken: Vec<i64> = picked.iter().map(|e| e.id).collect();
        let backfill = popular(conn, limit - picked.len(), &taken, now)?;
        picked.extend(backfill);
    }
    picked.truncate(limit);

    tracing::debug!(
        user_id,
        categories = categories.len(),
        results = picked.len(),
        "Computed recommendations"
    );
    Ok(picked)
}

/// Upcoming events sharing the category of `event_id`, soonest first.
pub fn similar(
    conn: &Connection,
    event_id: i64,
    limit: usize,
    now: DateTime<Utc>,
) -> AppResult<Vec<Event>> {
    let event = events::get(conn, event_id)?;
    let limit = limit.min(MAX_LIMIT);

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM events e
         WHERE e.id != ?1 AND e.category = ?2 AND e.start_datetime > ?3
         ORDER BY e.start_datetime ASC, e.id ASC
         LIMIT ?4",
        Event::COLUMNS
    ))?;
    let events = stmt
        .query_map(
            params![event_id, event.category, to_db_time(now), limit as i64],
            Event::from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}
