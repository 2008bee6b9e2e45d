// Event comments: one per (author, event), editable by the author or an admin.
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::auth::Actor;
use crate::db::models::Comment;
use crate::db::{is_unique_violation, to_db_time};
use crate::error::{AppError, AppResult};
use crate::events;
use crate::events::domain::double_option;

#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub event_id: i64,
    pub content: String,
    #[serde(default)]
    pub rating: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentPatch {
    pub content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub rating: Option<Option<i64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentAuthor {
    pub id: i64,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: CommentAuthor,
}

fn validate_content(content: &str) -> Result<String, AppError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("Comment content must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn validate_rating(rating: Option<i64>) -> Result<(), AppError> {
    match rating {
        Some(r) if !(1..=5).contains(&r) => {
            Err(AppError::validation("Rating must be between 1 and 5"))
        }
        _ => Ok(()),
    }
}

pub fn find(conn: &Connection, id: i64) -> Result<Option<Comment>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {} FROM comments c WHERE c.id = ?1", Comment::COLUMNS),
        params![id],
        Comment::from_row,
    )
    .optional()
}

pub fn create(conn: &Connection, actor: Actor, new: NewComment, now: DateTime<Utc>) -> AppResult<Comment> {
    events::get(conn, new.event_id)?;
    let content = validate_content(&new.content)?;
    validate_rating(new.rating)?;

    let ts = to_db_time(now);
    conn.execute(
        "INSERT INTO comments (content, rating, author_id, event_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![content, new.rating, actor.id, new.event_id, ts],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::DuplicateComment
        } else {
            AppError::Database(e)
        }
    })?;

    let id = conn.last_insert_rowid();
    find(conn, id)?.ok_or(AppError::NotFound("Comment"))
}

/// Comments on an event, newest first.
pub fn list_for_event(
    conn: &Connection,
    event_id: i64,
    skip: i64,
    limit: i64,
) -> AppResult<Vec<CommentWithAuthor>> {
    events::get(conn, event_id)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {}, u.full_name AS author_name
         FROM comments c
         JOIN users u ON u.id = c.author_id
         WHERE c.event_id = ?1
         ORDER BY c.created_at DESC, c.id DESC
         LIMIT ?2 OFFSET ?3",
        Comment::COLUMNS
    ))?;
    let comments = stmt
        .query_map(params![event_id, limit, skip], |row| {
            let comment = Comment::from_row(row)?;
            Ok(CommentWithAuthor {
                author: CommentAuthor {
                    id: comment.author_id,
                    full_name: row.get("author_name")?,
                },
                comment,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

fn owned(conn: &Connection, actor: Actor, id: i64, verb: &str) -> AppResult<Comment> {
    let comment = find(conn, id)?.ok_or(AppError::NotFound("Comment"))?;
    if !actor.can_manage(comment.author_id) {
        return Err(AppError::forbidden(format!("Not authorized to {} this comment", verb)));
    }
    Ok(comment)
}

pub fn update(
    conn: &Connection,
    actor: Actor,
    id: i64,
    patch: CommentPatch,
    now: DateTime<Utc>,
) -> AppResult<Comment> {
    let current = owned(conn, actor, id, "update")?;

    let content = match patch.content {
        Some(content) => validate_content(&content)?,
        None => current.content,
    };
    let rating = patch.rating.unwrap_or(current.rating);
    validate_rating(rating)?;

    conn.execute(
        "UPDATE comments SET content = ?2, rating = ?3, updated_at = ?4 WHERE id = ?1",
        params![id, content, rating, to_db_time(now)],
    )?;
    find(conn, id)?.ok_or(AppError::NotFound("Comment"))
}

pub fn delete(conn: &Connection, actor: Actor, id: i64) -> AppResult<()> {
    owned(conn, actor, id, "delete")?;
    conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
    Ok(())
}
