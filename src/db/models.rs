use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::{get_opt_time, get_time};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Student,
    General,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Student => "student",
            Self::General => "general",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "student" => Ok(Self::Student),
            "general" => Ok(Self::General),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Attended,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Attended => "attended",
        }
    }
}

impl FromStr for RegistrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "attended" => Ok(Self::Attended),
            other => Err(format!("unknown registration status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "upcoming" => Ok(Self::Upcoming),
            "ongoing" => Ok(Self::Ongoing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown event status: {}", other)),
        }
    }
}

/// Parse an enum column, surfacing bad values as a conversion failure.
fn get_enum<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(column)?;
    raw.parse().map_err(|e: String| {
        let idx = row.as_ref().column_index(column).unwrap_or(0);
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            e.into(),
        )
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub const COLUMNS: &'static str =
        "id, email, password_hash, full_name, role, is_active, email_verified, created_at, updated_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            email: row.get("email")?,
            password_hash: row.get("password_hash")?,
            full_name: row.get("full_name")?,
            role: get_enum(row, "role")?,
            is_active: row.get("is_active")?,
            email_verified: row.get("email_verified")?,
            created_at: get_time(row, "created_at")?,
            updated_at: get_time(row, "updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub max_participants: Option<i64>,
    pub registration_link: Option<String>,
    pub image_url: Option<String>,
    pub status: EventStatus,
    pub is_featured: bool,
    pub organizer_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub const COLUMNS: &'static str = "e.id AS id, e.title AS title, e.description AS description, \
         e.category AS category, e.location AS location, e.start_datetime AS start_datetime, \
         e.end_datetime AS end_datetime, e.registration_deadline AS registration_deadline, \
         e.max_participants AS max_participants, e.registration_link AS registration_link, \
         e.image_url AS image_url, e.status AS status, e.is_featured AS is_featured, \
         e.organizer_id AS organizer_id, e.created_at AS created_at, e.updated_at AS updated_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            category: row.get("category")?,
            location: row.get("location")?,
            start_datetime: get_time(row, "start_datetime")?,
            end_datetime: get_time(row, "end_datetime")?,
            registration_deadline: get_opt_time(row, "registration_deadline")?,
            max_participants: row.get("max_participants")?,
            registration_link: row.get("registration_link")?,
            image_url: row.get("image_url")?,
            status: get_enum(row, "status")?,
            is_featured: row.get("is_featured")?,
            organizer_id: row.get("organizer_id")?,
            created_at: get_time(row, "created_at")?,
            updated_at: get_time(row, "updated_at")?,
        })
    }

    /// Remaining capacity given the number of live registrations.
    /// `None` means the event has no participant cap.
    pub fn available_slots(&self, registered: i64) -> Option<i64> {
        self.max_participants
            .map(|max| (max - registered).max(0))
    }

    pub fn has_free_slot(&self, registered: i64) -> bool {
        self.available_slots(registered).map_or(true, |slots| slots > 0)
    }

    pub fn is_registration_open(&self, now: DateTime<Utc>) -> bool {
        match self.registration_deadline {
            Some(deadline) => now < deadline,
            None => true,
        }
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start_datetime < now
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: i64,
    pub status: RegistrationStatus,
    pub registration_date: DateTime<Utc>,
    pub attended: bool,
    pub user_id: i64,
    pub event_id: i64,
}

impl Registration {
    pub const COLUMNS: &'static str = "r.id AS id, r.status AS status, \
         r.registration_date AS registration_date, r.attended AS attended, \
         r.user_id AS user_id, r.event_id AS event_id";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            status: get_enum(row, "status")?,
            registration_date: get_time(row, "registration_date")?,
            attended: row.get("attended")?,
            user_id: row.get("user_id")?,
            event_id: row.get("event_id")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub rating: Option<i64>,
    pub author_id: i64,
    pub event_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub const COLUMNS: &'static str = "c.id AS id, c.content AS content, c.rating AS rating, \
         c.author_id AS author_id, c.event_id AS event_id, c.created_at AS created_at, \
         c.updated_at AS updated_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            content: row.get("content")?,
            rating: row.get("rating")?,
            author_id: row.get("author_id")?,
            event_id: row.get("event_id")?,
            created_at: get_time(row, "created_at")?,
            updated_at: get_time(row, "updated_at")?,
        })
    }
}
