// Event input types and validation - pure, no database access
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::models::{Event, EventStatus};
use crate::error::AppError;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_CATEGORY_LEN: usize = 50;
pub const MAX_LOCATION_LEN: usize = 200;

/// A UTC instant accepted as RFC 3339, or as a naive ISO datetime read as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Timestamp(pub DateTime<Utc>);

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw)
            .map(Timestamp)
            .map_err(serde::de::Error::custom)
    }
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(format!(
        "Invalid datetime format: {}. Use ISO format (YYYY-MM-DDTHH:MM:SS)",
        raw
    ))
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// The editable fields of an event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
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
}

impl EventDraft {
    pub fn validate(&self) -> Result<(), AppError> {
        check_text("Title", &self.title, MAX_TITLE_LEN)?;
        if self.description.trim().is_empty() {
            return Err(AppError::validation("Description is required"));
        }
        check_text("Category", &self.category, MAX_CATEGORY_LEN)?;
        check_text("Location", &self.location, MAX_LOCATION_LEN)?;

        if self.end_datetime < self.start_datetime {
            return Err(AppError::validation("End time must not be before start time"));
        }
        if let Some(max) = self.max_participants {
            if max <= 0 {
                return Err(AppError::validation(
                    "Maximum participants must be greater than zero",
                ));
            }
        }
        Ok(())
    }

    fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.category = self.category.trim().to_string();
        self.location = self.location.trim().to_string();
        self.registration_link = non_blank(self.registration_link);
        self.image_url = non_blank(self.image_url);
        self
    }
}

impl From<&Event> for EventDraft {
    fn from(event: &Event) -> Self {
        Self {
            title: event.title.clone(),
            description: event.description.clone(),
            category: event.category.clone(),
            location: event.location.clone(),
            start_datetime: event.start_datetime,
            end_datetime: event.end_datetime,
            registration_deadline: event.registration_deadline,
            max_participants: event.max_participants,
            registration_link: event.registration_link.clone(),
            image_url: event.image_url.clone(),
            status: event.status,
            is_featured: event.is_featured,
        }
    }
}

fn check_text(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    if len > max {
        return Err(AppError::validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub start_datetime: Timestamp,
    pub end_datetime: Timestamp,
    #[serde(default)]
    pub registration_deadline: Option<Timestamp>,
    #[serde(default)]
    pub max_participants: Option<i64>,
    #[serde(default)]
    pub registration_link: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
}

impl NewEvent {
    /// Validated draft ready for insertion.
    pub fn into_draft(self) -> Result<EventDraft, AppError> {
        let draft = EventDraft {
            title: self.title,
            description: self.description,
            category: self.category,
            location: self.location,
            start_datetime: self.start_datetime.0,
            end_datetime: self.end_datetime.0,
            registration_deadline: self.registration_deadline.map(|t| t.0),
            max_participants: self.max_participants,
            registration_link: self.registration_link,
            image_url: self.image_url,
            status: EventStatus::Upcoming,
            is_featured: self.is_featured,
        }
        .normalized();
        draft.validate()?;
        Ok(draft)
    }
}

/// Partial update. Nullable columns take `Option<Option<_>>` so `null` clears them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub start_datetime: Option<Timestamp>,
    pub end_datetime: Option<Timestamp>,
    #[serde(default, deserialize_with = "double_option")]
    pub registration_deadline: Option<Option<Timestamp>>,
    #[serde(default, deserialize_with = "double_option")]
    pub max_participants: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub registration_link: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
    pub status: Option<EventStatus>,
    pub is_featured: Option<bool>,
}

impl EventPatch {
    /// Apply onto the current state of an event and validate the result.
    pub fn apply(self, current: &Event) -> Result<EventDraft, AppError> {
        let mut draft = EventDraft::from(current);

        if let Some(v) = self.title {
            draft.title = v;
        }
        if let Some(v) = self.description {
            draft.description = v;
        }
        if let Some(v) = self.category {
            draft.category = v;
        }
        if let Some(v) = self.location {
            draft.location = v;
        }
        if let Some(v) = self.start_datetime {
            draft.start_datetime = v.0;
        }
        if let Some(v) = self.end_datetime {
            draft.end_datetime = v.0;
        }
        if let Some(v) = self.registration_deadline {
            draft.registration_deadline = v.map(|t| t.0);
        }
        if let Some(v) = self.max_participants {
            draft.max_participants = v;
        }
        if let Some(v) = self.registration_link {
            draft.registration_link = v;
        }
        if let Some(v) = self.image_url {
            draft.image_url = v;
        }
        if let Some(v) = self.status {
            draft.status = v;
        }
        if let Some(v) = self.is_featured {
            draft.is_featured = v;
        }

        let draft = draft.normalized();
        draft.validate()?;
        Ok(draft)
    }
}

/// Event plus the derived figures shown on its detail page.
#[derive(Debug, Clone, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub comments_count: i64,
    pub registrations_count: i64,
    pub available_slots: Option<i64>,
    pub is_registration_open: bool,
    pub is_cancelled: bool,
    pub is_registered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn new_event_json() -> serde_json::Value {
        json!({
            "title": "  Hackathon  ",
            "description": "24h of code",
            "category": "competition",
            "location": "Library",
            "start_datetime": "2030-03-01T09:00:00Z",
            "end_datetime": "2030-03-02T09:00:00Z",
            "max_participants": 50,
            "registration_link": "   "
        })
    }

    #[test]
    fn parses_rfc3339_and_naive_timestamps() {
        let expected = Utc.with_ymd_and_hms(2030, 3, 1, 9, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2030-03-01T09:00:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2030-03-01T11:00:00+02:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2030-03-01T09:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2030-03-01T09:00").unwrap(), expected);
        assert!(parse_timestamp("next tuesday").is_err());
    }

    #[test]
    fn new_event_is_trimmed_and_validated() {
        let new: NewEvent = serde_json::from_value(new_event_json()).unwrap();
        let draft = new.into_draft().unwrap();
        assert_eq!(draft.title, "Hackathon");
        assert_eq!(draft.registration_link, None);
        assert_eq!(draft.status, EventStatus::Upcoming);
        assert!(!draft.is_featured);
    }

    #[test]
    fn rejects_end_before_start() {
        let mut value = new_event_json();
        value["end_datetime"] = json!("2030-02-28T09:00:00Z");
        let new: NewEvent = serde_json::from_value(value).unwrap();
        assert!(matches!(new.into_draft(), Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_non_positive_capacity() {
        let mut value = new_event_json();
        value["max_participants"] = json!(0);
        let new: NewEvent = serde_json::from_value(value).unwrap();
        assert!(matches!(new.into_draft(), Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_overlong_category() {
        let mut value = new_event_json();
        value["category"] = json!("c".repeat(51));
        let new: NewEvent = serde_json::from_value(value).unwrap();
        assert!(matches!(new.into_draft(), Err(AppError::Validation(_))));
    }

    fn stored_event() -> Event {
        let start = Utc.with_ymd_and_hms(2030, 3, 1, 9, 0, 0).unwrap();
        Event {
            id: 4,
            title: "Hackathon".into(),
            description: "24h of code".into(),
            category: "competition".into(),
            location: "Library".into(),
            start_datetime: start,
            end_datetime: start + Duration::hours(24),
            registration_deadline: Some(start - Duration::days(1)),
            max_participants: Some(50),
            registration_link: None,
            image_url: None,
            status: EventStatus::Upcoming,
            is_featured: false,
            organizer_id: 1,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let patch: EventPatch = serde_json::from_value(json!({
            "title": "Hackathon 2030",
            "registration_deadline": null
        }))
        .unwrap();
        let draft = patch.apply(&stored_event()).unwrap();
        assert_eq!(draft.title, "Hackathon 2030");
        assert_eq!(draft.registration_deadline, None);
        assert_eq!(draft.max_participants, Some(50));
    }

    #[test]
    fn patch_updates_status_and_featured() {
        let patch: EventPatch = serde_json::from_value(json!({
            "status": "cancelled",
            "is_featured": true
        }))
        .unwrap();
        let draft = patch.apply(&stored_event()).unwrap();
        assert_eq!(draft.status, EventStatus::Cancelled);
        assert!(draft.is_featured);
    }

    #[test]
    fn patch_result_is_validated() {
        let patch: EventPatch =
            serde_json::from_value(json!({ "end_datetime": "2020-01-01T00:00:00Z" })).unwrap();
        assert!(matches!(
            patch.apply(&stored_event()),
            Err(AppError::Validation(_))
        ));
    }
}
