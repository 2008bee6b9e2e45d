// Registration rules. Pure functions over already-loaded state; the repository
// runs them inside the write transaction.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Actor;
use crate::db::models::{Event, Registration, RegistrationStatus};
use crate::error::AppError;

/// Checks run in a fixed order; the first failing one is reported.
pub fn check_can_register(
    event: &Event,
    active_registrations: i64,
    already_registered: bool,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if !event.is_registration_open(now) {
        return Err(AppError::RegistrationClosed);
    }
    if !event.has_free_slot(active_registrations) {
        return Err(AppError::CapacityExceeded);
    }
    if already_registered {
        return Err(AppError::AlreadyRegistered);
    }
    Ok(())
}

pub fn check_can_cancel(
    actor: Actor,
    registration: &Registration,
    event: &Event,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if !actor.can_manage(registration.user_id) {
        return Err(AppError::forbidden("Not authorized to cancel this registration"));
    }
    if event.has_started(now) {
        return Err(AppError::EventAlreadyStarted);
    }
    Ok(())
}

/// Organizer of the event, or an admin.
pub fn check_can_view_attendees(actor: Actor, event: &Event) -> Result<(), AppError> {
    if !actor.can_manage(event.organizer_id) {
        return Err(AppError::forbidden(
            "Not authorized to manage registrations for this event",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AttendanceUpdate {
    pub attended: bool,
}

impl AttendanceUpdate {
    pub fn status(&self) -> RegistrationStatus {
        if self.attended {
            RegistrationStatus::Attended
        } else {
            RegistrationStatus::Confirmed
        }
    }
}

/// A registration with the event it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationWithEvent {
    #[serde(flatten)]
    pub registration: Registration,
    pub event: Event,
}

/// A registration with the registrant's public details.
#[derive(Debug, Clone, Serialize)]
pub struct Attendee {
    #[serde(flatten)]
    pub registration: Registration,
    pub user_name: String,
    pub user_email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{EventStatus, UserRole};
    use chrono::Duration;

    fn event(max: Option<i64>, deadline_in: Option<Duration>, start_in: Duration) -> Event {
        let now = Utc::now();
        Event {
            id: 1,
            title: "Open mic".into(),
            description: "Bring a song".into(),
            category: "music".into(),
            location: "Cafe".into(),
            start_datetime: now + start_in,
            end_datetime: now + start_in + Duration::hours(2),
            registration_deadline: deadline_in.map(|d| now + d),
            max_participants: max,
            registration_link: None,
            image_url: None,
            status: EventStatus::Upcoming,
            is_featured: false,
            organizer_id: 10,
            created_at: now,
            updated_at: now,
        }
    }

    fn registration(user_id: i64) -> Registration {
        Registration {
            id: 5,
            status: RegistrationStatus::Confirmed,
            registration_date: Utc::now(),
            attended: false,
            user_id,
            event_id: 1,
        }
    }

    #[test]
    fn closed_registration_wins_over_capacity() {
        let e = event(Some(1), Some(-Duration::hours(1)), Duration::days(1));
        assert!(matches!(
            check_can_register(&e, 1, true, Utc::now()),
            Err(AppError::RegistrationClosed)
        ));
    }

    #[test]
    fn full_event_wins_over_duplicate() {
        let e = event(Some(1), None, Duration::days(1));
        assert!(matches!(
            check_can_register(&e, 1, true, Utc::now()),
            Err(AppError::CapacityExceeded)
        ));
    }

    #[test]
    fn duplicate_is_reported_last() {
        let e = event(Some(5), Some(Duration::hours(3)), Duration::days(1));
        assert!(matches!(
            check_can_register(&e, 1, true, Utc::now()),
            Err(AppError::AlreadyRegistered)
        ));
        assert!(check_can_register(&e, 1, false, Utc::now()).is_ok());
    }

    #[test]
    fn unbounded_event_accepts_anyone_before_deadline() {
        let e = event(None, None, Duration::days(1));
        assert!(check_can_register(&e, 10_000, false, Utc::now()).is_ok());
    }

    #[test]
    fn stranger_cannot_cancel() {
        let e = event(None, None, Duration::days(1));
        let stranger = Actor::new(99, UserRole::Student);
        assert!(matches!(
            check_can_cancel(stranger, &registration(3), &e, Utc::now()),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn admin_can_cancel_for_others_but_not_after_start() {
        let admin = Actor::new(1, UserRole::Admin);
        let future = event(None, None, Duration::days(1));
        assert!(check_can_cancel(admin, &registration(3), &future, Utc::now()).is_ok());

        let started = event(None, None, -Duration::minutes(5));
        assert!(matches!(
            check_can_cancel(admin, &registration(3), &started, Utc::now()),
            Err(AppError::EventAlreadyStarted)
        ));
    }

    #[test]
    fn attendance_maps_to_status() {
        assert_eq!(
            AttendanceUpdate { attended: true }.status(),
            RegistrationStatus::Attended
        );
        assert_eq!(
            AttendanceUpdate { attended: false }.status(),
            RegistrationStatus::Confirmed
        );
    }
}
