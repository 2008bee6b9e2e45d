pub mod transport;

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::db::models::{Event, Registration, User};
pub use transport::{LogTransport, MailTransport, OutboxTransport, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    EmailVerification,
    Welcome,
    PasswordReset,
    EventNotification,
    RegistrationNotification,
}

impl Template {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::Welcome => "welcome",
            Self::PasswordReset => "password_reset",
            Self::EventNotification => "event_notification",
            Self::RegistrationNotification => "registration_notification",
        }
    }
}

/// One outbound message: recipient, subject, structured body and the template to render it with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub template: Template,
    pub body: Value,
}

/// Fire-and-forget queue in front of a [`MailTransport`].
///
/// `dispatch` never fails from the caller's point of view: a closed queue or a
/// transport error is logged and dropped.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationDispatcher {
    /// Bare queue with the receiving end handed back to the caller.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Spawn the delivery worker. Must be called inside a tokio runtime.
    pub fn start(transport: Arc<dyn MailTransport>) -> (Self, JoinHandle<()>) {
        let (dispatcher, mut rx) = Self::channel();
        let handle = tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                if let Err(e) = transport.deliver(&notification).await {
                    tracing::error!(
                        recipient = %notification.recipient,
                        template = notification.template.as_str(),
                        "Failed to deliver notification: {}",
                        e
                    );
                }
            }
            tracing::debug!("Notification worker stopped");
        });
        (dispatcher, handle)
    }

    pub fn dispatch(&self, notification: Notification) {
        let template = notification.template;
        if self.tx.send(notification).is_err() {
            tracing::error!(
                template = template.as_str(),
                "Notification queue closed, message dropped"
            );
        }
    }
}

pub fn email_verification(
    frontend_url: &str,
    email: &str,
    name: &str,
    token: &str,
    valid_hours: i64,
) -> Notification {
    Notification {
        recipient: email.to_string(),
        subject: "Verify Your Email - EventNow".to_string(),
        template: Template::EmailVerification,
        body: json!({
            "name": name,
            "verify_url": format!("{}/verify-email/{}", frontend_url, token),
            "valid_hours": valid_hours,
        }),
    }
}

pub fn welcome(frontend_url: &str, email: &str, name: &str) -> Notification {
    Notification {
        recipient: email.to_string(),
        subject: "Welcome to EventNow".to_string(),
        template: Template::Welcome,
        body: json!({
            "name": name,
            "login_url": format!("{}/login", frontend_url),
        }),
    }
}

pub fn password_reset(
    frontend_url: &str,
    email: &str,
    name: &str,
    token: &str,
    valid_hours: i64,
) -> Notification {
    Notification {
        recipient: email.to_string(),
        subject: "Reset Your Password - EventNow".to_string(),
        template: Template::PasswordReset,
        body: json!({
            "name": name,
            "reset_url": format!("{}/reset-password/{}", frontend_url, token),
            "valid_hours": valid_hours,
        }),
    }
}

pub fn event_announcement(frontend_url: &str, event: &Event, recipient: &str) -> Notification {
    Notification {
        recipient: recipient.to_string(),
        subject: format!("New Event: {}", event.title),
        template: Template::EventNotification,
        body: json!({
            "event_id": event.id,
            "title": event.title,
            "description": event.description,
            "category": event.category,
            "location": event.location,
            "start": event.start_datetime.format("%Y-%m-%d %H:%M").to_string(),
            "end": event.end_datetime.format("%Y-%m-%d %H:%M").to_string(),
            "url": format!("{}/events/{}", frontend_url, event.id),
        }),
    }
}

pub fn registration_notice(
    frontend_url: &str,
    organizer_email: &str,
    event: &Event,
    registrant: &User,
    registration: &Registration,
) -> Notification {
    Notification {
        recipient: organizer_email.to_string(),
        subject: format!("New Registration: {}", event.title),
        template: Template::RegistrationNotification,
        body: json!({
            "event_id": event.id,
            "event_title": event.title,
            "user_name": registrant.full_name,
            "user_email": registrant.email,
            "registration_date": registration.registration_date.format("%Y-%m-%d %H:%M").to_string(),
            "status": registration.status.as_str(),
            "url": format!("{}/events/{}/registrations", frontend_url, event.id),
        }),
    }
}
