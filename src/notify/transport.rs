use async_trait::async_trait;
use chrono::Utc;
use rusqlite::params;
use thiserror::Error;

use crate::db::to_db_time;
use crate::notify::Notification;
use crate::state::DbPool;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Hands a notification to whatever actually sends mail.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), TransportError>;
}

/// Writes each notification to the log instead of sending it.
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn deliver(&self, notification: &Notification) -> Result<(), TransportError> {
        tracing::info!(
            recipient = %notification.recipient,
            template = notification.template.as_str(),
            "Notification: {}",
            notification.subject
        );
        Ok(())
    }
}

/// Persists notifications to `notification_outbox` for an external mail sender.
pub struct OutboxTransport {
    pool: DbPool,
}

impl OutboxTransport {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MailTransport for OutboxTransport {
    async fn deliver(&self, notification: &Notification) -> Result<(), TransportError> {
        let conn = self.pool.get()?;
        let body = serde_json::to_string(&notification.body)?;
        conn.execute(
            "INSERT INTO notification_outbox (recipient, subject, template, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                notification.recipient,
                notification.subject,
                notification.template.as_str(),
                body,
                to_db_time(Utc::now())
            ],
        )?;
        Ok(())
    }
}
