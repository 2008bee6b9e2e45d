#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

use eventnow::config::Config;
use eventnow::db;
use eventnow::notify::{Notification, NotificationDispatcher};
use eventnow::routes;
use eventnow::state::{AppState, DbPool};

pub const ADMIN_EMAIL: &str = "admin@campus.edu";
pub const ADMIN_PASSWORD: &str = "admin-secret-1";

pub struct TestApp {
    pub app: Router,
    pub pool: DbPool,
    pub outbox: UnboundedReceiver<Notification>,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(tweak: impl FnOnce(&mut Config)) -> Self {
        let dir = TempDir::new().unwrap();
        let pool = db::create_pool(&dir.path().join("eventnow.db")).unwrap();
        db::run_migrations(&pool).unwrap();
        db::ensure_admin(&pool, ADMIN_EMAIL, "Campus Admin", ADMIN_PASSWORD, 4).unwrap();

        let mut config = Config::default();
        config.auth.bcrypt_cost = 4;
        config.notifications.frontend_url = "http://frontend.test".into();
        tweak(&mut config);

        let (notifier, outbox) = NotificationDispatcher::channel();
        let state = AppState {
            db: pool.clone(),
            config,
            notifier,
        };

        Self {
            app: routes::build_router(state),
            pool,
            outbox,
            _dir: dir,
        }
    }

    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn register(&self, email: &str, name: &str) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({ "email": email, "password": "password123", "full_name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.call(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    pub async fn admin_token(&self) -> String {
        let (status, body) = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {}", body);
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Create an event as admin; `start_in_hours` may be negative.
    pub async fn create_event(
        &self,
        admin: &str,
        category: &str,
        start_in_hours: i64,
        extra: Value,
    ) -> Value {
        let start = chrono::Utc::now() + chrono::Duration::hours(start_in_hours);
        let mut payload = json!({
            "title": format!("{} meetup", category),
            "description": "An event on campus",
            "category": category,
            "location": "Student Union",
            "start_datetime": start.to_rfc3339(),
            "end_datetime": (start + chrono::Duration::hours(2)).to_rfc3339(),
        });
        if let (Some(base), Some(more)) = (payload.as_object_mut(), extra.as_object()) {
            for (k, v) in more {
                base.insert(k.clone(), v.clone());
            }
        }
        let (status, body) = self.call("POST", "/api/events", Some(admin), Some(payload)).await;
        assert_eq!(status, StatusCode::CREATED, "create event failed: {}", body);
        body
    }

    pub fn drain_outbox(&mut self) -> Vec<Notification> {
        let mut sent = Vec::new();
        while let Ok(n) = self.outbox.try_recv() {
            sent.push(n);
        }
        sent
    }
}
