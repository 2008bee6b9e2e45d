pub mod handlers;
pub mod password;
pub mod session;
pub mod tokens;

use crate::db::models::UserRole;

/// The authenticated caller as seen by the rule engines: who they are and what role they hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub role: UserRole,
}

impl Actor {
    pub fn new(id: i64, role: UserRole) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Owners and admins may mutate a resource.
    pub fn can_manage(&self, owner_id: i64) -> bool {
        self.is_admin() || self.id == owner_id
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| "Invalid email address".to_string())?;
    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@');
    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err("Invalid email address".into());
    }
    Ok(())
}

pub fn validate_full_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if !(2..=100).contains(&len) {
        return Err("Full name must be between 2 and 100 characters".into());
    }
    Ok(())
}
