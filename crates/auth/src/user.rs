//! Staff user accounts.
//!
//! A user belongs to exactly one role. Usernames are stored lowercased and are unique
//! (uniqueness is checked by the store-facing service, not here).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kopontren_core::{DomainError, DomainResult, Entity, UserId, error::required_text};

use crate::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub password_hash: String,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// Input for creating a user. The password arrives already hashed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub full_name: String,
    pub role: Role,
}

/// Partial update applied by an administrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Normalise and validate a username: 3–32 chars of `[a-z0-9_.]`.
pub fn normalize_username(raw: &str) -> DomainResult<String> {
    let username = raw.trim().to_lowercase();
    if !(3..=32).contains(&username.len()) {
        return Err(DomainError::validation(
            "username must be between 3 and 32 characters",
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '.')
    {
        return Err(DomainError::validation(
            "username may only contain letters, digits, '_' and '.'",
        ));
    }
    Ok(username)
}

impl User {
    pub fn create(input: NewUser, password_hash: String, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: UserId::new(),
            username: normalize_username(&input.username)?,
            full_name: required_text("full name", &input.full_name, 100)?,
            role: input.role,
            password_hash,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply an administrator's update. `actor` is the administrator's own id:
    /// nobody may lock themselves out by deactivating or demoting their own account.
    pub fn apply_update(&mut self, actor: UserId, update: UserUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if actor == self.id {
            if update.is_active == Some(false) {
                return Err(DomainError::invalid_state("you cannot deactivate your own account"));
            }
            if matches!(update.role, Some(role) if role != self.role) {
                return Err(DomainError::invalid_state("you cannot change your own role"));
            }
        }
        if let Some(name) = update.full_name {
            self.full_name = required_text("full name", &name, 100)?;
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn set_password_hash(&mut self, password_hash: String, now: DateTime<Utc>) {
        self.password_hash = password_hash;
        self.updated_at = now;
    }

    pub fn record_login(&mut self, now: DateTime<Utc>) {
        self.last_login_at = Some(now);
    }
}
