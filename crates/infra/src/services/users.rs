use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use kopontren_auth::{JwtClaims, JwtValidator, NewUser, Principal, Role, User, UserUpdate, password};
use kopontren_core::{DomainError, Page, PageRequest, UserId};

use super::{AuthFailure, ServiceError, ServiceResult, Services, require};
use crate::audit::{self, AuditAction};

/// User as exposed outside the service layer (no password hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            full_name: u.full_name.clone(),
            role: u.role,
            is_active: u.is_active,
            last_login_at: u.last_login_at,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub token: String,
    pub expires_at: i64,
    pub user: UserView,
}

fn ensure_username_free(tables: &crate::store::Tables, username: &str) -> Result<(), DomainError> {
    if tables.users.values().any(|u| u.username == username) {
        return Err(DomainError::conflict(format!("username '{username}' is already taken")));
    }
    Ok(())
}

impl Services {
    /// Create the first administrator when the store has no users at all.
    #[instrument(skip(self, password), err)]
    pub async fn bootstrap_admin(&self, username: &str, password: &str) -> ServiceResult<Option<UserId>> {
        if !self.store.read(|t| t.users.is_empty()).await {
            return Ok(None);
        }
        let hash = password::hash(password)?;
        let now = Utc::now();
        let admin = User::create(
            NewUser {
                username: username.to_string(),
                full_name: "Administrator".to_string(),
                role: Role::Admin,
            },
            hash,
            now,
        )?;
        let id = admin.id;
        let created = self
            .store
            .write(|tx| -> ServiceResult<bool> {
                if !tx.tables().users.is_empty() {
                    return Ok(false);
                }
                tx.put(admin)?;
                Ok(true)
            })
            .await?;
        if created {
            warn!(username, "bootstrap administrator created, change its password");
        }
        Ok(created.then_some(id))
    }

    /// Verify credentials and issue a token. Every failure is the same 401.
    #[instrument(skip(self, password), err)]
    pub async fn login(&self, username: &str, password: &str) -> ServiceResult<LoginResult> {
        let username = username.trim().to_lowercase();
        let user = self
            .store
            .read(|t| t.users.values().find(|u| u.username == username).cloned())
            .await;
        let Some(user) = user.filter(|u| u.is_active && password::verify(password, &u.password_hash)) else {
            return Err(AuthFailure::InvalidCredentials.into());
        };

        let now = Utc::now();
        let (token, claims) = self.jwt.issue(user.id, &user.username, user.role, now)?;
        let principal = Principal {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
        };
        let user = self
            .store
            .write(|tx| -> ServiceResult<User> {
                let mut user = require::<User>(tx, user.id, "user")?;
                user.record_login(now);
                tx.put(user.clone())?;
                audit::record(tx, &principal, AuditAction::Login, "user", Some(user.id.into()), json!({}), now)?;
                Ok(user)
            })
            .await?;
        info!(user = %user.username, "login");
        Ok(LoginResult {
            token,
            expires_at: claims.exp,
            user: (&user).into(),
        })
    }

    /// Validate a bearer token and resolve the caller against the current user table.
    ///
    /// Deactivated users lose access immediately; role changes apply immediately.
    pub async fn authenticate(&self, token: &str) -> ServiceResult<Principal> {
        let claims: JwtClaims = self.jwt.validate(token, Utc::now())?;
        let user = self.store.read(|t| t.users.get(&claims.sub).cloned()).await;
        match user {
            Some(u) if u.is_active => Ok(Principal {
                user_id: u.id,
                username: u.username,
                role: u.role,
            }),
            _ => Err(AuthFailure::InvalidCredentials.into()),
        }
    }

    pub async fn me(&self, principal: &Principal) -> ServiceResult<UserView> {
        self.store
            .read(|t| t.users.get(&principal.user_id).map(UserView::from))
            .await
            .ok_or_else(|| DomainError::not_found("user").into())
    }

    #[instrument(skip(self, principal, current, new), fields(user = %principal.username), err)]
    pub async fn change_password(&self, principal: &Principal, current: &str, new: &str) -> ServiceResult<()> {
        let user = self.store.read(|t| t.users.get(&principal.user_id).cloned()).await;
        let user = user.ok_or(DomainError::not_found("user"))?;
        if !password::verify(current, &user.password_hash) {
            return Err(DomainError::validation("current password is incorrect").into());
        }
        let hash = password::hash(new)?;
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<()> {
                let mut user = require::<User>(tx, principal.user_id, "user")?;
                user.set_password_hash(hash, now);
                tx.put(user)?;
                audit::record(tx, principal, AuditAction::ChangePassword, "user", Some(principal.user_id.into()), json!({}), now)?;
                Ok(())
            })
            .await
    }

    pub async fn list_users(&self, q: Option<&str>, page: PageRequest) -> Page<UserView> {
        let q = q.unwrap_or_default().trim().to_lowercase();
        self.store
            .read(|t| {
                let mut rows: Vec<UserView> = t
                    .users
                    .values()
                    .filter(|u| {
                        q.is_empty() || u.username.contains(&q) || u.full_name.to_lowercase().contains(&q)
                    })
                    .map(UserView::from)
                    .collect();
                rows.sort_by(|a, b| a.username.cmp(&b.username));
                Page::from_vec(rows, page)
            })
            .await
    }

    #[instrument(skip(self, actor, input, password), fields(actor = %actor.username), err)]
    pub async fn create_user(&self, actor: &Principal, input: NewUser, password: &str) -> ServiceResult<UserView> {
        let hash = password::hash(password)?;
        let now = Utc::now();
        let user = User::create(input, hash, now)?;
        self.store
            .write(|tx| -> ServiceResult<UserView> {
                ensure_username_free(tx.tables(), &user.username)?;
                let view = UserView::from(&user);
                audit::record(
                    tx,
                    actor,
                    AuditAction::Create,
                    "user",
                    Some(user.id.into()),
                    json!({ "username": user.username, "role": user.role }),
                    now,
                )?;
                tx.put(user)?;
                Ok(view)
            })
            .await
    }

    #[instrument(skip(self, actor, update), fields(actor = %actor.username), err)]
    pub async fn update_user(&self, actor: &Principal, id: UserId, update: UserUpdate) -> ServiceResult<UserView> {
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<UserView> {
                let mut user = require::<User>(tx, id, "user")?;
                let details = json!({ "full_name": update.full_name, "role": update.role, "is_active": update.is_active });
                user.apply_update(actor.user_id, update, now)?;
                let view = UserView::from(&user);
                tx.put(user)?;
                audit::record(tx, actor, AuditAction::Update, "user", Some(id.into()), details, now)?;
                Ok(view)
            })
            .await
    }

    #[instrument(skip(self, actor, new_password), fields(actor = %actor.username), err)]
    pub async fn reset_password(&self, actor: &Principal, id: UserId, new_password: &str) -> ServiceResult<()> {
        let hash = password::hash(new_password)?;
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<()> {
                let mut user = require::<User>(tx, id, "user")?;
                user.set_password_hash(hash, now);
                tx.put(user)?;
                audit::record(tx, actor, AuditAction::ChangePassword, "user", Some(id.into()), json!({ "reset": true }), now)?;
                Ok(())
            })
            .await
    }
}
