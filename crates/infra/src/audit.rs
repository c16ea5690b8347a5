//! Audit trail. Rows are written inside the same store write as the change they describe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use kopontren_auth::Principal;
use kopontren_core::{Entity, Page, PageRequest, UserId, entity_id};

use crate::store::{StoreError, Tables, Tx};

entity_id! {
    /// Audit log row identifier.
    pub struct AuditLogId; "audit log id"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Login,
    ChangePassword,
    Send,
    Cancel,
    Receive,
    Adjust,
    Pay,
    Void,
    UseMaterial,
    ChangeStatus,
    Upload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: AuditLogId,
    pub user_id: UserId,
    pub username: String,
    pub action: AuditAction,
    pub entity: String,
    pub entity_id: Option<Uuid>,
    pub details: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl Entity for AuditLog {
    type Id = AuditLogId;

    fn id(&self) -> AuditLogId {
        self.id
    }
}

/// Append an audit row to the running write.
pub fn record(
    tx: &mut Tx,
    actor: &Principal,
    action: AuditAction,
    entity: &str,
    entity_id: Option<Uuid>,
    details: JsonValue,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    tx.put(AuditLog {
        id: AuditLogId::new(),
        user_id: actor.user_id,
        username: actor.username.clone(),
        action,
        entity: entity.to_string(),
        entity_id,
        details,
        created_at: now,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditFilter {
    pub entity: Option<String>,
    pub action: Option<AuditAction>,
    pub user_id: Option<UserId>,
}

/// Newest first.
pub fn list(tables: &Tables, filter: &AuditFilter, page: PageRequest) -> Page<AuditLog> {
    let rows: Vec<AuditLog> = tables
        .audit_logs
        .iter()
        .rev()
        .map(|(_, a)| a)
        .filter(|a| filter.entity.as_deref().is_none_or(|e| a.entity.eq_ignore_ascii_case(e)))
        .filter(|a| filter.action.is_none_or(|act| a.action == act))
        .filter(|a| filter.user_id.is_none_or(|u| a.user_id == u))
        .cloned()
        .collect();
    Page::from_vec(rows, page)
}
