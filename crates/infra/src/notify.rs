//! In-app notifications and their best-effort fan-out.
//!
//! Fan-out runs on a spawned task after the originating write has committed. A failure
//! is logged and dropped: the originating change is never rolled back and nothing is
//! retried.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use kopontren_auth::Role;
use kopontren_core::{Entity, UserId, entity_id};

use crate::store::{Store, StoreError};

entity_id! {
    /// Notification identifier.
    pub struct NotificationId; "notification id"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    PurchaseOrderReceived,
    LowStock,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub reference_id: Option<Uuid>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Notification {
    type Id = NotificationId;

    fn id(&self) -> NotificationId {
        self.id
    }
}

impl Notification {
    pub fn mark_read(&mut self, now: DateTime<Utc>) {
        if !self.is_read {
            self.is_read = true;
            self.read_at = Some(now);
        }
    }
}

/// What to tell the recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub reference_id: Option<Uuid>,
}

/// Realtime message broadcast to SSE subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeMessage {
    pub user_id: UserId,
    pub topic: String,
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `notice` to every active administrator; returns how many were notified.
    async fn notify_admins(&self, notice: Notice) -> Result<usize, StoreError>;
}

/// Writes one notification row per active ADMIN and pushes it to realtime subscribers.
#[derive(Clone)]
pub struct StoreNotifier {
    store: Store,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
}

impl StoreNotifier {
    pub fn new(store: Store, realtime_tx: broadcast::Sender<RealtimeMessage>) -> Self {
        Self { store, realtime_tx }
    }
}

#[async_trait]
impl Notifier for StoreNotifier {
    async fn notify_admins(&self, notice: Notice) -> Result<usize, StoreError> {
        let now = Utc::now();
        let created = self
            .store
            .write(|tx| -> Result<Vec<Notification>, StoreError> {
                let admins: Vec<UserId> = tx
                    .tables()
                    .users
                    .values()
                    .filter(|u| u.is_active && u.role == Role::Admin)
                    .map(|u| u.id)
                    .collect();
                let mut created = Vec::with_capacity(admins.len());
                for user_id in admins {
                    let n = Notification {
                        id: NotificationId::new(),
                        user_id,
                        kind: notice.kind,
                        title: notice.title.clone(),
                        message: notice.message.clone(),
                        reference_id: notice.reference_id,
                        is_read: false,
                        read_at: None,
                        created_at: now,
                    };
                    tx.put(n.clone())?;
                    created.push(n);
                }
                Ok(created)
            })
            .await?;

        for n in &created {
            // Lossy: no subscribers is not an error.
            let _ = self.realtime_tx.send(RealtimeMessage {
                user_id: n.user_id,
                topic: "notification.created".to_string(),
                payload: serde_json::to_value(n).unwrap_or_default(),
            });
        }
        debug!(kind = ?notice.kind, recipients = created.len(), "notification fan-out done");
        Ok(created.len())
    }
}

/// Notifier that drops everything (tests, or notifications switched off).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify_admins(&self, _notice: Notice) -> Result<usize, StoreError> {
        Ok(0)
    }
}

/// Fire-and-forget fan-out. Must be called after the originating write committed.
pub fn spawn_notify(notifier: Arc<dyn Notifier>, notice: Notice) -> JoinHandle<()> {
    tokio::spawn(async move {
        let title = notice.title.clone();
        if let Err(err) = notifier.notify_admins(notice).await {
            warn!(error = %err, title = %title, "notification fan-out failed");
        }
    })
}
