use chrono::Utc;
use serde::Deserialize;

use kopontren_auth::Principal;
use kopontren_core::{DomainError, Page, PageRequest};

use super::{ServiceResult, Services};
use crate::notify::{Notification, NotificationId};
use crate::store::StoreError;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct NotificationFilter {
    #[serde(default)]
    pub unread_only: bool,
}

impl Services {
    /// The caller's notifications, newest first.
    pub async fn list_notifications(
        &self,
        principal: &Principal,
        filter: NotificationFilter,
        page: PageRequest,
    ) -> Page<Notification> {
        self.store
            .read(|t| {
                let rows: Vec<Notification> = t
                    .notifications
                    .iter()
                    .rev()
                    .map(|(_, n)| n)
                    .filter(|n| n.user_id == principal.user_id && (!filter.unread_only || !n.is_read))
                    .cloned()
                    .collect();
                Page::from_vec(rows, page)
            })
            .await
    }

    pub async fn unread_notification_count(&self, principal: &Principal) -> usize {
        self.store
            .read(|t| {
                t.notifications
                    .values()
                    .filter(|n| n.user_id == principal.user_id && !n.is_read)
                    .count()
            })
            .await
    }

    /// Mark one of the caller's notifications read. Someone else's is reported as missing.
    pub async fn mark_notification_read(&self, principal: &Principal, id: NotificationId) -> ServiceResult<Notification> {
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<Notification> {
                let mut n = tx
                    .get::<Notification>(id)
                    .filter(|n| n.user_id == principal.user_id)
                    .cloned()
                    .ok_or(DomainError::not_found("notification"))?;
                n.mark_read(now);
                tx.put(n.clone())?;
                Ok(n)
            })
            .await
    }

    /// Returns how many notifications changed.
    pub async fn mark_all_notifications_read(&self, principal: &Principal) -> ServiceResult<usize> {
        let now = Utc::now();
        let changed = self
            .store
            .write(|tx| -> Result<usize, StoreError> {
                let unread: Vec<Notification> = tx
                    .tables()
                    .notifications
                    .values()
                    .filter(|n| n.user_id == principal.user_id && !n.is_read)
                    .cloned()
                    .collect();
                let count = unread.len();
                for mut n in unread {
                    n.mark_read(now);
                    tx.put(n)?;
                }
                Ok(count)
            })
            .await?;
        Ok(changed)
    }
}
