use kopontren_core::{Page, PageRequest};

use super::Services;
use crate::audit::{self, AuditFilter, AuditLog};

impl Services {
    pub async fn audit_logs(&self, filter: &AuditFilter, page: PageRequest) -> Page<AuditLog> {
        self.store.read(|t| audit::list(t, filter, page)).await
    }
}
