use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use kopontren_auth::Principal;
use kopontren_core::{DomainError, Page, PageRequest};
use kopontren_suppliers::{Supplier, SupplierId, SupplierInput};

use super::{ServiceResult, Services, require};
use crate::audit::{self, AuditAction};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupplierFilter {
    pub q: Option<String>,
    /// `None` lists active suppliers only.
    pub active: Option<bool>,
}

impl Services {
    pub async fn list_suppliers(&self, filter: &SupplierFilter, page: PageRequest) -> Page<Supplier> {
        let active = filter.active.unwrap_or(true);
        self.store
            .read(|t| {
                let mut rows: Vec<Supplier> = t
                    .suppliers
                    .values()
                    .filter(|s| s.is_active == active)
                    .filter(|s| filter.q.as_deref().is_none_or(|q| s.matches_search(q)))
                    .cloned()
                    .collect();
                rows.sort_by_key(|s| s.name.to_lowercase());
                Page::from_vec(rows, page)
            })
            .await
    }

    pub async fn get_supplier(&self, id: SupplierId) -> ServiceResult<Supplier> {
        self.store
            .read(|t| t.suppliers.get(&id).cloned())
            .await
            .ok_or_else(|| DomainError::not_found("supplier").into())
    }

    #[instrument(skip(self, actor, input), fields(actor = %actor.username), err)]
    pub async fn create_supplier(&self, actor: &Principal, input: SupplierInput) -> ServiceResult<Supplier> {
        let now = Utc::now();
        let supplier = Supplier::create(input, now)?;
        self.store
            .write(|tx| -> ServiceResult<Supplier> {
                audit::record(tx, actor, AuditAction::Create, "supplier", Some(supplier.id.into()), json!({ "name": supplier.name }), now)?;
                tx.put(supplier.clone())?;
                Ok(supplier)
            })
            .await
    }

    #[instrument(skip(self, actor, input), fields(actor = %actor.username), err)]
    pub async fn update_supplier(&self, actor: &Principal, id: SupplierId, input: SupplierInput) -> ServiceResult<Supplier> {
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<Supplier> {
                let mut supplier = require::<Supplier>(tx, id, "supplier")?;
                supplier.update(input, now)?;
                audit::record(tx, actor, AuditAction::Update, "supplier", Some(id.into()), json!({ "name": supplier.name }), now)?;
                tx.put(supplier.clone())?;
                Ok(supplier)
            })
            .await
    }

    /// Soft delete. Existing purchase orders keep their supplier snapshot.
    #[instrument(skip(self, actor), fields(actor = %actor.username), err)]
    pub async fn deactivate_supplier(&self, actor: &Principal, id: SupplierId) -> ServiceResult<Supplier> {
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<Supplier> {
                let mut supplier = require::<Supplier>(tx, id, "supplier")?;
                supplier.deactivate(now);
                audit::record(tx, actor, AuditAction::Delete, "supplier", Some(id.into()), json!({ "name": supplier.name }), now)?;
                tx.put(supplier.clone())?;
                Ok(supplier)
            })
            .await
    }
}
