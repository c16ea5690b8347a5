use im::OrdMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

use kopontren_auth::User;
use kopontren_core::{Entity, UserId};
use kopontren_inventory::{PriceHistory, PriceHistoryId, StockMovement, StockMovementId};
use kopontren_products::{Category, CategoryId, Product, ProductId};
use kopontren_projects::{MaterialUsage, MaterialUsageId, Project, ProjectId};
use kopontren_purchasing::{PurchaseOrder, PurchaseOrderId};
use kopontren_sales::{Transaction, TransactionId};
use kopontren_suppliers::{Supplier, SupplierId};

use crate::audit::{AuditLog, AuditLogId};
use crate::notify::{Notification, NotificationId};

use super::{StoreError, StoredRow};

/// Every table of the store. Cloning is O(1) (structural sharing).
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub users: OrdMap<UserId, User>,
    pub categories: OrdMap<CategoryId, Category>,
    pub products: OrdMap<ProductId, Product>,
    pub suppliers: OrdMap<SupplierId, Supplier>,
    pub purchase_orders: OrdMap<PurchaseOrderId, PurchaseOrder>,
    pub stock_movements: OrdMap<StockMovementId, StockMovement>,
    pub price_history: OrdMap<PriceHistoryId, PriceHistory>,
    pub transactions: OrdMap<TransactionId, Transaction>,
    pub projects: OrdMap<ProjectId, Project>,
    pub material_usages: OrdMap<MaterialUsageId, MaterialUsage>,
    pub audit_logs: OrdMap<AuditLogId, AuditLog>,
    pub notifications: OrdMap<NotificationId, Notification>,
}

/// A row type stored in one of the [`Tables`].
pub trait Record: Entity + Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Journal table name.
    const TABLE: &'static str;

    fn table(tables: &Tables) -> &OrdMap<Self::Id, Self>;
    fn table_mut(tables: &mut Tables) -> &mut OrdMap<Self::Id, Self>;
}

macro_rules! records {
    ($($ty:ty => $field:ident, $name:literal;)*) => {
        $(
            impl Record for $ty {
                const TABLE: &'static str = $name;

                fn table(tables: &Tables) -> &OrdMap<Self::Id, Self> {
                    &tables.$field
                }

                fn table_mut(tables: &mut Tables) -> &mut OrdMap<Self::Id, Self> {
                    &mut tables.$field
                }
            }
        )*

        impl Tables {
            /// Rebuild the tables from journal rows.
            pub fn restore(rows: impl IntoIterator<Item = StoredRow>) -> Result<Self, StoreError> {
                let mut tables = Tables::default();
                for row in rows {
                    match row.table.as_str() {
                        $( $name => restore_row::<$ty>(&mut tables, row)?, )*
                        other => {
                            return Err(StoreError::Corrupt(format!("unknown table '{other}'")));
                        }
                    }
                }
                Ok(tables)
            }
        }
    };
}

records! {
    User => users, "users";
    Category => categories, "categories";
    Product => products, "products";
    Supplier => suppliers, "suppliers";
    PurchaseOrder => purchase_orders, "purchase_orders";
    StockMovement => stock_movements, "stock_movements";
    PriceHistory => price_history, "price_history";
    Transaction => transactions, "transactions";
    Project => projects, "projects";
    MaterialUsage => material_usages, "material_usages";
    AuditLog => audit_logs, "audit_logs";
    Notification => notifications, "notifications";
}

fn restore_row<R: Record>(tables: &mut Tables, row: StoredRow) -> Result<(), StoreError> {
    let record: R = serde_json::from_value(row.body).map_err(|e| {
        StoreError::Corrupt(format!("{} row {}: {e}", R::TABLE, row.id))
    })?;
    let id: uuid::Uuid = record.id().into();
    if id != row.id {
        return Err(StoreError::Corrupt(format!(
            "{} row {} carries a different id",
            R::TABLE,
            row.id
        )));
    }
    R::table_mut(tables).insert(record.id(), record);
    Ok(())
}
