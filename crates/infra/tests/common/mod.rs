#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

use kopontren_auth::{Hs256Jwt, Principal, Role};
use kopontren_infra::notify::{NoopNotifier, Notifier, RealtimeMessage, StoreNotifier};
use kopontren_infra::services::{CreatePurchaseOrder, PoLine, ServiceSettings, Services};
use kopontren_infra::store::{Change, Journal, MemoryJournal, Store, StoreError, StoredRow};
use kopontren_infra::uploads::ImageStore;
use kopontren_products::{NewProduct, Product};
use kopontren_purchasing::PurchaseOrder;
use kopontren_suppliers::{Supplier, SupplierInput};

pub const ADMIN_PASSWORD: &str = "rahasia123";

/// Memory journal whose commits can be made to fail on demand.
#[derive(Default)]
pub struct FlakyJournal {
    inner: MemoryJournal,
    failing: AtomicBool,
}

impl FlakyJournal {
    pub fn fail(&self, on: bool) {
        self.failing.store(on, Ordering::SeqCst);
    }
}

#[async_trait]
impl Journal for FlakyJournal {
    async fn load(&self) -> Result<Vec<StoredRow>, StoreError> {
        self.inner.load().await
    }

    async fn commit(&self, changes: &[Change]) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Journal("disk full".into()));
        }
        self.inner.commit(changes).await
    }
}

pub struct Harness {
    pub services: Services,
    pub journal: Arc<FlakyJournal>,
    pub admin: Principal,
    pub realtime_tx: broadcast::Sender<RealtimeMessage>,
}

async fn build(with_notifications: bool) -> Harness {
    let journal = Arc::new(FlakyJournal::default());
    let store = Store::open(journal.clone()).await.unwrap();
    let (realtime_tx, _) = broadcast::channel(64);
    let notifier: Arc<dyn Notifier> = if with_notifications {
        Arc::new(StoreNotifier::new(store.clone(), realtime_tx.clone()))
    } else {
        Arc::new(NoopNotifier)
    };
    let images = ImageStore::new(
        std::env::temp_dir().join(format!("kopontren-tests-{}", Uuid::now_v7())),
        1024 * 1024,
    );
    let services = Services::new(
        store,
        Arc::new(Hs256Jwt::new(b"test-secret", Duration::hours(1))),
        notifier,
        realtime_tx.clone(),
        images,
        ServiceSettings::default(),
    );
    let admin_id = services
        .bootstrap_admin("admin", ADMIN_PASSWORD)
        .await
        .unwrap()
        .expect("fresh store has no users");
    Harness {
        services,
        journal,
        admin: Principal {
            user_id: admin_id,
            username: "admin".into(),
            role: Role::Admin,
        },
        realtime_tx,
    }
}

pub async fn harness() -> Harness {
    build(false).await
}

pub async fn harness_with_notifications() -> Harness {
    build(true).await
}

impl Harness {
    pub async fn product(&self, code: &str, stock: i64, buy: i64, sell: i64, min_stock: i64) -> Product {
        self.services
            .create_product(
                &self.admin,
                NewProduct {
                    code: code.into(),
                    barcode: None,
                    name: format!("Barang {code}"),
                    description: None,
                    category_id: None,
                    unit: "pcs".into(),
                    units: Vec::new(),
                    buy_price: buy,
                    sell_price: sell,
                    min_stock,
                    initial_stock: stock,
                },
                false,
            )
            .await
            .unwrap()
    }

    pub async fn supplier(&self, name: &str) -> Supplier {
        self.services
            .create_supplier(
                &self.admin,
                SupplierInput {
                    name: name.into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    /// DRAFT order for `lines` of (product, quantity, unit price).
    pub async fn purchase_order(&self, supplier: &Supplier, lines: &[(&Product, i64, Option<i64>)]) -> PurchaseOrder {
        self.services
            .create_purchase_order(
                &self.admin,
                CreatePurchaseOrder {
                    supplier_id: supplier.id,
                    order_date: None,
                    expected_date: None,
                    notes: None,
                    items: lines
                        .iter()
                        .map(|(p, quantity, unit_price)| PoLine {
                            product_id: p.id,
                            quantity: *quantity,
                            unit_price: *unit_price,
                        })
                        .collect(),
                },
            )
            .await
            .unwrap()
    }

    pub async fn stock_of(&self, product: &Product) -> i64 {
        self.services.get_product(product.id).await.unwrap().stock
    }
}
