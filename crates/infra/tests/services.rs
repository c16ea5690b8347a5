//! Service-level behaviour across catalog, POS, stock, projects and users.

mod common;

use std::time::Duration;

use chrono::Utc;
use kopontren_auth::{NewUser, Role, UserUpdate};
use kopontren_core::{DomainError, PageRequest};
use kopontren_infra::audit::{AuditAction, AuditFilter};
use kopontren_infra::services::{
    AuthFailure, CartLine, CheckoutRequest, MaterialRequest, MovementFilter, ProductFilter, ServiceError,
    UsageRequest,
};
use kopontren_inventory::{AdjustmentMode, ReferenceType, StockAdjustment};
use kopontren_products::{CategoryInput, ProductUpdate};
use kopontren_projects::{NewProject, ProjectStatus};
use kopontren_reporting::DateRange;
use kopontren_sales::{PaymentStatus, PaymentType, TransactionStatus};

use common::{ADMIN_PASSWORD, harness, harness_with_notifications};

fn cash(items: Vec<CartLine>, paid: i64) -> CheckoutRequest {
    CheckoutRequest {
        items,
        discount: 0,
        payment_type: PaymentType::Cash,
        paid_amount: Some(paid),
        customer_name: None,
        notes: None,
    }
}

fn line(product_id: kopontren_products::ProductId, quantity: i64) -> CartLine {
    CartLine {
        product_id,
        quantity,
        discount: 0,
    }
}

#[tokio::test]
async fn login_issues_token_and_rejects_bad_credentials_alike() {
    let h = harness().await;
    let ok = h.services.login("ADMIN ", ADMIN_PASSWORD).await.unwrap();
    assert_eq!(ok.user.role, Role::Admin);
    assert!(ok.user.last_login_at.is_some());
    let principal = h.services.authenticate(&ok.token).await.unwrap();
    assert_eq!(principal.user_id, h.admin.user_id);

    let wrong = h.services.login("admin", "nope-nope").await.unwrap_err();
    let unknown = h.services.login("ghost", ADMIN_PASSWORD).await.unwrap_err();
    for err in [wrong, unknown] {
        assert!(matches!(err, ServiceError::Auth(AuthFailure::InvalidCredentials)), "{err:?}");
    }

    let logins = h
        .services
        .audit_logs(
            &AuditFilter {
                action: Some(AuditAction::Login),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await;
    assert_eq!(logins.total, 1);
}

#[tokio::test]
async fn deactivated_users_lose_access() {
    let h = harness().await;
    let kasir = h
        .services
        .create_user(
            &h.admin,
            NewUser {
                username: "kasir1".into(),
                full_name: "Kasir Satu".into(),
                role: Role::Cashier,
            },
            "kasir123",
        )
        .await
        .unwrap();
    let token = h.services.login("kasir1", "kasir123").await.unwrap().token;

    let dup = h
        .services
        .create_user(
            &h.admin,
            NewUser {
                username: "Kasir1".into(),
                full_name: "Lagi".into(),
                role: Role::Cashier,
            },
            "kasir123",
        )
        .await
        .unwrap_err();
    assert!(matches!(dup, ServiceError::Domain(DomainError::Conflict(_))));

    h.services
        .update_user(
            &h.admin,
            kasir.id,
            UserUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(h.services.authenticate(&token).await.is_err());
    assert!(h.services.login("kasir1", "kasir123").await.is_err());
}

#[tokio::test]
async fn change_password_requires_the_current_one() {
    let h = harness().await;
    let err = h.services.change_password(&h.admin, "salah", "baru12345").await.unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    h.services.change_password(&h.admin, ADMIN_PASSWORD, "baru12345").await.unwrap();
    assert!(h.services.login("admin", "baru12345").await.is_ok());
}

#[tokio::test]
async fn products_are_unique_and_price_edits_are_recorded() {
    let h = harness().await;
    let p = h.product("SMN-01", 10, 60_000, 65_000, 2).await;
    let movements = h
        .services
        .list_movements(
            &MovementFilter {
                product_id: Some(p.id),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await;
    assert_eq!(movements.total, 1);
    assert_eq!(movements.items[0].reference_type, ReferenceType::Initial);
    assert_eq!(p.stock, 10);

    let updated = h
        .services
        .update_product(
            &h.admin,
            p.id,
            ProductUpdate {
                sell_price: Some(67_000),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.sell_price, 67_000);
    let history = h.services.price_history(p.id, PageRequest::default()).await.unwrap();
    assert_eq!(history.total, 1);
    assert_eq!((history.items[0].old_sell_price, history.items[0].new_sell_price), (65_000, 67_000));

    let clash = h
        .services
        .update_product(
            &h.admin,
            h.product("PKU-01", 0, 1, 2, 0).await.id,
            ProductUpdate {
                code: Some("smn-01".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(clash, ServiceError::Domain(DomainError::Conflict(_))), "{clash:?}");
}

#[tokio::test]
async fn generated_barcodes_are_internal_ean13_and_scannable() {
    let h = harness().await;
    let p = h.product("CAT-01", 0, 1_000, 1_500, 0).await;
    let p = h.services.generate_barcode(&h.admin, p.id).await.unwrap();
    let code = p.barcode.clone().unwrap();
    assert_eq!(code.len(), 13);
    assert!(code.starts_with("20"));
    assert!(kopontren_products::barcode::validate(&code).is_ok());
    assert_eq!(h.services.product_by_barcode(&code).await.unwrap().id, p.id);

    let again = h.services.generate_barcode(&h.admin, p.id).await.unwrap_err();
    assert!(matches!(again, ServiceError::Domain(DomainError::Conflict(_))));
}

#[tokio::test]
async fn categories_in_use_cannot_be_deleted() {
    let h = harness().await;
    let cat = h
        .services
        .create_category(
            &h.admin,
            CategoryInput {
                name: "Semen".into(),
                description: None,
            },
        )
        .await
        .unwrap();
    let dup = h
        .services
        .create_category(
            &h.admin,
            CategoryInput {
                name: " semen ".into(),
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(dup, ServiceError::Domain(DomainError::Conflict(_))));

    let p = h.product("SMN-01", 0, 1, 2, 0).await;
    h.services
        .update_product(
            &h.admin,
            p.id,
            ProductUpdate {
                category_id: Some(Some(cat.id)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let err = h.services.delete_category(&h.admin, cat.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));

    let listed = h.services.list_categories().await;
    assert_eq!(listed[0].product_count, 1);
}

#[tokio::test]
async fn checkout_takes_stock_and_void_restores_it() {
    let h = harness().await;
    let p = h.product("SMN-01", 10, 60_000, 65_000, 0).await;

    let trx = h.services.checkout(&h.admin, cash(vec![line(p.id, 3)], 200_000)).await.unwrap();
    assert!(trx.number.starts_with("TRX-"));
    assert_eq!(trx.total, 195_000);
    assert_eq!(trx.change_amount, 5_000);
    assert_eq!(h.stock_of(&p).await, 7);

    let voided = h.services.void_transaction(&h.admin, trx.id, Some("salah input".into())).await.unwrap();
    assert_eq!(voided.status, TransactionStatus::Voided);
    assert_eq!(h.stock_of(&p).await, 10);

    let twice = h.services.void_transaction(&h.admin, trx.id, None).await.unwrap_err();
    assert!(matches!(twice, ServiceError::Domain(DomainError::InvalidState(_))));
    assert_eq!(h.stock_of(&p).await, 10);
}

#[tokio::test]
async fn insufficient_stock_rejects_the_whole_sale() {
    let h = harness().await;
    let a = h.product("A-1", 5, 100, 200, 0).await;
    let b = h.product("B-1", 1, 100, 200, 0).await;
    let err = h
        .services
        .checkout(&h.admin, cash(vec![line(a.id, 2), line(b.id, 2)], 10_000))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))), "{err:?}");
    assert_eq!(h.stock_of(&a).await, 5);
    assert_eq!(h.stock_of(&b).await, 1);
    assert_eq!(h.services.list_transactions(&Default::default(), PageRequest::default()).await.total, 0);
}

#[tokio::test]
async fn bon_is_settled_in_instalments() {
    let h = harness().await;
    let p = h.product("SMN-01", 10, 60_000, 65_000, 0).await;
    let trx = h
        .services
        .checkout(
            &h.admin,
            CheckoutRequest {
                items: vec![line(p.id, 2)],
                discount: 0,
                payment_type: PaymentType::Bon,
                paid_amount: Some(30_000),
                customer_name: Some("Ustadz Hasan".into()),
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(trx.payment_status, PaymentStatus::Unpaid);
    assert_eq!(trx.outstanding(), 100_000);

    let over = h.services.pay_transaction(&h.admin, trx.id, 100_001).await.unwrap_err();
    assert!(matches!(over, ServiceError::Domain(DomainError::Validation(_))));
    let partial = h.services.pay_transaction(&h.admin, trx.id, 40_000).await.unwrap();
    assert_eq!(partial.outstanding(), 60_000);
    let paid = h.services.pay_transaction(&h.admin, trx.id, 60_000).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.payments.len(), 3);
}

#[tokio::test]
async fn sale_crossing_minimum_notifies_admins() {
    let h = harness_with_notifications().await;
    let mut realtime = h.services.subscribe();
    let p = h.product("SMN-01", 5, 60_000, 65_000, 3).await;

    h.services.checkout(&h.admin, cash(vec![line(p.id, 1)], 65_000)).await.unwrap();
    h.services.checkout(&h.admin, cash(vec![line(p.id, 1)], 65_000)).await.unwrap();

    let message = tokio::time::timeout(Duration::from_secs(2), realtime.recv())
        .await
        .expect("notification in time")
        .unwrap();
    assert_eq!(message.topic, "notification.created");
    let low = h.services.low_stock_products().await;
    assert_eq!(low.len(), 1);
    assert_eq!(h.services.unread_notification_count(&h.admin).await, 1);
    assert_eq!(h.services.mark_all_notifications_read(&h.admin).await.unwrap(), 1);
    assert_eq!(h.services.unread_notification_count(&h.admin).await, 0);
}

#[tokio::test]
async fn stock_opname_sets_counted_quantity() {
    let h = harness().await;
    let p = h.product("P-1", 10, 100, 200, 0).await;
    let movement = h
        .services
        .adjust_stock(
            &h.admin,
            StockAdjustment {
                product_id: p.id,
                mode: AdjustmentMode::Set,
                quantity: 7,
                reason: "stock opname akhir bulan".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!((movement.previous_stock, movement.new_stock), (10, 7));
    assert_eq!(movement.reference_type, ReferenceType::Adjustment);
    assert_eq!(h.stock_of(&p).await, 7);

    let nothing = h
        .services
        .adjust_stock(
            &h.admin,
            StockAdjustment {
                product_id: p.id,
                mode: AdjustmentMode::Set,
                quantity: 7,
                reason: "hitung ulang".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(nothing, ServiceError::Domain(DomainError::Validation(_))));
}

#[tokio::test]
async fn project_usage_moves_stock_and_feeds_the_summary() {
    let h = harness().await;
    let semen = h.product("SMN-01", 20, 60_000, 65_000, 0).await;
    let project = h
        .services
        .create_project(
            &h.admin,
            NewProject {
                code: "asrama-2026".into(),
                name: "Renovasi Asrama Putra".into(),
                description: None,
                location: Some("Blok B".into()),
                budget: 1_000_000,
                start_date: None,
                end_date: None,
            },
        )
        .await
        .unwrap();
    let project = h
        .services
        .add_project_material(
            &h.admin,
            project.id,
            MaterialRequest {
                product_id: semen.id,
                estimated_quantity: 10,
                estimated_unit_price: None,
                notes: None,
            },
        )
        .await
        .unwrap();
    let material_id = project.materials[0].id;
    let usage = UsageRequest {
        material_id,
        quantity: 4,
        usage_date: None,
        notes: None,
    };

    let planning = h.services.record_material_usage(&h.admin, project.id, usage.clone()).await.unwrap_err();
    assert!(matches!(planning, ServiceError::Domain(DomainError::InvalidState(_))));

    h.services
        .change_project_status(&h.admin, project.id, ProjectStatus::InProgress)
        .await
        .unwrap();
    let booked = h.services.record_material_usage(&h.admin, project.id, usage).await.unwrap();
    assert_eq!(booked.total_cost, 240_000);
    assert_eq!(h.stock_of(&semen).await, 16);

    let summary = h.services.project_summary(project.id).await.unwrap();
    assert_eq!(summary.total_estimated_cost, 600_000);
    assert_eq!(summary.total_used_cost, 240_000);
    assert_eq!(summary.budget_remaining, 760_000);
    assert_eq!(summary.materials[0].usage_percent, 40.0);
    assert!(!summary.over_budget);

    let remove = h
        .services
        .remove_project_material(&h.admin, project.id, material_id)
        .await
        .unwrap_err();
    assert!(matches!(remove, ServiceError::Domain(DomainError::Conflict(_))));
}

#[tokio::test]
async fn reports_see_committed_sales() {
    let h = harness().await;
    let p = h.product("P-1", 10, 1_000, 1_500, 0).await;
    h.services.checkout(&h.admin, cash(vec![line(p.id, 2)], 3_000)).await.unwrap();

    let today = Utc::now().date_naive();
    let summary = h.services.sales_summary(DateRange::day(today)).await;
    assert_eq!(summary.transaction_count, 1);
    assert_eq!(summary.net_sales, 3_000);
    assert_eq!(summary.gross_profit, 1_000);

    let dashboard = h.services.dashboard(today).await;
    assert_eq!(dashboard.today_sales, 3_000);
    assert_eq!(dashboard.today_transactions, 1);

    let listed = h
        .services
        .list_products(&ProductFilter::default(), PageRequest::default())
        .await;
    assert_eq!(listed.total, 1);
}
