use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use kopontren_auth::Principal;
use kopontren_core::{DomainError, Page, PageRequest, UserId};
use kopontren_inventory::{MovementType, ReferenceType, StockMovement, StockReference};
use kopontren_products::{Product, ProductId};
use kopontren_sales::{
    Checkout, LineInput, PaymentStatus, PaymentType, Transaction, TransactionId, TransactionStatus, transaction,
};

use super::stock::crossed_low_stock;
use super::{ServiceResult, Services, next_number, require};
use crate::audit::{self, AuditAction};

/// One cart line, in the product's base unit at its current sell price.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default)]
    pub discount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub discount: i64,
    pub payment_type: PaymentType,
    pub paid_amount: Option<i64>,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    pub status: Option<TransactionStatus>,
    pub payment_type: Option<PaymentType>,
    pub payment_status: Option<PaymentStatus>,
    pub cashier_id: Option<UserId>,
    /// Inclusive UTC dates.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Matches the number or customer name.
    pub q: Option<String>,
}

impl TransactionFilter {
    fn matches(&self, t: &Transaction) -> bool {
        let day = t.created_at.date_naive();
        self.status.is_none_or(|s| t.status == s)
            && self.payment_type.is_none_or(|p| t.payment_type == p)
            && self.payment_status.is_none_or(|p| t.payment_status == p)
            && self.cashier_id.is_none_or(|c| t.cashier_id == c)
            && self.from.is_none_or(|d| day >= d)
            && self.to.is_none_or(|d| day <= d)
            && self.q.as_deref().is_none_or(|q| {
                let q = q.trim().to_lowercase();
                t.number.to_lowercase().contains(&q)
                    || t.customer_name.as_deref().is_some_and(|c| c.to_lowercase().contains(&q))
            })
    }
}

impl Services {
    /// Ring up a sale: price the cart, settle payment and take the goods out of stock.
    #[instrument(skip(self, actor, request), fields(actor = %actor.username), err)]
    pub async fn checkout(&self, actor: &Principal, request: CheckoutRequest) -> ServiceResult<Transaction> {
        let now = Utc::now();
        let (trx, low) = self
            .store
            .write(|tx| -> ServiceResult<(Transaction, Vec<Product>)> {
                let mut products = Vec::with_capacity(request.items.len());
                let mut lines = Vec::with_capacity(request.items.len());
                for line in &request.items {
                    let product = require::<Product>(tx, line.product_id, "product")?;
                    product.ensure_active()?;
                    lines.push(LineInput {
                        product_id: product.id,
                        product_code: product.code.clone(),
                        product_name: product.name.clone(),
                        unit: product.unit.clone(),
                        quantity: line.quantity,
                        unit_price: product.sell_price,
                        cost_price: product.buy_price,
                        discount: line.discount,
                    });
                    products.push(product);
                }

                let today = now.date_naive();
                let number = next_number(
                    transaction::NUMBER_PREFIX,
                    today,
                    tx.tables().transactions.values().map(|t| t.number.as_str()),
                );
                let trx = Transaction::checkout(
                    Checkout {
                        number,
                        lines,
                        discount: request.discount,
                        payment_type: request.payment_type,
                        paid_amount: request.paid_amount,
                        customer_name: request.customer_name,
                        notes: request.notes,
                        cashier_id: actor.user_id,
                        cashier_name: actor.username.clone(),
                    },
                    now,
                )?;

                let mut low = Vec::new();
                for (item, mut product) in trx.items.iter().zip(products) {
                    let movement = StockMovement::apply(
                        &mut product,
                        MovementType::Out,
                        item.quantity,
                        StockReference::document(ReferenceType::Sale, trx.id, trx.number.clone()),
                        None,
                        actor.user_id,
                        now,
                    )?;
                    if crossed_low_stock(&movement, &product) {
                        low.push(product.clone());
                    }
                    tx.put(movement)?;
                    tx.put(product)?;
                }

                audit::record(
                    tx,
                    actor,
                    AuditAction::Create,
                    "transaction",
                    Some(trx.id.into()),
                    json!({ "number": trx.number, "total": trx.total, "payment_type": trx.payment_type }),
                    now,
                )?;
                tx.put(trx.clone())?;
                Ok((trx, low))
            })
            .await?;
        info!(number = %trx.number, total = trx.total, "sale completed");
        self.notify_low_stock(&low);
        Ok(trx)
    }

    /// Settle (part of) an unpaid BON.
    #[instrument(skip(self, actor), fields(actor = %actor.username), err)]
    pub async fn pay_transaction(&self, actor: &Principal, id: TransactionId, amount: i64) -> ServiceResult<Transaction> {
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<Transaction> {
                let mut trx = require::<Transaction>(tx, id, "transaction")?;
                trx.pay(amount, actor.user_id, now)?;
                audit::record(
                    tx,
                    actor,
                    AuditAction::Pay,
                    "transaction",
                    Some(id.into()),
                    json!({ "number": trx.number, "amount": amount, "outstanding": trx.outstanding() }),
                    now,
                )?;
                tx.put(trx.clone())?;
                Ok(trx)
            })
            .await
    }

    /// Void a completed sale and put every item back into stock.
    #[instrument(skip(self, actor, reason), fields(actor = %actor.username), err)]
    pub async fn void_transaction(
        &self,
        actor: &Principal,
        id: TransactionId,
        reason: Option<String>,
    ) -> ServiceResult<Transaction> {
        let now = Utc::now();
        self.store
            .write(|tx| -> ServiceResult<Transaction> {
                let mut trx = require::<Transaction>(tx, id, "transaction")?;
                trx.void(reason, actor.user_id, now)?;
                for item in &trx.items {
                    let mut product = require::<Product>(tx, item.product_id, "product")?;
                    let movement = StockMovement::apply(
                        &mut product,
                        MovementType::In,
                        item.quantity,
                        StockReference::document(ReferenceType::SaleVoid, trx.id, trx.number.clone()),
                        trx.void_reason.clone(),
                        actor.user_id,
                        now,
                    )?;
                    tx.put(movement)?;
                    tx.put(product)?;
                }
                audit::record(
                    tx,
                    actor,
                    AuditAction::Void,
                    "transaction",
                    Some(id.into()),
                    json!({ "number": trx.number, "reason": trx.void_reason }),
                    now,
                )?;
                tx.put(trx.clone())?;
                Ok(trx)
            })
            .await
    }

    pub async fn list_transactions(&self, filter: &TransactionFilter, page: PageRequest) -> Page<Transaction> {
        self.store
            .read(|t| {
                let mut rows: Vec<Transaction> =
                    t.transactions.values().filter(|trx| filter.matches(trx)).cloned().collect();
                rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.number.cmp(&a.number)));
                Page::from_vec(rows, page)
            })
            .await
    }

    pub async fn get_transaction(&self, id: TransactionId) -> ServiceResult<Transaction> {
        self.store
            .read(|t| t.transactions.get(&id).cloned())
            .await
            .ok_or_else(|| DomainError::not_found("transaction").into())
    }
}
