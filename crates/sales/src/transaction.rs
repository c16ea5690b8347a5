use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kopontren_core::{
    DomainError, DomainResult, Entity, UserId, entity_id,
    error::{checked_add, checked_mul, non_negative, optional_text, positive},
};
use kopontren_products::ProductId;

entity_id! {
    /// POS transaction identifier.
    pub struct TransactionId; "transaction id"
}

/// Document number prefix (`TRX-YYYYMMDD-NNNN`).
pub const NUMBER_PREFIX: &str = "TRX";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Cash,
    Transfer,
    /// Store credit, settled later.
    Bon,
}

impl PaymentType {
    pub const ALL: [PaymentType; 3] = [Self::Cash, Self::Transfer, Self::Bon];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Transfer => "TRANSFER",
            Self::Bon => "BON",
        }
    }
}

impl FromStr for PaymentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown payment type '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Completed,
    Voided,
}

/// Sold line. Name and prices are snapshots taken at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionItem {
    pub product_id: ProductId,
    pub product_code: String,
    pub product_name: String,
    pub unit: String,
    pub quantity: i64,
    pub unit_price: i64,
    /// Buy price at checkout, for cost of goods.
    pub cost_price: i64,
    pub discount: i64,
    pub subtotal: i64,
}

impl TransactionItem {
    pub fn cost(&self) -> i64 {
        self.cost_price.saturating_mul(self.quantity)
    }
}

/// A checkout line with the product snapshot already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInput {
    pub product_id: ProductId,
    pub product_code: String,
    pub product_name: String,
    pub unit: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub cost_price: i64,
    pub discount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub number: String,
    pub lines: Vec<LineInput>,
    pub discount: i64,
    pub payment_type: PaymentType,
    /// Cash handed over, transfer amount, or BON down payment.
    pub paid_amount: Option<i64>,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
    pub cashier_id: UserId,
    pub cashier_name: String,
}

/// A settlement instalment against a BON transaction (including the down payment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub amount: i64,
    pub received_by: UserId,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub number: String,
    pub items: Vec<TransactionItem>,
    pub subtotal: i64,
    pub discount: i64,
    pub total: i64,
    pub payment_type: PaymentType,
    pub paid_amount: i64,
    pub change_amount: i64,
    pub payment_status: PaymentStatus,
    pub status: TransactionStatus,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
    pub cashier_id: UserId,
    pub cashier_name: String,
    pub payments: Vec<Payment>,
    pub paid_at: Option<DateTime<Utc>>,
    pub voided_at: Option<DateTime<Utc>>,
    pub voided_by: Option<UserId>,
    pub void_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Transaction {
    type Id = TransactionId;

    fn id(&self) -> TransactionId {
        self.id
    }
}

fn build_items(lines: Vec<LineInput>) -> DomainResult<(Vec<TransactionItem>, i64)> {
    if lines.is_empty() {
        return Err(DomainError::validation("transaction needs at least one item"));
    }
    let mut seen = BTreeSet::new();
    let mut subtotal = 0i64;
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        if !seen.insert(line.product_id) {
            return Err(DomainError::validation(format!(
                "product '{}' appears more than once",
                line.product_name
            )));
        }
        positive("quantity", line.quantity)?;
        non_negative("line discount", line.discount)?;
        let gross = checked_mul("line total", line.quantity, line.unit_price)?;
        if line.discount > gross {
            return Err(DomainError::validation(format!(
                "discount on '{}' exceeds the line total",
                line.product_name
            )));
        }
        let line_total = gross - line.discount;
        subtotal = checked_add("subtotal", subtotal, line_total)?;
        items.push(TransactionItem {
            product_id: line.product_id,
            product_code: line.product_code,
            product_name: line.product_name,
            unit: line.unit,
            quantity: line.quantity,
            unit_price: line.unit_price,
            cost_price: line.cost_price,
            discount: line.discount,
            subtotal: line_total,
        });
    }
    Ok((items, subtotal))
}

impl Transaction {
    /// Price the cart and settle payment according to the payment type.
    pub fn checkout(input: Checkout, now: DateTime<Utc>) -> DomainResult<Self> {
        let (items, subtotal) = build_items(input.lines)?;
        let discount = non_negative("discount", input.discount)?;
        if discount > subtotal {
            return Err(DomainError::validation("discount exceeds the subtotal"));
        }
        let total = subtotal - discount;
        let customer_name = optional_text(input.customer_name);

        let (paid_amount, change_amount, payment_status) = match input.payment_type {
            PaymentType::Cash => {
                let paid = input
                    .paid_amount
                    .ok_or_else(|| DomainError::validation("cash payments need the amount paid"))?;
                if paid < total {
                    return Err(DomainError::validation(format!(
                        "amount paid {paid} is less than the total {total}"
                    )));
                }
                (paid, paid - total, PaymentStatus::Paid)
            }
            PaymentType::Transfer => {
                let paid = input.paid_amount.unwrap_or(total);
                if paid != total {
                    return Err(DomainError::validation("transfer amount must equal the total"));
                }
                (paid, 0, PaymentStatus::Paid)
            }
            PaymentType::Bon => {
                if customer_name.is_none() {
                    return Err(DomainError::validation("BON transactions need a customer name"));
                }
                let paid = non_negative("down payment", input.paid_amount.unwrap_or(0))?;
                if paid >= total {
                    return Err(DomainError::validation(
                        "down payment must be less than the total, use CASH or TRANSFER instead",
                    ));
                }
                (paid, 0, PaymentStatus::Unpaid)
            }
        };

        let payments = if paid_amount > 0 && input.payment_type == PaymentType::Bon {
            vec![Payment { amount: paid_amount, received_by: input.cashier_id, paid_at: now }]
        } else {
            Vec::new()
        };

        Ok(Self {
            id: TransactionId::new(),
            number: input.number,
            items,
            subtotal,
            discount,
            total,
            payment_type: input.payment_type,
            paid_amount,
            change_amount,
            payment_status,
            status: TransactionStatus::Completed,
            customer_name,
            notes: optional_text(input.notes),
            cashier_id: input.cashier_id,
            cashier_name: input.cashier_name,
            payments,
            paid_at: (payment_status == PaymentStatus::Paid).then_some(now),
            voided_at: None,
            voided_by: None,
            void_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    /// Amount still owed on a BON transaction (0 otherwise).
    pub fn outstanding(&self) -> i64 {
        match (self.status, self.payment_status) {
            (TransactionStatus::Completed, PaymentStatus::Unpaid) => (self.total - self.paid_amount).max(0),
            _ => 0,
        }
    }

    pub fn cost_of_goods(&self) -> i64 {
        self.items.iter().map(TransactionItem::cost).fold(0, i64::saturating_add)
    }

    pub fn gross_profit(&self) -> i64 {
        self.total.saturating_sub(self.cost_of_goods())
    }

    /// Settle (part of) an unpaid BON.
    pub fn pay(&mut self, amount: i64, by: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.is_completed() || self.payment_status != PaymentStatus::Unpaid {
            return Err(DomainError::invalid_state(format!(
                "transaction {} has nothing outstanding",
                self.number
            )));
        }
        positive("payment amount", amount)?;
        let outstanding = self.outstanding();
        if amount > outstanding {
            return Err(DomainError::validation(format!(
                "payment {amount} exceeds the outstanding {outstanding}"
            )));
        }
        self.paid_amount += amount;
        self.payments.push(Payment { amount, received_by: by, paid_at: now });
        if self.paid_amount >= self.total {
            self.payment_status = PaymentStatus::Paid;
            self.paid_at = Some(now);
        }
        self.updated_at = now;
        Ok(())
    }

    /// COMPLETED → VOIDED. The caller returns the items to stock.
    pub fn void(&mut self, reason: Option<String>, by: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.is_completed() {
            return Err(DomainError::invalid_state(format!(
                "transaction {} is already voided",
                self.number
            )));
        }
        self.status = TransactionStatus::Voided;
        self.voided_at = Some(now);
        self.voided_by = Some(by);
        self.void_reason = optional_text(reason);
        self.updated_at = now;
        Ok(())
    }
}
