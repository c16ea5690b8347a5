use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use kopontren_core::{
    DomainError, DomainResult, Entity, UserId, entity_id,
    error::{checked_add, checked_mul, non_negative, optional_text, positive},
};
use kopontren_products::ProductId;
use kopontren_suppliers::SupplierId;

entity_id! {
    /// Purchase order identifier.
    pub struct PurchaseOrderId; "purchase order id"
}

/// Document number prefix (`PO-YYYYMMDD-NNNN`).
pub const NUMBER_PREFIX: &str = "PO";

/// Purchase order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    Draft,
    Sent,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub const ALL: [PurchaseOrderStatus; 4] = [Self::Draft, Self::Sent, Self::Received, Self::Cancelled];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Sent => "SENT",
            Self::Received => "RECEIVED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Still waiting for goods (dashboard "open POs").
    pub fn is_open(self) -> bool {
        matches!(self, Self::Draft | Self::Sent)
    }
}

impl core::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown purchase order status '{s}'")))
    }
}

/// Purchase order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit: String,
    pub quantity: i64,
    /// Set on receipt; 0 until then.
    pub received_quantity: i64,
    pub unit_price: i64,
    pub subtotal: i64,
}

/// A line as requested by the caller, with the product snapshot already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInput {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit: String,
    pub quantity: i64,
    pub unit_price: i64,
}

/// Header fields for a new draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPurchaseOrder {
    pub number: String,
    pub supplier_id: SupplierId,
    pub supplier_name: String,
    pub order_date: NaiveDate,
    pub expected_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: UserId,
}

/// Caller-supplied received quantity for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveOverride {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// One resolved line of a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub number: String,
    pub supplier_id: SupplierId,
    pub supplier_name: String,
    pub status: PurchaseOrderStatus,
    pub items: Vec<PurchaseOrderItem>,
    pub total_amount: i64,
    pub order_date: NaiveDate,
    pub expected_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_by: UserId,
    pub received_by: Option<UserId>,
    pub sent_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> PurchaseOrderId {
        self.id
    }
}

fn build_items(lines: Vec<LineInput>) -> DomainResult<(Vec<PurchaseOrderItem>, i64)> {
    if lines.is_empty() {
        return Err(DomainError::validation("purchase order needs at least one item"));
    }

    let mut seen = BTreeSet::new();
    let mut total = 0i64;
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        if !seen.insert(line.product_id) {
            return Err(DomainError::validation(format!(
                "product '{}' appears more than once",
                line.product_name
            )));
        }
        positive("quantity", line.quantity)?;
        non_negative("unit price", line.unit_price)?;
        let subtotal = checked_mul("subtotal", line.quantity, line.unit_price)?;
        total = checked_add("total", total, subtotal)?;
        items.push(PurchaseOrderItem {
            product_id: line.product_id,
            product_name: line.product_name,
            unit: line.unit,
            quantity: line.quantity,
            received_quantity: 0,
            unit_price: line.unit_price,
            subtotal,
        });
    }
    Ok((items, total))
}

impl PurchaseOrder {
    pub fn draft(header: NewPurchaseOrder, lines: Vec<LineInput>, now: DateTime<Utc>) -> DomainResult<Self> {
        if let Some(expected) = header.expected_date {
            if expected < header.order_date {
                return Err(DomainError::validation("expected date is before the order date"));
            }
        }
        let (items, total_amount) = build_items(lines)?;
        Ok(Self {
            id: PurchaseOrderId::new(),
            number: header.number,
            supplier_id: header.supplier_id,
            supplier_name: header.supplier_name,
            status: PurchaseOrderStatus::Draft,
            items,
            total_amount,
            order_date: header.order_date,
            expected_date: header.expected_date,
            notes: optional_text(header.notes),
            cancel_reason: None,
            created_by: header.created_by,
            received_by: None,
            sent_at: None,
            received_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn ensure_draft(&self, action: &str) -> DomainResult<()> {
        if self.status != PurchaseOrderStatus::Draft {
            return Err(DomainError::invalid_state(format!(
                "cannot {action} purchase order {} in status {}",
                self.number, self.status
            )));
        }
        Ok(())
    }

    pub fn replace_items(&mut self, lines: Vec<LineInput>, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_draft("edit")?;
        let (items, total) = build_items(lines)?;
        self.items = items;
        self.total_amount = total;
        self.updated_at = now;
        Ok(())
    }

    pub fn update_notes(&mut self, expected_date: Option<NaiveDate>, notes: Option<String>, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_draft("edit")?;
        if expected_date.is_some_and(|d| d < self.order_date) {
            return Err(DomainError::validation("expected date is before the order date"));
        }
        self.expected_date = expected_date;
        self.notes = optional_text(notes);
        self.updated_at = now;
        Ok(())
    }

    /// DRAFT → SENT.
    pub fn send(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_draft("send")?;
        self.status = PurchaseOrderStatus::Sent;
        self.sent_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// DRAFT/SENT → CANCELLED.
    pub fn cancel(&mut self, reason: Option<String>, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.is_open() {
            return Err(DomainError::invalid_state(format!(
                "cannot cancel purchase order {} in status {}",
                self.number, self.status
            )));
        }
        self.status = PurchaseOrderStatus::Cancelled;
        self.cancel_reason = optional_text(reason);
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Resolve what a receive call books for each line.
    ///
    /// Lines without an override receive their ordered quantity. Fails with
    /// `InvalidState` once the order is RECEIVED or CANCELLED.
    pub fn receive_plan(&self, overrides: &[ReceiveOverride]) -> DomainResult<Vec<ReceiptLine>> {
        if !self.status.is_open() {
            return Err(DomainError::invalid_state(format!(
                "purchase order {} is already {}",
                self.number, self.status
            )));
        }

        let mut by_product = BTreeMap::new();
        for o in overrides {
            if !self.items.iter().any(|i| i.product_id == o.product_id) {
                return Err(DomainError::validation(format!(
                    "product {} is not on purchase order {}",
                    o.product_id, self.number
                )));
            }
            non_negative("received quantity", o.quantity)?;
            if by_product.insert(o.product_id, o.quantity).is_some() {
                return Err(DomainError::validation(format!(
                    "product {} is listed more than once",
                    o.product_id
                )));
            }
        }

        Ok(self
            .items
            .iter()
            .map(|item| ReceiptLine {
                product_id: item.product_id,
                quantity: by_product.get(&item.product_id).copied().unwrap_or(item.quantity),
                unit_price: item.unit_price,
            })
            .collect())
    }

    /// Record the receipt and flip to RECEIVED.
    pub fn mark_received(&mut self, receipt: &[ReceiptLine], by: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.is_open() {
            return Err(DomainError::invalid_state(format!(
                "purchase order {} is already {}",
                self.number, self.status
            )));
        }
        for item in &mut self.items {
            item.received_quantity = receipt
                .iter()
                .find(|r| r.product_id == item.product_id)
                .map(|r| r.quantity)
                .unwrap_or(0);
        }
        self.status = PurchaseOrderStatus::Received;
        self.received_by = Some(by);
        self.received_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}
