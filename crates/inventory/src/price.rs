use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kopontren_core::{Entity, UserId, entity_id};
use kopontren_products::{PriceChange, ProductId};

entity_id! {
    /// Price history row identifier.
    pub struct PriceHistoryId; "price history id"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceSource {
    Manual,
    PurchaseOrder,
}

/// Append-only record of a buy/sell price change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub id: PriceHistoryId,
    pub product_id: ProductId,
    pub old_buy_price: i64,
    pub new_buy_price: i64,
    pub old_sell_price: i64,
    pub new_sell_price: i64,
    pub source: PriceSource,
    pub reference_id: Option<Uuid>,
    pub changed_by: UserId,
    pub changed_at: DateTime<Utc>,
}

impl Entity for PriceHistory {
    type Id = PriceHistoryId;

    fn id(&self) -> PriceHistoryId {
        self.id
    }
}

impl PriceHistory {
    pub fn record(
        product_id: ProductId,
        change: PriceChange,
        source: PriceSource,
        reference_id: Option<Uuid>,
        changed_by: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PriceHistoryId::new(),
            product_id,
            old_buy_price: change.old_buy_price,
            new_buy_price: change.new_buy_price,
            old_sell_price: change.old_sell_price,
            new_sell_price: change.new_sell_price,
            source,
            reference_id,
            changed_by,
            changed_at: now,
        }
    }

    pub fn buy_price_changed(&self) -> bool {
        self.old_buy_price != self.new_buy_price
    }
}
