//! Request DTOs and query-string mapping that only the HTTP layer needs.
//!
//! Bodies that map one-to-one onto a service input (`NewProduct`, `SupplierInput`,
//! `CheckoutRequest`, ...) are deserialized straight into the service type instead.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use kopontren_auth::Role;
use kopontren_core::PageRequest;
use kopontren_projects::ProjectStatus;
use kopontren_purchasing::ReceiveOverride;
use kopontren_reporting::{DateRange, TopBy};

use crate::app::errors::ApiError;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl From<PageQuery> for PageRequest {
    fn from(q: PageQuery) -> Self {
        PageRequest::new(q.page, q.limit)
    }
}

/// `?start=YYYY-MM-DD&end=YYYY-MM-DD`; missing bounds default to month-to-date.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RangeQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl RangeQuery {
    pub fn resolve(self) -> Result<DateRange, ApiError> {
        let today = Utc::now().date_naive();
        let default = DateRange::month_to_date(today);
        let start = self.start.unwrap_or(default.start);
        let end = self.end.unwrap_or(today.max(start));
        Ok(DateRange::new(start, end)?)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TopQuery {
    #[serde(default)]
    pub by: TopBy,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct BarcodeQuery {
    /// Assign an in-store barcode when the product has none.
    #[serde(default)]
    pub generate_barcode: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReceiveRequest {
    #[serde(default)]
    pub items: Vec<ReceiveOverride>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReasonRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PayRequest {
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ProjectStatus,
}

#[derive(Debug, Deserialize)]
pub struct MaterialEstimateRequest {
    pub estimated_quantity: i64,
    pub estimated_unit_price: i64,
}
