//! Application services: the only place that reads and writes the store.
//!
//! Every mutating operation runs as one [`Store::write`], so the domain change, its
//! stock movements, price history and audit row commit together or not at all.
//! Notifications are fanned out only after the write has committed.

mod audit;
mod catalog;
mod notifications;
mod projects;
mod purchasing;
mod reports;
mod sales;
mod stock;
mod suppliers;
mod users;

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tokio::sync::broadcast;

use kopontren_auth::{AuthzError, Hs256Jwt, PasswordError, TokenError};
use kopontren_core::{DomainError, numbering};

use crate::notify::{Notice, Notifier, RealtimeMessage, spawn_notify};
use crate::store::{Record, Store, StoreError, Tx};
use crate::uploads::{ImageStore, UploadError};

pub use catalog::{CategoryView, ProductFilter};
pub use notifications::NotificationFilter;
pub use projects::{MaterialRequest, ProjectDetail, ProjectFilter, UsageRequest};
pub use purchasing::{CreatePurchaseOrder, PoLine, PurchaseOrderFilter, UpdatePurchaseOrder};
pub use sales::{CartLine, CheckoutRequest, TransactionFilter};
pub use stock::MovementFilter;
pub use suppliers::SupplierFilter;
pub use users::{LoginResult, UserView};

/// Authentication and authorization failures.
#[derive(Debug, Error)]
pub enum AuthFailure {
    /// Wrong username, wrong password, or inactive account. Deliberately indistinguishable.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthFailure),

    #[error("file storage failure: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AuthzError> for ServiceError {
    fn from(value: AuthzError) -> Self {
        ServiceError::Auth(value.into())
    }
}

impl From<TokenError> for ServiceError {
    fn from(value: TokenError) -> Self {
        ServiceError::Auth(value.into())
    }
}

impl From<PasswordError> for ServiceError {
    fn from(value: PasswordError) -> Self {
        match value {
            PasswordError::TooShort => ServiceError::Domain(DomainError::validation(value.to_string())),
            PasswordError::Hash(msg) => ServiceError::Auth(AuthFailure::Hashing(msg)),
        }
    }
}

impl From<UploadError> for ServiceError {
    fn from(value: UploadError) -> Self {
        match value {
            UploadError::Invalid(msg) => ServiceError::Domain(DomainError::Validation(msg)),
            UploadError::NotFound => ServiceError::Domain(DomainError::not_found("file")),
            UploadError::Io(err) => ServiceError::Io(err),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    /// Notify admins when a sale or project usage drops a product to its minimum.
    pub low_stock_notify: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            low_stock_notify: true,
        }
    }
}

/// Handle to every application service. Cheap to clone.
#[derive(Clone)]
pub struct Services {
    store: Store,
    jwt: Arc<Hs256Jwt>,
    notifier: Arc<dyn Notifier>,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
    images: ImageStore,
    settings: ServiceSettings,
}

impl Services {
    pub fn new(
        store: Store,
        jwt: Arc<Hs256Jwt>,
        notifier: Arc<dyn Notifier>,
        realtime_tx: broadcast::Sender<RealtimeMessage>,
        images: ImageStore,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            jwt,
            notifier,
            realtime_tx,
            images,
            settings,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn jwt(&self) -> &Arc<Hs256Jwt> {
        &self.jwt
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    /// Subscribe to realtime messages (SSE).
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeMessage> {
        self.realtime_tx.subscribe()
    }

    /// Hand `notice` to the notifier on a background task.
    fn notify(&self, notice: Notice) {
        spawn_notify(self.notifier.clone(), notice);
    }
}

/// Clone a row out of the running write, or fail with `NotFound(what)`.
fn require<R: Record>(tx: &Tx, id: R::Id, what: &'static str) -> Result<R, DomainError> {
    tx.get::<R>(id).cloned().ok_or(DomainError::not_found(what))
}

/// Next free `PREFIX-YYYYMMDD-NNNN` number.
fn next_number<'a>(prefix: &str, date: NaiveDate, existing: impl IntoIterator<Item = &'a str>) -> String {
    numbering::document_number(prefix, date, numbering::next_sequence(prefix, date, existing))
}
