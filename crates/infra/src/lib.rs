//! Infrastructure layer: the transactional store and its journals, application
//! services, audit trail, notifications, image uploads and configuration.

pub mod audit;
pub mod config;
pub mod notify;
pub mod services;
pub mod store;
pub mod uploads;
