//! HTTP route handlers.

pub mod auth;
pub mod contact;
pub mod courses;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod payments;
