//! HTTP request handlers.

pub mod health;
pub mod metrics;
pub mod recommend;
