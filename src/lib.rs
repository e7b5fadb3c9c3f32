//! EcrasPay payment gateway SDK and its payment-recording service.
//!
//! [`payments`] is the standalone SDK. [`database`], [`services`] and [`api`]
//! layer local payment records and an HTTP surface on top of it.

pub mod api;
pub mod config;
pub mod database;
pub mod payments;
pub mod services;

pub use payments::{EcrasPay, GatewayConfig, GatewayError, GatewayResult};
