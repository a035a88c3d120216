//! order-engine: order execution for USD-M perpetual futures
//!
//! This library provides the core components for:
//! - Validation of symbols, sides, quantities, prices and strategy bounds
//! - Market, limit, stop-limit and OCO order handlers
//! - TWAP and grid strategy engines with per-strategy cancellation
//! - In-memory order and strategy history
//! - A signed Binance futures REST gateway, with local simulation when absent

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod history;
pub mod orders;
pub mod strategy;
pub mod telemetry;
pub mod types;
pub mod validation;
