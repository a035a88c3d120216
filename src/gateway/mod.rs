//! Exchange gateway
//!
//! The remote order service the engine dispatches to. Handlers hold an
//! optional shared gateway and fall back to local simulation without one.

mod binance;
mod memory;
mod types;

pub use binance::{BinanceConfig, BinanceGateway, BINANCE_FUTURES_URL, BINANCE_TESTNET_URL};
pub use memory::InMemoryGateway;
pub use types::{
    AccountInfo, AssetBalance, CancelAck, CreateOrder, GatewayError, OrderRef, PositionInfo,
};

use crate::orders::Order;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for exchange gateway implementations
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Create an order
    async fn create_order(&self, request: CreateOrder) -> Result<Order, GatewayError>;
    /// Cancel an order
    async fn cancel_order(&self, symbol: &str, target: OrderRef)
        -> Result<CancelAck, GatewayError>;
    /// Query an order
    async fn get_order(&self, symbol: &str, target: OrderRef) -> Result<Order, GatewayError>;
    /// List working orders, optionally for one symbol
    async fn list_open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>, GatewayError>;
    /// Fetch balances and positions
    async fn get_account(&self) -> Result<AccountInfo, GatewayError>;
}

/// Gateway handle shared by every handler
pub type SharedGateway = Arc<dyn ExchangeGateway>;
