//! Order handlers
//!
//! Market and limit handlers implement [`OrderHandler`], the capability the
//! strategy engines place their child orders through. Stop-limit and OCO
//! handlers expose their own request types.

mod handler;
mod limit;
mod market;
mod oco;
pub mod paper;
mod request;
mod stop_limit;
mod types;

pub use handler::new_client_order_id;
pub use limit::LimitOrderHandler;
pub use market::MarketOrderHandler;
pub use oco::{OcoOrderHandler, OcoRequest};
pub use request::OrderRequest;
pub use stop_limit::{StopLimitOrderHandler, StopLimitRequest};
pub use types::{Fill, ListStatus, OcoOrder, Order, OrderId, OrderListId, OrderStatus};

use crate::error::EngineResult;
use crate::gateway::CancelAck;
use async_trait::async_trait;

/// Trait for handlers that place single orders
#[async_trait]
pub trait OrderHandler: Send + Sync {
    /// Short handler name used in logs and metrics
    fn name(&self) -> &'static str;
    /// Validate and place an order
    async fn place(&self, request: OrderRequest) -> EngineResult<Order>;
    /// Cancel an order
    async fn cancel(&self, symbol: &str, order_id: OrderId) -> EngineResult<CancelAck>;
    /// Look up an order
    async fn status(&self, symbol: &str, order_id: OrderId) -> EngineResult<Order>;
    /// Re-read a working order from the exchange and update history
    async fn refresh(&self, symbol: &str, order_id: OrderId) -> EngineResult<Order>;
    /// Every order this handler has recorded
    async fn history(&self) -> Vec<Order>;
    /// Recorded orders still working
    async fn open_orders(&self, symbol: Option<&str>) -> EngineResult<Vec<Order>>;
}
