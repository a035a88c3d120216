//! Market order handler

use super::handler::{new_client_order_id, HandlerCore};
use super::paper::{simulate_market_fill, DEFAULT_COMMISSION_RATE, MARKET_ID_BASE};
use super::{Order, OrderHandler, OrderId, OrderRequest};
use crate::error::EngineResult;
use crate::gateway::{CancelAck, CreateOrder, SharedGateway};
use crate::types::OrderType;
use crate::validation::{validate_market_order, ValidationError};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Places orders that execute immediately at market
pub struct MarketOrderHandler {
    core: HandlerCore,
    commission_rate: Decimal,
}

impl MarketOrderHandler {
    pub fn new(gateway: Option<SharedGateway>) -> Self {
        Self {
            core: HandlerCore::new("market", MARKET_ID_BASE, gateway),
            commission_rate: DEFAULT_COMMISSION_RATE,
        }
    }

    /// Fee rate applied to simulated fills
    pub fn with_commission_rate(mut self, rate: Decimal) -> Self {
        self.commission_rate = rate;
        self
    }

    pub async fn place_order(&self, request: OrderRequest) -> EngineResult<Order> {
        if request.order_type != OrderType::Market {
            return Err(ValidationError::InvalidOrderType {
                order_type: request.order_type.to_string(),
                valid: OrderType::Market.to_string(),
            }
            .into());
        }
        let params = validate_market_order(&request.symbol, &request.side, request.quantity)?;

        if self.core.should_simulate(request.test_mode) {
            let order = simulate_market_fill(
                self.core.next_simulated_id(),
                &params.symbol,
                params.side,
                params.quantity,
                self.commission_rate,
            );
            return Ok(self.core.record(order).await);
        }

        let create = CreateOrder::new(params.symbol, params.side, OrderType::Market)
            .quantity(params.quantity)
            .reduce_only(request.reduce_only)
            .client_order_id(new_client_order_id());
        self.core.dispatch(create).await
    }
}

#[async_trait]
impl OrderHandler for MarketOrderHandler {
    fn name(&self) -> &'static str {
        self.core.name()
    }

    async fn place(&self, request: OrderRequest) -> EngineResult<Order> {
        self.place_order(request).await
    }

    async fn cancel(&self, symbol: &str, order_id: OrderId) -> EngineResult<CancelAck> {
        self.core.cancel(symbol, order_id).await
    }

    async fn status(&self, symbol: &str, order_id: OrderId) -> EngineResult<Order> {
        self.core.status(symbol, order_id).await
    }

    async fn refresh(&self, symbol: &str, order_id: OrderId) -> EngineResult<Order> {
        self.core.refresh(symbol, order_id).await
    }

    async fn history(&self) -> Vec<Order> {
        self.core.history().all().await
    }

    async fn open_orders(&self, symbol: Option<&str>) -> EngineResult<Vec<Order>> {
        self.core.open_orders(symbol).await
    }
}
