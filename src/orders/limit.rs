//! Limit order handler

use super::handler::{new_client_order_id, HandlerCore};
use super::paper::{simulate_resting, LIMIT_ID_BASE};
use super::{Order, OrderHandler, OrderId, OrderRequest, OrderStatus};
use crate::error::{EngineError, EngineResult};
use crate::gateway::{CancelAck, CreateOrder, SharedGateway};
use crate::types::OrderType;
use crate::validation::{validate_limit_order, LimitParams, ValidationError};
use async_trait::async_trait;

/// Places resting orders at a limit price
pub struct LimitOrderHandler {
    core: HandlerCore,
}

impl LimitOrderHandler {
    pub fn new(gateway: Option<SharedGateway>) -> Self {
        Self {
            core: HandlerCore::new("limit", LIMIT_ID_BASE, gateway),
        }
    }

    fn validate(request: &OrderRequest) -> Result<LimitParams, ValidationError> {
        if request.order_type != OrderType::Limit {
            return Err(ValidationError::InvalidOrderType {
                order_type: request.order_type.to_string(),
                valid: OrderType::Limit.to_string(),
            });
        }
        let price = request.price.ok_or_else(|| {
            ValidationError::InvalidPrice("limit orders require a price".to_string())
        })?;
        validate_limit_order(&request.symbol, &request.side, request.quantity, price)
    }

    pub async fn place_order(&self, request: OrderRequest) -> EngineResult<Order> {
        let params = Self::validate(&request)?;
        let tif = request.effective_time_in_force();

        if self.core.should_simulate(request.test_mode) {
            let mut order = simulate_resting(
                self.core.next_simulated_id(),
                &params.symbol,
                params.side,
                OrderType::Limit,
                params.quantity,
            );
            order.price = Some(params.price);
            order.time_in_force = Some(tif);
            order.reduce_only = request.reduce_only;
            return Ok(self.core.record(order).await);
        }

        let create = CreateOrder::new(params.symbol, params.side, OrderType::Limit)
            .quantity(params.quantity)
            .price(params.price)
            .time_in_force(tif)
            .reduce_only(request.reduce_only)
            .client_order_id(new_client_order_id());
        self.core.dispatch(create).await
    }

    /// Cancel `order_id` and place `replacement` in its place.
    ///
    /// The replacement is validated before anything is cancelled and must be
    /// for the same symbol. Orders that are already filled or failed are not
    /// replaced.
    pub async fn replace_order(
        &self,
        symbol: &str,
        order_id: OrderId,
        replacement: OrderRequest,
    ) -> EngineResult<Order> {
        let params = Self::validate(&replacement)?;
        let original = self.core.status(symbol, order_id).await?;
        if params.symbol != original.symbol {
            return Err(EngineError::InvalidState(format!(
                "replacement symbol {} does not match order {} on {}",
                params.symbol, order_id, original.symbol
            )));
        }

        let ack = self.core.cancel(&original.symbol, order_id).await?;
        if ack.status != OrderStatus::Cancelled {
            return Err(EngineError::InvalidState(format!(
                "order {order_id} is already {}",
                ack.status
            )));
        }

        tracing::info!(order_id, symbol = %original.symbol, "Replacing limit order");
        self.place_order(replacement).await
    }
}

#[async_trait]
impl OrderHandler for LimitOrderHandler {
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
