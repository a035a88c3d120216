//! Stop-limit order handler

use super::handler::{new_client_order_id, HandlerCore};
use super::paper::{simulate_resting, STOP_LIMIT_ID_BASE};
use super::{Order, OrderId};
use crate::error::EngineResult;
use crate::gateway::{CancelAck, CreateOrder, SharedGateway};
use crate::types::{OrderType, TimeInForce, WorkingType};
use crate::validation::validate_stop_limit_order;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A limit order armed once `stop_price` trades
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopLimitRequest {
    pub symbol: String,
    pub side: String,
    pub quantity: Decimal,
    /// Trigger price
    pub stop_price: Decimal,
    /// Execution price once triggered
    pub limit_price: Decimal,
    /// Price feed the trigger watches
    pub working_type: WorkingType,
    pub time_in_force: TimeInForce,
    pub reduce_only: bool,
    pub test_mode: bool,
}

impl StopLimitRequest {
    pub fn new(
        symbol: impl Into<String>,
        side: impl Into<String>,
        quantity: Decimal,
        stop_price: Decimal,
        limit_price: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side: side.into(),
            quantity,
            stop_price,
            limit_price,
            working_type: WorkingType::default(),
            time_in_force: TimeInForce::default(),
            reduce_only: false,
            test_mode: false,
        }
    }

    pub fn working_type(mut self, working_type: WorkingType) -> Self {
        self.working_type = working_type;
        self
    }

    pub fn time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = tif;
        self
    }

    pub fn reduce_only(mut self, reduce_only: bool) -> Self {
        self.reduce_only = reduce_only;
        self
    }

    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }
}

/// Places conditional stop-limit orders
pub struct StopLimitOrderHandler {
    core: HandlerCore,
}

impl StopLimitOrderHandler {
    pub fn new(gateway: Option<SharedGateway>) -> Self {
        Self {
            core: HandlerCore::new("stop_limit", STOP_LIMIT_ID_BASE, gateway),
        }
    }

    pub async fn place_order(&self, request: StopLimitRequest) -> EngineResult<Order> {
        let params = validate_stop_limit_order(
            &request.symbol,
            &request.side,
            request.quantity,
            request.stop_price,
            request.limit_price,
        )?;

        if self.core.should_simulate(request.test_mode) {
            let mut order = simulate_resting(
                self.core.next_simulated_id(),
                &params.symbol,
                params.side,
                OrderType::StopLimit,
                params.quantity,
            );
            order.price = Some(params.limit_price);
            order.stop_price = Some(params.stop_price);
            order.time_in_force = Some(request.time_in_force);
            order.working_type = Some(request.working_type);
            order.reduce_only = request.reduce_only;
            return Ok(self.core.record(order).await);
        }

        let create = CreateOrder::new(params.symbol, params.side, OrderType::StopLimit)
            .quantity(params.quantity)
            .price(params.limit_price)
            .stop_price(params.stop_price)
            .time_in_force(request.time_in_force)
            .working_type(request.working_type)
            .reduce_only(request.reduce_only)
            .client_order_id(new_client_order_id());
        self.core.dispatch(create).await
    }

    pub async fn cancel_order(&self, symbol: &str, order_id: OrderId) -> EngineResult<CancelAck> {
        self.core.cancel(symbol, order_id).await
    }

    pub async fn get_order_status(&self, symbol: &str, order_id: OrderId) -> EngineResult<Order> {
        self.core.status(symbol, order_id).await
    }

    pub async fn open_orders(&self, symbol: Option<&str>) -> EngineResult<Vec<Order>> {
        self.core.open_orders(symbol).await
    }

    pub async fn history(&self) -> Vec<Order> {
        self.core.history().all().await
    }
}
