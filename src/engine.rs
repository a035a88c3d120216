//! Engine wiring
//!
//! Builds every handler and strategy engine around one optional gateway
//! handle. Nothing here is global; tests build as many engines as they need.

use crate::error::{EngineError, EngineResult};
use crate::gateway::{AccountInfo, CancelAck, GatewayError, OrderRef, SharedGateway};
use crate::orders::paper::DEFAULT_COMMISSION_RATE;
use crate::orders::{
    LimitOrderHandler, MarketOrderHandler, OcoOrderHandler, Order, OrderHandler, OrderId,
    StopLimitOrderHandler,
};
use crate::strategy::{GridEngine, StrategyIdGenerator, TwapEngine};
use crate::validation::validate_symbol;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Every order handler and strategy engine sharing one gateway
pub struct Engine {
    gateway: Option<SharedGateway>,
    market: Arc<MarketOrderHandler>,
    limit: Arc<LimitOrderHandler>,
    stop_limit: StopLimitOrderHandler,
    oco: OcoOrderHandler,
    twap: TwapEngine,
    grid: GridEngine,
}

impl Engine {
    /// Engine with the default simulated commission rate
    pub fn new(gateway: Option<SharedGateway>) -> Self {
        Self::with_commission_rate(gateway, DEFAULT_COMMISSION_RATE)
    }

    pub fn with_commission_rate(gateway: Option<SharedGateway>, commission_rate: Decimal) -> Self {
        let market =
            Arc::new(MarketOrderHandler::new(gateway.clone()).with_commission_rate(commission_rate));
        let limit = Arc::new(LimitOrderHandler::new(gateway.clone()));
        let ids = Arc::new(StrategyIdGenerator::new());

        let twap = TwapEngine::new(market.clone(), limit.clone()).with_id_generator(ids.clone());
        let grid = GridEngine::new(limit.clone()).with_id_generator(ids);

        tracing::info!(
            gateway = gateway.is_some(),
            %commission_rate,
            "Order engine initialized"
        );

        Self {
            stop_limit: StopLimitOrderHandler::new(gateway.clone()),
            oco: OcoOrderHandler::new(gateway.clone()),
            gateway,
            market,
            limit,
            twap,
            grid,
        }
    }

    pub fn gateway(&self) -> Option<&SharedGateway> {
        self.gateway.as_ref()
    }

    pub fn market(&self) -> &MarketOrderHandler {
        &self.market
    }

    pub fn limit(&self) -> &LimitOrderHandler {
        &self.limit
    }

    pub fn stop_limit(&self) -> &StopLimitOrderHandler {
        &self.stop_limit
    }

    pub fn oco(&self) -> &OcoOrderHandler {
        &self.oco
    }

    pub fn twap(&self) -> &TwapEngine {
        &self.twap
    }

    pub fn grid(&self) -> &GridEngine {
        &self.grid
    }

    /// Look an order up across every handler's history, then the gateway.
    ///
    /// The gateway is consulted once, and only when no history knows the id.
    pub async fn find_order(&self, symbol: &str, order_id: OrderId) -> EngineResult<Order> {
        let symbol = validate_symbol(symbol)?;

        let histories = [
            self.market.history().await,
            self.limit.history().await,
            self.stop_limit.history().await,
        ];
        if let Some(order) = histories
            .into_iter()
            .flatten()
            .find(|o| o.order_id == order_id)
        {
            return Ok(order);
        }

        match self.gateway.as_ref() {
            Some(gateway) => Ok(gateway.get_order(&symbol, OrderRef::Id(order_id)).await?),
            None => Err(EngineError::not_found("order", order_id)),
        }
    }

    /// Cancel through whichever handler placed the order.
    ///
    /// Orders this engine never saw go straight to the gateway.
    pub async fn cancel_order(&self, symbol: &str, order_id: OrderId) -> EngineResult<CancelAck> {
        let owns = |orders: Vec<Order>| orders.iter().any(|o| o.order_id == order_id);

        if owns(self.market.history().await) {
            self.market.cancel(symbol, order_id).await
        } else if owns(self.stop_limit.history().await) {
            self.stop_limit.cancel_order(symbol, order_id).await
        } else if self.gateway.is_some() || owns(self.limit.history().await) {
            self.limit.cancel(symbol, order_id).await
        } else {
            validate_symbol(symbol)?;
            Err(EngineError::not_found("order", order_id))
        }
    }

    /// Working orders: from the exchange when connected, otherwise local history
    pub async fn open_orders(&self, symbol: Option<&str>) -> EngineResult<Vec<Order>> {
        let symbol = symbol.map(validate_symbol).transpose()?;

        if let Some(gateway) = self.gateway.as_ref() {
            return Ok(gateway.list_open_orders(symbol.as_deref()).await?);
        }

        let symbol = symbol.as_deref();
        let mut orders = self.market.open_orders(symbol).await?;
        orders.extend(self.limit.open_orders(symbol).await?);
        orders.extend(self.stop_limit.open_orders(symbol).await?);
        for oco in self.oco.history().await {
            orders.extend(
                oco.legs()
                    .into_iter()
                    .filter(|leg| !leg.is_terminal() && symbol.map_or(true, |s| leg.symbol == s))
                    .cloned(),
            );
        }
        Ok(orders)
    }

    pub async fn account(&self) -> EngineResult<AccountInfo> {
        let gateway = self.gateway.as_ref().ok_or(GatewayError::NotConfigured)?;
        Ok(gateway.get_account().await?)
    }

    /// Stop all running strategies
    pub async fn shutdown(&self) {
        self.twap.shutdown().await;
    }
}
