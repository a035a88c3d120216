//! Raw order input accepted by the immediate handlers

use crate::types::{OrderType, TimeInForce};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order parameters as supplied by a caller, before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: String,
    pub order_type: OrderType,
    pub quantity: Decimal,
    /// Required for limit orders
    pub price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    /// Maker-only; sent as GTX
    pub post_only: bool,
    pub reduce_only: bool,
    /// Simulate locally even when a gateway is configured
    pub test_mode: bool,
}

impl OrderRequest {
    pub fn market(symbol: impl Into<String>, side: impl Into<String>, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side: side.into(),
            order_type: OrderType::Market,
            quantity,
            price: None,
            time_in_force: TimeInForce::Gtc,
            post_only: false,
            reduce_only: false,
            test_mode: false,
        }
    }

    pub fn limit(
        symbol: impl Into<String>,
        side: impl Into<String>,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            order_type: OrderType::Limit,
            price: Some(price),
            ..Self::market(symbol, side, quantity)
        }
    }

    pub fn time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = tif;
        self
    }

    pub fn post_only(mut self, post_only: bool) -> Self {
        self.post_only = post_only;
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

    /// Time-in-force actually sent to the exchange
    pub fn effective_time_in_force(&self) -> TimeInForce {
        if self.post_only {
            TimeInForce::Gtx
        } else {
            self.time_in_force
        }
    }
}
