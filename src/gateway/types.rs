//! Gateway request, acknowledgement and account types

use crate::orders::{OrderId, OrderListId, OrderStatus};
use crate::types::{OrderType, Side, TimeInForce, WorkingType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Remote call failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// No gateway is configured for a call that needs one
    #[error("Gateway not configured")]
    NotConfigured,
    /// Network or connection failure
    #[error("Transport error: {0}")]
    Transport(String),
    /// The exchange answered with an error
    #[error("Exchange rejected request ({status}): {message}")]
    Rejected {
        status: u16,
        code: Option<i64>,
        message: String,
    },
    /// The response could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),
    /// Request signing failed
    #[error("Signing failed: {0}")]
    Signing(String),
    /// The request is missing something the exchange requires
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// How an order is addressed on cancel/query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderRef {
    /// Exchange-assigned identifier
    Id(OrderId),
    /// Caller-assigned identifier
    ClientId(String),
}

impl From<OrderId> for OrderRef {
    fn from(id: OrderId) -> Self {
        OrderRef::Id(id)
    }
}

/// Parameters for a new order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
    pub working_type: Option<WorkingType>,
    pub reduce_only: bool,
    pub client_order_id: Option<String>,
}

impl CreateOrder {
    pub fn new(symbol: impl Into<String>, side: Side, order_type: OrderType) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type,
            quantity: None,
            price: None,
            stop_price: None,
            time_in_force: None,
            working_type: None,
            reduce_only: false,
            client_order_id: None,
        }
    }

    pub fn quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    pub fn stop_price(mut self, stop_price: Decimal) -> Self {
        self.stop_price = Some(stop_price);
        self
    }

    pub fn time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = Some(tif);
        self
    }

    pub fn working_type(mut self, working_type: WorkingType) -> Self {
        self.working_type = Some(working_type);
        self
    }

    pub fn reduce_only(mut self, reduce_only: bool) -> Self {
        self.reduce_only = reduce_only;
        self
    }

    pub fn client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }
}

/// Acknowledgement of a cancel request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelAck {
    pub symbol: String,
    pub order_id: Option<OrderId>,
    pub order_list_id: Option<OrderListId>,
    pub status: OrderStatus,
    /// Set when no exchange call was made
    pub note: Option<String>,
}

impl CancelAck {
    /// Acknowledgement produced without a gateway
    pub fn simulated(symbol: impl Into<String>, order_id: Option<OrderId>) -> Self {
        Self {
            symbol: symbol.into(),
            order_id,
            order_list_id: None,
            status: OrderStatus::Cancelled,
            note: Some("Simulated cancellation".to_string()),
        }
    }
}

/// Balance of one margin asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetBalance {
    pub asset: String,
    pub wallet_balance: Decimal,
    pub available_balance: Decimal,
}

/// One open position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionInfo {
    pub symbol: String,
    pub position_amt: Decimal,
    pub entry_price: Decimal,
    pub unrealized_profit: Decimal,
}

/// Futures account snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub total_wallet_balance: Decimal,
    pub available_balance: Decimal,
    pub total_unrealized_profit: Decimal,
    pub assets: Vec<AssetBalance>,
    pub positions: Vec<PositionInfo>,
}
