//! Order records

use crate::types::{OrderType, Side, TimeInForce, WorkingType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order identifier, assigned by the exchange or the simulator
pub type OrderId = u64;

/// Identifier shared by the two legs of an OCO pair
pub type OrderListId = u64;

/// Lifecycle status of a single order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Accepted and working (possibly partially filled)
    New,
    /// Completely filled
    Filled,
    /// Cancelled or expired
    Cancelled,
    /// Rejected or failed to place
    Failed,
}

impl OrderStatus {
    /// Terminal orders never change again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::New)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution against an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    /// Execution price
    pub price: Decimal,
    /// Executed quantity
    pub qty: Decimal,
    /// Fee charged
    pub commission: Decimal,
    /// Asset the fee was charged in
    pub commission_asset: String,
}

/// A single exchange order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub client_order_id: Option<String>,
    /// Set for OCO legs
    pub order_list_id: Option<OrderListId>,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    /// Limit price for limit-family orders
    pub price: Option<Decimal>,
    /// Trigger price for conditional orders
    pub stop_price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
    pub working_type: Option<WorkingType>,
    pub reduce_only: bool,
    pub status: OrderStatus,
    pub executed_qty: Decimal,
    pub avg_price: Decimal,
    pub fills: Vec<Fill>,
    pub update_time: DateTime<Utc>,
    /// Produced locally rather than by the exchange
    #[serde(default)]
    pub simulated: bool,
}

impl Order {
    /// Create a NEW order with nothing executed
    pub fn new(
        order_id: OrderId,
        symbol: impl Into<String>,
        side: Side,
        order_type: OrderType,
        quantity: Decimal,
    ) -> Self {
        Self {
            order_id,
            client_order_id: None,
            order_list_id: None,
            symbol: symbol.into(),
            side,
            order_type,
            quantity,
            price: None,
            stop_price: None,
            time_in_force: None,
            working_type: None,
            reduce_only: false,
            status: OrderStatus::New,
            executed_qty: Decimal::ZERO,
            avg_price: Decimal::ZERO,
            fills: vec![],
            update_time: Utc::now(),
            simulated: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Executed value (executed quantity × average price)
    pub fn filled_notional(&self) -> Decimal {
        self.executed_qty * self.avg_price
    }

    /// Sum of fees across fills
    pub fn total_commission(&self) -> Decimal {
        self.fills.iter().map(|f| f.commission).sum()
    }

    /// Mark the order cancelled unless it is already terminal.
    ///
    /// Returns whether the status changed.
    pub fn mark_cancelled(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = OrderStatus::Cancelled;
        self.update_time = Utc::now();
        true
    }
}

/// Status of an OCO order list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListStatus {
    /// Both legs working
    Executing,
    /// The list is finished (one leg executed or both cancelled)
    AllDone,
}

/// Two linked conditional orders sharing one list identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcoOrder {
    pub order_list_id: OrderListId,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub take_profit: Order,
    pub stop_loss: Order,
    pub list_status: ListStatus,
    pub update_time: DateTime<Utc>,
}

impl OcoOrder {
    /// Both legs, take-profit first
    pub fn legs(&self) -> [&Order; 2] {
        [&self.take_profit, &self.stop_loss]
    }
}
