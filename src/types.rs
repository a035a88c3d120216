//! Primitive enums shared by validation, orders and strategies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Exchange wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exchange order type of a single order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Immediate execution at market
    Market,
    /// Resting order at a limit price
    Limit,
    /// Limit order armed by a stop trigger
    StopLimit,
    /// Take-profit leg of an OCO pair
    TakeProfit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
            OrderType::StopLimit => "STOP_LIMIT",
            OrderType::TakeProfit => "TAKE_PROFIT",
        };
        f.write_str(s)
    }
}

/// Order-type family accepted at the engine boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    Market,
    Limit,
    StopLimit,
    Oco,
    Twap,
    Grid,
}

impl OrderKind {
    pub const ALL: [OrderKind; 6] = [
        OrderKind::Market,
        OrderKind::Limit,
        OrderKind::StopLimit,
        OrderKind::Oco,
        OrderKind::Twap,
        OrderKind::Grid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Market => "MARKET",
            OrderKind::Limit => "LIMIT",
            OrderKind::StopLimit => "STOP_LIMIT",
            OrderKind::Oco => "OCO",
            OrderKind::Twap => "TWAP",
            OrderKind::Grid => "GRID",
        }
    }
}

/// How long a limit order stays working
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Good-til-cancelled
    #[default]
    Gtc,
    /// Immediate-or-cancel
    Ioc,
    /// Fill-or-kill
    Fok,
    /// Good-til-crossing (post-only)
    Gtx,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::Gtc => "GTC",
            TimeInForce::Ioc => "IOC",
            TimeInForce::Fok => "FOK",
            TimeInForce::Gtx => "GTX",
        }
    }
}

impl FromStr for TimeInForce {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GTC" => Ok(TimeInForce::Gtc),
            "IOC" => Ok(TimeInForce::Ioc),
            "FOK" => Ok(TimeInForce::Fok),
            "GTX" => Ok(TimeInForce::Gtx),
            other => Err(format!("Time in force must be GTC, IOC, FOK or GTX, got: {other}")),
        }
    }
}

/// Price feed that evaluates a stop trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkingType {
    /// Last traded contract price
    #[default]
    ContractPrice,
    /// Mark price
    MarkPrice,
}

impl WorkingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkingType::ContractPrice => "CONTRACT_PRICE",
            WorkingType::MarkPrice => "MARK_PRICE",
        }
    }
}

impl FromStr for WorkingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "CONTRACT_PRICE" => Ok(WorkingType::ContractPrice),
            "MARK_PRICE" => Ok(WorkingType::MarkPrice),
            other => Err(format!(
                "Working type must be CONTRACT_PRICE or MARK_PRICE, got: {other}"
            )),
        }
    }
}

/// Direction of a grid ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GridType {
    /// Buy at every level
    Long,
    /// Sell at every level
    Short,
}

impl GridType {
    /// Side used for every level of the ladder
    pub fn level_side(&self) -> Side {
        match self {
            GridType::Long => Side::Buy,
            GridType::Short => Side::Sell,
        }
    }
}

impl fmt::Display for GridType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridType::Long => f.write_str("LONG"),
            GridType::Short => f.write_str("SHORT"),
        }
    }
}
