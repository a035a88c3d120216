//! Validation error kinds, bounds and validated parameter sets

use crate::types::Side;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

/// Smallest accepted order quantity
pub const MIN_QUANTITY: Decimal = dec!(0.001);
/// Largest accepted order quantity
pub const MAX_QUANTITY: Decimal = dec!(1000000);
/// Smallest accepted price
pub const MIN_PRICE: Decimal = dec!(0.00001);
/// Largest accepted price
pub const MAX_PRICE: Decimal = dec!(999999);
/// Shortest accepted interval between steps
pub const MIN_INTERVAL_SECS: i64 = 1;
/// Step count bounds for TWAP splits and grid levels
pub const MIN_STEPS: usize = 2;
pub const MAX_STEPS: usize = 100;

/// USD-M perpetual symbols the engine accepts
pub const SUPPORTED_SYMBOLS: [&str; 20] = [
    "ADAUSDT", "APTUSDT", "ARBUSDT", "ATOMUSDT", "AVAXUSDT", "BNBUSDT", "BTCUSDT", "DOGEUSDT",
    "ETHUSDT", "GALAUSDT", "GMXUSDT", "LINKUSDT", "LTCUSDT", "MATICUSDT", "OPUSDT", "PEPEUSDT",
    "RDNTUSDT", "SOLUSDT", "UNIUSDT", "XRPUSDT",
];

/// Input rejected before any side effect
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Symbol '{symbol}' not supported. Available: {available}")]
    InvalidSymbol { symbol: String, available: String },
    #[error("Side must be 'BUY' or 'SELL', got: {0}")]
    InvalidSide(String),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
    #[error("Invalid price: {0}")]
    InvalidPrice(String),
    #[error("Invalid stop price: {0}")]
    InvalidStopLogic(String),
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),
    #[error("Order type '{order_type}' not supported. Valid: {valid}")]
    InvalidOrderType { order_type: String, valid: String },
    #[error("Percentage must be between 0 and 100, got: {0}")]
    InvalidPercentage(Decimal),
    #[error("Invalid OCO prices: {0}")]
    InvalidOcoLogic(String),
    #[error("Invalid strategy parameters: {0}")]
    InvalidStrategy(String),
}

/// Market order parameters after validation
#[derive(Debug, Clone, PartialEq)]
pub struct MarketParams {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
}

/// Limit order parameters after validation
#[derive(Debug, Clone, PartialEq)]
pub struct LimitParams {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
}

/// Stop-limit order parameters after validation
#[derive(Debug, Clone, PartialEq)]
pub struct StopLimitParams {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub stop_price: Decimal,
    pub limit_price: Decimal,
}
