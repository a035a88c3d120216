//! Order validation
//!
//! Pure checks every order passes before any side effect: symbol, side,
//! quantity, price, stop direction, interval and strategy bounds.

mod rules;
mod types;

pub use rules::{
    parse_interval, parse_price, parse_quantity, validate_grid_type, validate_interval,
    validate_limit_order, validate_market_order, validate_oco_prices, validate_order_type,
    validate_percentage, validate_price, validate_price_range, validate_quantity, validate_side,
    validate_step_count, validate_stop_limit_order, validate_stop_price, validate_symbol,
};
pub use types::{
    LimitParams, MarketParams, StopLimitParams, ValidationError, MAX_PRICE, MAX_QUANTITY,
    MAX_STEPS, MIN_INTERVAL_SECS, MIN_PRICE, MIN_QUANTITY, MIN_STEPS, SUPPORTED_SYMBOLS,
};
