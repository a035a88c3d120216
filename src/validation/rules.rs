//! Pure validation rules

use super::types::*;
use crate::types::{GridType, OrderKind, Side};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Validate and upper-case a trading symbol
pub fn validate_symbol(symbol: &str) -> Result<String, ValidationError> {
    let normalized = symbol.trim().to_uppercase();

    if normalized.is_empty() || !SUPPORTED_SYMBOLS.contains(&normalized.as_str()) {
        return Err(ValidationError::InvalidSymbol {
            symbol: normalized,
            available: SUPPORTED_SYMBOLS.join(", "),
        });
    }

    tracing::debug!(symbol = %normalized, "Symbol validation passed");
    Ok(normalized)
}

/// Validate an order side, case-insensitive
pub fn validate_side(side: &str) -> Result<Side, ValidationError> {
    let normalized = side.trim().to_uppercase();
    let parsed = match normalized.as_str() {
        "BUY" => Side::Buy,
        "SELL" => Side::Sell,
        _ => return Err(ValidationError::InvalidSide(normalized)),
    };

    tracing::debug!(side = %parsed, "Side validation passed");
    Ok(parsed)
}

/// Validate a quantity against `[MIN_QUANTITY, MAX_QUANTITY]`
pub fn validate_quantity(quantity: Decimal) -> Result<Decimal, ValidationError> {
    if quantity <= Decimal::ZERO {
        return Err(ValidationError::InvalidQuantity(format!(
            "must be positive, got: {quantity}"
        )));
    }
    if quantity < MIN_QUANTITY {
        return Err(ValidationError::InvalidQuantity(format!(
            "{quantity} below minimum {MIN_QUANTITY}"
        )));
    }
    if quantity > MAX_QUANTITY {
        return Err(ValidationError::InvalidQuantity(format!(
            "{quantity} exceeds maximum {MAX_QUANTITY}"
        )));
    }

    tracing::debug!(%quantity, "Quantity validation passed");
    Ok(quantity)
}

/// Validate a price against `[MIN_PRICE, MAX_PRICE]`
pub fn validate_price(price: Decimal) -> Result<Decimal, ValidationError> {
    if price <= Decimal::ZERO {
        return Err(ValidationError::InvalidPrice(format!(
            "must be positive, got: {price}"
        )));
    }
    if price < MIN_PRICE {
        return Err(ValidationError::InvalidPrice(format!(
            "{price} below minimum {MIN_PRICE}"
        )));
    }
    if price > MAX_PRICE {
        return Err(ValidationError::InvalidPrice(format!(
            "{price} exceeds maximum {MAX_PRICE}"
        )));
    }

    tracing::debug!(%price, "Price validation passed");
    Ok(price)
}

/// Validate the stop trigger against the entry price.
///
/// A SELL stop must sit above entry and a BUY stop strictly below it.
pub fn validate_stop_price(
    stop_price: Decimal,
    entry_price: Decimal,
    side: Side,
) -> Result<Decimal, ValidationError> {
    match side {
        Side::Sell if stop_price <= entry_price => {
            return Err(ValidationError::InvalidStopLogic(format!(
                "for SELL orders, stop price ({stop_price}) must be > entry price ({entry_price})"
            )));
        }
        Side::Buy if stop_price >= entry_price => {
            return Err(ValidationError::InvalidStopLogic(format!(
                "for BUY orders, stop price ({stop_price}) must be < entry price ({entry_price})"
            )));
        }
        _ => {}
    }

    tracing::debug!(%stop_price, "Stop price validation passed");
    Ok(stop_price)
}

/// Validate take-profit/stop-loss ordering for an OCO pair
pub fn validate_oco_prices(
    side: Side,
    take_profit: Decimal,
    stop_loss: Decimal,
) -> Result<(), ValidationError> {
    match side {
        Side::Buy if take_profit <= stop_loss => Err(ValidationError::InvalidOcoLogic(format!(
            "for BUY: take-profit ({take_profit}) must be > stop-loss ({stop_loss})"
        ))),
        Side::Sell if take_profit >= stop_loss => Err(ValidationError::InvalidOcoLogic(format!(
            "for SELL: take-profit ({take_profit}) must be < stop-loss ({stop_loss})"
        ))),
        _ => Ok(()),
    }
}

/// Validate a pacing interval in whole seconds
pub fn validate_interval(interval_secs: i64) -> Result<u64, ValidationError> {
    if interval_secs < MIN_INTERVAL_SECS {
        return Err(ValidationError::InvalidInterval(format!(
            "minimum is {MIN_INTERVAL_SECS} second, got: {interval_secs}"
        )));
    }

    tracing::debug!(interval_secs, "Interval validation passed");
    Ok(interval_secs as u64)
}

/// Validate an order-type name
pub fn validate_order_type(order_type: &str) -> Result<OrderKind, ValidationError> {
    let normalized = order_type.trim().to_uppercase();

    OrderKind::ALL
        .into_iter()
        .find(|kind| kind.as_str() == normalized)
        .ok_or_else(|| ValidationError::InvalidOrderType {
            order_type: normalized,
            valid: OrderKind::ALL.map(|k| k.as_str()).join(", "),
        })
}

/// Validate a grid direction, case-insensitive
pub fn validate_grid_type(grid_type: &str) -> Result<GridType, ValidationError> {
    match grid_type.trim().to_uppercase().as_str() {
        "LONG" => Ok(GridType::Long),
        "SHORT" => Ok(GridType::Short),
        other => Err(ValidationError::InvalidStrategy(format!(
            "grid type must be 'LONG' or 'SHORT', got: {other}"
        ))),
    }
}

/// Validate a percentage in `(0, 100]`
pub fn validate_percentage(percentage: Decimal) -> Result<Decimal, ValidationError> {
    if percentage <= Decimal::ZERO || percentage > Decimal::ONE_HUNDRED {
        return Err(ValidationError::InvalidPercentage(percentage));
    }
    Ok(percentage)
}

/// Validate the number of TWAP splits or grid levels
pub fn validate_step_count(count: usize, what: &str) -> Result<usize, ValidationError> {
    if count < MIN_STEPS {
        return Err(ValidationError::InvalidStrategy(format!(
            "number of {what} must be at least {MIN_STEPS}, got: {count}"
        )));
    }
    if count > MAX_STEPS {
        return Err(ValidationError::InvalidStrategy(format!(
            "number of {what} cannot exceed {MAX_STEPS}, got: {count}"
        )));
    }
    Ok(count)
}

/// Validate a grid range; both bounds must be valid prices with `lower < upper`
pub fn validate_price_range(
    lower: Decimal,
    upper: Decimal,
) -> Result<(Decimal, Decimal), ValidationError> {
    let lower = validate_price(lower)?;
    let upper = validate_price(upper)?;
    if lower >= upper {
        return Err(ValidationError::InvalidStrategy(format!(
            "lower price ({lower}) must be < upper price ({upper})"
        )));
    }
    Ok((lower, upper))
}

/// Parse and validate a quantity given as text
pub fn parse_quantity(raw: &str) -> Result<Decimal, ValidationError> {
    let quantity = Decimal::from_str(raw.trim()).map_err(|_| {
        ValidationError::InvalidQuantity(format!("must be a number, got: {raw}"))
    })?;
    validate_quantity(quantity)
}

/// Parse and validate a price given as text
pub fn parse_price(raw: &str) -> Result<Decimal, ValidationError> {
    let price = Decimal::from_str(raw.trim())
        .map_err(|_| ValidationError::InvalidPrice(format!("must be a number, got: {raw}")))?;
    validate_price(price)
}

/// Parse and validate an interval given as text
pub fn parse_interval(raw: &str) -> Result<u64, ValidationError> {
    let interval = raw.trim().parse::<i64>().map_err(|_| {
        ValidationError::InvalidInterval(format!("must be an integer, got: {raw}"))
    })?;
    validate_interval(interval)
}

fn log_rejection(kind: &str, input: &str, err: &ValidationError) {
    tracing::warn!(order_kind = kind, input, error = %err, "Validation rejected order");
}

/// Validate market order parameters
pub fn validate_market_order(
    symbol: &str,
    side: &str,
    quantity: Decimal,
) -> Result<MarketParams, ValidationError> {
    let validated = (|| -> Result<MarketParams, ValidationError> {
        Ok(MarketParams {
            symbol: validate_symbol(symbol)?,
            side: validate_side(side)?,
            quantity: validate_quantity(quantity)?,
        })
    })();

    validated.inspect_err(|e| log_rejection("MARKET", &format!("{symbol} {side} {quantity}"), e))
}

/// Validate limit order parameters
pub fn validate_limit_order(
    symbol: &str,
    side: &str,
    quantity: Decimal,
    price: Decimal,
) -> Result<LimitParams, ValidationError> {
    let validated = (|| -> Result<LimitParams, ValidationError> {
        Ok(LimitParams {
            symbol: validate_symbol(symbol)?,
            side: validate_side(side)?,
            quantity: validate_quantity(quantity)?,
            price: validate_price(price)?,
        })
    })();

    validated.inspect_err(|e| {
        log_rejection("LIMIT", &format!("{symbol} {side} {quantity} @ {price}"), e)
    })
}

/// Validate stop-limit order parameters including stop direction
pub fn validate_stop_limit_order(
    symbol: &str,
    side: &str,
    quantity: Decimal,
    stop_price: Decimal,
    limit_price: Decimal,
) -> Result<StopLimitParams, ValidationError> {
    let validated = (|| -> Result<StopLimitParams, ValidationError> {
        let side = validate_side(side)?;
        let params = StopLimitParams {
            symbol: validate_symbol(symbol)?,
            side,
            quantity: validate_quantity(quantity)?,
            stop_price: validate_price(stop_price)?,
            limit_price: validate_price(limit_price)?,
        };
        validate_stop_price(params.stop_price, params.limit_price, side)?;
        Ok(params)
    })();

    validated.inspect_err(|e| {
        log_rejection(
            "STOP_LIMIT",
            &format!("{symbol} {side} {quantity} stop:{stop_price} limit:{limit_price}"),
            e,
        )
    })
}
