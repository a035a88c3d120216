//! Deterministic local simulation of exchange responses

use super::{Fill, Order, OrderId, OrderStatus};
use crate::types::{OrderType, Side};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fee charged on simulated fills (0.02%)
pub const DEFAULT_COMMISSION_RATE: Decimal = dec!(0.0002);

/// Reference price for symbols missing from the table
pub const DEFAULT_REFERENCE_PRICE: Decimal = dec!(100.0);

/// Fixed prices used to fill simulated market orders
pub const REFERENCE_PRICES: [(&str, Decimal); 5] = [
    ("BTCUSDT", dec!(42500.50)),
    ("ETHUSDT", dec!(2350.25)),
    ("BNBUSDT", dec!(615.80)),
    ("ADAUSDT", dec!(0.98)),
    ("DOGEUSDT", dec!(0.38)),
];

/// Identifier ranges for simulated records, one per handler type
pub const MARKET_ID_BASE: u64 = 1_000_000_000;
pub const LIMIT_ID_BASE: u64 = 2_000_000_000;
pub const STOP_LIMIT_ID_BASE: u64 = 3_000_000_000;
pub const OCO_LEG_ID_BASE: u64 = 4_000_000_000;
pub const OCO_LIST_ID_BASE: u64 = 5_000_000_000;

/// Simulated fill price for a symbol
pub fn reference_price(symbol: &str) -> Decimal {
    REFERENCE_PRICES
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, p)| *p)
        .unwrap_or(DEFAULT_REFERENCE_PRICE)
}

/// Deterministic identifier sequence: `base + 1`, `base + 2`, ...
#[derive(Debug)]
pub struct SimulatedIds {
    base: u64,
    next: AtomicU64,
}

impl SimulatedIds {
    pub fn new(base: u64) -> Self {
        Self {
            base,
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> OrderId {
        self.base + self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// A market order filled in full at the reference price
pub fn simulate_market_fill(
    order_id: OrderId,
    symbol: &str,
    side: Side,
    quantity: Decimal,
    commission_rate: Decimal,
) -> Order {
    let price = reference_price(symbol);
    let notional = quantity * price;

    let mut order = Order::new(order_id, symbol, side, OrderType::Market, quantity);
    order.status = OrderStatus::Filled;
    order.executed_qty = quantity;
    order.avg_price = price;
    order.fills = vec![Fill {
        price,
        qty: quantity,
        commission: notional * commission_rate,
        commission_asset: "USDT".to_string(),
    }];
    order.simulated = true;
    order
}

/// A resting order with nothing executed
pub fn simulate_resting(
    order_id: OrderId,
    symbol: &str,
    side: Side,
    order_type: OrderType,
    quantity: Decimal,
) -> Order {
    let mut order = Order::new(order_id, symbol, side, order_type, quantity);
    order.simulated = true;
    order
}
