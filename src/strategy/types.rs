//! Strategy records and lifecycle

use crate::orders::{Order, OrderId};
use crate::telemetry::metrics::STRATEGY_TRANSITIONS_TOTAL;
use crate::types::{GridType, OrderType, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Strategy identifier: milliseconds since the epoch, unique per process
pub type StrategyId = u64;

/// Time-derived identifiers, bumped past the previous one on collision
#[derive(Debug, Default)]
pub struct StrategyIdGenerator {
    last: AtomicU64,
}

impl StrategyIdGenerator {
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self) -> StrategyId {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last
                .compare_exchange(last, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(current) => last = current,
            }
        }
    }
}

/// Strategy lifecycle.
///
/// `PLANNED -> EXECUTING -> {COMPLETED | CANCELLED | STOPPED | FAILED}`;
/// a planned strategy may also end directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StrategyStatus {
    Planned,
    Executing,
    Completed,
    Cancelled,
    Stopped,
    Failed,
}

impl StrategyStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StrategyStatus::Planned | StrategyStatus::Executing)
    }

    /// Whether `next` is a forward move from this state
    pub fn can_transition_to(&self, next: StrategyStatus) -> bool {
        match self {
            StrategyStatus::Planned => next != StrategyStatus::Planned,
            StrategyStatus::Executing => next.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyStatus::Planned => "PLANNED",
            StrategyStatus::Executing => "EXECUTING",
            StrategyStatus::Completed => "COMPLETED",
            StrategyStatus::Cancelled => "CANCELLED",
            StrategyStatus::Stopped => "STOPPED",
            StrategyStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for StrategyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TWAP schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwapPlan {
    pub side: Side,
    pub num_splits: usize,
    pub interval_secs: u64,
    pub quantity_per_split: Decimal,
    /// MARKET or LIMIT
    pub child_order_type: OrderType,
    pub limit_price: Option<Decimal>,
    pub test_mode: bool,
    /// Children that failed to place
    pub failed_steps: Vec<usize>,
}

/// Placement state of one grid level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LevelStatus {
    Pending,
    Placed,
    Failed,
}

/// One rung of a grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridLevel {
    pub level: usize,
    pub price: Decimal,
    pub quantity: Decimal,
    pub side: Side,
    pub status: LevelStatus,
    pub order_id: Option<OrderId>,
}

/// Grid ladder definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPlan {
    pub lower_price: Decimal,
    pub upper_price: Decimal,
    pub num_grids: usize,
    pub price_step: Decimal,
    pub quantity_per_grid: Decimal,
    pub grid_type: GridType,
    pub levels: Vec<GridLevel>,
    pub test_mode: bool,
}

impl GridPlan {
    /// Spacing between adjacent levels
    pub fn price_step(lower: Decimal, upper: Decimal, num_grids: usize) -> Decimal {
        (upper - lower) / Decimal::from(num_grids - 1)
    }

    /// Price of level `index`; the first and last levels sit exactly on the bounds
    pub fn level_price(lower: Decimal, upper: Decimal, num_grids: usize, index: usize) -> Decimal {
        lower + (upper - lower) * Decimal::from(index) / Decimal::from(num_grids - 1)
    }

    /// Move every level onto a new range, keeping the level count
    pub fn reprice(&mut self, lower: Decimal, upper: Decimal) {
        self.lower_price = lower;
        self.upper_price = upper;
        self.price_step = Self::price_step(lower, upper, self.num_grids);
        for level in &mut self.levels {
            level.price = Self::level_price(lower, upper, self.num_grids, level.level);
            level.status = LevelStatus::Pending;
            level.order_id = None;
        }
    }
}

/// Strategy-specific parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum StrategyKind {
    Twap(TwapPlan),
    Grid(GridPlan),
}

/// A multi-order program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub strategy_id: StrategyId,
    pub symbol: String,
    pub total_quantity: Decimal,
    pub status: StrategyStatus,
    pub kind: StrategyKind,
    /// Child orders in placement order
    pub orders: Vec<Order>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Strategy {
    pub fn new(
        strategy_id: StrategyId,
        symbol: impl Into<String>,
        total_quantity: Decimal,
        kind: StrategyKind,
    ) -> Self {
        Self {
            strategy_id,
            symbol: symbol.into(),
            total_quantity,
            status: StrategyStatus::Planned,
            kind,
            orders: vec![],
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `next` if it is a forward transition.
    ///
    /// Returns false and leaves the strategy untouched otherwise.
    pub fn transition(&mut self, next: StrategyStatus) -> bool {
        if !self.status.can_transition_to(next) {
            tracing::debug!(
                strategy_id = self.strategy_id,
                from = %self.status,
                to = %next,
                "Ignored strategy transition"
            );
            return false;
        }

        let now = Utc::now();
        if next == StrategyStatus::Executing {
            self.started_at = Some(now);
        }
        if next.is_terminal() {
            self.completed_at = Some(now);
        }
        tracing::info!(
            strategy_id = self.strategy_id,
            from = %self.status,
            to = %next,
            "Strategy transition"
        );
        metrics::counter!(STRATEGY_TRANSITIONS_TOTAL, "to" => next.as_str())
            .increment(1);
        self.status = next;
        true
    }

    pub fn twap(&self) -> Option<&TwapPlan> {
        match &self.kind {
            StrategyKind::Twap(plan) => Some(plan),
            StrategyKind::Grid(_) => None,
        }
    }

    pub fn twap_mut(&mut self) -> Option<&mut TwapPlan> {
        match &mut self.kind {
            StrategyKind::Twap(plan) => Some(plan),
            StrategyKind::Grid(_) => None,
        }
    }

    pub fn grid(&self) -> Option<&GridPlan> {
        match &self.kind {
            StrategyKind::Grid(plan) => Some(plan),
            StrategyKind::Twap(_) => None,
        }
    }

    pub fn grid_mut(&mut self) -> Option<&mut GridPlan> {
        match &mut self.kind {
            StrategyKind::Grid(plan) => Some(plan),
            StrategyKind::Twap(_) => None,
        }
    }

    /// Child orders not yet terminal
    pub fn working_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(|o| !o.is_terminal())
    }
}

/// Realized result of a grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitLoss {
    pub strategy_id: StrategyId,
    /// Executed value of BUY children
    pub buy_total: Decimal,
    pub buy_quantity: Decimal,
    /// Executed value of SELL children
    pub sell_total: Decimal,
    pub sell_quantity: Decimal,
    /// `sell_total - buy_total`, zero unless both sides executed
    pub gross_profit: Decimal,
    /// Percent of `buy_total`
    pub roi_pct: Decimal,
}

impl ProfitLoss {
    pub fn from_orders<'a>(
        strategy_id: StrategyId,
        orders: impl IntoIterator<Item = &'a Order>,
    ) -> Self {
        let mut pnl = Self {
            strategy_id,
            buy_total: Decimal::ZERO,
            buy_quantity: Decimal::ZERO,
            sell_total: Decimal::ZERO,
            sell_quantity: Decimal::ZERO,
            gross_profit: Decimal::ZERO,
            roi_pct: Decimal::ZERO,
        };

        for order in orders {
            match order.side {
                Side::Buy => {
                    pnl.buy_total += order.filled_notional();
                    pnl.buy_quantity += order.executed_qty;
                }
                Side::Sell => {
                    pnl.sell_total += order.filled_notional();
                    pnl.sell_quantity += order.executed_qty;
                }
            }
        }

        if pnl.buy_quantity > Decimal::ZERO && pnl.sell_quantity > Decimal::ZERO {
            pnl.gross_profit = pnl.sell_total - pnl.buy_total;
            if !pnl.buy_total.is_zero() {
                pnl.roi_pct = pnl.gross_profit / pnl.buy_total * Decimal::ONE_HUNDRED;
            }
        }
        pnl
    }
}

/// Progress notifications from running strategies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StrategyEvent {
    ChildPlaced {
        strategy_id: StrategyId,
        step: usize,
        order: Order,
    },
    ChildFailed {
        strategy_id: StrategyId,
        step: usize,
        error: String,
    },
    Finished {
        strategy_id: StrategyId,
        status: StrategyStatus,
    },
}

impl StrategyEvent {
    pub fn strategy_id(&self) -> StrategyId {
        match self {
            StrategyEvent::ChildPlaced { strategy_id, .. }
            | StrategyEvent::ChildFailed { strategy_id, .. }
            | StrategyEvent::Finished { strategy_id, .. } => *strategy_id,
        }
    }
}
