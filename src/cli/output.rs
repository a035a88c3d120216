//! Human-readable and JSON rendering of engine records

use crate::gateway::{AccountInfo, CancelAck};
use crate::orders::{OcoOrder, Order};
use crate::strategy::{Strategy, StrategyEvent, StrategyKind};
use serde::Serialize;

/// Where command results go
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Print `value` as JSON, or the text `human` builds
    pub fn emit<T, F>(&self, value: &T, human: F) -> anyhow::Result<()>
    where
        T: Serialize,
        F: FnOnce(&T) -> String,
    {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", human(value));
        }
        Ok(())
    }

    pub fn order(&self, order: &Order) -> anyhow::Result<()> {
        self.emit(order, format_order)
    }

    pub fn orders(&self, orders: &[Order]) -> anyhow::Result<()> {
        self.emit(&orders, |orders| {
            if orders.is_empty() {
                return "No open orders".to_string();
            }
            orders
                .iter()
                .map(format_order)
                .collect::<Vec<_>>()
                .join("\n")
        })
    }

    pub fn oco(&self, oco: &OcoOrder) -> anyhow::Result<()> {
        self.emit(oco, |oco| {
            format!(
                "OCO list #{} {} {} {} [{:?}]\n  take-profit: {}\n  stop-loss:   {}",
                oco.order_list_id,
                oco.symbol,
                oco.side,
                oco.quantity,
                oco.list_status,
                format_order(&oco.take_profit),
                format_order(&oco.stop_loss),
            )
        })
    }

    pub fn strategy(&self, strategy: &Strategy) -> anyhow::Result<()> {
        self.emit(strategy, format_strategy)
    }

    pub fn event(&self, event: &StrategyEvent) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(event)?);
            return Ok(());
        }
        match event {
            StrategyEvent::ChildPlaced { step, order, .. } => {
                println!("  [{}] {}", step + 1, format_order(order))
            }
            StrategyEvent::ChildFailed { step, error, .. } => {
                println!("  [{}] failed: {}", step + 1, error)
            }
            StrategyEvent::Finished { status, .. } => println!("  finished: {}", status),
        }
        Ok(())
    }

    pub fn cancel(&self, ack: &CancelAck) -> anyhow::Result<()> {
        self.emit(ack, |ack| {
            let target = ack
                .order_id
                .map(|id| format!("#{id}"))
                .or_else(|| ack.order_list_id.map(|id| format!("list #{id}")))
                .unwrap_or_default();
            match &ack.note {
                Some(note) => format!("{} {} {}: {}", ack.symbol, target, ack.status, note),
                None => format!("{} {} {}", ack.symbol, target, ack.status),
            }
        })
    }

    pub fn account(&self, account: &AccountInfo) -> anyhow::Result<()> {
        self.emit(account, |a| {
            let mut lines = vec![
                format!("Wallet balance:    {}", a.total_wallet_balance),
                format!("Available balance: {}", a.available_balance),
                format!("Unrealized P&L:    {}", a.total_unrealized_profit),
            ];
            for asset in &a.assets {
                lines.push(format!(
                    "  {} wallet={} available={}",
                    asset.asset, asset.wallet_balance, asset.available_balance
                ));
            }
            for position in &a.positions {
                lines.push(format!(
                    "  {} amt={} entry={} upnl={}",
                    position.symbol,
                    position.position_amt,
                    position.entry_price,
                    position.unrealized_profit
                ));
            }
            lines.join("\n")
        })
    }
}

/// One-line summary of an order
pub fn format_order(order: &Order) -> String {
    let mut line = format!(
        "#{} {} {} {} qty={} status={}",
        order.order_id, order.symbol, order.side, order.order_type, order.quantity, order.status
    );
    if let Some(price) = order.price {
        line.push_str(&format!(" price={price}"));
    }
    if let Some(stop) = order.stop_price {
        line.push_str(&format!(" stop={stop}"));
    }
    if !order.executed_qty.is_zero() {
        line.push_str(&format!(
            " filled={}@{}",
            order.executed_qty, order.avg_price
        ));
    }
    if order.simulated {
        line.push_str(" (simulated)");
    }
    line
}

fn format_strategy(strategy: &Strategy) -> String {
    let header = format!(
        "Strategy #{} {} qty={} status={} children={}",
        strategy.strategy_id,
        strategy.symbol,
        strategy.total_quantity,
        strategy.status,
        strategy.orders.len()
    );
    let detail = match &strategy.kind {
        StrategyKind::Twap(plan) => format!(
            "  TWAP {} {} x {} every {}s",
            plan.side, plan.num_splits, plan.quantity_per_split, plan.interval_secs
        ),
        StrategyKind::Grid(plan) => {
            let mut lines = vec![format!(
                "  GRID {} {}..{} step={} qty/level={}",
                plan.grid_type,
                plan.lower_price,
                plan.upper_price,
                plan.price_step,
                plan.quantity_per_grid
            )];
            for level in &plan.levels {
                lines.push(format!(
                    "    L{} {} @ {} {:?}",
                    level.level, level.side, level.price, level.status
                ));
            }
            lines.join("\n")
        }
    };
    format!("{header}\n{detail}")
}
