//! Strategy commands

use super::Context;
use crate::engine::Engine;
use crate::strategy::{GridRequest, StrategyEvent, TwapRequest};
use crate::types::GridType;
use crate::validation::{parse_interval, parse_price, parse_quantity, validate_grid_type};
use clap::Args;
use rust_decimal::Decimal;
use tokio::sync::broadcast::error::RecvError;

#[derive(Args, Debug)]
pub struct TwapArgs {
    pub symbol: String,

    pub side: String,

    /// Total quantity across all slices
    #[arg(value_parser = parse_quantity)]
    pub quantity: Decimal,

    /// Number of slices
    #[arg(long, default_value = "5")]
    pub splits: usize,

    /// Seconds between slices
    #[arg(long, default_value = "60", value_parser = parse_interval)]
    pub interval: u64,

    /// Use LIMIT slices at this price instead of MARKET
    #[arg(long, value_parser = parse_price)]
    pub limit_price: Option<Decimal>,
}

impl TwapArgs {
    /// Run the program to completion, printing each slice as it lands.
    ///
    /// Ctrl-C cancels the strategy and its working slices.
    pub async fn execute(&self, engine: &Engine, ctx: Context) -> anyhow::Result<()> {
        let mut request = TwapRequest::new(
            &self.symbol,
            &self.side,
            self.quantity,
            self.splits,
            i64::try_from(self.interval)?,
        )
        .test_mode(ctx.test_mode);
        if let Some(price) = self.limit_price {
            request = request.limit(price);
        }

        let twap = engine.twap();
        let mut events = twap.subscribe();
        let strategy = twap.place_order(request).await?;
        let strategy_id = strategy.strategy_id;
        ctx.output.strategy(&strategy)?;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) if event.strategy_id() == strategy_id => {
                        ctx.output.event(&event)?;
                        if matches!(event, StrategyEvent::Finished { .. }) {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(strategy_id, skipped, "Progress events dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    tracing::warn!(strategy_id, "Interrupted, cancelling TWAP");
                    if let Err(e) = twap.cancel_strategy(strategy_id).await {
                        tracing::warn!(strategy_id, error = %e, "Cancel after interrupt failed");
                    }
                }
            }
        }

        let strategy = twap.join(strategy_id).await?;
        ctx.output.strategy(&strategy)
    }
}

#[derive(Args, Debug)]
pub struct GridArgs {
    pub symbol: String,

    /// Lowest level price
    #[arg(value_parser = parse_price)]
    pub lower: Decimal,

    /// Highest level price
    #[arg(value_parser = parse_price)]
    pub upper: Decimal,

    /// Total quantity across all levels
    #[arg(value_parser = parse_quantity)]
    pub quantity: Decimal,

    /// Number of levels, the first and last on the bounds
    #[arg(long, default_value = "10")]
    pub grids: usize,

    /// LONG buys at every level, SHORT sells
    #[arg(long, default_value = "LONG", value_parser = validate_grid_type)]
    pub grid_type: GridType,
}

impl GridArgs {
    pub async fn execute(&self, engine: &Engine, ctx: Context) -> anyhow::Result<()> {
        let request = GridRequest::new(
            &self.symbol,
            self.lower,
            self.upper,
            self.grids,
            self.quantity,
            self.grid_type,
        )
        .test_mode(ctx.test_mode);
        let strategy = engine.grid().place_order(request).await?;
        ctx.output.strategy(&strategy)
    }
}
