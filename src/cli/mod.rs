//! CLI interface for order-engine
//!
//! Provides subcommands for:
//! - `market`, `limit`, `stop-limit`, `oco`: place single orders
//! - `cancel`: cancel an order
//! - `twap`, `grid`: run multi-order strategies
//! - `status`, `open-orders`, `account`: query orders and balances

mod orders;
mod output;
mod query;
mod strategy;

pub use orders::{CancelArgs, LimitArgs, MarketArgs, OcoArgs, StopLimitArgs};
pub use output::Output;
pub use query::{OpenOrdersArgs, StatusArgs};
pub use strategy::{GridArgs, TwapArgs};

use crate::engine::Engine;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "order-engine")]
#[command(about = "Order execution engine for USD-M futures")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "ORDER_ENGINE_CONFIG", default_value = "config.toml")]
    pub config: String,

    /// Simulate orders locally instead of sending them
    #[arg(long, global = true)]
    pub test: bool,

    /// Print records as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Place a market order
    Market(MarketArgs),
    /// Place a limit order
    Limit(LimitArgs),
    /// Place a stop-limit order
    StopLimit(StopLimitArgs),
    /// Place a take-profit / stop-loss pair
    Oco(OcoArgs),
    /// Cancel an order
    Cancel(CancelArgs),
    /// Split an order into equal slices over time
    Twap(TwapArgs),
    /// Lay limit orders across a price range
    Grid(GridArgs),
    /// Show one order
    Status(StatusArgs),
    /// List working orders
    OpenOrders(OpenOrdersArgs),
    /// Show balances and positions
    Account,
}

/// Settings shared by every subcommand
#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub test_mode: bool,
    pub output: Output,
}

impl Commands {
    pub async fn execute(&self, engine: &Engine, ctx: Context) -> anyhow::Result<()> {
        match self {
            Commands::Market(args) => args.execute(engine, ctx).await,
            Commands::Limit(args) => args.execute(engine, ctx).await,
            Commands::StopLimit(args) => args.execute(engine, ctx).await,
            Commands::Oco(args) => args.execute(engine, ctx).await,
            Commands::Cancel(args) => args.execute(engine, ctx).await,
            Commands::Twap(args) => args.execute(engine, ctx).await,
            Commands::Grid(args) => args.execute(engine, ctx).await,
            Commands::Status(args) => args.execute(engine, ctx).await,
            Commands::OpenOrders(args) => args.execute(engine, ctx).await,
            Commands::Account => query::account(engine, ctx).await,
        }
    }
}
