//! Single-order commands

use super::Context;
use crate::engine::Engine;
use crate::orders::{OcoRequest, OrderId, OrderRequest, StopLimitRequest};
use crate::types::{TimeInForce, WorkingType};
use crate::validation::{parse_price, parse_quantity};
use clap::Args;
use rust_decimal::Decimal;

#[derive(Args, Debug)]
pub struct MarketArgs {
    /// Trading pair, e.g. BTCUSDT
    pub symbol: String,

    /// BUY or SELL
    pub side: String,

    #[arg(value_parser = parse_quantity)]
    pub quantity: Decimal,

    /// Only reduce an existing position
    #[arg(long)]
    pub reduce_only: bool,
}

impl MarketArgs {
    pub async fn execute(&self, engine: &Engine, ctx: Context) -> anyhow::Result<()> {
        let request = OrderRequest::market(&self.symbol, &self.side, self.quantity)
            .reduce_only(self.reduce_only)
            .test_mode(ctx.test_mode);
        let order = engine.market().place_order(request).await?;
        ctx.output.order(&order)
    }
}

#[derive(Args, Debug)]
pub struct LimitArgs {
    pub symbol: String,

    pub side: String,

    #[arg(value_parser = parse_quantity)]
    pub quantity: Decimal,

    #[arg(value_parser = parse_price)]
    pub price: Decimal,

    /// GTC, IOC, FOK or GTX
    #[arg(long, default_value = "GTC")]
    pub tif: TimeInForce,

    /// Reject instead of taking liquidity
    #[arg(long)]
    pub post_only: bool,

    #[arg(long)]
    pub reduce_only: bool,
}

impl LimitArgs {
    pub async fn execute(&self, engine: &Engine, ctx: Context) -> anyhow::Result<()> {
        let request = OrderRequest::limit(&self.symbol, &self.side, self.quantity, self.price)
            .time_in_force(self.tif)
            .post_only(self.post_only)
            .reduce_only(self.reduce_only)
            .test_mode(ctx.test_mode);
        let order = engine.limit().place_order(request).await?;
        ctx.output.order(&order)
    }
}

#[derive(Args, Debug)]
pub struct StopLimitArgs {
    pub symbol: String,

    pub side: String,

    #[arg(value_parser = parse_quantity)]
    pub quantity: Decimal,

    /// Trigger price
    #[arg(value_parser = parse_price)]
    pub stop_price: Decimal,

    /// Price of the limit order placed once triggered
    #[arg(value_parser = parse_price)]
    pub limit_price: Decimal,

    /// CONTRACT_PRICE or MARK_PRICE
    #[arg(long, default_value = "CONTRACT_PRICE")]
    pub working_type: WorkingType,

    #[arg(long, default_value = "GTC")]
    pub tif: TimeInForce,

    #[arg(long)]
    pub reduce_only: bool,
}

impl StopLimitArgs {
    pub async fn execute(&self, engine: &Engine, ctx: Context) -> anyhow::Result<()> {
        let request = StopLimitRequest::new(
            &self.symbol,
            &self.side,
            self.quantity,
            self.stop_price,
            self.limit_price,
        )
        .working_type(self.working_type)
        .time_in_force(self.tif)
        .reduce_only(self.reduce_only)
        .test_mode(ctx.test_mode);
        let order = engine.stop_limit().place_order(request).await?;
        ctx.output.order(&order)
    }
}

#[derive(Args, Debug)]
pub struct OcoArgs {
    pub symbol: String,

    /// Side of both exit legs
    pub side: String,

    #[arg(value_parser = parse_quantity)]
    pub quantity: Decimal,

    #[arg(value_parser = parse_price)]
    pub take_profit: Decimal,

    /// Stop-loss trigger
    #[arg(value_parser = parse_price)]
    pub stop_loss: Decimal,

    /// Stop-loss execution price, defaults to the trigger
    #[arg(long, value_parser = parse_price)]
    pub stop_loss_limit: Option<Decimal>,

    #[arg(long, default_value = "CONTRACT_PRICE")]
    pub working_type: WorkingType,
}

impl OcoArgs {
    pub async fn execute(&self, engine: &Engine, ctx: Context) -> anyhow::Result<()> {
        let mut request = OcoRequest::new(
            &self.symbol,
            &self.side,
            self.quantity,
            self.take_profit,
            self.stop_loss,
        )
        .working_type(self.working_type)
        .test_mode(ctx.test_mode);
        if let Some(price) = self.stop_loss_limit {
            request = request.stop_loss_limit_price(price);
        }
        let oco = engine.oco().place_order(request).await?;
        ctx.output.oco(&oco)
    }
}

#[derive(Args, Debug)]
pub struct CancelArgs {
    pub symbol: String,

    pub order_id: OrderId,
}

impl CancelArgs {
    pub async fn execute(&self, engine: &Engine, ctx: Context) -> anyhow::Result<()> {
        let ack = engine.cancel_order(&self.symbol, self.order_id).await?;
        ctx.output.cancel(&ack)
    }
}
