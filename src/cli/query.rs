//! Read-only commands

use super::Context;
use crate::engine::Engine;
use crate::orders::OrderId;
use clap::Args;

#[derive(Args, Debug)]
pub struct StatusArgs {
    pub symbol: String,

    pub order_id: OrderId,
}

impl StatusArgs {
    pub async fn execute(&self, engine: &Engine, ctx: Context) -> anyhow::Result<()> {
        let order = engine.find_order(&self.symbol, self.order_id).await?;
        ctx.output.order(&order)
    }
}

#[derive(Args, Debug)]
pub struct OpenOrdersArgs {
    /// Limit to one trading pair
    pub symbol: Option<String>,
}

impl OpenOrdersArgs {
    pub async fn execute(&self, engine: &Engine, ctx: Context) -> anyhow::Result<()> {
        let orders = engine.open_orders(self.symbol.as_deref()).await?;
        ctx.output.orders(&orders)
    }
}

pub async fn account(engine: &Engine, ctx: Context) -> anyhow::Result<()> {
    let account = engine.account().await?;
    ctx.output.account(&account)
}
