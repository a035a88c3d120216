//! Grid engine
//!
//! Lays a ladder of post-only limit orders evenly across a price range.
//! LONG grids buy at every level, SHORT grids sell at every level.

use super::{GridLevel, GridPlan, LevelStatus, ProfitLoss, Strategy, StrategyId};
use super::{StrategyIdGenerator, StrategyKind, StrategyStatus};
use crate::error::{EngineError, EngineResult};
use crate::history::{SharedStrategy, StrategyStore};
use crate::orders::{Order, OrderHandler, OrderId, OrderRequest};
use crate::telemetry::metrics::STRATEGY_STEP_FAILURES_TOTAL;
use crate::types::GridType;
use crate::validation::{
    validate_price_range, validate_quantity, validate_step_count, validate_symbol,
    ValidationError,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Parameters for a grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRequest {
    pub symbol: String,
    pub lower_price: Decimal,
    pub upper_price: Decimal,
    pub num_grids: usize,
    pub total_quantity: Decimal,
    pub grid_type: GridType,
    pub test_mode: bool,
}

impl GridRequest {
    pub fn new(
        symbol: impl Into<String>,
        lower_price: Decimal,
        upper_price: Decimal,
        num_grids: usize,
        total_quantity: Decimal,
        grid_type: GridType,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            lower_price,
            upper_price,
            num_grids,
            total_quantity,
            grid_type,
            test_mode: false,
        }
    }

    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    fn plan(&self) -> Result<(String, GridPlan), ValidationError> {
        let symbol = validate_symbol(&self.symbol)?;
        let (lower, upper) = validate_price_range(self.lower_price, self.upper_price)?;
        let num_grids = validate_step_count(self.num_grids, "grids")?;
        let total = validate_quantity(self.total_quantity)?;

        let quantity_per_grid = total / Decimal::from(num_grids);
        validate_quantity(quantity_per_grid).map_err(|e| {
            ValidationError::InvalidStrategy(format!(
                "quantity per grid ({quantity_per_grid}) is out of bounds: {e}"
            ))
        })?;

        let side = self.grid_type.level_side();
        let levels = (0..num_grids)
            .map(|level| GridLevel {
                level,
                price: GridPlan::level_price(lower, upper, num_grids, level),
                quantity: quantity_per_grid,
                side,
                status: LevelStatus::Pending,
                order_id: None,
            })
            .collect();

        Ok((
            symbol,
            GridPlan {
                lower_price: lower,
                upper_price: upper,
                num_grids,
                price_step: GridPlan::price_step(lower, upper, num_grids),
                quantity_per_grid,
                grid_type: self.grid_type,
                levels,
                test_mode: self.test_mode,
            },
        ))
    }
}

/// Places and maintains grids
pub struct GridEngine {
    limit: Arc<dyn OrderHandler>,
    store: StrategyStore,
    ids: Arc<StrategyIdGenerator>,
}

impl GridEngine {
    pub fn new(limit: Arc<dyn OrderHandler>) -> Self {
        Self {
            limit,
            store: StrategyStore::new(),
            ids: Arc::new(StrategyIdGenerator::new()),
        }
    }

    /// Share an id generator with other engines
    pub fn with_id_generator(mut self, ids: Arc<StrategyIdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Validate the grid and place every level.
    ///
    /// A level that fails to place is marked FAILED; the grid is FAILED only
    /// when no level could be placed.
    pub async fn place_order(&self, request: GridRequest) -> EngineResult<Strategy> {
        let (symbol, plan) = request.plan().inspect_err(|e| {
            tracing::warn!(
                order_kind = "GRID",
                symbol = %request.symbol,
                error = %e,
                "Validation rejected order"
            )
        })?;

        let strategy_id = self.ids.next_id();
        tracing::info!(
            strategy_id,
            %symbol,
            grid_type = %plan.grid_type,
            lower = %plan.lower_price,
            upper = %plan.upper_price,
            num_grids = plan.num_grids,
            price_step = %plan.price_step,
            "Grid strategy planned"
        );

        let shared = self
            .store
            .insert(Strategy::new(
                strategy_id,
                symbol,
                request.total_quantity,
                StrategyKind::Grid(plan),
            ))
            .await;

        let placed = self.place_levels(&shared).await;
        let mut strategy = shared.write().await;
        strategy.transition(if placed > 0 {
            StrategyStatus::Executing
        } else {
            StrategyStatus::Failed
        });
        Ok(strategy.clone())
    }

    /// Place every pending level; returns how many were placed
    async fn place_levels(&self, shared: &SharedStrategy) -> usize {
        let (strategy_id, symbol, test_mode, levels) = {
            let strategy = shared.read().await;
            let Some(plan) = strategy.grid() else {
                return 0;
            };
            (
                strategy.strategy_id,
                strategy.symbol.clone(),
                plan.test_mode,
                plan.levels.clone(),
            )
        };

        let mut placed = 0;
        for level in levels.iter().filter(|l| l.status == LevelStatus::Pending) {
            if shared.read().await.status.is_terminal() {
                tracing::info!(strategy_id, level = level.level, "Grid ended, placement stopped");
                break;
            }

            let request =
                OrderRequest::limit(&symbol, level.side.as_str(), level.quantity, level.price)
                    .post_only(true)
                    .test_mode(test_mode);

            let outcome = self.limit.place(request).await;
            let mut strategy = shared.write().await;
            match outcome {
                // Checked under the lock so a concurrent cancel either saw
                // this order or leaves it to us.
                Ok(order) if strategy.status.is_terminal() => {
                    let order_id = order.order_id;
                    strategy.orders.push(order);
                    drop(strategy);
                    tracing::warn!(strategy_id, order_id, "Grid level placed after cancel");
                    self.cancel_late(shared, &symbol, order_id).await;
                }
                Ok(order) => {
                    placed += 1;
                    if let Some(slot) = grid_level(&mut strategy, level.level) {
                        slot.status = LevelStatus::Placed;
                        slot.order_id = Some(order.order_id);
                    }
                    strategy.orders.push(order);
                }
                Err(e) => {
                    tracing::error!(
                        strategy_id,
                        level = level.level,
                        price = %level.price,
                        error = %e,
                        "Grid level failed"
                    );
                    metrics::counter!(
                        STRATEGY_STEP_FAILURES_TOTAL,
                        "strategy" => "grid"
                    )
                    .increment(1);
                    if let Some(slot) = grid_level(&mut strategy, level.level) {
                        slot.status = LevelStatus::Failed;
                    }
                }
            }
        }

        tracing::info!(strategy_id, placed, total = levels.len(), "Grid levels placed");
        placed
    }

    async fn cancel_late(&self, shared: &SharedStrategy, symbol: &str, order_id: OrderId) {
        match self.limit.cancel(symbol, order_id).await {
            Ok(_) => {
                let mut strategy = shared.write().await;
                if let Some(o) = strategy.orders.iter_mut().find(|o| o.order_id == order_id) {
                    o.mark_cancelled();
                }
            }
            Err(e) => {
                tracing::warn!(order_id, error = %e, "Failed to cancel late grid order")
            }
        }
    }

    /// Cancel working children, logging the ones that could not be cancelled
    async fn cancel_working(&self, shared: &SharedStrategy) -> usize {
        let (symbol, working) = {
            let strategy = shared.read().await;
            let working: Vec<Order> = strategy.working_orders().cloned().collect();
            (strategy.symbol.clone(), working)
        };

        let mut cancelled = 0;
        for order in &working {
            match self.limit.cancel(&symbol, order.order_id).await {
                Ok(_) => {
                    cancelled += 1;
                    let mut strategy = shared.write().await;
                    if let Some(o) = strategy
                        .orders
                        .iter_mut()
                        .find(|o| o.order_id == order.order_id)
                    {
                        o.mark_cancelled();
                    }
                }
                Err(e) => {
                    tracing::warn!(order_id = order.order_id, error = %e, "Failed to cancel grid order")
                }
            }
        }
        cancelled
    }

    async fn live_strategy(&self, strategy_id: StrategyId) -> EngineResult<SharedStrategy> {
        let shared = self
            .store
            .get(strategy_id)
            .await
            .ok_or_else(|| EngineError::not_found("strategy", strategy_id))?;

        let status = shared.read().await.status;
        if status.is_terminal() {
            return Err(EngineError::InvalidState(format!(
                "strategy {strategy_id} is already {status}"
            )));
        }
        Ok(shared)
    }

    /// Move the grid to a new range and re-place every level.
    ///
    /// The level count never changes. The new range is validated before any
    /// order is cancelled.
    pub async fn update_grid(
        &self,
        strategy_id: StrategyId,
        new_lower: Option<Decimal>,
        new_upper: Option<Decimal>,
    ) -> EngineResult<Strategy> {
        let shared = self.live_strategy(strategy_id).await?;
        let (lower, upper) = {
            let strategy = shared.read().await;
            let plan = strategy.grid().ok_or_else(|| {
                EngineError::InvalidState(format!("strategy {strategy_id} is not a grid"))
            })?;
            (
                new_lower.unwrap_or(plan.lower_price),
                new_upper.unwrap_or(plan.upper_price),
            )
        };
        let (lower, upper) = validate_price_range(lower, upper)?;

        let cancelled = self.cancel_working(&shared).await;
        {
            let mut strategy = shared.write().await;
            if let Some(plan) = strategy.grid_mut() {
                plan.reprice(lower, upper);
            }
        }
        tracing::info!(strategy_id, %lower, %upper, cancelled, "Grid range updated");

        let placed = self.place_levels(&shared).await;
        let mut strategy = shared.write().await;
        if placed == 0 && !strategy.status.is_terminal() {
            strategy.transition(StrategyStatus::Failed);
        }
        Ok(strategy.clone())
    }

    /// End the grid and cancel every working level.
    ///
    /// The grid is CANCELLED before any order is cancelled, so a placement
    /// still in flight cancels its own order.
    pub async fn cancel_strategy(&self, strategy_id: StrategyId) -> EngineResult<Strategy> {
        let shared = self
            .store
            .get(strategy_id)
            .await
            .ok_or_else(|| EngineError::not_found("strategy", strategy_id))?;
        {
            let mut strategy = shared.write().await;
            if !strategy.transition(StrategyStatus::Cancelled) {
                return Err(EngineError::InvalidState(format!(
                    "strategy {strategy_id} is already {}",
                    strategy.status
                )));
            }
        }

        let cancelled = self.cancel_working(&shared).await;
        tracing::info!(strategy_id, cancelled, "Grid strategy cancelled");
        let strategy = shared.read().await.clone();
        Ok(strategy)
    }

    /// Realized P&L over executed children.
    ///
    /// Working children are refreshed from the exchange first; refresh
    /// failures keep the last known state.
    pub async fn get_profit_loss(&self, strategy_id: StrategyId) -> EngineResult<ProfitLoss> {
        let shared = self
            .store
            .get(strategy_id)
            .await
            .ok_or_else(|| EngineError::not_found("strategy", strategy_id))?;

        let (symbol, working) = {
            let strategy = shared.read().await;
            let working: Vec<Order> = strategy.working_orders().cloned().collect();
            (strategy.symbol.clone(), working)
        };
        for order in working {
            match self.limit.refresh(&symbol, order.order_id).await {
                Ok(fresh) => {
                    let mut strategy = shared.write().await;
                    if let Some(o) = strategy
                        .orders
                        .iter_mut()
                        .find(|o| o.order_id == fresh.order_id)
                    {
                        *o = fresh;
                    }
                }
                Err(e) => {
                    tracing::warn!(order_id = order.order_id, error = %e, "Failed to refresh grid order")
                }
            }
        }

        let strategy = shared.read().await;
        Ok(ProfitLoss::from_orders(strategy_id, &strategy.orders))
    }

    pub async fn get_strategy_status(&self, strategy_id: StrategyId) -> EngineResult<Strategy> {
        self.store
            .snapshot(strategy_id)
            .await
            .ok_or_else(|| EngineError::not_found("strategy", strategy_id))
    }

    pub async fn get_all_strategies(&self) -> Vec<Strategy> {
        self.store.all().await
    }

    pub async fn get_active_strategies(&self) -> Vec<Strategy> {
        self.store.active().await
    }
}

fn grid_level(strategy: &mut Strategy, level: usize) -> Option<&mut GridLevel> {
    strategy
        .grid_mut()
        .and_then(|plan| plan.levels.iter_mut().find(|l| l.level == level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;
    use crate::orders::{LimitOrderHandler, OrderStatus};
    use crate::types::{OrderType, Side, TimeInForce};
    use rust_decimal_macros::dec;

    fn simulated() -> (GridEngine, Arc<LimitOrderHandler>) {
        let limit = Arc::new(LimitOrderHandler::new(None));
        (GridEngine::new(limit.clone()), limit)
    }

    fn dispatched() -> (GridEngine, Arc<InMemoryGateway>) {
        let gateway = Arc::new(InMemoryGateway::new());
        let limit = Arc::new(LimitOrderHandler::new(Some(gateway.clone())));
        (GridEngine::new(limit), gateway)
    }

    /// Limit handler whose placements take a second each
    struct SlowLimit(Arc<LimitOrderHandler>);

    #[async_trait::async_trait]
    impl OrderHandler for SlowLimit {
        fn name(&self) -> &'static str {
            "slow_limit"
        }
        async fn place(&self, request: OrderRequest) -> EngineResult<Order> {
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            self.0.place(request).await
        }
        async fn cancel(
            &self,
            symbol: &str,
            order_id: OrderId,
        ) -> EngineResult<crate::gateway::CancelAck> {
            self.0.cancel(symbol, order_id).await
        }
        async fn status(&self, symbol: &str, order_id: OrderId) -> EngineResult<Order> {
            self.0.status(symbol, order_id).await
        }
        async fn refresh(&self, symbol: &str, order_id: OrderId) -> EngineResult<Order> {
            self.0.refresh(symbol, order_id).await
        }
        async fn history(&self) -> Vec<Order> {
            self.0.history().await
        }
        async fn open_orders(&self, symbol: Option<&str>) -> EngineResult<Vec<Order>> {
            self.0.open_orders(symbol).await
        }
    }

    fn btc_grid() -> GridRequest {
        GridRequest::new(
            "BTCUSDT",
            dec!(40000),
            dec!(45000),
            10,
            dec!(0.1),
            GridType::Long,
        )
    }

    #[tokio::test]
    async fn test_grid_levels() {
        let (engine, _) = simulated();

        let strategy = engine.place_order(btc_grid().test_mode(true)).await.unwrap();
        let plan = strategy.grid().unwrap();

        assert_eq!(strategy.status, StrategyStatus::Executing);
        assert_eq!(plan.levels.len(), 10);
        assert!(plan.price_step > dec!(555.5555) && plan.price_step < dec!(555.5556));
        assert_eq!(plan.levels[0].price, dec!(40000));
        assert_eq!(plan.levels[9].price, dec!(45000));
        assert!(plan.levels.windows(2).all(|w| w[0].price < w[1].price));
        assert!(plan.levels.iter().all(|l| l.quantity == dec!(0.01)));
        assert!(plan
            .levels
            .iter()
            .all(|l| l.side == Side::Buy && l.status == LevelStatus::Placed));
        assert_eq!(strategy.orders.len(), 10);
    }

    #[tokio::test]
    async fn test_short_grid_sells_post_only() {
        let (engine, gateway) = dispatched();

        let strategy = engine
            .place_order(GridRequest::new(
                "ETHUSDT",
                dec!(2000),
                dec!(2400),
                5,
                dec!(1),
                GridType::Short,
            ))
            .await
            .unwrap();

        assert!(strategy.orders.iter().all(|o| o.side == Side::Sell));
        let sent = gateway.orders().await;
        assert_eq!(sent.len(), 5);
        assert!(sent
            .iter()
            .all(|o| o.order_type == OrderType::Limit && o.time_in_force == Some(TimeInForce::Gtx)));
    }

    #[tokio::test]
    async fn test_failed_level_does_not_abort() {
        let (engine, gateway) = dispatched();
        gateway.reject_when(|req| req.price == Some(dec!(45000)));

        let strategy = engine.place_order(btc_grid()).await.unwrap();
        let plan = strategy.grid().unwrap();

        assert_eq!(strategy.status, StrategyStatus::Executing);
        assert_eq!(strategy.orders.len(), 9);
        assert_eq!(plan.levels[9].status, LevelStatus::Failed);
        assert!(plan.levels[9].order_id.is_none());
        assert!(plan.levels[..9].iter().all(|l| l.status == LevelStatus::Placed));
    }

    #[tokio::test]
    async fn test_no_level_placed_fails_grid() {
        let (engine, gateway) = dispatched();
        gateway.reject_when(|_| true);

        let strategy = engine.place_order(btc_grid()).await.unwrap();
        assert_eq!(strategy.status, StrategyStatus::Failed);
        assert!(strategy.completed_at.is_some());
        assert!(engine.get_active_strategies().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_grids_rejected() {
        let (engine, _) = simulated();
        let cases = [
            GridRequest::new("BTCUSDT", dec!(45000), dec!(40000), 10, dec!(0.1), GridType::Long),
            GridRequest::new("BTCUSDT", dec!(40000), dec!(40000), 10, dec!(0.1), GridType::Long),
            GridRequest::new("BTCUSDT", dec!(40000), dec!(45000), 1, dec!(0.1), GridType::Long),
            GridRequest::new("BTCUSDT", dec!(40000), dec!(45000), 101, dec!(0.1), GridType::Long),
            GridRequest::new("BTCUSDT", dec!(40000), dec!(45000), 10, dec!(0.005), GridType::Long),
        ];
        for request in cases {
            let err = engine.place_order(request).await.unwrap_err();
            assert!(err.is_rejection(), "{err}");
        }
        assert!(engine.get_all_strategies().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_grid_reprices_in_place() {
        let (engine, limit) = simulated();
        let strategy = engine.place_order(btc_grid()).await.unwrap();

        let updated = engine
            .update_grid(strategy.strategy_id, Some(dec!(41000)), Some(dec!(44000)))
            .await
            .unwrap();
        let plan = updated.grid().unwrap();

        assert_eq!(updated.status, StrategyStatus::Executing);
        assert_eq!(plan.levels.len(), 10);
        assert_eq!(plan.levels[0].price, dec!(41000));
        assert_eq!(plan.levels[9].price, dec!(44000));
        assert_eq!(plan.price_step, dec!(3000) / dec!(9));

        // old orders cancelled, new ones working
        assert_eq!(updated.orders.len(), 20);
        assert_eq!(
            updated
                .orders
                .iter()
                .filter(|o| o.status == OrderStatus::Cancelled)
                .count(),
            10
        );
        assert_eq!(limit.open_orders(Some("BTCUSDT")).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_update_grid_keeps_one_bound() {
        let (engine, _) = simulated();
        let strategy = engine.place_order(btc_grid()).await.unwrap();

        let updated = engine
            .update_grid(strategy.strategy_id, None, Some(dec!(46000)))
            .await
            .unwrap();
        let plan = updated.grid().unwrap();
        assert_eq!(plan.lower_price, dec!(40000));
        assert_eq!(plan.levels[9].price, dec!(46000));
    }

    #[tokio::test]
    async fn test_invalid_update_cancels_nothing() {
        let (engine, limit) = simulated();
        let strategy = engine.place_order(btc_grid()).await.unwrap();

        let err = engine
            .update_grid(strategy.strategy_id, Some(dec!(46000)), None)
            .await
            .unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(limit.open_orders(None).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_cancel_strategy() {
        let (engine, limit) = simulated();
        let strategy = engine.place_order(btc_grid()).await.unwrap();

        let cancelled = engine.cancel_strategy(strategy.strategy_id).await.unwrap();
        assert_eq!(cancelled.status, StrategyStatus::Cancelled);
        assert!(cancelled.completed_at.is_some());
        assert!(limit.open_orders(None).await.unwrap().is_empty());

        let err = engine
            .update_grid(strategy.strategy_id, Some(dec!(1)), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
        assert!(matches!(
            engine.cancel_strategy(strategy.strategy_id).await,
            Err(EngineError::InvalidState(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_update_unwinds_late_levels() {
        let limit = Arc::new(LimitOrderHandler::new(None));
        let engine = Arc::new(GridEngine::new(Arc::new(SlowLimit(limit.clone()))));
        let strategy = engine.place_order(btc_grid()).await.unwrap();
        let strategy_id = strategy.strategy_id;

        let updating = {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .update_grid(strategy_id, Some(dec!(41000)), None)
                    .await
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(2500)).await;

        let cancelled = engine.cancel_strategy(strategy_id).await.unwrap();
        assert_eq!(cancelled.status, StrategyStatus::Cancelled);

        let updated = updating.await.unwrap().unwrap();
        assert_eq!(updated.status, StrategyStatus::Cancelled);

        let status = engine.get_strategy_status(strategy_id).await.unwrap();
        assert_eq!(status.working_orders().count(), 0);
        // ten original levels plus the three placed before placement stopped
        assert_eq!(status.orders.len(), 13);
        assert!(limit.open_orders(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_failures_still_cancel_strategy() {
        let (engine, gateway) = dispatched();
        let strategy = engine.place_order(btc_grid()).await.unwrap();
        gateway.fail_cancels(true);

        let cancelled = engine.cancel_strategy(strategy.strategy_id).await.unwrap();
        assert_eq!(cancelled.status, StrategyStatus::Cancelled);
        assert_eq!(gateway.cancel_calls(), 10);
    }

    #[tokio::test]
    async fn test_profit_loss_buy_only_is_zero() {
        let (engine, gateway) = dispatched();
        let strategy = engine.place_order(btc_grid()).await.unwrap();
        let first = strategy.orders[0].order_id;
        gateway.fill(first, dec!(40000)).await.unwrap();

        let pnl = engine.get_profit_loss(strategy.strategy_id).await.unwrap();
        assert_eq!(pnl.buy_total, dec!(400));
        assert_eq!(pnl.buy_quantity, dec!(0.01));
        assert_eq!(pnl.gross_profit, dec!(0));
        assert_eq!(pnl.roi_pct, dec!(0));
    }

    #[tokio::test]
    async fn test_profit_loss_with_both_sides() {
        let (engine, gateway) = dispatched();
        let strategy = engine.place_order(btc_grid()).await.unwrap();
        gateway
            .fill(strategy.orders[0].order_id, dec!(40000))
            .await
            .unwrap();

        let mut sell = Order::new(99, "BTCUSDT", Side::Sell, OrderType::Limit, dec!(0.01));
        sell.status = OrderStatus::Filled;
        sell.executed_qty = dec!(0.01);
        sell.avg_price = dec!(41000);
        let shared = engine.store.get(strategy.strategy_id).await.unwrap();
        shared.write().await.orders.push(sell);

        let pnl = engine.get_profit_loss(strategy.strategy_id).await.unwrap();
        assert_eq!(pnl.sell_total, dec!(410));
        assert_eq!(pnl.gross_profit, dec!(10));
        assert_eq!(pnl.roi_pct, dec!(2.5));
    }

    #[tokio::test]
    async fn test_unknown_strategy() {
        let (engine, _) = simulated();
        assert!(matches!(
            engine.get_profit_loss(5).await,
            Err(EngineError::NotFound { .. })
        ));
        assert!(matches!(
            engine.update_grid(5, None, None).await,
            Err(EngineError::NotFound { .. })
        ));
    }
}
