//! TWAP engine
//!
//! Splits a parent quantity into equal child orders issued at a fixed
//! interval. Every strategy runs in its own task with its own cancellation
//! token, a child of the engine's root token.

use super::{Strategy, StrategyEvent, StrategyId, StrategyIdGenerator, StrategyKind};
use super::{StrategyStatus, TwapPlan};
use crate::error::{EngineError, EngineResult};
use crate::history::{SharedStrategy, StrategyStore};
use crate::orders::{Order, OrderHandler, OrderRequest};
use crate::telemetry::metrics::STRATEGY_STEP_FAILURES_TOTAL;
use crate::types::OrderType;
use crate::validation::{
    validate_interval, validate_price, validate_quantity, validate_side, validate_step_count,
    validate_symbol, ValidationError,
};
use futures_util::FutureExt;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const EVENT_CAPACITY: usize = 1024;

/// Parameters for a TWAP program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwapRequest {
    pub symbol: String,
    pub side: String,
    pub total_quantity: Decimal,
    pub num_splits: usize,
    pub interval_secs: i64,
    /// MARKET or LIMIT children
    pub order_type: OrderType,
    /// Required for LIMIT children
    pub limit_price: Option<Decimal>,
    pub test_mode: bool,
}

impl TwapRequest {
    pub fn new(
        symbol: impl Into<String>,
        side: impl Into<String>,
        total_quantity: Decimal,
        num_splits: usize,
        interval_secs: i64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side: side.into(),
            total_quantity,
            num_splits,
            interval_secs,
            order_type: OrderType::Market,
            limit_price: None,
            test_mode: false,
        }
    }

    /// Use LIMIT children at `price`
    pub fn limit(mut self, price: Decimal) -> Self {
        self.order_type = OrderType::Limit;
        self.limit_price = Some(price);
        self
    }

    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    fn plan(&self) -> Result<(String, TwapPlan), ValidationError> {
        let symbol = validate_symbol(&self.symbol)?;
        let side = validate_side(&self.side)?;
        let total = validate_quantity(self.total_quantity)?;
        let num_splits = validate_step_count(self.num_splits, "splits")?;
        let interval_secs = validate_interval(self.interval_secs)?;

        let limit_price = match self.order_type {
            OrderType::Market => None,
            OrderType::Limit => {
                let price = self.limit_price.ok_or_else(|| {
                    ValidationError::InvalidPrice("LIMIT children require a price".to_string())
                })?;
                Some(validate_price(price)?)
            }
            other => {
                return Err(ValidationError::InvalidOrderType {
                    order_type: other.to_string(),
                    valid: "MARKET, LIMIT".to_string(),
                })
            }
        };

        let quantity_per_split = total / Decimal::from(num_splits);
        validate_quantity(quantity_per_split).map_err(|e| {
            ValidationError::InvalidStrategy(format!(
                "quantity per split ({quantity_per_split}) is out of bounds: {e}"
            ))
        })?;

        Ok((
            symbol,
            TwapPlan {
                side,
                num_splits,
                interval_secs,
                quantity_per_split,
                child_order_type: self.order_type,
                limit_price,
                test_mode: self.test_mode,
                failed_steps: vec![],
            },
        ))
    }
}

struct TwapTask {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// Running loops by strategy; a loop removes its own entry when it ends
type TaskMap = Arc<Mutex<HashMap<StrategyId, TwapTask>>>;

/// Runs TWAP programs concurrently
pub struct TwapEngine {
    market: Arc<dyn OrderHandler>,
    limit: Arc<dyn OrderHandler>,
    store: StrategyStore,
    ids: Arc<StrategyIdGenerator>,
    root: CancellationToken,
    tasks: TaskMap,
    events: broadcast::Sender<StrategyEvent>,
}

impl TwapEngine {
    pub fn new(market: Arc<dyn OrderHandler>, limit: Arc<dyn OrderHandler>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            market,
            limit,
            store: StrategyStore::new(),
            ids: Arc::new(StrategyIdGenerator::new()),
            root: CancellationToken::new(),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    /// Share an id generator with other engines
    pub fn with_id_generator(mut self, ids: Arc<StrategyIdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Receive progress events from every strategy
    pub fn subscribe(&self) -> broadcast::Receiver<StrategyEvent> {
        self.events.subscribe()
    }

    fn handler_for(&self, order_type: OrderType) -> Arc<dyn OrderHandler> {
        match order_type {
            OrderType::Limit => self.limit.clone(),
            _ => self.market.clone(),
        }
    }

    /// Validate, store and start a TWAP program.
    ///
    /// Returns the strategy as planned; pacing continues in the background.
    pub async fn place_order(&self, request: TwapRequest) -> EngineResult<Strategy> {
        let (symbol, plan) = request.plan().inspect_err(|e| {
            tracing::warn!(
                order_kind = "TWAP",
                symbol = %request.symbol,
                error = %e,
                "Validation rejected order"
            )
        })?;

        let strategy_id = self.ids.next_id();
        let strategy = Strategy::new(
            strategy_id,
            &symbol,
            request.total_quantity,
            StrategyKind::Twap(plan.clone()),
        );
        let shared = self.store.insert(strategy.clone()).await;

        tracing::info!(
            strategy_id,
            %symbol,
            side = %plan.side,
            total_quantity = %request.total_quantity,
            num_splits = plan.num_splits,
            interval_secs = plan.interval_secs,
            "TWAP strategy planned"
        );

        let token = self.root.child_token();
        let run = TwapRun {
            strategy_id,
            symbol,
            plan: plan.clone(),
            shared,
            handler: self.handler_for(plan.child_order_type),
            token: token.clone(),
            events: self.events.clone(),
            tasks: self.tasks.clone(),
        };

        // Held across the spawn so the entry exists before the loop can remove it
        let mut tasks = self.tasks.lock().await;
        let handle = tokio::spawn(run.execute());
        tasks.insert(
            strategy_id,
            TwapTask {
                token,
                handle: Some(handle),
            },
        );
        Ok(strategy)
    }

    /// Stop a strategy and cancel its working children.
    ///
    /// The strategy is CANCELLED on return even when some children could not
    /// be cancelled.
    pub async fn cancel_strategy(&self, strategy_id: StrategyId) -> EngineResult<Strategy> {
        let shared = self
            .store
            .get(strategy_id)
            .await
            .ok_or_else(|| EngineError::not_found("strategy", strategy_id))?;

        if let Some(task) = self.tasks.lock().await.get(&strategy_id) {
            task.token.cancel();
        }

        let (symbol, working) = {
            let mut strategy = shared.write().await;
            if !strategy.transition(StrategyStatus::Cancelled) {
                return Err(EngineError::InvalidState(format!(
                    "strategy {strategy_id} is already {}",
                    strategy.status
                )));
            }
            let working: Vec<Order> = strategy.working_orders().cloned().collect();
            (strategy.symbol.clone(), working)
        };

        cancel_children(&shared, &symbol, &working, |t| self.handler_for(t)).await;

        tracing::info!(strategy_id, cancelled_children = working.len(), "TWAP strategy cancelled");
        let strategy = shared.read().await.clone();
        Ok(strategy)
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

    /// Wait for a strategy's pacing loop to finish
    pub async fn join(&self, strategy_id: StrategyId) -> EngineResult<Strategy> {
        let handle = self
            .tasks
            .lock()
            .await
            .remove(&strategy_id)
            .and_then(|task| task.handle);

        if let Some(handle) = handle {
            handle.await.map_err(|e| {
                EngineError::InvalidState(format!("strategy {strategy_id} task aborted: {e}"))
            })?;
        }
        self.get_strategy_status(strategy_id).await
    }

    /// Loops still running or not yet joined
    pub async fn running(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Stop every running strategy and wait for the loops to exit
    pub async fn shutdown(&self) {
        self.root.cancel();
        let handles: Vec<JoinHandle<()>> = self
            .tasks
            .lock()
            .await
            .values_mut()
            .filter_map(|task| task.handle.take())
            .collect();

        tracing::info!(running = handles.len(), "Shutting down TWAP engine");
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "TWAP task did not exit cleanly");
            }
        }
    }
}

/// Best-effort cancellation of child orders; failures are logged and skipped
async fn cancel_children<F>(shared: &SharedStrategy, symbol: &str, children: &[Order], handler: F)
where
    F: Fn(OrderType) -> Arc<dyn OrderHandler>,
{
    for child in children {
        match handler(child.order_type).cancel(symbol, child.order_id).await {
            Ok(_) => {
                let mut strategy = shared.write().await;
                if let Some(order) = strategy
                    .orders
                    .iter_mut()
                    .find(|o| o.order_id == child.order_id)
                {
                    order.mark_cancelled();
                }
            }
            Err(e) => {
                tracing::warn!(order_id = child.order_id, error = %e, "Failed to cancel child order")
            }
        }
    }
}

/// State owned by one pacing loop
struct TwapRun {
    strategy_id: StrategyId,
    symbol: String,
    plan: TwapPlan,
    shared: SharedStrategy,
    handler: Arc<dyn OrderHandler>,
    token: CancellationToken,
    events: broadcast::Sender<StrategyEvent>,
    tasks: TaskMap,
}

impl TwapRun {
    async fn execute(self) {
        let strategy_id = self.strategy_id;
        let outcome = AssertUnwindSafe(self.pace()).catch_unwind().await;

        let target = match outcome {
            Ok(status) => status,
            Err(_) => {
                tracing::error!(strategy_id, "TWAP pacing loop panicked");
                StrategyStatus::Failed
            }
        };

        let status = {
            let mut strategy = self.shared.write().await;
            strategy.transition(target);
            strategy.status
        };
        self.tasks.lock().await.remove(&strategy_id);
        let _ = self.events.send(StrategyEvent::Finished {
            strategy_id,
            status,
        });
    }

    fn child_request(&self) -> OrderRequest {
        let side = self.plan.side.as_str();
        let request = match self.plan.limit_price {
            Some(price) => {
                OrderRequest::limit(&self.symbol, side, self.plan.quantity_per_split, price)
            }
            None => OrderRequest::market(&self.symbol, side, self.plan.quantity_per_split),
        };
        request.test_mode(self.plan.test_mode)
    }

    /// Issue children until done or cancelled; returns the status to end in
    async fn pace(&self) -> StrategyStatus {
        {
            let mut strategy = self.shared.write().await;
            if !strategy.transition(StrategyStatus::Executing) {
                return strategy.status;
            }
        }
        let interval = Duration::from_secs(self.plan.interval_secs);

        for step in 0..self.plan.num_splits {
            if self.token.is_cancelled() {
                tracing::info!(strategy_id = self.strategy_id, step, "TWAP stopped");
                return StrategyStatus::Stopped;
            }

            match self.handler.place(self.child_request()).await {
                Ok(order) => self.record_child(step, order).await,
                Err(e) => self.record_failure(step, e).await,
            }

            if step + 1 < self.plan.num_splits {
                tokio::select! {
                    _ = self.token.cancelled() => {
                        tracing::info!(strategy_id = self.strategy_id, step, "TWAP stopped");
                        return StrategyStatus::Stopped;
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        }

        StrategyStatus::Completed
    }

    async fn record_child(&self, step: usize, order: Order) {
        tracing::info!(
            strategy_id = self.strategy_id,
            step,
            order_id = order.order_id,
            quantity = %order.quantity,
            "TWAP child placed"
        );

        // Checked under the lock so a concurrent cancel either sees this child
        // or leaves it to us.
        let cancelled = {
            let mut strategy = self.shared.write().await;
            strategy.orders.push(order.clone());
            self.token.is_cancelled()
        };

        let _ = self.events.send(StrategyEvent::ChildPlaced {
            strategy_id: self.strategy_id,
            step,
            order: order.clone(),
        });

        if cancelled && !order.is_terminal() {
            let handler = self.handler.clone();
            cancel_children(&self.shared, &self.symbol, &[order], move |_| handler.clone()).await;
        }
    }

    async fn record_failure(&self, step: usize, error: EngineError) {
        tracing::error!(
            strategy_id = self.strategy_id,
            step,
            error = %error,
            "TWAP child failed"
        );
        metrics::counter!(STRATEGY_STEP_FAILURES_TOTAL, "strategy" => "twap")
            .increment(1);

        if let Some(plan) = self.shared.write().await.twap_mut() {
            plan.failed_steps.push(step);
        }
        let _ = self.events.send(StrategyEvent::ChildFailed {
            strategy_id: self.strategy_id,
            step,
            error: error.to_string(),
        });
    }
}
