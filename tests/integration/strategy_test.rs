//! TWAP and grid strategies driven through the engine

use order_engine::engine::Engine;
use order_engine::error::EngineError;
use order_engine::gateway::InMemoryGateway;
use order_engine::orders::OrderStatus;
use order_engine::strategy::{
    GridRequest, LevelStatus, StrategyEvent, StrategyStatus, TwapRequest,
};
use order_engine::types::{GridType, Side, TimeInForce};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

fn live_engine() -> (Engine, Arc<InMemoryGateway>) {
    let gateway = Arc::new(InMemoryGateway::new());
    (Engine::new(Some(gateway.clone())), gateway)
}

#[tokio::test(start_paused = true)]
async fn test_twap_runs_to_completion() {
    let engine = Engine::new(None);
    let mut events = engine.twap().subscribe();
    let start = tokio::time::Instant::now();

    let planned = engine
        .twap()
        .place_order(TwapRequest::new("ETHUSDT", "BUY", dec!(1), 4, 15))
        .await
        .unwrap();
    let done = engine.twap().join(planned.strategy_id).await.unwrap();

    assert_eq!(done.status, StrategyStatus::Completed);
    assert_eq!(done.orders.len(), 4);
    assert!(done
        .orders
        .iter()
        .all(|o| o.quantity == dec!(0.25) && o.status == OrderStatus::Filled && o.simulated));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(45) && elapsed < Duration::from_secs(46));

    let mut placed = 0;
    let mut finished = None;
    while let Ok(event) = events.try_recv() {
        match event {
            StrategyEvent::ChildPlaced { .. } => placed += 1,
            StrategyEvent::Finished { status, .. } => finished = Some(status),
            StrategyEvent::ChildFailed { .. } => panic!("unexpected failure"),
        }
    }
    assert_eq!(placed, 4);
    assert_eq!(finished, Some(StrategyStatus::Completed));
    assert!(engine.twap().get_active_strategies().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_one_of_two_concurrent_twaps() {
    let (engine, gateway) = live_engine();
    let twap = engine.twap();

    let a = twap
        .place_order(TwapRequest::new("BTCUSDT", "BUY", dec!(0.03), 3, 60).limit(dec!(40000)))
        .await
        .unwrap();
    let b = twap
        .place_order(TwapRequest::new("ETHUSDT", "SELL", dec!(3), 3, 60).limit(dec!(2500)))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(61)).await;
    let cancelled = twap.cancel_strategy(a.strategy_id).await.unwrap();
    assert_eq!(cancelled.status, StrategyStatus::Cancelled);

    let a = twap.join(a.strategy_id).await.unwrap();
    let b = twap.join(b.strategy_id).await.unwrap();

    assert_eq!(a.status, StrategyStatus::Cancelled);
    assert_eq!(a.orders.len(), 2);
    assert!(a.orders.iter().all(|o| o.status == OrderStatus::Cancelled));
    assert_eq!(gateway.cancel_calls(), 2);

    assert_eq!(b.status, StrategyStatus::Completed);
    assert_eq!(b.orders.len(), 3);
    assert_eq!(engine.open_orders(Some("ETHUSDT")).await.unwrap().len(), 3);
    assert!(engine.open_orders(Some("BTCUSDT")).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_finished_twap_is_invalid() {
    let engine = Engine::new(None);
    let planned = engine
        .twap()
        .place_order(TwapRequest::new("BTCUSDT", "SELL", dec!(0.02), 2, 1))
        .await
        .unwrap();
    engine.twap().join(planned.strategy_id).await.unwrap();

    assert!(matches!(
        engine.twap().cancel_strategy(planned.strategy_id).await,
        Err(EngineError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_grid_lifecycle() {
    let (engine, gateway) = live_engine();
    let grid = engine.grid();

    let strategy = grid
        .place_order(GridRequest::new(
            "BTCUSDT",
            dec!(40000),
            dec!(45000),
            10,
            dec!(0.1),
            GridType::Long,
        ))
        .await
        .unwrap();
    let plan = strategy.grid().unwrap();
    assert_eq!(strategy.status, StrategyStatus::Executing);
    assert_eq!(plan.levels.first().unwrap().price, dec!(40000));
    assert_eq!(plan.levels.last().unwrap().price, dec!(45000));
    assert_eq!(gateway.create_calls(), 10);
    assert!(gateway
        .orders()
        .await
        .iter()
        .all(|o| o.side == Side::Buy && o.time_in_force == Some(TimeInForce::Gtx)));

    let updated = grid
        .update_grid(strategy.strategy_id, Some(dec!(41000)), None)
        .await
        .unwrap();
    let plan = updated.grid().unwrap();
    assert_eq!(gateway.cancel_calls(), 10);
    assert_eq!(gateway.create_calls(), 20);
    assert_eq!(plan.levels.len(), 10);
    assert_eq!(plan.levels[0].price, dec!(41000));
    assert_eq!(plan.levels[9].price, dec!(45000));
    assert!(plan.levels.iter().all(|l| l.status == LevelStatus::Placed));
    assert_eq!(engine.open_orders(None).await.unwrap().len(), 10);

    let cancelled = grid.cancel_strategy(strategy.strategy_id).await.unwrap();
    assert_eq!(cancelled.status, StrategyStatus::Cancelled);
    assert!(engine.open_orders(None).await.unwrap().is_empty());
    assert!(grid.get_active_strategies().await.is_empty());
    assert_eq!(grid.get_all_strategies().await.len(), 1);
}

#[tokio::test]
async fn test_grid_profit_loss_after_fills() {
    let (engine, gateway) = live_engine();
    let strategy = engine
        .grid()
        .place_order(GridRequest::new(
            "ETHUSDT",
            dec!(2000),
            dec!(2400),
            5,
            dec!(1),
            GridType::Long,
        ))
        .await
        .unwrap();

    gateway
        .fill(strategy.orders[0].order_id, dec!(2000))
        .await
        .unwrap();
    gateway
        .fill(strategy.orders[1].order_id, dec!(2100))
        .await
        .unwrap();

    let pnl = engine
        .grid()
        .get_profit_loss(strategy.strategy_id)
        .await
        .unwrap();
    assert_eq!(pnl.buy_quantity, dec!(0.4));
    assert_eq!(pnl.buy_total, dec!(820));
    assert_eq!(pnl.sell_quantity, dec!(0));
    assert_eq!(pnl.gross_profit, dec!(0));
}
