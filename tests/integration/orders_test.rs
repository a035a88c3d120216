//! Order handler flows through the engine

use order_engine::engine::Engine;
use order_engine::error::EngineError;
use order_engine::gateway::InMemoryGateway;
use order_engine::orders::paper::{reference_price, DEFAULT_COMMISSION_RATE};
use order_engine::orders::{
    ListStatus, OcoRequest, OrderHandler, OrderRequest, OrderStatus, StopLimitRequest,
};
use order_engine::types::{OrderType, Side};
use order_engine::validation::ValidationError;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

fn live_engine() -> (Engine, Arc<InMemoryGateway>) {
    let gateway = Arc::new(InMemoryGateway::new());
    (Engine::new(Some(gateway.clone())), gateway)
}

#[tokio::test]
async fn test_simulated_market_fill() {
    let engine = Engine::new(None);

    let order = engine
        .market()
        .place_order(OrderRequest::market("btcusdt", "buy", dec!(0.01)))
        .await
        .unwrap();

    let price = reference_price("BTCUSDT");
    assert_eq!(order.symbol, "BTCUSDT");
    assert_eq!(order.side, Side::Buy);
    assert_eq!(order.status, OrderStatus::Filled);
    assert!(order.simulated);
    assert_eq!(order.executed_qty, dec!(0.01));
    assert_eq!(order.avg_price, price);
    assert_eq!(
        order.total_commission(),
        dec!(0.01) * price * DEFAULT_COMMISSION_RATE
    );
    assert_eq!(engine.market().history().await, vec![order]);
}

#[tokio::test]
async fn test_test_mode_skips_gateway() {
    let (engine, gateway) = live_engine();

    let live = engine
        .market()
        .place_order(OrderRequest::market("ETHUSDT", "SELL", dec!(0.5)))
        .await
        .unwrap();
    assert!(!live.simulated);
    assert_eq!(gateway.create_calls(), 1);

    let simulated = engine
        .market()
        .place_order(OrderRequest::market("ETHUSDT", "SELL", dec!(0.5)).test_mode(true))
        .await
        .unwrap();
    assert!(simulated.simulated);
    assert_eq!(gateway.create_calls(), 1);
}

#[tokio::test]
async fn test_rejections_have_no_side_effects() {
    let (engine, gateway) = live_engine();

    let err = assert_err!(
        engine
            .market()
            .place_order(OrderRequest::market("BTCUSDT", "HOLD", dec!(0.01)))
            .await
    );
    assert!(err.is_rejection());

    assert_err!(
        engine
            .limit()
            .place_order(OrderRequest::limit("BTCUSDT", "BUY", dec!(0.0001), dec!(40000)))
            .await
    );
    assert_err!(
        engine
            .limit()
            .place_order(OrderRequest::limit("XYZUSDT", "BUY", dec!(1), dec!(10)))
            .await
    );

    assert_eq!(gateway.create_calls(), 0);
    assert!(engine.market().history().await.is_empty());
    assert!(engine.limit().history().await.is_empty());
}

#[tokio::test]
async fn test_stop_direction_enforced() {
    let engine = Engine::new(None);

    let err = engine
        .stop_limit()
        .place_order(StopLimitRequest::new(
            "BTCUSDT",
            "BUY",
            dec!(0.01),
            dec!(43000),
            dec!(42900),
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::InvalidStopLogic(_))
    ));

    let order = assert_ok!(
        engine
            .stop_limit()
            .place_order(StopLimitRequest::new(
                "BTCUSDT",
                "SELL",
                dec!(0.01),
                dec!(43000),
                dec!(42900),
            ))
            .await
    );
    assert_eq!(order.order_type, OrderType::StopLimit);
    assert_eq!(order.stop_price, Some(dec!(43000)));
    assert_eq!(order.price, Some(dec!(42900)));
    assert_eq!(order.status, OrderStatus::New);
}

#[tokio::test]
async fn test_oco_place_and_cancel() {
    let (engine, gateway) = live_engine();

    let oco = engine
        .oco()
        .place_order(OcoRequest::new(
            "BTCUSDT",
            "SELL",
            dec!(0.01),
            dec!(40000),
            dec!(45000),
        ))
        .await
        .unwrap();
    assert_eq!(gateway.create_calls(), 2);
    assert_eq!(oco.list_status, ListStatus::Executing);
    assert!(oco
        .legs()
        .iter()
        .all(|leg| leg.order_list_id == Some(oco.order_list_id) && !leg.simulated));
    assert_eq!(engine.open_orders(Some("BTCUSDT")).await.unwrap().len(), 2);

    let ack = engine
        .oco()
        .cancel_order("BTCUSDT", oco.order_list_id)
        .await
        .unwrap();
    assert_eq!(ack.order_list_id, Some(oco.order_list_id));
    assert_eq!(gateway.cancel_calls(), 2);

    let after = engine
        .oco()
        .get_order_status("BTCUSDT", oco.order_list_id)
        .await
        .unwrap();
    assert_eq!(after.list_status, ListStatus::AllDone);
    assert!(after.legs().iter().all(|leg| leg.status == OrderStatus::Cancelled));
    assert!(engine.open_orders(Some("BTCUSDT")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_oco_second_leg_failure_unwinds_first() {
    let (engine, gateway) = live_engine();
    gateway.reject_when(|req| req.order_type == OrderType::StopLimit);

    assert_err!(
        engine
            .oco()
            .place_order(OcoRequest::new(
                "BTCUSDT",
                "BUY",
                dec!(0.01),
                dec!(45000),
                dec!(40000),
            ))
            .await
    );
    assert!(engine.open_orders(None).await.unwrap().is_empty());
    assert!(engine.oco().history().await.is_empty());
}

#[tokio::test]
async fn test_replace_limit_order() {
    let (engine, gateway) = live_engine();

    let original = engine
        .limit()
        .place_order(OrderRequest::limit("ETHUSDT", "BUY", dec!(1), dec!(2000)))
        .await
        .unwrap();
    let replaced = engine
        .limit()
        .replace_order(
            "ETHUSDT",
            original.order_id,
            OrderRequest::limit("ETHUSDT", "BUY", dec!(1), dec!(2100)),
        )
        .await
        .unwrap();

    assert_ne!(replaced.order_id, original.order_id);
    assert_eq!(replaced.price, Some(dec!(2100)));
    assert_eq!(gateway.cancel_calls(), 1);

    let open = engine.open_orders(Some("ETHUSDT")).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].order_id, replaced.order_id);

    let status = engine
        .find_order("ETHUSDT", original.order_id)
        .await
        .unwrap();
    assert_eq!(status.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_account_through_gateway() {
    let (engine, _) = live_engine();
    let account = engine.account().await.unwrap();
    assert!(account.positions.is_empty());

    let offline = Engine::new(None);
    assert!(offline.account().await.is_err());
}

#[tokio::test]
async fn test_status_lookup_is_stable() {
    let engine = Engine::new(None);
    let placed = engine
        .market()
        .place_order(OrderRequest::market("BTCUSDT", "BUY", dec!(0.01)).test_mode(true))
        .await
        .unwrap();

    let first = engine.market().status("BTCUSDT", placed.order_id).await.unwrap();
    let second = engine.market().status("BTCUSDT", placed.order_id).await.unwrap();
    assert_eq!(first, placed);
    assert_eq!(first, second);
}
