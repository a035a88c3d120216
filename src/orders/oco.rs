//! One-cancels-the-other order handler
//!
//! An OCO pair is a take-profit leg and a stop-loss leg sharing one list id.
//! List ids are assigned here; dispatched legs carry the list id in their
//! client order id (`oco-<list>-tp`, `oco-<list>-sl`) so they can be found
//! again on the exchange.

use super::paper::{simulate_resting, SimulatedIds, OCO_LEG_ID_BASE, OCO_LIST_ID_BASE};
use super::{ListStatus, OcoOrder, Order, OrderListId};
use crate::error::{EngineError, EngineResult};
use crate::gateway::{CancelAck, CreateOrder, GatewayError, OrderRef, SharedGateway};
use crate::history::History;
use crate::orders::OrderStatus;
use crate::telemetry::metrics::ORDERS_TOTAL;
use crate::types::{OrderType, Side, TimeInForce, WorkingType};
use crate::validation::{
    validate_oco_prices, validate_price, validate_quantity, validate_side, validate_symbol,
    ValidationError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Take-profit and stop-loss parameters for one position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcoRequest {
    pub symbol: String,
    pub side: String,
    pub quantity: Decimal,
    pub take_profit_price: Decimal,
    /// Stop-loss trigger
    pub stop_loss_price: Decimal,
    /// Stop-loss execution price, defaults to the trigger
    pub stop_loss_limit_price: Option<Decimal>,
    pub working_type: WorkingType,
    pub test_mode: bool,
}

impl OcoRequest {
    pub fn new(
        symbol: impl Into<String>,
        side: impl Into<String>,
        quantity: Decimal,
        take_profit_price: Decimal,
        stop_loss_price: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side: side.into(),
            quantity,
            take_profit_price,
            stop_loss_price,
            stop_loss_limit_price: None,
            working_type: WorkingType::default(),
            test_mode: false,
        }
    }

    pub fn stop_loss_limit_price(mut self, price: Decimal) -> Self {
        self.stop_loss_limit_price = Some(price);
        self
    }

    pub fn working_type(mut self, working_type: WorkingType) -> Self {
        self.working_type = working_type;
        self
    }

    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }
}

struct OcoParams {
    symbol: String,
    side: Side,
    quantity: Decimal,
    take_profit: Decimal,
    stop_loss: Decimal,
    stop_loss_limit: Decimal,
}

fn validate(request: &OcoRequest) -> Result<OcoParams, ValidationError> {
    let symbol = validate_symbol(&request.symbol)?;
    let side = validate_side(&request.side)?;
    let quantity = validate_quantity(request.quantity)?;
    let take_profit = validate_price(request.take_profit_price)?;
    let stop_loss = validate_price(request.stop_loss_price)?;
    let stop_loss_limit = request
        .stop_loss_limit_price
        .map(validate_price)
        .transpose()?
        .unwrap_or(stop_loss);

    validate_oco_prices(side, take_profit, stop_loss)?;

    Ok(OcoParams {
        symbol,
        side,
        quantity,
        take_profit,
        stop_loss,
        stop_loss_limit,
    })
}

fn leg_client_id(list_id: OrderListId, leg: &str) -> String {
    format!("oco-{list_id}-{leg}")
}

/// Places and manages OCO pairs
pub struct OcoOrderHandler {
    gateway: Option<SharedGateway>,
    history: History<OcoOrder>,
    leg_ids: SimulatedIds,
    list_ids: SimulatedIds,
}

impl OcoOrderHandler {
    pub fn new(gateway: Option<SharedGateway>) -> Self {
        Self {
            gateway,
            history: History::new(),
            leg_ids: SimulatedIds::new(OCO_LEG_ID_BASE),
            list_ids: SimulatedIds::new(OCO_LIST_ID_BASE),
        }
    }

    pub async fn place_order(&self, request: OcoRequest) -> EngineResult<OcoOrder> {
        let params = validate(&request).inspect_err(|e| {
            tracing::warn!(
                order_kind = "OCO",
                symbol = %request.symbol,
                side = %request.side,
                error = %e,
                "Validation rejected order"
            )
        })?;
        let list_id = self.list_ids.next_id();

        let (take_profit, stop_loss) = match self.gateway.as_ref() {
            Some(gateway) if !request.test_mode => {
                self.dispatch_legs(gateway, list_id, &params, request.working_type)
                    .await?
            }
            _ => self.simulate_legs(&params, request.working_type),
        };

        let mut oco = OcoOrder {
            order_list_id: list_id,
            symbol: params.symbol,
            side: params.side,
            quantity: params.quantity,
            take_profit,
            stop_loss,
            list_status: ListStatus::Executing,
            update_time: Utc::now(),
        };
        oco.take_profit.order_list_id = Some(list_id);
        oco.stop_loss.order_list_id = Some(list_id);

        metrics::counter!(ORDERS_TOTAL, "handler" => "oco").increment(2);
        tracing::info!(
            order_list_id = list_id,
            symbol = %oco.symbol,
            side = %oco.side,
            quantity = %oco.quantity,
            take_profit = %params.take_profit,
            stop_loss = %params.stop_loss,
            "OCO order placed"
        );

        self.history.append(oco.clone()).await;
        Ok(oco)
    }

    fn simulate_legs(&self, params: &OcoParams, working_type: WorkingType) -> (Order, Order) {
        let mut take_profit = simulate_resting(
            self.leg_ids.next_id(),
            &params.symbol,
            params.side,
            OrderType::TakeProfit,
            params.quantity,
        );
        take_profit.price = Some(params.take_profit);
        take_profit.stop_price = Some(params.take_profit);
        take_profit.time_in_force = Some(TimeInForce::Gtc);
        take_profit.working_type = Some(working_type);

        let mut stop_loss = simulate_resting(
            self.leg_ids.next_id(),
            &params.symbol,
            params.side,
            OrderType::StopLimit,
            params.quantity,
        );
        stop_loss.price = Some(params.stop_loss_limit);
        stop_loss.stop_price = Some(params.stop_loss);
        stop_loss.time_in_force = Some(TimeInForce::Gtc);
        stop_loss.working_type = Some(working_type);

        (take_profit, stop_loss)
    }

    async fn dispatch_legs(
        &self,
        gateway: &SharedGateway,
        list_id: OrderListId,
        params: &OcoParams,
        working_type: WorkingType,
    ) -> EngineResult<(Order, Order)> {
        let take_profit = gateway
            .create_order(
                CreateOrder::new(&params.symbol, params.side, OrderType::TakeProfit)
                    .quantity(params.quantity)
                    .price(params.take_profit)
                    .stop_price(params.take_profit)
                    .time_in_force(TimeInForce::Gtc)
                    .working_type(working_type)
                    .client_order_id(leg_client_id(list_id, "tp")),
            )
            .await
            .inspect_err(|e| {
                tracing::error!(order_list_id = list_id, error = %e, "Take-profit leg failed")
            })?;

        let stop_loss = gateway
            .create_order(
                CreateOrder::new(&params.symbol, params.side, OrderType::StopLimit)
                    .quantity(params.quantity)
                    .price(params.stop_loss_limit)
                    .stop_price(params.stop_loss)
                    .time_in_force(TimeInForce::Gtc)
                    .working_type(working_type)
                    .client_order_id(leg_client_id(list_id, "sl")),
            )
            .await;

        match stop_loss {
            Ok(stop_loss) => Ok((take_profit, stop_loss)),
            Err(e) => {
                tracing::error!(order_list_id = list_id, error = %e, "Stop-loss leg failed");
                if let Err(cancel_err) = gateway
                    .cancel_order(&params.symbol, OrderRef::Id(take_profit.order_id))
                    .await
                {
                    tracing::error!(
                        order_id = take_profit.order_id,
                        error = %cancel_err,
                        "Failed to roll back take-profit leg"
                    );
                }
                Err(e.into())
            }
        }
    }

    /// Cancel both legs of a list
    pub async fn cancel_order(
        &self,
        symbol: &str,
        order_list_id: OrderListId,
    ) -> EngineResult<CancelAck> {
        let symbol = validate_symbol(symbol)?;

        let Some(oco) = self.history.find(order_list_id).await else {
            if self.gateway.is_none() {
                let mut ack = CancelAck::simulated(symbol, None);
                ack.order_list_id = Some(order_list_id);
                return Ok(ack);
            }
            return Err(EngineError::not_found("order list", order_list_id));
        };

        if oco.list_status == ListStatus::AllDone {
            return Ok(CancelAck {
                symbol,
                order_id: None,
                order_list_id: Some(order_list_id),
                status: OrderStatus::Cancelled,
                note: Some("Order list already done".to_string()),
            });
        }

        let mut first_error: Option<GatewayError> = None;
        let mut cancelled = vec![];
        for leg in oco.legs() {
            if leg.is_terminal() {
                continue;
            }
            match self.gateway.as_ref() {
                Some(gateway) if !leg.simulated => {
                    match gateway.cancel_order(&symbol, OrderRef::Id(leg.order_id)).await {
                        Ok(_) => cancelled.push(leg.order_id),
                        Err(e) => {
                            tracing::error!(
                                order_list_id,
                                order_id = leg.order_id,
                                error = %e,
                                "Failed to cancel OCO leg"
                            );
                            first_error.get_or_insert(e);
                        }
                    }
                }
                _ => cancelled.push(leg.order_id),
            }
        }

        let all_done = first_error.is_none();
        self.history
            .update(order_list_id, |oco| {
                for leg in [&mut oco.take_profit, &mut oco.stop_loss] {
                    if cancelled.contains(&leg.order_id) {
                        leg.mark_cancelled();
                    }
                }
                if all_done {
                    oco.list_status = ListStatus::AllDone;
                }
                oco.update_time = Utc::now();
            })
            .await;

        if let Some(e) = first_error {
            return Err(e.into());
        }

        tracing::info!(order_list_id, %symbol, "OCO order list cancelled");
        Ok(CancelAck {
            symbol,
            order_id: None,
            order_list_id: Some(order_list_id),
            status: OrderStatus::Cancelled,
            note: None,
        })
    }

    /// History first, then the exchange's open orders for the list
    pub async fn get_order_status(
        &self,
        symbol: &str,
        order_list_id: OrderListId,
    ) -> EngineResult<OcoOrder> {
        let symbol = validate_symbol(symbol)?;

        if let Some(oco) = self.history.find(order_list_id).await {
            return Ok(oco);
        }

        let gateway = self
            .gateway
            .as_ref()
            .ok_or_else(|| EngineError::not_found("order list", order_list_id))?;
        let open = gateway.list_open_orders(Some(&symbol)).await?;
        let find_leg = |leg: &str| {
            let client_id = leg_client_id(order_list_id, leg);
            open.iter()
                .find(|o| o.client_order_id.as_deref() == Some(client_id.as_str()))
                .cloned()
        };

        match (find_leg("tp"), find_leg("sl")) {
            (Some(mut take_profit), Some(mut stop_loss)) => {
                take_profit.order_list_id = Some(order_list_id);
                stop_loss.order_list_id = Some(order_list_id);
                Ok(OcoOrder {
                    order_list_id,
                    symbol,
                    side: take_profit.side,
                    quantity: take_profit.quantity,
                    update_time: take_profit.update_time.max(stop_loss.update_time),
                    take_profit,
                    stop_loss,
                    list_status: ListStatus::Executing,
                })
            }
            _ => Err(EngineError::not_found("order list", order_list_id)),
        }
    }

    pub async fn history(&self) -> Vec<OcoOrder> {
        self.history.all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{ExchangeGateway, InMemoryGateway};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn buy_request() -> OcoRequest {
        OcoRequest::new("BTCUSDT", "BUY", dec!(0.01), dec!(45000), dec!(40000))
    }

    #[tokio::test]
    async fn test_simulated_pair() {
        let handler = OcoOrderHandler::new(None);

        let oco = handler.place_order(buy_request()).await.unwrap();

        assert_eq!(oco.order_list_id, 5_000_000_001);
        assert_eq!(oco.list_status, ListStatus::Executing);
        assert_eq!(oco.take_profit.order_id, 4_000_000_001);
        assert_eq!(oco.stop_loss.order_id, 4_000_000_002);
        assert_eq!(oco.take_profit.order_type, OrderType::TakeProfit);
        assert_eq!(oco.stop_loss.order_type, OrderType::StopLimit);
        for leg in oco.legs() {
            assert_eq!(leg.order_list_id, Some(5_000_000_001));
            assert_eq!(leg.status, OrderStatus::New);
        }
        // limit defaults to the trigger
        assert_eq!(oco.stop_loss.price, Some(dec!(40000)));
    }

    #[tokio::test]
    async fn test_price_ordering_enforced() {
        let handler = OcoOrderHandler::new(None);

        for (side, tp, sl) in [
            ("BUY", dec!(40000), dec!(45000)),
            ("BUY", dec!(42000), dec!(42000)),
            ("SELL", dec!(45000), dec!(40000)),
            ("SELL", dec!(42000), dec!(42000)),
        ] {
            let err = handler
                .place_order(OcoRequest::new("BTCUSDT", side, dec!(0.01), tp, sl))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                EngineError::Validation(ValidationError::InvalidOcoLogic(_))
            ));
        }

        handler
            .place_order(OcoRequest::new(
                "BTCUSDT",
                "SELL",
                dec!(0.01),
                dec!(40000),
                dec!(45000),
            ))
            .await
            .unwrap();
        assert_eq!(handler.history().await.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_removes_both_legs() {
        let handler = OcoOrderHandler::new(None);
        let oco = handler.place_order(buy_request()).await.unwrap();

        let ack = handler
            .cancel_order("BTCUSDT", oco.order_list_id)
            .await
            .unwrap();
        assert_eq!(ack.order_list_id, Some(oco.order_list_id));

        let stored = handler
            .get_order_status("BTCUSDT", oco.order_list_id)
            .await
            .unwrap();
        assert_eq!(stored.list_status, ListStatus::AllDone);
        assert!(stored.legs().iter().all(|l| l.status == OrderStatus::Cancelled));
    }

    #[tokio::test]
    async fn test_dispatch_and_remote_lookup() {
        let gateway = Arc::new(InMemoryGateway::new());
        let handler = OcoOrderHandler::new(Some(gateway.clone()));
        let oco = handler
            .place_order(buy_request().stop_loss_limit_price(dec!(39900)))
            .await
            .unwrap();

        assert_eq!(gateway.create_calls(), 2);
        assert_eq!(oco.stop_loss.price, Some(dec!(39900)));
        assert_eq!(oco.stop_loss.stop_price, Some(dec!(40000)));

        let fresh = OcoOrderHandler::new(Some(gateway.clone()));
        let remote = fresh
            .get_order_status("BTCUSDT", oco.order_list_id)
            .await
            .unwrap();
        assert_eq!(remote.take_profit.order_id, oco.take_profit.order_id);
        assert_eq!(remote.stop_loss.order_id, oco.stop_loss.order_id);

        handler
            .cancel_order("BTCUSDT", oco.order_list_id)
            .await
            .unwrap();
        assert_eq!(gateway.cancel_calls(), 2);
        assert!(gateway.list_open_orders(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_second_leg_rolls_back_first() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.reject_when(|req| req.order_type == OrderType::StopLimit);
        let handler = OcoOrderHandler::new(Some(gateway.clone()));

        let err = handler.place_order(buy_request()).await.unwrap_err();
        assert!(matches!(err, EngineError::Gateway(_)));
        assert_eq!(gateway.cancel_calls(), 1);
        assert!(gateway.list_open_orders(None).await.unwrap().is_empty());
        assert!(handler.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_list() {
        let offline = OcoOrderHandler::new(None);
        let ack = offline.cancel_order("BTCUSDT", 7).await.unwrap();
        assert_eq!(ack.order_list_id, Some(7));
        assert!(offline.get_order_status("BTCUSDT", 7).await.is_err());

        let online = OcoOrderHandler::new(Some(Arc::new(InMemoryGateway::new())));
        let err = online.cancel_order("BTCUSDT", 7).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { id: 7, .. }));
    }
}
