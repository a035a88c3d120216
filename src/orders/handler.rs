//! State and behaviour shared by every order handler

use super::paper::SimulatedIds;
use super::{Order, OrderId};
use crate::error::{EngineError, EngineResult};
use crate::gateway::{CancelAck, CreateOrder, GatewayError, OrderRef, SharedGateway};
use crate::history::OrderHistory;
use crate::telemetry::metrics::{ORDERS_FAILED_TOTAL, ORDERS_TOTAL};
use crate::validation::validate_symbol;
use uuid::Uuid;

/// Client order id attached to dispatched orders
pub fn new_client_order_id() -> String {
    format!("oe-{}", Uuid::new_v4().simple())
}

/// Gateway handle, history and simulated id sequence of one handler
pub struct HandlerCore {
    name: &'static str,
    gateway: Option<SharedGateway>,
    history: OrderHistory,
    ids: SimulatedIds,
}

impl HandlerCore {
    pub fn new(name: &'static str, id_base: u64, gateway: Option<SharedGateway>) -> Self {
        Self {
            name,
            gateway,
            history: OrderHistory::new(),
            ids: SimulatedIds::new(id_base),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Simulate when asked to, or when there is nothing to dispatch to
    pub fn should_simulate(&self, test_mode: bool) -> bool {
        test_mode || self.gateway.is_none()
    }

    pub fn next_simulated_id(&self) -> OrderId {
        self.ids.next_id()
    }

    pub fn history(&self) -> &OrderHistory {
        &self.history
    }

    /// Append an order to history and return it
    pub async fn record(&self, order: Order) -> Order {
        let mode = if order.simulated { "simulated" } else { "live" };
        metrics::counter!(
            ORDERS_TOTAL,
            "handler" => self.name,
            "mode" => mode
        )
        .increment(1);

        tracing::info!(
            handler = self.name,
            order_id = order.order_id,
            symbol = %order.symbol,
            side = %order.side,
            quantity = %order.quantity,
            status = %order.status,
            mode,
            "Order recorded"
        );

        self.history.append(order.clone()).await;
        order
    }

    /// Send an order to the gateway and record the response
    pub async fn dispatch(&self, request: CreateOrder) -> EngineResult<Order> {
        let gateway = self.gateway.as_ref().ok_or(GatewayError::NotConfigured)?;
        let symbol = request.symbol.clone();

        match gateway.create_order(request).await {
            Ok(order) => Ok(self.record(order).await),
            Err(e) => {
                metrics::counter!(ORDERS_FAILED_TOTAL, "handler" => self.name)
                    .increment(1);
                tracing::error!(handler = self.name, %symbol, error = %e, "Order placement failed");
                Err(e.into())
            }
        }
    }

    /// Cancel by order id.
    ///
    /// Terminal orders in history are acknowledged without a remote call.
    /// Without a gateway the result is a simulated acknowledgement.
    pub async fn cancel(&self, symbol: &str, order_id: OrderId) -> EngineResult<CancelAck> {
        let symbol = validate_symbol(symbol)?;

        if let Some(existing) = self.history.find(order_id).await {
            if existing.is_terminal() {
                tracing::debug!(order_id, status = %existing.status, "Cancel on terminal order");
                return Ok(CancelAck {
                    symbol,
                    order_id: Some(order_id),
                    order_list_id: existing.order_list_id,
                    status: existing.status,
                    note: Some(format!("Order already {}", existing.status)),
                });
            }
            if existing.simulated {
                self.mark_cancelled(order_id).await;
                return Ok(CancelAck::simulated(symbol, Some(order_id)));
            }
        }

        let Some(gateway) = self.gateway.as_ref() else {
            self.mark_cancelled(order_id).await;
            tracing::info!(handler = self.name, order_id, "Simulated cancellation");
            return Ok(CancelAck::simulated(symbol, Some(order_id)));
        };

        let ack = gateway
            .cancel_order(&symbol, OrderRef::Id(order_id))
            .await
            .inspect_err(|e| {
                tracing::error!(handler = self.name, order_id, error = %e, "Cancel failed")
            })?;
        self.mark_cancelled(order_id).await;
        tracing::info!(handler = self.name, order_id, %symbol, "Order cancelled");
        Ok(ack)
    }

    /// History first, then the gateway
    pub async fn status(&self, symbol: &str, order_id: OrderId) -> EngineResult<Order> {
        let symbol = validate_symbol(symbol)?;

        if let Some(order) = self.history.find(order_id).await {
            return Ok(order);
        }

        match self.gateway.as_ref() {
            Some(gateway) => Ok(gateway.get_order(&symbol, OrderRef::Id(order_id)).await?),
            None => Err(EngineError::not_found("order", order_id)),
        }
    }

    /// Re-read a dispatched order from the gateway and update history with it
    pub async fn refresh(&self, symbol: &str, order_id: OrderId) -> EngineResult<Order> {
        let local = self.status(symbol, order_id).await?;
        if local.simulated || local.is_terminal() {
            return Ok(local);
        }
        let Some(gateway) = self.gateway.as_ref() else {
            return Ok(local);
        };

        let fresh = gateway
            .get_order(&local.symbol, OrderRef::Id(order_id))
            .await?;
        let replacement = fresh.clone();
        self.history
            .update(order_id, move |o| *o = replacement)
            .await;
        Ok(fresh)
    }

    /// Working orders in history
    pub async fn open_orders(&self, symbol: Option<&str>) -> EngineResult<Vec<Order>> {
        let symbol = symbol.map(validate_symbol).transpose()?;
        Ok(self
            .history
            .filter(|o| {
                !o.is_terminal() && symbol.as_deref().map_or(true, |s| o.symbol == s)
            })
            .await)
    }

    async fn mark_cancelled(&self, order_id: OrderId) {
        self.history
            .update(order_id, |o| {
                o.mark_cancelled();
            })
            .await;
    }
}
