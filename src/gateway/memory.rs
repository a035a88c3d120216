//! In-process exchange used for dry runs and tests

use super::{AccountInfo, CancelAck, CreateOrder, ExchangeGateway, GatewayError, OrderRef};
use crate::orders::paper::reference_price;
use crate::orders::{Fill, Order, OrderStatus};
use crate::types::OrderType;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

type RejectRule = Arc<dyn Fn(&CreateOrder) -> bool + Send + Sync>;

/// Exchange stand-in that keeps orders in memory.
///
/// Market orders fill at the reference price; every other type rests as NEW
/// until [`InMemoryGateway::fill`] executes it. Rejection rules let callers
/// fail selected requests.
pub struct InMemoryGateway {
    next_id: AtomicU64,
    orders: RwLock<Vec<Order>>,
    reject_rule: Mutex<Option<RejectRule>>,
    fail_cancels: Mutex<bool>,
    create_calls: AtomicUsize,
    cancel_calls: AtomicUsize,
    get_calls: AtomicUsize,
    account: AccountInfo,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            orders: RwLock::new(vec![]),
            reject_rule: Mutex::new(None),
            fail_cancels: Mutex::new(false),
            create_calls: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            account: AccountInfo::default(),
        }
    }

    pub fn with_account(mut self, account: AccountInfo) -> Self {
        self.account = account;
        self
    }

    /// Reject every create request matching `rule`
    pub fn reject_when<F>(&self, rule: F)
    where
        F: Fn(&CreateOrder) -> bool + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.reject_rule.lock() {
            *slot = Some(Arc::new(rule));
        }
    }

    /// Make every cancel request fail
    pub fn fail_cancels(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_cancels.lock() {
            *flag = fail;
        }
    }

    /// Execute a resting order in full at `price`
    pub async fn fill(&self, order_id: u64, price: Decimal) -> Option<Order> {
        let mut orders = self.orders.write().await;
        let order = orders.iter_mut().find(|o| o.order_id == order_id)?;
        if order.is_terminal() {
            return Some(order.clone());
        }
        order.status = OrderStatus::Filled;
        order.executed_qty = order.quantity;
        order.avg_price = price;
        order.fills.push(Fill {
            price,
            qty: order.quantity,
            commission: Decimal::ZERO,
            commission_asset: "USDT".to_string(),
        });
        order.update_time = Utc::now();
        Some(order.clone())
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::Relaxed)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::Relaxed)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::Relaxed)
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.orders.read().await.clone()
    }

    fn rejects(&self, request: &CreateOrder) -> bool {
        let rule = self.reject_rule.lock().ok().and_then(|slot| slot.clone());
        rule.is_some_and(|rule| rule(request))
    }

    fn find_index(orders: &[Order], target: &OrderRef) -> Option<usize> {
        orders.iter().position(|o| match target {
            OrderRef::Id(id) => o.order_id == *id,
            OrderRef::ClientId(id) => o.client_order_id.as_deref() == Some(id.as_str()),
        })
    }

    fn unknown_order() -> GatewayError {
        GatewayError::Rejected {
            status: 400,
            code: Some(-2013),
            message: "Order does not exist.".to_string(),
        }
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeGateway for InMemoryGateway {
    async fn create_order(&self, request: CreateOrder) -> Result<Order, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::Relaxed);

        if self.rejects(&request) {
            return Err(GatewayError::Rejected {
                status: 400,
                code: Some(-2010),
                message: "Order would immediately trigger.".to_string(),
            });
        }
        let quantity = request
            .quantity
            .ok_or_else(|| GatewayError::InvalidRequest("quantity is required".to_string()))?;

        let order_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut order = Order::new(
            order_id,
            &request.symbol,
            request.side,
            request.order_type,
            quantity,
        );
        order.client_order_id = request.client_order_id;
        order.price = request.price;
        order.stop_price = request.stop_price;
        order.time_in_force = request.time_in_force;
        order.working_type = request.working_type;
        order.reduce_only = request.reduce_only;

        if request.order_type == OrderType::Market {
            let price = reference_price(&request.symbol);
            order.status = OrderStatus::Filled;
            order.executed_qty = quantity;
            order.avg_price = price;
            order.fills.push(Fill {
                price,
                qty: quantity,
                commission: Decimal::ZERO,
                commission_asset: "USDT".to_string(),
            });
        }

        self.orders.write().await.push(order.clone());
        Ok(order)
    }

    async fn cancel_order(
        &self,
        symbol: &str,
        target: OrderRef,
    ) -> Result<CancelAck, GatewayError> {
        self.cancel_calls.fetch_add(1, Ordering::Relaxed);

        if self.fail_cancels.lock().map(|f| *f).unwrap_or(false) {
            return Err(GatewayError::Transport("connection reset".to_string()));
        }

        let mut orders = self.orders.write().await;
        let index = Self::find_index(&orders, &target).ok_or_else(Self::unknown_order)?;
        let order = &mut orders[index];
        if !order.mark_cancelled() {
            return Err(GatewayError::Rejected {
                status: 400,
                code: Some(-2011),
                message: "Unknown order sent.".to_string(),
            });
        }

        Ok(CancelAck {
            symbol: symbol.to_string(),
            order_id: Some(order.order_id),
            order_list_id: order.order_list_id,
            status: order.status,
            note: None,
        })
    }

    async fn get_order(&self, _symbol: &str, target: OrderRef) -> Result<Order, GatewayError> {
        self.get_calls.fetch_add(1, Ordering::Relaxed);
        let orders = self.orders.read().await;
        Self::find_index(&orders, &target)
            .map(|i| orders[i].clone())
            .ok_or_else(Self::unknown_order)
    }

    async fn list_open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>, GatewayError> {
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .filter(|o| !o.is_terminal() && symbol.map_or(true, |s| o.symbol == s))
            .cloned()
            .collect())
    }

    async fn get_account(&self) -> Result<AccountInfo, GatewayError> {
        Ok(self.account.clone())
    }
}
