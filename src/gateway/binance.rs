//! Binance USD-M futures REST gateway
//!
//! Signs every request with HMAC-SHA256 over the query string and maps the
//! exchange's JSON (string-encoded decimals) into engine records.

use super::{
    AccountInfo, AssetBalance, CancelAck, CreateOrder, ExchangeGateway, GatewayError, OrderRef,
    PositionInfo,
};
use crate::orders::{Order, OrderStatus};
use crate::telemetry::metrics::GATEWAY_LATENCY_MS;
use crate::types::{OrderType, Side, TimeInForce, WorkingType};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use std::time::{Duration, Instant};

type HmacSha256 = Hmac<Sha256>;

/// Production REST endpoint
pub const BINANCE_FUTURES_URL: &str = "https://fapi.binance.com";
/// Testnet REST endpoint
pub const BINANCE_TESTNET_URL: &str = "https://testnet.binancefuture.com";

const ORDER_PATH: &str = "/fapi/v1/order";
const OPEN_ORDERS_PATH: &str = "/fapi/v1/openOrders";
const ACCOUNT_PATH: &str = "/fapi/v2/account";

/// Configuration for the Binance gateway
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    /// REST base URL
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    /// Validity window for signed requests
    pub recv_window_ms: u64,
    /// Request timeout
    pub timeout: Duration,
}

impl BinanceConfig {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            base_url: BINANCE_FUTURES_URL.to_string(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            recv_window_ms: 5000,
            timeout: Duration::from_secs(10),
        }
    }
}

/// REST client for Binance USD-M futures
pub struct BinanceGateway {
    config: BinanceConfig,
    client: Client,
}

impl BinanceGateway {
    /// Create a new gateway
    pub fn new(config: BinanceConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        tracing::info!(base_url = %config.base_url, "Binance gateway initialized");
        Ok(Self { config, client })
    }

    fn sign(&self, payload: &str) -> Result<String, GatewayError> {
        sign_payload(&self.config.api_secret, payload)
    }

    /// Send a signed request and decode the JSON body
    async fn signed_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<T, GatewayError> {
        let timestamp = Utc::now().timestamp_millis();
        let mut query = encode_params(&params);
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&format!(
            "recvWindow={}&timestamp={}",
            self.config.recv_window_ms, timestamp
        ));
        let signature = self.sign(&query)?;
        let url = format!(
            "{}{}?{}&signature={}",
            self.config.base_url, path, query, signature
        );

        tracing::debug!(method = %method, path, params = %encode_params(&params), "Gateway request");
        let started = Instant::now();

        let response = self
            .client
            .request(method.clone(), &url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        metrics::histogram!(GATEWAY_LATENCY_MS, "path" => path.to_string())
            .record(started.elapsed().as_secs_f64() * 1000.0);

        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !status.is_success() {
            let err = rejection(status, &body);
            tracing::error!(method = %method, path, error = %err, "Gateway request failed");
            return Err(err);
        }

        tracing::debug!(method = %method, path, status = status.as_u16(), "Gateway response");
        serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ExchangeGateway for BinanceGateway {
    async fn create_order(&self, request: CreateOrder) -> Result<Order, GatewayError> {
        let params = order_params(&request)?;
        let wire: WireOrder = self.signed_request(Method::POST, ORDER_PATH, params).await?;
        wire.into_order()
    }

    async fn cancel_order(
        &self,
        symbol: &str,
        target: OrderRef,
    ) -> Result<CancelAck, GatewayError> {
        let params = target_params(symbol, &target);
        let wire: WireOrder = self
            .signed_request(Method::DELETE, ORDER_PATH, params)
            .await?;
        let order = wire.into_order()?;

        Ok(CancelAck {
            symbol: order.symbol,
            order_id: Some(order.order_id),
            order_list_id: None,
            status: order.status,
            note: None,
        })
    }

    async fn get_order(&self, symbol: &str, target: OrderRef) -> Result<Order, GatewayError> {
        let params = target_params(symbol, &target);
        let wire: WireOrder = self.signed_request(Method::GET, ORDER_PATH, params).await?;
        wire.into_order()
    }

    async fn list_open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>, GatewayError> {
        let params = symbol
            .map(|s| vec![("symbol", s.to_string())])
            .unwrap_or_default();
        let wire: Vec<WireOrder> = self
            .signed_request(Method::GET, OPEN_ORDERS_PATH, params)
            .await?;
        wire.into_iter().map(WireOrder::into_order).collect()
    }

    async fn get_account(&self) -> Result<AccountInfo, GatewayError> {
        let wire: WireAccount = self
            .signed_request(Method::GET, ACCOUNT_PATH, vec![])
            .await?;
        Ok(wire.into_account())
    }
}

/// Hex-encoded HMAC-SHA256 of the payload
fn sign_payload(secret: &str, payload: &str) -> Result<String, GatewayError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| GatewayError::Signing(e.to_string()))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn encode_params(params: &[(&'static str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn format_decimal(value: Decimal) -> String {
    value.normalize().to_string()
}

fn wire_order_type(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Market => "MARKET",
        OrderType::Limit => "LIMIT",
        OrderType::StopLimit => "STOP",
        OrderType::TakeProfit => "TAKE_PROFIT",
    }
}

/// Build the query parameters for a new order
fn order_params(request: &CreateOrder) -> Result<Vec<(&'static str, String)>, GatewayError> {
    let needs_price = matches!(
        request.order_type,
        OrderType::Limit | OrderType::StopLimit | OrderType::TakeProfit
    );
    let needs_stop = matches!(
        request.order_type,
        OrderType::StopLimit | OrderType::TakeProfit
    );

    if needs_price && request.price.is_none() {
        return Err(GatewayError::InvalidRequest(format!(
            "{} order requires a price",
            request.order_type
        )));
    }
    if needs_stop && request.stop_price.is_none() {
        return Err(GatewayError::InvalidRequest(format!(
            "{} order requires a stop price",
            request.order_type
        )));
    }

    let mut params = vec![
        ("symbol", request.symbol.clone()),
        ("side", request.side.as_str().to_string()),
        ("type", wire_order_type(request.order_type).to_string()),
    ];

    if let Some(quantity) = request.quantity {
        params.push(("quantity", format_decimal(quantity)));
    }
    if let Some(price) = request.price {
        params.push(("price", format_decimal(price)));
    }
    if let Some(stop_price) = request.stop_price {
        params.push(("stopPrice", format_decimal(stop_price)));
    }
    if needs_price {
        let tif = request.time_in_force.unwrap_or_default();
        params.push(("timeInForce", tif.as_str().to_string()));
    }
    if let Some(working_type) = request.working_type {
        params.push(("workingType", working_type.as_str().to_string()));
    }
    if request.reduce_only {
        params.push(("reduceOnly", "true".to_string()));
    }
    if let Some(ref client_id) = request.client_order_id {
        params.push(("newClientOrderId", client_id.clone()));
    }

    Ok(params)
}

fn target_params(symbol: &str, target: &OrderRef) -> Vec<(&'static str, String)> {
    let mut params = vec![("symbol", symbol.to_string())];
    match target {
        OrderRef::Id(id) => params.push(("orderId", id.to_string())),
        OrderRef::ClientId(id) => params.push(("origClientOrderId", id.clone())),
    }
    params
}

#[derive(Debug, Deserialize)]
struct WireError {
    code: i64,
    msg: String,
}

fn rejection(status: StatusCode, body: &str) -> GatewayError {
    match serde_json::from_str::<WireError>(body) {
        Ok(err) => GatewayError::Rejected {
            status: status.as_u16(),
            code: Some(err.code),
            message: err.msg,
        },
        Err(_) => GatewayError::Rejected {
            status: status.as_u16(),
            code: None,
            message: body.chars().take(200).collect(),
        },
    }
}

/// Order as returned by the order endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOrder {
    order_id: u64,
    #[serde(default)]
    client_order_id: Option<String>,
    symbol: String,
    side: String,
    #[serde(rename = "type")]
    order_type: String,
    orig_qty: Decimal,
    #[serde(default)]
    price: Decimal,
    #[serde(default)]
    stop_price: Decimal,
    #[serde(default)]
    avg_price: Decimal,
    #[serde(default)]
    executed_qty: Decimal,
    status: String,
    #[serde(default)]
    time_in_force: Option<String>,
    #[serde(default)]
    working_type: Option<String>,
    #[serde(default)]
    reduce_only: bool,
    update_time: i64,
}

impl WireOrder {
    fn into_order(self) -> Result<Order, GatewayError> {
        let side = match self.side.as_str() {
            "BUY" => Side::Buy,
            "SELL" => Side::Sell,
            other => return Err(GatewayError::Decode(format!("unknown side {other}"))),
        };
        let order_type = match self.order_type.as_str() {
            "MARKET" => OrderType::Market,
            "LIMIT" => OrderType::Limit,
            "STOP" | "STOP_MARKET" => OrderType::StopLimit,
            "TAKE_PROFIT" | "TAKE_PROFIT_MARKET" => OrderType::TakeProfit,
            other => return Err(GatewayError::Decode(format!("unknown order type {other}"))),
        };
        let status = match self.status.as_str() {
            "NEW" | "PARTIALLY_FILLED" => OrderStatus::New,
            "FILLED" => OrderStatus::Filled,
            "CANCELED" | "EXPIRED" | "EXPIRED_IN_MATCH" => OrderStatus::Cancelled,
            "REJECTED" => OrderStatus::Failed,
            other => return Err(GatewayError::Decode(format!("unknown status {other}"))),
        };
        let time_in_force = self.time_in_force.as_deref().and_then(|tif| match tif {
            "GTC" => Some(TimeInForce::Gtc),
            "IOC" => Some(TimeInForce::Ioc),
            "FOK" => Some(TimeInForce::Fok),
            "GTX" => Some(TimeInForce::Gtx),
            _ => None,
        });
        let working_type = self.working_type.as_deref().and_then(|wt| match wt {
            "CONTRACT_PRICE" => Some(WorkingType::ContractPrice),
            "MARK_PRICE" => Some(WorkingType::MarkPrice),
            _ => None,
        });
        let update_time = Utc
            .timestamp_millis_opt(self.update_time)
            .single()
            .unwrap_or_else(Utc::now);

        let mut order = Order::new(self.order_id, self.symbol, side, order_type, self.orig_qty);
        order.client_order_id = self.client_order_id;
        order.price = (!self.price.is_zero()).then_some(self.price);
        order.stop_price = (!self.stop_price.is_zero()).then_some(self.stop_price);
        order.time_in_force = time_in_force;
        order.working_type = working_type;
        order.reduce_only = self.reduce_only;
        order.status = status;
        order.executed_qty = self.executed_qty;
        order.avg_price = self.avg_price;
        order.update_time = update_time;
        Ok(order)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAsset {
    asset: String,
    wallet_balance: Decimal,
    available_balance: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePosition {
    symbol: String,
    position_amt: Decimal,
    #[serde(default)]
    entry_price: Decimal,
    #[serde(default, alias = "unRealizedProfit")]
    unrealized_profit: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAccount {
    total_wallet_balance: Decimal,
    available_balance: Decimal,
    total_unrealized_profit: Decimal,
    #[serde(default)]
    assets: Vec<WireAsset>,
    #[serde(default)]
    positions: Vec<WirePosition>,
}

impl WireAccount {
    fn into_account(self) -> AccountInfo {
        AccountInfo {
            total_wallet_balance: self.total_wallet_balance,
            available_balance: self.available_balance,
            total_unrealized_profit: self.total_unrealized_profit,
            assets: self
                .assets
                .into_iter()
                .filter(|a| !a.wallet_balance.is_zero())
                .map(|a| AssetBalance {
                    asset: a.asset,
                    wallet_balance: a.wallet_balance,
                    available_balance: a.available_balance,
                })
                .collect(),
            positions: self
                .positions
                .into_iter()
                .filter(|p| !p.position_amt.is_zero())
                .map(|p| PositionInfo {
                    symbol: p.symbol,
                    position_amt: p.position_amt,
                    entry_price: p.entry_price,
                    unrealized_profit: p.unrealized_profit,
                })
                .collect(),
        }
    }
}
