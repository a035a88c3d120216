//! Prometheus metrics

use ::metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};

/// Orders recorded, labelled by handler and mode
pub const ORDERS_TOTAL: &str = "order_engine_orders_total";
/// Gateway placements that failed, labelled by handler
pub const ORDERS_FAILED_TOTAL: &str = "order_engine_orders_failed_total";
/// Strategy status changes, labelled by target status
pub const STRATEGY_TRANSITIONS_TOTAL: &str = "order_engine_strategy_transitions_total";
/// Failed TWAP steps and grid levels
pub const STRATEGY_STEP_FAILURES_TOTAL: &str = "order_engine_strategy_step_failures_total";
/// Round trip of signed gateway requests
pub const GATEWAY_LATENCY_MS: &str = "order_engine_gateway_latency_ms";

/// Register descriptions for every engine metric
pub fn describe_metrics() {
    describe_counter!(ORDERS_TOTAL, "Orders recorded by the engine");
    describe_counter!(ORDERS_FAILED_TOTAL, "Order placements rejected or failed");
    describe_counter!(STRATEGY_TRANSITIONS_TOTAL, "Strategy status transitions");
    describe_counter!(
        STRATEGY_STEP_FAILURES_TOTAL,
        "Strategy child orders that could not be placed"
    );
    describe_histogram!(
        GATEWAY_LATENCY_MS,
        Unit::Milliseconds,
        "Exchange request latency"
    );
}

/// Serve `/metrics` on `port`
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;

    describe_metrics();
    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(())
}
