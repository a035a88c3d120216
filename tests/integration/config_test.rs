//! Configuration loading and engine construction

use order_engine::config::{Config, Credentials, API_KEY_VAR, API_SECRET_VAR};
use order_engine::engine::Engine;
use order_engine::orders::OrderRequest;
use order_engine::telemetry::LogFormat;
use rust_decimal_macros::dec;
use std::io::Write;
use std::path::Path;

#[test]
fn test_config_example_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.toml.example");
    let config = Config::load(path).unwrap();

    assert_eq!(config.gateway.effective_base_url(), "https://fapi.binance.com");
    assert_eq!(config.gateway.recv_window_ms, 5000);
    assert!(!config.engine.test_mode);
    assert_eq!(config.engine.commission_rate, dec!(0.0002));
    assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
    assert!(config.telemetry.metrics_port.is_none());
}

#[tokio::test]
async fn test_engine_from_config_without_credentials() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[engine]\ncommission_rate = 0.001").unwrap();
    let config = Config::load_or_default(file.path()).unwrap();

    let credentials = Credentials::from_lookup(|name| match name {
        API_KEY_VAR => Some("too-short".to_string()),
        API_SECRET_VAR => Some("also-too-short".to_string()),
        _ => None,
    });
    let gateway = config.build_gateway(credentials).unwrap();
    assert!(gateway.is_none());

    let engine = Engine::with_commission_rate(gateway, config.engine.commission_rate);
    let order = engine
        .market()
        .place_order(OrderRequest::market("BNBUSDT", "BUY", dec!(1)))
        .await
        .unwrap();
    assert!(order.simulated);
    assert_eq!(order.total_commission(), order.filled_notional() * dec!(0.001));
}
