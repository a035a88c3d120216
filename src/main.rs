use clap::Parser;
use order_engine::cli::{Cli, Context, Output};
use order_engine::config::{Config, Credentials};
use order_engine::engine::Engine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_default(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    let _log_guard = order_engine::telemetry::init_telemetry(&config.telemetry)?;

    let test_mode = cli.test || config.engine.test_mode;
    let gateway = if test_mode {
        tracing::info!("Test mode, orders will be simulated locally");
        None
    } else {
        config.build_gateway(Credentials::from_env())?
    };

    let engine = Engine::with_commission_rate(gateway, config.engine.commission_rate);
    let ctx = Context {
        test_mode,
        output: Output::new(cli.json),
    };

    let result = cli.command.execute(&engine, ctx).await;
    engine.shutdown().await;
    result
}
