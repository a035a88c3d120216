//! Integration tests for order-engine

mod config_test;
mod orders_test;
mod strategy_test;
