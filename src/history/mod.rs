//! In-memory order and strategy stores
//!
//! Both stores are append-only: records are marked terminal, never removed.

mod orders;
mod strategies;

pub use orders::{History, HistoryEntry, OrderHistory};
pub use strategies::{SharedStrategy, StrategyStore};
