//! Multi-order strategies
//!
//! TWAP programs pace equal child orders over time; grids lay resting limit
//! orders across a price range. Both place their children through
//! [`crate::orders::OrderHandler`].

mod grid;
mod twap;
mod types;

pub use grid::{GridEngine, GridRequest};
pub use twap::{TwapEngine, TwapRequest};
pub use types::{
    GridLevel, GridPlan, LevelStatus, ProfitLoss, Strategy, StrategyEvent, StrategyId,
    StrategyIdGenerator, StrategyKind, StrategyStatus, TwapPlan,
};
