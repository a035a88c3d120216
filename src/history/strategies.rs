//! Strategy store

use crate::strategy::{Strategy, StrategyId};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A strategy shared between its pacing task and status queries
pub type SharedStrategy = Arc<RwLock<Strategy>>;

/// Append-only list of strategies, each behind its own lock
#[derive(Default)]
pub struct StrategyStore {
    strategies: RwLock<Vec<SharedStrategy>>,
}

impl StrategyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a strategy and return its shared handle
    pub async fn insert(&self, strategy: Strategy) -> SharedStrategy {
        let shared = Arc::new(RwLock::new(strategy));
        self.strategies.write().await.push(shared.clone());
        shared
    }

    /// Shared handle of a strategy
    pub async fn get(&self, strategy_id: StrategyId) -> Option<SharedStrategy> {
        for shared in self.strategies.read().await.iter() {
            if shared.read().await.strategy_id == strategy_id {
                return Some(shared.clone());
            }
        }
        None
    }

    /// Copy of a strategy's current state
    pub async fn snapshot(&self, strategy_id: StrategyId) -> Option<Strategy> {
        let shared = self.get(strategy_id).await?;
        let strategy = shared.read().await.clone();
        Some(strategy)
    }

    /// Copies of every strategy in creation order
    pub async fn all(&self) -> Vec<Strategy> {
        let handles = self.strategies.read().await.clone();
        let mut out = Vec::with_capacity(handles.len());
        for shared in handles {
            out.push(shared.read().await.clone());
        }
        out
    }

    /// Copies of every non-terminal strategy
    pub async fn active(&self) -> Vec<Strategy> {
        self.all()
            .await
            .into_iter()
            .filter(|s| !s.is_terminal())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.strategies.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.strategies.read().await.is_empty()
    }
}
