//! Append-only record list

use crate::orders::{OcoOrder, Order};
use tokio::sync::RwLock;

/// A record that can be kept in a [`History`]
pub trait HistoryEntry: Clone + Send + Sync {
    /// Identifier used for lookups
    fn entry_id(&self) -> u64;
}

impl HistoryEntry for Order {
    fn entry_id(&self) -> u64 {
        self.order_id
    }
}

impl HistoryEntry for OcoOrder {
    fn entry_id(&self) -> u64 {
        self.order_list_id
    }
}

/// Append-only list of records with linear lookup.
///
/// Entries are never removed; callers mark them terminal through
/// [`History::update`].
pub struct History<T> {
    entries: RwLock<Vec<T>>,
}

/// Order history kept by each handler
pub type OrderHistory = History<Order>;

impl<T: HistoryEntry> History<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(vec![]),
        }
    }

    /// Append a record
    pub async fn append(&self, entry: T) {
        self.entries.write().await.push(entry);
    }

    /// First record with the given identifier
    pub async fn find(&self, id: u64) -> Option<T> {
        self.entries
            .read()
            .await
            .iter()
            .find(|e| e.entry_id() == id)
            .cloned()
    }

    /// Apply `f` to the record with the given identifier and return the result
    pub async fn update<F>(&self, id: u64, f: F) -> Option<T>
    where
        F: FnOnce(&mut T),
    {
        let mut entries = self.entries.write().await;
        let entry = entries.iter_mut().find(|e| e.entry_id() == id)?;
        f(entry);
        Some(entry.clone())
    }

    /// Snapshot of every record in insertion order
    pub async fn all(&self) -> Vec<T> {
        self.entries.read().await.clone()
    }

    /// Snapshot of records matching a predicate
    pub async fn filter<P>(&self, predicate: P) -> Vec<T>
    where
        P: Fn(&T) -> bool,
    {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<T: HistoryEntry> Default for History<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::OrderStatus;
    use crate::types::{OrderType, Side};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn order(id: u64, symbol: &str) -> Order {
        Order::new(id, symbol, Side::Buy, OrderType::Limit, dec!(1))
    }

    #[tokio::test]
    async fn test_append_and_find() {
        let history = OrderHistory::new();
        history.append(order(1, "BTCUSDT")).await;
        history.append(order(2, "ETHUSDT")).await;

        assert_eq!(history.len().await, 2);
        assert_eq!(history.find(2).await.unwrap().symbol, "ETHUSDT");
        assert!(history.find(3).await.is_none());
    }

    #[tokio::test]
    async fn test_update_keeps_entry() {
        let history = OrderHistory::new();
        history.append(order(1, "BTCUSDT")).await;

        let updated = history.update(1, |o| {
            o.mark_cancelled();
        });
        assert_eq!(updated.await.unwrap().status, OrderStatus::Cancelled);
        assert_eq!(history.len().await, 1);
        assert_eq!(history.find(1).await.unwrap().status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_filter() {
        let history = OrderHistory::new();
        history.append(order(1, "BTCUSDT")).await;
        history.append(order(2, "ETHUSDT")).await;
        history.append(order(3, "BTCUSDT")).await;

        let btc = history.filter(|o| o.symbol == "BTCUSDT").await;
        assert_eq!(btc.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_appends() {
        let history = Arc::new(OrderHistory::new());
        let mut handles = vec![];
        for i in 0..8u64 {
            let history = history.clone();
            handles.push(tokio::spawn(async move {
                for j in 0..25u64 {
                    history.append(order(i * 100 + j, "BTCUSDT")).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(history.len().await, 200);
    }
}
