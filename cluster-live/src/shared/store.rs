//! Latest-snapshot-per-symbol store.
//!
//! The store is the only mutable state in the pipeline. It has a single
//! writer (the ingestion task) and is read by the view layer. Snapshots are
//! held behind [`Arc`] and replaced by reference, so a reader holding a
//! snapshot always sees a complete one.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::decoder::DecodedBatch;
use super::types::Snapshot;

#[derive(Debug, Clone, Default)]
pub struct SymbolStore {
    snapshots: HashMap<String, Arc<Snapshot>>,
}

impl SymbolStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace each symbol's snapshot with the one in `batch`.
    ///
    /// Returns the number of symbols written. Entries are never removed.
    pub fn apply(&mut self, batch: DecodedBatch) -> usize {
        let applied = batch.snapshots.len();
        for (symbol, snapshot) in batch.snapshots {
            self.snapshots.insert(symbol, Arc::new(snapshot));
        }
        applied
    }

    pub fn get(&self, symbol: &str) -> Option<Arc<Snapshot>> {
        self.snapshots.get(symbol).cloned()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.snapshots.contains_key(symbol)
    }

    /// Symbols currently held. Order is not meaningful.
    pub fn list_symbols(&self) -> HashSet<String> {
        self.snapshots.keys().cloned().collect()
    }

    /// Iterate `(symbol, snapshot)` pairs without cloning
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Snapshot)> {
        self.snapshots
            .iter()
            .map(|(symbol, snapshot)| (symbol.as_str(), snapshot.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::decoder::decode;

    fn batch(raw: &str) -> DecodedBatch {
        decode(raw).unwrap()
    }

    #[test]
    fn test_store_starts_empty() {
        let store = SymbolStore::new();
        assert!(store.is_empty());
        assert!(store.get("BTCUSDT").is_none());
        assert!(store.list_symbols().is_empty());
    }

    #[test]
    fn test_store_last_write_wins() {
        let mut store = SymbolStore::new();

        store.apply(batch(r#"{"BTCUSDT": {"heat": 0.1}, "ETHUSDT": {"heat": 0.2}}"#));
        store.apply(batch(r#"{"BTCUSDT": {"heat": 0.9}}"#));
        store.apply(batch(r#"{"SOLUSDT": {"heat": 0.3}}"#));

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("BTCUSDT").unwrap().heat, 0.9);
        assert_eq!(store.get("ETHUSDT").unwrap().heat, 0.2);
        assert_eq!(store.get("SOLUSDT").unwrap().heat, 0.3);

        let expected: HashSet<String> = ["BTCUSDT", "ETHUSDT", "SOLUSDT"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(store.list_symbols(), expected);
    }

    #[test]
    fn test_store_replaces_wholesale() {
        let mut store = SymbolStore::new();

        store.apply(batch(
            r#"{"BTCUSDT": {"heat": 0.5, "tape": [{"time": "t", "price": 1, "volume": 1, "side": "BUY"}]}}"#,
        ));
        store.apply(batch(r#"{"BTCUSDT": {"heat": 0.6}}"#));

        let snapshot = store.get("BTCUSDT").unwrap();
        assert_eq!(snapshot.heat, 0.6);
        assert!(snapshot.tape.is_empty());
    }

    #[test]
    fn test_store_idempotent_reapply() {
        let raw = r#"{"BTCUSDT": {"heat": 0.75, "clusters": [{"start": 0, "total": 3, "bins": {"1": 3}}]}}"#;

        let mut once = SymbolStore::new();
        once.apply(batch(raw));

        let mut twice = SymbolStore::new();
        twice.apply(batch(raw));
        twice.apply(batch(raw));

        assert_eq!(once.len(), twice.len());
        assert_eq!(once.get("BTCUSDT"), twice.get("BTCUSDT"));
    }

    #[test]
    fn test_store_reader_keeps_old_snapshot() {
        let mut store = SymbolStore::new();
        store.apply(batch(r#"{"BTCUSDT": {"heat": 0.1}}"#));

        let held = store.get("BTCUSDT").unwrap();
        store.apply(batch(r#"{"BTCUSDT": {"heat": 0.8}}"#));

        assert_eq!(held.heat, 0.1);
        assert_eq!(store.get("BTCUSDT").unwrap().heat, 0.8);
    }
}
