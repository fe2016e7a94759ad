//! Ingestion: decode one inbound frame and apply it to the store.

use tracing::{debug, warn};

use super::decoder::decode;
use super::error::DecodeError;
use super::store::SymbolStore;

/// Outcome of ingesting one message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Symbols written to the store
    pub applied: usize,
    /// Symbols skipped because their entry was malformed
    pub skipped: usize,
}

/// Decode `raw` and apply every well-formed symbol to `store`.
///
/// A malformed top level returns the [`DecodeError`] and leaves the store
/// untouched. Malformed symbols are logged and counted in the report.
pub fn ingest(store: &mut SymbolStore, raw: &str) -> Result<IngestReport, DecodeError> {
    let batch = decode(raw)?;

    for warning in &batch.warnings {
        warn!(symbol = %warning.symbol, reason = %warning.reason, "skipping malformed symbol update");
    }

    let skipped = batch.warning_count();
    let applied = store.apply(batch);
    debug!(applied, skipped, total = store.len(), "ingested snapshot batch");

    Ok(IngestReport { applied, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::view::{ViewController, ViewModel, ViewState};

    #[test]
    fn test_ingest_partial_batch() {
        let mut store = SymbolStore::new();
        let report = ingest(
            &mut store,
            r#"{"BTCUSDT": {"heat": 0.8}, "ETHUSDT": {"clusters": "broken"}}"#,
        )
        .unwrap();

        assert_eq!(report, IngestReport { applied: 1, skipped: 1 });
        assert!(store.contains("BTCUSDT"));
        assert!(!store.contains("ETHUSDT"));
    }

    #[test]
    fn test_ingest_out_of_range_numbers_stay_per_symbol() {
        let mut store = SymbolStore::new();

        let report = ingest(
            &mut store,
            r#"{"BTCUSDT": {"heat": 0.5}, "ETHUSDT": {"heat": 1e400}}"#,
        )
        .unwrap();
        assert_eq!(report, IngestReport { applied: 2, skipped: 0 });
        assert_eq!(store.get("BTCUSDT").unwrap().heat, 0.5);
        assert_eq!(store.get("ETHUSDT").unwrap().heat, 1.0);

        let report = ingest(
            &mut store,
            r#"{
                "SOLUSDT": {"heat": 0.2},
                "XRPUSDT": {"clusters": [{"start": 0, "bins": {"1": 1e400}}]}
            }"#,
        )
        .unwrap();
        assert_eq!(report, IngestReport { applied: 1, skipped: 1 });
        assert!(store.contains("SOLUSDT"));
        assert!(!store.contains("XRPUSDT"));
    }

    #[test]
    fn test_ingest_malformed_message_leaves_store() {
        let mut store = SymbolStore::new();
        ingest(&mut store, r#"{"BTCUSDT": {"heat": 0.4}}"#).unwrap();

        assert!(ingest(&mut store, "]").is_err());
        assert!(ingest(&mut store, r#""BTCUSDT""#).is_err());

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("BTCUSDT").unwrap().heat, 0.4);
    }

    #[test]
    fn test_ingest_then_browse() {
        let mut store = SymbolStore::new();
        let mut view = ViewController::new();

        assert_eq!(view.current_model(&store), ViewModel::NoData);
        assert!(!view.select("BTCUSDT", &store));

        ingest(&mut store, r#"{"BTCUSDT": {"heat": 1.7}}"#).unwrap();
        assert!(view.select("BTCUSDT", &store));

        // Later updates are visible on the next model without reselecting
        ingest(&mut store, r#"{"BTCUSDT": {"heat": 0.3}}"#).unwrap();
        let ViewModel::Detail(detail) = view.current_model(&store) else {
            panic!("expected detail");
        };
        assert_eq!(detail.heat, 0.3);

        view.back();
        assert_eq!(view.state(), &ViewState::Overview);
        assert!(matches!(view.current_model(&store), ViewModel::Overview(_)));
    }
}
