/// Cluster Live - Shared Library
///
/// Streaming state model behind the `cluster-live` terminal:
/// - Snapshot decoding with per-symbol partial success
/// - Latest-snapshot-per-symbol store
/// - Derived presentation metrics (heat tiers, bin normalization, tape window)
/// - Overview/detail view controller
///
/// plus the WebSocket feed, configuration and logging used by the binary.
pub mod shared;

// Re-export commonly used types for convenience
pub use shared::types::{Cluster, Side, Snapshot, Trade, TradeTime};

pub use shared::decoder::{DecodedBatch, decode};
pub use shared::error::{DecodeError, SymbolDecodeWarning};
pub use shared::ingest::{IngestReport, ingest};
pub use shared::store::SymbolStore;

pub use shared::metrics::{
    HeatTier, RenderedBin, RenderedCluster, TAPE_WINDOW, heat_percent, heat_tier,
    max_cluster_total, normalize_cluster, normalize_clusters, window_tape,
};
pub use shared::view::{DetailModel, OverviewTile, ViewController, ViewModel, ViewState};

pub use shared::config::Config;
pub use shared::feed::{ConnectionStatus, FeedClient, FeedConfig};
pub use shared::logging::init_logging;
