//! Overview/detail view state machine and the model it renders.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::metrics::{
    HeatTier, RenderedCluster, heat_tier, max_cluster_total, normalize_clusters, window_tape,
};
use super::store::SymbolStore;
use super::types::{Snapshot, Trade};

/// Which view is active
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Overview,
    Detail(String),
}

/// One symbol tile on the overview
#[derive(Debug, Clone, PartialEq)]
pub struct OverviewTile {
    pub symbol: String,
    pub tier: HeatTier,
    pub heat: f64,
}

/// Everything the detail page shows for one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct DetailModel {
    pub symbol: String,
    pub heat: f64,
    pub tier: HeatTier,
    pub clusters: Vec<RenderedCluster>,
    /// Largest reported cluster total, `None` without clusters
    pub max_total: Option<f64>,
    /// Most recent trades, oldest first
    pub tape: Vec<Trade>,
}

/// Renderable model for the current view
#[derive(Debug, Clone, PartialEq)]
pub enum ViewModel {
    /// Nothing has been received yet
    NoData,
    Overview(Vec<OverviewTile>),
    Detail(DetailModel),
}

#[derive(Debug, Clone, Default)]
pub struct ViewController {
    state: ViewState,
}

impl ViewController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Open the detail view for `symbol`.
    ///
    /// Rejected, leaving the state unchanged, when the store has no such
    /// symbol. Returns whether the transition happened.
    pub fn select(&mut self, symbol: &str, store: &SymbolStore) -> bool {
        if !store.contains(symbol) {
            debug!(%symbol, "ignoring selection of unknown symbol");
            return false;
        }
        self.state = ViewState::Detail(symbol.to_string());
        true
    }

    /// Return to the overview. No-op when already there.
    pub fn back(&mut self) {
        self.state = ViewState::Overview;
    }

    /// Assemble the model for the current view.
    ///
    /// A detail view whose symbol is no longer stored falls back to the
    /// overview.
    pub fn current_model(&mut self, store: &SymbolStore) -> ViewModel {
        if let ViewState::Detail(symbol) = self.state.clone() {
            match store.get(&symbol) {
                Some(snapshot) => return ViewModel::Detail(detail_model(&symbol, snapshot)),
                None => {
                    debug!(%symbol, "selected symbol missing from store, returning to overview");
                    self.state = ViewState::Overview;
                }
            }
        }

        if store.is_empty() {
            return ViewModel::NoData;
        }
        ViewModel::Overview(overview_tiles(store))
    }
}

/// Overview tiles sorted by symbol
pub fn overview_tiles(store: &SymbolStore) -> Vec<OverviewTile> {
    let mut tiles: Vec<OverviewTile> = store
        .iter()
        .map(|(symbol, snapshot)| OverviewTile {
            symbol: symbol.to_string(),
            tier: heat_tier(snapshot.heat),
            heat: snapshot.heat,
        })
        .collect();
    tiles.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    tiles
}

fn detail_model(symbol: &str, snapshot: Arc<Snapshot>) -> DetailModel {
    DetailModel {
        symbol: symbol.to_string(),
        heat: snapshot.heat,
        tier: heat_tier(snapshot.heat),
        clusters: normalize_clusters(&snapshot.clusters),
        max_total: max_cluster_total(&snapshot.clusters),
        tape: window_tape(&snapshot.tape).to_vec(),
    }
}

impl DetailModel {
    /// Start time of the newest cluster, if any
    pub fn latest_cluster_start(&self) -> Option<DateTime<Utc>> {
        self.clusters.last().map(|c| c.start)
    }
}
