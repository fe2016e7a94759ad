//! Derived presentation metrics
//!
//! Heat tiers, per-cluster bin normalization and tape windowing. Everything
//! here is a pure function of a stored snapshot and is recomputed on each
//! render; stored data is only ever borrowed.

use chrono::{DateTime, Utc};

use super::types::{Cluster, Trade};

/// Number of most recent trades shown on the tape
pub const TAPE_WINDOW: usize = 12;

const CRITICAL_HEAT: f64 = 0.9;
const HOT_HEAT: f64 = 0.7;

/// Discrete heat bucket used for visual emphasis
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeatTier {
    Normal,
    Hot,
    Critical,
}

impl HeatTier {
    pub fn label(&self) -> &'static str {
        match self {
            HeatTier::Normal => "normal",
            HeatTier::Hot => "hot",
            HeatTier::Critical => "critical",
        }
    }

    /// Hot and critical symbols are emphasised on the overview
    pub fn is_emphasised(&self) -> bool {
        !matches!(self, HeatTier::Normal)
    }
}

impl std::fmt::Display for HeatTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Map heat to its tier. Both thresholds are exclusive.
pub fn heat_tier(heat: f64) -> HeatTier {
    if heat > CRITICAL_HEAT {
        HeatTier::Critical
    } else if heat > HOT_HEAT {
        HeatTier::Hot
    } else {
        HeatTier::Normal
    }
}

/// Heat as a whole percentage for display
pub fn heat_percent(heat: f64) -> u8 {
    (heat.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// One price bin scaled against the largest bin of its cluster
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBin {
    pub label: String,
    pub volume: f64,
    /// `volume / max_bin`, in `[0, 1]`
    pub relative_height: f64,
    /// Every bin equal to the cluster maximum is a peak
    pub is_peak: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCluster {
    pub start: DateTime<Utc>,
    pub start_label: String,
    pub total: f64,
    pub max_bin: f64,
    pub bins: Vec<RenderedBin>,
}

impl RenderedCluster {
    /// First peak bin in wire order, `None` for an empty cluster
    pub fn peak_bin(&self) -> Option<&RenderedBin> {
        self.bins.iter().find(|bin| bin.is_peak)
    }

    /// Index of [`Self::peak_bin`] within `bins`
    pub fn peak_index(&self) -> Option<usize> {
        self.bins.iter().position(|bin| bin.is_peak)
    }
}

/// Normalize a cluster's bins against its largest bin.
///
/// An empty cluster reports `max_bin = 1` and no bins. When every bin is zero
/// the heights are computed against `1` and all bins tie as peaks.
pub fn normalize_cluster(cluster: &Cluster) -> RenderedCluster {
    let max_bin = if cluster.bins.is_empty() {
        1.0
    } else {
        cluster.bins.values().copied().fold(f64::MIN, f64::max)
    };
    let divisor = if max_bin > 0.0 { max_bin } else { 1.0 };

    let bins = cluster
        .bins
        .iter()
        .map(|(label, &volume)| RenderedBin {
            label: label.clone(),
            volume,
            relative_height: volume / divisor,
            is_peak: volume == max_bin,
        })
        .collect();

    RenderedCluster {
        start: cluster.start,
        start_label: cluster.start_label(),
        total: cluster.total,
        max_bin,
        bins,
    }
}

pub fn normalize_clusters(clusters: &[Cluster]) -> Vec<RenderedCluster> {
    clusters.iter().map(normalize_cluster).collect()
}

/// Largest reported cluster total, `None` when there are no clusters
pub fn max_cluster_total(clusters: &[Cluster]) -> Option<f64> {
    if clusters.is_empty() {
        return None;
    }
    Some(clusters.iter().map(|c| c.total).fold(f64::MIN, f64::max))
}

/// Last [`TAPE_WINDOW`] trades, oldest first
pub fn window_tape(tape: &[Trade]) -> &[Trade] {
    &tape[tape.len().saturating_sub(TAPE_WINDOW)..]
}
