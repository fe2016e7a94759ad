/// Core data types for per-symbol cluster snapshots
///
/// These are the decoded, validated forms of the JSON payload pushed by the
/// cluster backend. Wire parsing lives in [`crate::shared::decoder`].

use chrono::{DateTime, Local, Utc};
use indexmap::IndexMap;

/// Complete current market state for one symbol
///
/// A newer snapshot replaces the previous one for the same symbol wholesale.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    /// Activity score, always within `[0, 1]`
    pub heat: f64,
    /// Time-bucketed clusters, oldest first
    pub clusters: Vec<Cluster>,
    /// Recent trades, oldest first
    pub tape: Vec<Trade>,
}

/// Time-bucketed aggregation of traded volume by price level
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Bucket open time
    pub start: DateTime<Utc>,
    /// Total volume as reported upstream (not reconciled with `bins`)
    pub total: f64,
    /// Price-bucket label -> traded volume, in the order received
    pub bins: IndexMap<String, f64>,
}

impl Cluster {
    /// Short `HH:MM` label for the bucket open time, in the local timezone
    pub fn start_label(&self) -> String {
        self.start.with_timezone(&Local).format("%H:%M").to_string()
    }
}

/// Aggressor side of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Parse the wire representation, ignoring case
    pub fn from_wire(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("BUY") {
            Some(Side::Buy)
        } else if value.eq_ignore_ascii_case("SELL") {
            Some(Side::Sell)
        } else {
            None
        }
    }

    /// Convert to display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    /// Check if this is a buy
    pub fn is_buy(&self) -> bool {
        matches!(self, Side::Buy)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trade time as sent by the backend: either preformatted text or epoch millis.
/// Epoch times display as local `HH:MM:SS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeTime {
    Epoch(i64),
    Text(String),
}

impl std::fmt::Display for TradeTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeTime::Text(text) => f.write_str(text),
            TradeTime::Epoch(millis) => match DateTime::<Utc>::from_timestamp_millis(*millis) {
                Some(time) => write!(f, "{}", time.with_timezone(&Local).format("%H:%M:%S")),
                None => write!(f, "{millis}"),
            },
        }
    }
}

/// Single trade on the tape
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub time: TradeTime,
    pub price: f64,
    pub volume: f64,
    pub side: Side,
}
