//! Snapshot decoder.
//!
//! Turns one raw text frame into a [`DecodedBatch`]. A malformed top level
//! drops the whole message; a malformed symbol entry only skips that symbol
//! and is reported as a [`SymbolDecodeWarning`].

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::value::RawValue;

use super::error::{DecodeError, SymbolDecodeWarning};
use super::types::{Cluster, Side, Snapshot, Trade, TradeTime};

/// Result of decoding one inbound message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedBatch {
    /// Successfully decoded snapshots keyed by symbol, in message order
    pub snapshots: IndexMap<String, Snapshot>,
    /// Symbols skipped because their entry was malformed
    pub warnings: Vec<SymbolDecodeWarning>,
}

impl DecodedBatch {
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct WireSnapshot {
    // Kept raw so an out-of-range number is clamped instead of rejected
    #[serde(default)]
    heat: Option<Box<RawValue>>,
    #[serde(default)]
    clusters: Option<Vec<WireCluster>>,
    #[serde(default)]
    tape: Option<Vec<WireTrade>>,
}

#[derive(Debug, Deserialize)]
struct WireCluster {
    start: WireNumberOrText,
    #[serde(default)]
    total: Option<f64>,
    #[serde(default)]
    bins: Option<IndexMap<String, f64>>,
}

#[derive(Debug, Deserialize)]
struct WireTrade {
    time: WireNumberOrText,
    price: f64,
    volume: f64,
    side: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireNumberOrText {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Decode one raw message into per-symbol snapshots.
///
/// Symbol entries are split off as raw JSON before any of their numbers are
/// parsed, so a bad value only ever affects its own symbol.
pub fn decode(raw: &str) -> Result<DecodedBatch, DecodeError> {
    let payload: Box<RawValue> = serde_json::from_str(raw)?;
    let found = json_kind(&payload);
    if found != "object" {
        return Err(DecodeError::NotKeyed { found });
    }

    let entries: IndexMap<String, Box<RawValue>> = serde_json::from_str(payload.get())?;

    let mut batch = DecodedBatch::default();
    for (symbol, entry) in entries {
        match decode_snapshot(&entry) {
            Ok(snapshot) => {
                batch.snapshots.insert(symbol, snapshot);
            }
            Err(reason) => batch.warnings.push(SymbolDecodeWarning::new(symbol, reason)),
        }
    }

    Ok(batch)
}

fn decode_snapshot(entry: &RawValue) -> Result<Snapshot, String> {
    let found = json_kind(entry);
    if found != "object" {
        return Err(format!("expected object, found {found}"));
    }

    let wire: WireSnapshot = serde_json::from_str(entry.get()).map_err(|e| e.to_string())?;

    let heat = match &wire.heat {
        Some(heat) => parse_heat(heat)?,
        None => 0.0,
    };

    let clusters = wire
        .clusters
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, cluster)| {
            decode_cluster(cluster).map_err(|reason| format!("clusters[{index}]: {reason}"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let tape = wire
        .tape
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, trade)| {
            decode_trade(trade).map_err(|reason| format!("tape[{index}]: {reason}"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Snapshot {
        heat: clamp_heat(heat),
        clusters,
        tape,
    })
}

/// Parse a raw JSON number as heat. Magnitudes beyond `f64` become infinite
/// and are clamped by the caller.
fn parse_heat(raw: &RawValue) -> Result<f64, String> {
    let found = json_kind(raw);
    if found != "number" {
        return Err(format!("heat: expected number, found {found}"));
    }
    raw.get()
        .parse::<f64>()
        .map_err(|e| format!("heat: invalid number {}: {e}", raw.get()))
}

fn decode_cluster(wire: WireCluster) -> Result<Cluster, String> {
    let start = parse_start(wire.start)?;
    let bins = wire
        .bins
        .unwrap_or_default()
        .into_iter()
        .map(|(label, volume)| (label, non_negative(volume)))
        .collect();

    Ok(Cluster {
        start,
        total: non_negative(wire.total.unwrap_or(0.0)),
        bins,
    })
}

fn decode_trade(wire: WireTrade) -> Result<Trade, String> {
    let side = Side::from_wire(&wire.side).ok_or_else(|| format!("unknown side {:?}", wire.side))?;
    let time = match wire.time {
        WireNumberOrText::Int(millis) => TradeTime::Epoch(millis),
        WireNumberOrText::Float(millis) => TradeTime::Epoch(millis as i64),
        WireNumberOrText::Text(text) => TradeTime::Text(text),
    };

    Ok(Trade {
        time,
        price: wire.price,
        volume: wire.volume,
        side,
    })
}

/// Cluster start is either epoch milliseconds or an RFC 3339 string
fn parse_start(start: WireNumberOrText) -> Result<DateTime<Utc>, String> {
    let millis = match start {
        WireNumberOrText::Int(millis) => millis,
        WireNumberOrText::Float(millis) => millis as i64,
        WireNumberOrText::Text(text) => {
            return DateTime::parse_from_rfc3339(&text)
                .map(|time| time.with_timezone(&Utc))
                .map_err(|e| format!("invalid start {text:?}: {e}"));
        }
    };

    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| format!("start {millis} out of range"))
}

/// Clamp heat into `[0, 1]`; out-of-range values are clamped, never rejected
pub fn clamp_heat(heat: f64) -> f64 {
    if heat.is_nan() { 0.0 } else { heat.clamp(0.0, 1.0) }
}

fn non_negative(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.max(0.0) }
}

fn json_kind(value: &RawValue) -> &'static str {
    match value.get().trim_start().as_bytes().first() {
        Some(b'{') => "object",
        Some(b'[') => "array",
        Some(b'"') => "string",
        Some(b't' | b'f') => "bool",
        Some(b'n') => "null",
        _ => "number",
    }
}
