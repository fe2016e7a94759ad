use thiserror::Error;

/// Errors that drop an inbound message entirely.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    Json(String),

    #[error("payload top level must be an object keyed by symbol, found {found}")]
    NotKeyed { found: &'static str },
}

impl From<serde_json::Error> for DecodeError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value.to_string())
    }
}

/// Non-fatal problem with one symbol's entry; that symbol's update is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("skipped symbol {symbol}: {reason}")]
pub struct SymbolDecodeWarning {
    pub symbol: String,
    pub reason: String,
}

impl SymbolDecodeWarning {
    pub fn new(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }
}
