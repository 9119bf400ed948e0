pub mod hyperliquid;
pub mod okx;

pub use hyperliquid::HyperliquidClient;
pub use okx::OkxClient;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

use crate::models::MarginMode;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum VenueError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Bad status, decode failure, or a semantically broken payload.
    /// Transient: the observer logs it and retries on the next tick.
    #[error("{0}")]
    Api(String),

    /// Unusable construction input (e.g. empty identifier). Fatal to the
    /// observer; surfaced to the caller at run.
    #[error("{0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Normalized venue records
// ---------------------------------------------------------------------------

/// One leader fill, already symbol-normalized. Fills never become signals
/// directly; they feed the observer's price cache and high-water-mark.
#[derive(Debug, Clone)]
pub struct LeaderFill {
    /// Normalized ticker; empty when the venue symbol did not normalize.
    pub symbol: String,
    pub price: Decimal,
    /// Venue event time in milliseconds; primary sort key.
    pub time: i64,
    /// Venue record id, kept for diagnostics.
    pub id: String,
    /// High-water-mark value for exactly-once ingestion and the numeric
    /// tie-break within one timestamp (trade id on Hyperliquid, fill time
    /// on OKX).
    pub cursor: i64,
}

/// Per-symbol leader position data from one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderPositionMeta {
    /// Signed size: long positive, short negative.
    pub size: Decimal,
    pub leverage: u32,
    pub margin_mode: Option<MarginMode>,
}

/// The leader account as one poll saw it.
#[derive(Debug, Clone)]
pub struct LeaderState {
    pub equity: Decimal,
    pub positions: HashMap<String, LeaderPositionMeta>,
}

// ---------------------------------------------------------------------------
// LeaderVenue
// ---------------------------------------------------------------------------

/// Venue adapter consumed by the shared observer algorithm.
#[async_trait]
pub trait LeaderVenue: Send + Sync {
    fn venue(&self) -> &'static str;

    fn identifier(&self) -> &str;

    /// Reject unusable construction input before the poll loop starts.
    fn validate(&self) -> Result<(), VenueError>;

    /// Recent leader fills, unordered.
    async fn fetch_fills(&self) -> Result<Vec<LeaderFill>, VenueError>;

    /// Equity and open positions, symbol-normalized.
    async fn fetch_state(&self) -> Result<LeaderState, VenueError>;
}

/// Lenient numeric parsing for venue payloads: unparseable input becomes
/// zero and is filtered by the downstream size/notional guards.
pub(crate) fn parse_decimal(raw: &str) -> Decimal {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .unwrap_or_default()
}
