use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use super::SignalAction;

// ---------------------------------------------------------------------------
// DecisionOutcome
// ---------------------------------------------------------------------------

/// Why a signal produced no order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// `follow_open` is disabled in the copy config.
    OpenNotFollowed,
    /// `follow_add` is disabled in the copy config.
    AddNotFollowed,
    /// `follow_reduce` is disabled in the copy config.
    ReduceNotFollowed,
    /// The follower holds no position to reduce or close.
    NoFollowerPosition,
    /// Sizing arithmetic produced a non-positive notional.
    ZeroNotional,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::OpenNotFollowed => "open signals not followed",
            SkipReason::AddNotFollowed => "add signals not followed",
            SkipReason::ReduceNotFollowed => "reduce signals not followed",
            SkipReason::NoFollowerPosition => "no follower position",
            SkipReason::ZeroNotional => "sized notional is zero",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Sized,
    Skipped(SkipReason),
}

impl fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionOutcome::Sized => write!(f, "sized"),
            DecisionOutcome::Skipped(reason) => write!(f, "skipped: {reason}"),
        }
    }
}

// ---------------------------------------------------------------------------
// DecisionRecord
// ---------------------------------------------------------------------------

/// Every intermediate quantity of one sizing decision, for observability.
/// Emitted for sized and skipped signals alike.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionRecord {
    pub id: Uuid,
    pub symbol: String,
    pub action: SignalAction,
    pub outcome: DecisionOutcome,

    pub leader_equity: Decimal,
    pub leader_notional: Decimal,
    pub leader_margin: Decimal,
    pub leader_price: Decimal,

    pub follower_equity: Decimal,
    pub follower_notional: Decimal,
    pub follower_margin: Decimal,

    /// Percent multiplier from the copy config.
    pub copy_ratio: Decimal,
    /// Leader margin share of leader equity.
    pub proportion: Decimal,
    pub min_triggered: bool,
    pub max_triggered: bool,
    pub close_fraction: Option<Decimal>,

    pub created_at: DateTime<Utc>,
}
