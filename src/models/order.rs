use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{MarginMode, SignalAction};

// ---------------------------------------------------------------------------
// OrderSide
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Side of the follower order that mirrors a leader action: growing a
    /// long or shrinking a short buys; growing a short or shrinking a long
    /// sells.
    pub fn for_action(action: SignalAction) -> Self {
        match action {
            SignalAction::OpenLong
            | SignalAction::AddLong
            | SignalAction::CloseShort
            | SignalAction::ReduceShort => OrderSide::Buy,
            SignalAction::OpenShort
            | SignalAction::AddShort
            | SignalAction::CloseLong
            | SignalAction::ReduceLong => OrderSide::Sell,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

// ---------------------------------------------------------------------------
// OrderRequest
// ---------------------------------------------------------------------------

/// A sized, risk-bounded order for the follower executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    /// True for reduce/close orders; the executor must not grow exposure.
    pub reduce_only: bool,
    /// Target notional in USD. For reduce/close orders this is derived from
    /// the follower's own position and the signal's reference price.
    pub notional_usd: Decimal,
    /// Leader reference price; zero when none was available.
    pub price: Decimal,
    /// Target leverage, present only when leverage sync is enabled.
    pub leverage: Option<u32>,
    /// Target margin mode, present only when margin-mode sync is enabled.
    pub margin_mode: Option<MarginMode>,
    /// Fraction of the follower's position to close; set on reduce/close
    /// orders, capped at 1.
    pub close_fraction: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
