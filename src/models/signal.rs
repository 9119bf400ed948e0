use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{MarginMode, SignalAction};

/// A normalized leader position change, as observed on a venue.
///
/// Invariant: `leader_pos_after - leader_pos_before == delta_size`, and the
/// sign of `delta_size` agrees with the action family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Venue-neutral ticker, uppercased (e.g. `BTCUSDT`).
    pub symbol: String,
    pub action: SignalAction,
    /// Absolute USD value of the change; always positive.
    pub notional_usd: Decimal,
    /// Reference price used to compute the notional. Zero means the
    /// consumer must fetch one itself.
    pub price: Decimal,
    /// Leader account equity at observation time.
    pub leader_equity: Decimal,
    /// Leader leverage on the position; zero only on disappearance closes,
    /// where the venue no longer reports the position.
    pub leader_leverage: u32,
    pub margin_mode: Option<MarginMode>,
    pub timestamp: DateTime<Utc>,
    /// Leader position change in base-asset contracts, signed.
    pub delta_size: Decimal,
    /// Leader position size before this change, signed.
    pub leader_pos_before: Decimal,
    /// Leader position size after this change, signed.
    pub leader_pos_after: Decimal,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Signal: symbol={} action={} notional={} delta={} pos {} -> {}",
            self.symbol,
            self.action,
            self.notional_usd,
            self.delta_size,
            self.leader_pos_before,
            self.leader_pos_after,
        )
    }
}
