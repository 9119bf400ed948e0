pub mod decision;
pub mod order;
pub mod signal;

pub use decision::{DecisionOutcome, DecisionRecord, SkipReason};
pub use order::{OrderRequest, OrderSide};
pub use signal::Signal;

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// SignalAction
// ---------------------------------------------------------------------------

/// Normalized action tag carried by every leader signal.
///
/// `add_*` grows an existing same-direction position, `reduce_*` shrinks it
/// without crossing zero; `open_*`/`close_*` mark the zero boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalAction {
    OpenLong,
    OpenShort,
    CloseLong,
    CloseShort,
    AddLong,
    AddShort,
    ReduceLong,
    ReduceShort,
}

impl SignalAction {
    pub fn is_open(self) -> bool {
        matches!(self, SignalAction::OpenLong | SignalAction::OpenShort)
    }

    pub fn is_add(self) -> bool {
        matches!(self, SignalAction::AddLong | SignalAction::AddShort)
    }

    pub fn is_reduce(self) -> bool {
        matches!(self, SignalAction::ReduceLong | SignalAction::ReduceShort)
    }

    pub fn is_close(self) -> bool {
        matches!(self, SignalAction::CloseLong | SignalAction::CloseShort)
    }

    /// True for the actions sized from margin share (open/add); false for
    /// the actions sized proportionally to the follower position.
    pub fn increases_exposure(self) -> bool {
        self.is_open() || self.is_add()
    }

    /// True when the action concerns a long leader position.
    pub fn is_long(self) -> bool {
        matches!(
            self,
            SignalAction::OpenLong
                | SignalAction::AddLong
                | SignalAction::CloseLong
                | SignalAction::ReduceLong
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalAction::OpenLong => "open_long",
            SignalAction::OpenShort => "open_short",
            SignalAction::CloseLong => "close_long",
            SignalAction::CloseShort => "close_short",
            SignalAction::AddLong => "add_long",
            SignalAction::AddShort => "add_short",
            SignalAction::ReduceLong => "reduce_long",
            SignalAction::ReduceShort => "reduce_short",
        }
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// MarginMode
// ---------------------------------------------------------------------------

/// Margin mode of a leader position. The venue wire strings ("cross",
/// "isolated", "") are mapped at the adapter boundary; an empty or unknown
/// string becomes `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginMode {
    Cross,
    Isolated,
}

impl MarginMode {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cross" => Some(MarginMode::Cross),
            "isolated" => Some(MarginMode::Isolated),
            _ => None,
        }
    }
}

impl fmt::Display for MarginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarginMode::Cross => write!(f, "cross"),
            MarginMode::Isolated => write!(f, "isolated"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_families() {
        assert!(SignalAction::OpenShort.is_open());
        assert!(SignalAction::AddLong.is_add());
        assert!(SignalAction::ReduceShort.is_reduce());
        assert!(SignalAction::CloseLong.is_close());

        assert!(SignalAction::AddShort.increases_exposure());
        assert!(!SignalAction::ReduceLong.increases_exposure());
    }

    #[test]
    fn test_action_strings() {
        assert_eq!(SignalAction::OpenLong.to_string(), "open_long");
        assert_eq!(SignalAction::ReduceShort.to_string(), "reduce_short");
    }

    #[test]
    fn test_margin_mode_from_api_str() {
        assert_eq!(MarginMode::from_api_str("Cross"), Some(MarginMode::Cross));
        assert_eq!(
            MarginMode::from_api_str("ISOLATED"),
            Some(MarginMode::Isolated)
        );
        assert_eq!(MarginMode::from_api_str(""), None);
        assert_eq!(MarginMode::from_api_str("portfolio"), None);
    }
}
