use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Poll cadence applied when the provider config leaves it unset or zero.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Timeout applied when the provider config carries no HTTP client.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// CopyTradingConfig
// ---------------------------------------------------------------------------

/// Per-trader proportional copy settings, as configured upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyTradingConfig {
    /// Mirror size-up signals born from absent positions.
    pub follow_open: bool,
    /// Mirror size-up signals on existing same-direction positions.
    pub follow_add: bool,
    /// Mirror size-down signals (reduce and close).
    pub follow_reduce: bool,
    /// Percent multiplier applied after the margin-share proportion.
    pub follow_ratio: Decimal,
    /// Floor in USD on sized notional; zero disables.
    pub min_amount: Decimal,
    /// Cap in USD on sized notional; zero disables.
    pub max_amount: Decimal,
    /// Mirror leader leverage onto the follower.
    pub sync_leverage: bool,
    /// Mirror leader margin mode onto the follower.
    pub sync_margin_mode: bool,
}

impl Default for CopyTradingConfig {
    fn default() -> Self {
        Self {
            follow_open: true,
            follow_add: true,
            follow_reduce: true,
            follow_ratio: Decimal::ONE_HUNDRED,
            min_amount: Decimal::ZERO,
            max_amount: Decimal::ZERO,
            sync_leverage: true,
            sync_margin_mode: true,
        }
    }
}

impl CopyTradingConfig {
    /// Decode a stored JSON document. Blank or undecodable input falls back
    /// to the defaults; decoded configs are normalized.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        match serde_json::from_str::<Self>(raw) {
            Ok(cfg) => cfg.normalized(),
            Err(e) => {
                tracing::warn!(error = %e, "undecodable copy config, using defaults");
                Self::default()
            }
        }
    }

    /// Clamp out-of-range values. A config with all three follow flags off
    /// is treated as a user mistake and reset to follow everything.
    pub fn normalized(mut self) -> Self {
        if self.follow_ratio <= Decimal::ZERO {
            self.follow_ratio = Decimal::ONE_HUNDRED;
        }
        if self.min_amount < Decimal::ZERO {
            self.min_amount = Decimal::ZERO;
        }
        if self.max_amount < Decimal::ZERO {
            self.max_amount = Decimal::ZERO;
        }
        if !self.follow_open && !self.follow_add && !self.follow_reduce {
            self.follow_open = true;
            self.follow_add = true;
            self.follow_reduce = true;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// ProviderConfig
// ---------------------------------------------------------------------------

/// Construction descriptor for a signal source.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    /// One of `hyperliquid_wallet`, `hyperliquid`, `okx_wallet`, `okx`.
    pub source_type: String,
    /// Wallet address (Hyperliquid) or uniqueName (OKX). Surrounding
    /// whitespace is trimmed; an empty identifier fails at run time.
    pub identifier: String,
    /// Poll cadence; unset or zero falls back to [`DEFAULT_POLL_INTERVAL`].
    pub poll_interval: Option<Duration>,
    /// Injected HTTP client; defaults to one with [`DEFAULT_HTTP_TIMEOUT`].
    pub http_client: Option<reqwest::Client>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_follows_everything() {
        let cfg = CopyTradingConfig::default();
        assert!(cfg.follow_open && cfg.follow_add && cfg.follow_reduce);
        assert_eq!(cfg.follow_ratio, dec!(100));
        assert_eq!(cfg.min_amount, Decimal::ZERO);
        assert_eq!(cfg.max_amount, Decimal::ZERO);
        assert!(cfg.sync_leverage && cfg.sync_margin_mode);
    }

    #[test]
    fn test_parse_blank_and_garbage() {
        assert_eq!(CopyTradingConfig::parse(""), CopyTradingConfig::default());
        assert_eq!(
            CopyTradingConfig::parse("   "),
            CopyTradingConfig::default()
        );
        assert_eq!(
            CopyTradingConfig::parse("{not json"),
            CopyTradingConfig::default()
        );
    }

    #[test]
    fn test_parse_partial_document_keeps_defaults() {
        let cfg = CopyTradingConfig::parse(r#"{"follow_ratio": 50, "max_amount": 2000}"#);
        assert_eq!(cfg.follow_ratio, dec!(50));
        assert_eq!(cfg.max_amount, dec!(2000));
        assert!(cfg.follow_open);
        assert!(cfg.sync_leverage);
    }

    #[test]
    fn test_normalize_clamps_negative_bounds() {
        let cfg = CopyTradingConfig {
            min_amount: dec!(-5),
            max_amount: dec!(-1),
            ..CopyTradingConfig::default()
        }
        .normalized();
        assert_eq!(cfg.min_amount, Decimal::ZERO);
        assert_eq!(cfg.max_amount, Decimal::ZERO);
    }

    #[test]
    fn test_normalize_resets_non_positive_ratio() {
        let cfg = CopyTradingConfig {
            follow_ratio: Decimal::ZERO,
            ..CopyTradingConfig::default()
        }
        .normalized();
        assert_eq!(cfg.follow_ratio, dec!(100));
    }

    #[test]
    fn test_normalize_fully_disabled_resets_flags() {
        let cfg = CopyTradingConfig::parse(
            r#"{"follow_open": false, "follow_add": false, "follow_reduce": false}"#,
        );
        assert!(cfg.follow_open && cfg.follow_add && cfg.follow_reduce);
    }

    #[test]
    fn test_normalize_keeps_partial_flags() {
        let cfg = CopyTradingConfig::parse(r#"{"follow_open": false}"#);
        assert!(!cfg.follow_open);
        assert!(cfg.follow_add && cfg.follow_reduce);
    }
}
