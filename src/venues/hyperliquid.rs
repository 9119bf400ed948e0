use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

use crate::models::MarginMode;

use super::{parse_decimal, LeaderFill, LeaderPositionMeta, LeaderState, LeaderVenue, VenueError};

const HYPERLIQUID_API_BASE: &str = "https://api.hyperliquid.xyz";

/// Read-only client for the Hyperliquid `info` endpoint, keyed by wallet
/// address. Both queries are POSTs against the same URL, distinguished by
/// the `type` field of the JSON body.
#[derive(Debug, Clone)]
pub struct HyperliquidClient {
    http: Client,
    base_url: String,
    user: String,
}

impl HyperliquidClient {
    pub fn new(http: Client, user: impl Into<String>) -> Self {
        Self {
            http,
            base_url: HYPERLIQUID_API_BASE.into(),
            user: user.into().trim().to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn info(&self, request_type: &str) -> Result<reqwest::Response, VenueError> {
        let resp = self
            .http
            .post(format!("{}/info", self.base_url))
            .json(&serde_json::json!({ "type": request_type, "user": self.user }))
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() >= 400 {
            return Err(VenueError::Api(format!(
                "hyperliquid {request_type} error: {status}"
            )));
        }
        Ok(resp)
    }
}

#[async_trait]
impl LeaderVenue for HyperliquidClient {
    fn venue(&self) -> &'static str {
        "hyperliquid"
    }

    fn identifier(&self) -> &str {
        &self.user
    }

    fn validate(&self) -> Result<(), VenueError> {
        if self.user.is_empty() {
            return Err(VenueError::Config(
                "hyperliquid provider requires wallet address".into(),
            ));
        }
        Ok(())
    }

    async fn fetch_fills(&self) -> Result<Vec<LeaderFill>, VenueError> {
        let resp = self.info("userFills").await?;
        let fills: Vec<RawFill> = resp
            .json()
            .await
            .map_err(|e| VenueError::Api(format!("hyperliquid fills decode error: {e}")))?;

        Ok(fills
            .into_iter()
            .map(|f| LeaderFill {
                symbol: convert_symbol(&f.coin),
                price: parse_decimal(&f.px),
                time: f.time,
                id: f.tid.to_string(),
                cursor: f.tid,
            })
            .collect())
    }

    async fn fetch_state(&self) -> Result<LeaderState, VenueError> {
        let resp = self.info("clearinghouseState").await?;
        let raw: RawState = resp
            .json()
            .await
            .map_err(|e| VenueError::Api(format!("hyperliquid state decode error: {e}")))?;

        let mut positions = HashMap::new();
        for asset in raw.asset_positions {
            let symbol = convert_symbol(&asset.position.coin);
            if symbol.is_empty() {
                continue;
            }
            let leverage = (asset.position.leverage.value as i64).max(1) as u32;
            positions.insert(
                symbol,
                LeaderPositionMeta {
                    size: parse_decimal(&asset.position.szi),
                    leverage,
                    margin_mode: MarginMode::from_api_str(&asset.position.leverage.kind),
                },
            );
        }

        Ok(LeaderState {
            equity: parse_decimal(&raw.margin_summary.account_value),
            positions,
        })
    }
}

/// Uppercase and suffix with `USDT` unless already suffixed. Blank coins
/// normalize to an empty string and are dropped by the caller.
pub fn convert_symbol(coin: &str) -> String {
    let coin = coin.trim();
    if coin.is_empty() {
        return String::new();
    }
    let coin = coin.to_uppercase();
    if coin.ends_with("USDT") {
        coin
    } else {
        format!("{coin}USDT")
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawFill {
    #[serde(default)]
    coin: String,
    #[serde(default)]
    px: String,
    #[serde(default)]
    time: i64,
    #[serde(default)]
    tid: i64,
}

#[derive(Debug, Deserialize)]
struct RawState {
    #[serde(rename = "marginSummary", default)]
    margin_summary: RawMarginSummary,
    #[serde(rename = "assetPositions", default)]
    asset_positions: Vec<RawAssetPosition>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMarginSummary {
    #[serde(rename = "accountValue", default)]
    account_value: String,
}

#[derive(Debug, Deserialize)]
struct RawAssetPosition {
    position: RawPosition,
}

#[derive(Debug, Deserialize)]
struct RawPosition {
    #[serde(default)]
    coin: String,
    #[serde(default)]
    szi: String,
    #[serde(default)]
    leverage: RawLeverage,
}

#[derive(Debug, Default, Deserialize)]
struct RawLeverage {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    value: f64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
