use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

use crate::models::MarginMode;

use super::{parse_decimal, LeaderFill, LeaderPositionMeta, LeaderState, LeaderVenue, VenueError};

const OKX_API_BASE: &str = "https://www.okx.com";
const COMMUNITY_PATH: &str = "/priapi/v5/ecotrade/public/community/user";

/// Read-only client for the OKX copy-trading community endpoints, keyed by
/// the leader's `uniqueName`.
#[derive(Debug, Clone)]
pub struct OkxClient {
    http: Client,
    base_url: String,
    unique_name: String,
}

impl OkxClient {
    pub fn new(http: Client, unique_name: impl Into<String>) -> Self {
        Self {
            http,
            base_url: OKX_API_BASE.into(),
            unique_name: unique_name.into().trim().to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn get_community<T: DeserializeOwned>(
        &self,
        resource: &str,
        extra_query: &[(&str, &str)],
    ) -> Result<T, VenueError> {
        let now_ms = Utc::now().timestamp_millis().to_string();
        let mut query: Vec<(&str, &str)> =
            vec![("uniqueName", self.unique_name.as_str()), ("t", now_ms.as_str())];
        query.extend_from_slice(extra_query);

        let resp = self
            .http
            .get(format!("{}{}/{}", self.base_url, COMMUNITY_PATH, resource))
            .query(&query)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() >= 400 {
            return Err(VenueError::Api(format!("okx {resource} error: {status}")));
        }

        resp.json()
            .await
            .map_err(|e| VenueError::Api(format!("okx {resource} decode error: {e}")))
    }

    async fn fetch_equity(&self) -> Result<Decimal, VenueError> {
        let resp: AssetResponse = self.get_community("asset", &[]).await?;
        resp.data
            .iter()
            .find(|row| row.currency.eq_ignore_ascii_case("USDT"))
            .map(|row| parse_decimal(&row.amount))
            .ok_or_else(|| VenueError::Api("okx equity not found".into()))
    }

    async fn fetch_positions(&self) -> Result<HashMap<String, LeaderPositionMeta>, VenueError> {
        let resp: PositionResponse = self.get_community("position-current", &[]).await?;

        let mut positions = HashMap::new();
        for parent in resp.data {
            for pos in parent.pos_data {
                let symbol = format_symbol(&pos.inst_id);
                if symbol.is_empty() {
                    continue;
                }
                let mut size = parse_decimal(&pos.pos);
                if pos.pos_side.eq_ignore_ascii_case("short") {
                    size = -size;
                }
                let lever = parse_decimal(&pos.lever);
                let leverage = if lever <= Decimal::ZERO {
                    1
                } else {
                    lever.trunc().to_u32().unwrap_or(1).max(1)
                };
                positions.insert(
                    symbol,
                    LeaderPositionMeta {
                        size,
                        leverage,
                        margin_mode: MarginMode::from_api_str(&pos.margin_mode),
                    },
                );
            }
        }
        Ok(positions)
    }
}

#[async_trait]
impl LeaderVenue for OkxClient {
    fn venue(&self) -> &'static str {
        "okx"
    }

    fn identifier(&self) -> &str {
        &self.unique_name
    }

    fn validate(&self) -> Result<(), VenueError> {
        if self.unique_name.is_empty() {
            return Err(VenueError::Config("okx provider requires uniqueName".into()));
        }
        Ok(())
    }

    async fn fetch_fills(&self) -> Result<Vec<LeaderFill>, VenueError> {
        let resp: TradeResponse = self
            .get_community("trade-records", &[("instType", "SWAP"), ("limit", "50")])
            .await?;

        Ok(resp
            .data
            .into_iter()
            .map(|t| {
                let fill_time = t.fill_time.parse::<i64>().unwrap_or_default();
                LeaderFill {
                    symbol: format_symbol(&t.inst_id),
                    price: parse_decimal(&t.avg_px),
                    time: fill_time,
                    id: t.ord_id,
                    cursor: fill_time,
                }
            })
            .collect())
    }

    async fn fetch_state(&self) -> Result<LeaderState, VenueError> {
        let equity = self.fetch_equity().await?;
        let positions = self.fetch_positions().await?;
        Ok(LeaderState { equity, positions })
    }
}

/// Uppercase, strip the `-SWAP` suffix and the remaining dashes:
/// `BTC-USDT-SWAP` becomes `BTCUSDT`.
pub fn format_symbol(inst_id: &str) -> String {
    let inst_id = inst_id.trim();
    if inst_id.is_empty() {
        return String::new();
    }
    inst_id.to_uppercase().replace("-SWAP", "").replace('-', "")
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TradeResponse {
    #[serde(default)]
    data: Vec<RawTrade>,
}

#[derive(Debug, Deserialize)]
struct RawTrade {
    #[serde(rename = "instId", default)]
    inst_id: String,
    #[serde(rename = "avgPx", default)]
    avg_px: String,
    /// Millisecond timestamp, sent as a string.
    #[serde(rename = "fillTime", default)]
    fill_time: String,
    #[serde(rename = "ordId", default)]
    ord_id: String,
}

#[derive(Debug, Deserialize)]
struct AssetResponse {
    #[serde(default)]
    data: Vec<AssetRow>,
}

#[derive(Debug, Deserialize)]
struct AssetRow {
    #[serde(default)]
    currency: String,
    #[serde(default)]
    amount: String,
}

#[derive(Debug, Deserialize)]
struct PositionResponse {
    #[serde(default)]
    data: Vec<PositionParent>,
}

#[derive(Debug, Deserialize)]
struct PositionParent {
    #[serde(rename = "posData", default)]
    pos_data: Vec<RawPosition>,
}

#[derive(Debug, Deserialize)]
struct RawPosition {
    #[serde(rename = "instId", default)]
    inst_id: String,
    #[serde(rename = "mgnMode", default)]
    margin_mode: String,
    #[serde(rename = "posSide", default)]
    pos_side: String,
    #[serde(default)]
    pos: String,
    #[serde(default)]
    lever: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
