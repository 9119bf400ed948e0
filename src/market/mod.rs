use async_trait::async_trait;
use rust_decimal::Decimal;

/// A market-data snapshot from the external cache.
#[derive(Debug, Clone)]
pub struct Market {
    pub symbol: String,
    pub current_price: Decimal,
}

/// Read-only price fallback, consulted when an observer has no fill price
/// for a symbol. An error or a non-positive `current_price` both mean
/// "no price".
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn get(&self, symbol: &str) -> anyhow::Result<Market>;
}
