use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::{OrderRequest, OrderSide};

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("exchange error: {0}")]
    Exchange(String),
}

/// Result of an executed follower order.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// Exchange order id; `None` in dry-run mode.
    pub order_id: Option<String>,
    pub filled_notional: Decimal,
    /// Average fill price; zero when unknown (dry-run).
    pub fill_price: Decimal,
}

/// The follower-exchange adapter consumed by the sizing translator.
#[async_trait]
pub trait FollowerExecutor: Send + Sync {
    async fn execute_order(&self, request: &OrderRequest) -> Result<ExecutionReport, ExecutionError>;

    /// Signed size of the follower's current position; zero when absent.
    async fn position_size(&self, symbol: &str) -> Result<Decimal, ExecutionError>;

    /// Current follower account equity in USD.
    async fn equity(&self) -> Result<Decimal, ExecutionError>;
}

// ---------------------------------------------------------------------------
// DryRunExecutor
// ---------------------------------------------------------------------------

/// Executor that logs order intent and tracks follower positions in
/// memory, so proportional closes resolve without a live exchange. Used in
/// monitor-only deployments and tests.
pub struct DryRunExecutor {
    equity: Decimal,
    book: Mutex<HashMap<String, Decimal>>,
}

impl DryRunExecutor {
    pub fn new(equity: Decimal) -> Self {
        Self {
            equity,
            book: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_position(mut self, symbol: impl Into<String>, size: Decimal) -> Self {
        self.book.get_mut().insert(symbol.into(), size);
        self
    }

    /// Current simulated position, for assertions.
    pub async fn position(&self, symbol: &str) -> Decimal {
        self.book
            .lock()
            .await
            .get(symbol)
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl FollowerExecutor for DryRunExecutor {
    async fn execute_order(&self, request: &OrderRequest) -> Result<ExecutionReport, ExecutionError> {
        tracing::info!(
            symbol = %request.symbol,
            side = %request.side,
            notional = %request.notional_usd,
            reduce_only = request.reduce_only,
            leverage = ?request.leverage,
            margin_mode = ?request.margin_mode,
            "[DRY-RUN] would place order"
        );

        let mut book = self.book.lock().await;
        let entry = book.entry(request.symbol.clone()).or_default();
        if request.reduce_only {
            let fraction = request.close_fraction.unwrap_or(Decimal::ONE);
            *entry -= *entry * fraction;
        } else if request.price > Decimal::ZERO {
            let size = request.notional_usd / request.price;
            match request.side {
                OrderSide::Buy => *entry += size,
                OrderSide::Sell => *entry -= size,
            }
        }

        Ok(ExecutionReport {
            order_id: None,
            filled_notional: request.notional_usd,
            fill_price: Decimal::ZERO,
        })
    }

    async fn position_size(&self, symbol: &str) -> Result<Decimal, ExecutionError> {
        Ok(self
            .book
            .lock()
            .await
            .get(symbol)
            .copied()
            .unwrap_or_default())
    }

    async fn equity(&self) -> Result<Decimal, ExecutionError> {
        Ok(self.equity)
    }
}
