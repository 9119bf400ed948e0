pub mod executor;
pub mod translator;

pub use executor::{DryRunExecutor, ExecutionError, ExecutionReport, FollowerExecutor};
pub use translator::{run_translator, translate_signal, SizingOutcome};

use async_trait::async_trait;

use crate::models::DecisionRecord;

/// Receives one record per sizing decision, sized or skipped. Storage is
/// up to the embedding program; the translator also logs every decision.
#[async_trait]
pub trait DecisionSink: Send + Sync {
    async fn record(&self, decision: &DecisionRecord);
}
