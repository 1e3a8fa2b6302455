use crate::domain::errors::CollectError;
use crate::domain::sample::MetricSample;
use async_trait::async_trait;

/// A metrics source polled once per tick.
///
/// Implementations own their instrument registry and any cached connection
/// state; the agent only ever calls `collect`.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Short label used in logs (endpoint URL, process name).
    fn name(&self) -> &str;

    /// Collect one sample. An empty sample means nothing to report this cycle.
    async fn collect(&self) -> Result<MetricSample, CollectError>;
}
