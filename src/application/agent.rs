//! The sampling scheduler.
//!
//! On every tick the agent spawns one collection task per source. Tasks from
//! a slow tick may still be running when the next one fires; nothing orders
//! them beyond their own completion. On shutdown the agent stops ticking,
//! joins every in-flight task and only then closes the reporter, so all
//! collected samples reach the sink before [`Agent::start`] returns.

use crate::application::shutdown::shutdown_signal;
use crate::domain::ports::MetricSource;
use crate::infrastructure::observability::Reporter;
use crate::infrastructure::observability::reporter::ReporterHandle;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{Instrument, Span, debug, error, info, info_span};

/// Lifecycle of an [`Agent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Idle,
    Running,
    Draining,
    Stopped,
}

pub struct Agent {
    sample_interval: Duration,
    sources: Vec<Arc<dyn MetricSource>>,
    reporter: Reporter,
    state: watch::Sender<AgentState>,
    span: Span,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sources: Vec<&str> = self.sources.iter().map(|s| s.name()).collect();
        f.debug_struct("Agent")
            .field("sample_interval", &self.sample_interval)
            .field("sources", &sources)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl Agent {
    pub fn new(
        sample_interval: Duration,
        sources: Vec<Arc<dyn MetricSource>>,
        reporter: Reporter,
        span: Span,
    ) -> Self {
        let (state, _) = watch::channel(AgentState::Idle);
        Self {
            sample_interval,
            sources,
            reporter,
            state,
            span,
        }
    }

    pub fn sample_interval(&self) -> Duration {
        self.sample_interval
    }

    pub fn sources(&self) -> &[Arc<dyn MetricSource>] {
        &self.sources
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<AgentState> {
        self.state.subscribe()
    }

    /// Run until SIGINT or SIGTERM, then drain and close the reporter.
    pub async fn start(self) -> std::io::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `shutdown` resolves, then drain and close the reporter.
    pub async fn run_until<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let span = self.span.clone();
        self.sample(shutdown).instrument(span).await
    }

    async fn sample<F>(mut self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()>,
    {
        self.reporter.report()?;
        self.state.send_replace(AgentState::Running);
        info!(
            "Sampling {} sources every {:?}",
            self.sources.len(),
            self.sample_interval
        );

        let mut ticker =
            tokio::time::interval_at(Instant::now() + self.sample_interval, self.sample_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight = JoinSet::new();
        let mut tick: u64 = 0;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,

                _ = ticker.tick() => {
                    tick += 1;
                    self.spawn_cycle(&mut in_flight, tick);
                }

                Some(result) = in_flight.join_next(), if !in_flight.is_empty() => {
                    log_task_result(result);
                }
            }
        }

        self.state.send_replace(AgentState::Draining);
        info!(
            "Graceful shutting down agent, waiting for {} collection tasks...",
            in_flight.len()
        );
        while let Some(result) = in_flight.join_next().await {
            log_task_result(result);
        }

        let Agent {
            reporter, state, ..
        } = self;
        reporter.close().await;
        state.send_replace(AgentState::Stopped);
        info!("Agent stopped");
        Ok(())
    }

    fn spawn_cycle(&self, in_flight: &mut JoinSet<()>, tick: u64) {
        debug!("Tick {}: collecting {} sources", tick, self.sources.len());
        for source in &self.sources {
            let source = Arc::clone(source);
            let reporter = self.reporter.handle();
            let span = info_span!("collect", source = %source.name(), tick);
            in_flight.spawn(collect_once(source, reporter).instrument(span));
        }
    }
}

/// One source, one cycle. Failures only cost this source's sample.
async fn collect_once(source: Arc<dyn MetricSource>, reporter: ReporterHandle) {
    match source.collect().await {
        Ok(sample) if sample.is_empty() => debug!("Nothing to report"),
        Ok(sample) => reporter.write(sample).await,
        Err(e) => error!("Collection failed: {}", e),
    }
}

fn log_task_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!("Collection task aborted: {}", e);
    }
}
