//! Host process source.
//!
//! Tracks one named process, re-resolving its PID whenever the cached one
//! stops referring to a live process, and reports CPU accounting and network
//! octet counters as five fixed gauges.

use crate::domain::errors::CollectError;
use crate::domain::ports::MetricSource;
use crate::domain::sample::MetricSample;
use crate::infrastructure::observability::InstrumentRegistry;
use crate::infrastructure::sources::procfs::ProcessProbe;
use async_trait::async_trait;
use prometheus::Gauge;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{Instrument, Span, debug, info};

/// Gauges registered once at construction and never added to.
struct ProcessGauges {
    utime: Gauge,
    stime: Gauge,
    start_time: Gauge,
    in_octets: Gauge,
    out_octets: Gauge,
}

pub struct SystemSource {
    process_name: String,
    pid: RwLock<Option<i32>>,
    probe: Arc<dyn ProcessProbe>,
    registry: InstrumentRegistry,
    gauges: ProcessGauges,
    span: Span,
}

impl SystemSource {
    pub fn new(
        process_name: &str,
        probe: Arc<dyn ProcessProbe>,
        span: Span,
    ) -> prometheus::Result<Self> {
        let registry = InstrumentRegistry::new(span.clone());
        let prefix = metric_prefix(process_name);
        let display = display_name(process_name);

        let gauges = ProcessGauges {
            utime: registry.register_gauge(
                &format!("{}_utime", prefix),
                &format!("{} process utime", display),
            )?,
            stime: registry.register_gauge(
                &format!("{}_stime", prefix),
                &format!("{} process stime", display),
            )?,
            start_time: registry.register_gauge(
                &format!("{}_starttime", prefix),
                &format!("{} process start time", display),
            )?,
            in_octets: registry.register_gauge(
                &format!("{}_inoctets", prefix),
                &format!("{} inoctets (bytes)", display),
            )?,
            out_octets: registry.register_gauge(
                &format!("{}_outoctets", prefix),
                &format!("{} outoctets (bytes)", display),
            )?,
        };

        Ok(Self {
            process_name: process_name.to_string(),
            pid: RwLock::new(None),
            probe,
            registry,
            gauges,
            span,
        })
    }

    /// Currently cached PID, if one has been resolved.
    pub fn cached_pid(&self) -> Option<i32> {
        *self.pid.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return a live PID for the target, re-resolving it when the cached one
    /// is gone.
    async fn sync_pid(&self) -> Result<i32, CollectError> {
        if let Some(pid) = self.cached_pid() {
            if self.probe.is_running(pid).await {
                return Ok(pid);
            }
            debug!("Cached pid {} for {} is gone", pid, self.process_name);
        }

        let raw = self.probe.find_pid(&self.process_name).await?;
        let pid = raw
            .lines()
            .next()
            .and_then(|line| line.trim().parse::<i32>().ok())
            .filter(|pid| *pid > 0)
            .ok_or_else(|| CollectError::InvalidPid { raw: raw.clone() })?;

        *self.pid.write().unwrap_or_else(PoisonError::into_inner) = Some(pid);
        info!("Resolved {} to pid {}", self.process_name, pid);
        Ok(pid)
    }

    async fn collect_process(&self) -> Result<MetricSample, CollectError> {
        let pid = self.sync_pid().await?;
        let stat = self.probe.read_stat(pid).await?;

        self.gauges.utime.set(stat.utime);
        self.gauges.stime.set(stat.stime);
        self.gauges.start_time.set(stat.start_time);
        self.gauges.in_octets.set(stat.in_octets);
        self.gauges.out_octets.set(stat.out_octets);

        Ok(MetricSample::new(self.registry.encode()))
    }
}

#[async_trait]
impl MetricSource for SystemSource {
    fn name(&self) -> &str {
        &self.process_name
    }

    async fn collect(&self) -> Result<MetricSample, CollectError> {
        self.collect_process().instrument(self.span.clone()).await
    }
}

/// `algod` -> `algod`, `my-node.bin` -> `my_node_bin`, `9p-server` -> `_9p_server`.
fn metric_prefix(process_name: &str) -> String {
    let lead = match process_name.chars().next() {
        Some(c) if c.is_ascii_digit() => "_",
        _ => "",
    };
    let body = process_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect::<String>();
    format!("{}{}", lead, body)
}

/// `algod` -> `Algod`.
fn display_name(process_name: &str) -> String {
    let mut chars = process_name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
