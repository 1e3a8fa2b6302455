//! Per-source instrument registry.
//!
//! Each source owns one of these. Gauges are created lazily the first time a
//! name is seen and live for as long as the source does.

use crate::infrastructure::observability::encoder::encode_families;
use prometheus::{Gauge, Opts, Registry, proto::MetricFamily};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{Span, warn};

pub struct InstrumentRegistry {
    registry: Registry,
    gauges: RwLock<HashMap<String, Gauge>>,
    span: Span,
}

impl InstrumentRegistry {
    /// Create an empty registry. Encode failures are logged inside `span`.
    pub fn new(span: Span) -> Self {
        Self {
            registry: Registry::new(),
            gauges: RwLock::new(HashMap::new()),
            span,
        }
    }

    /// Register a gauge up front. Registering the same name twice is an error.
    pub fn register_gauge(&self, name: &str, help: &str) -> prometheus::Result<Gauge> {
        let mut gauges = self.gauges.write().unwrap_or_else(PoisonError::into_inner);
        if gauges.contains_key(name) {
            return Err(prometheus::Error::AlreadyReg);
        }
        let gauge = Gauge::with_opts(Opts::new(name, help))?;
        self.registry.register(Box::new(gauge.clone()))?;
        gauges.insert(name.to_string(), gauge.clone());
        Ok(gauge)
    }

    /// Set a gauge, creating and registering it first if the name is new.
    ///
    /// Existing gauges are looked up under the read lock; the write lock is
    /// only taken to create one.
    pub fn set_gauge(&self, name: &str, help: &str, value: f64) -> prometheus::Result<()> {
        let existing = self
            .gauges
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();

        let gauge = match existing {
            Some(gauge) => gauge,
            None => {
                let mut gauges = self.gauges.write().unwrap_or_else(PoisonError::into_inner);
                // Another task may have created it between the two locks.
                match gauges.get(name) {
                    Some(gauge) => gauge.clone(),
                    None => {
                        let gauge = Gauge::with_opts(Opts::new(name, help))?;
                        self.registry.register(Box::new(gauge.clone()))?;
                        gauges.insert(name.to_string(), gauge.clone());
                        gauge
                    }
                }
            }
        };

        gauge.set(value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.gauges.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every registered family, sorted by name.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Render the registry in text exposition format.
    ///
    /// Families that fail to encode are logged and left out.
    pub fn encode(&self) -> Vec<u8> {
        let encoded = encode_families(&self.gather());
        for failure in &encoded.failures {
            self.span.in_scope(|| {
                warn!(
                    "Dropping metric family {} from output: {}",
                    failure.family, failure.error
                )
            });
        }
        encoded.bytes
    }
}
