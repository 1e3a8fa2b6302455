use crate::application::agent::Agent;
use crate::config::Config;
use crate::domain::errors::{BuildError, ConfigError};
use crate::domain::ports::MetricSource;
use crate::infrastructure::HttpClientFactory;
use crate::infrastructure::observability::Reporter;
use crate::infrastructure::observability::reporter::{DEFAULT_BUFFER_CAPACITY, Sink};
use crate::infrastructure::sources::{HttpSource, ProcessProbe, ProcfsProbe, SystemSource};
use std::sync::Arc;
use tracing::{Span, info, info_span};

/// Assembles an [`Agent`] from a validated [`Config`].
///
/// The sink, the process probe and extra sources can be swapped in, which is
/// how tests build agents without touching the filesystem or `/proc`.
#[derive(Default)]
pub struct AgentBuilder {
    config: Option<Config>,
    sink: Option<Sink>,
    probe: Option<Arc<dyn ProcessProbe>>,
    extra_sources: Vec<Arc<dyn MetricSource>>,
    span: Option<Span>,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: Config) -> Self {
        Self::new().config(config)
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Report into `sink` instead of opening the configured output file.
    pub fn with_sink(mut self, sink: Sink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_process_probe(mut self, probe: Arc<dyn ProcessProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Add a source on top of the configured ones.
    pub fn with_source(mut self, source: Arc<dyn MetricSource>) -> Self {
        self.extra_sources.push(source);
        self
    }

    /// Parent span for every component's logs.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn build(self) -> Result<Agent, BuildError> {
        let config = self.config.ok_or(ConfigError::Missing)?;
        config.validate()?;
        let root = self.span.unwrap_or_else(|| info_span!("agent"));

        let mut sources: Vec<Arc<dyn MetricSource>> = Vec::new();

        for (index, http) in config.http_sources.iter().enumerate() {
            let headers = http.header_map(index)?;
            let client = HttpClientFactory::create_client(http.timeout())?;
            let span = info_span!(parent: &root, "http_source", endpoint = %http.endpoint);
            sources.push(Arc::new(HttpSource::new(
                &http.endpoint,
                headers,
                client,
                span,
            )));
        }

        if config.system.enabled {
            let probe: Arc<dyn ProcessProbe> = match self.probe {
                Some(probe) => probe,
                None => Arc::new(ProcfsProbe::new(&config.system.proc_root)),
            };
            let span = info_span!(
                parent: &root,
                "system_source",
                process = %config.system.process_name
            );
            sources.push(Arc::new(SystemSource::new(
                &config.system.process_name,
                probe,
                span,
            )?));
        }

        sources.extend(self.extra_sources);

        let reporter_span = info_span!(parent: &root, "reporter");
        let reporter = match self.sink {
            Some(sink) => Reporter::with_capacity(
                sink,
                config.queue_capacity,
                DEFAULT_BUFFER_CAPACITY,
                reporter_span,
            ),
            None => Reporter::open_file(
                &config.target_output_file,
                config.queue_capacity,
                reporter_span,
            )
            .map_err(|source| BuildError::Sink {
                path: config.target_output_file.clone(),
                source,
            })?,
        };

        root.in_scope(|| info!("Built agent with {} sources", sources.len()));
        Ok(Agent::new(config.sample_interval(), sources, reporter, root))
    }
}
