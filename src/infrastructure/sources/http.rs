//! HTTP endpoint source.
//!
//! `text/plain` responses are assumed to already be in exposition format and
//! are passed through untouched. Flat JSON objects are turned into gauges,
//! one per numeric field, which are kept for the lifetime of the source.

use crate::domain::errors::CollectError;
use crate::domain::ports::MetricSource;
use crate::domain::sample::MetricSample;
use crate::infrastructure::observability::InstrumentRegistry;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use tracing::{Instrument, Span, debug, warn};

pub const TEXT_CONTENT_TYPE: &str = "text/plain";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// How a response body is interpreted, from its media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Json,
    Unsupported,
}

impl ContentKind {
    /// Classify a `Content-Type` value, ignoring parameters such as charset.
    pub fn classify(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            TEXT_CONTENT_TYPE => ContentKind::Text,
            JSON_CONTENT_TYPE => ContentKind::Json,
            _ => ContentKind::Unsupported,
        }
    }
}

pub struct HttpSource {
    endpoint: String,
    headers: HeaderMap,
    client: Client,
    registry: InstrumentRegistry,
    span: Span,
}

impl HttpSource {
    pub fn new(endpoint: &str, headers: HeaderMap, client: Client, span: Span) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            headers,
            client,
            registry: InstrumentRegistry::new(span.clone()),
            span,
        }
    }

    /// Number of gauges created from JSON fields so far.
    pub fn instrument_count(&self) -> usize {
        self.registry.len()
    }

    async fn fetch(&self) -> Result<MetricSample, CollectError> {
        let response = self
            .client
            .get(&self.endpoint)
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|source| CollectError::Request {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        if response.status() != StatusCode::OK {
            return Err(CollectError::Status {
                endpoint: self.endpoint.clone(),
                status: response.status(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let kind = ContentKind::classify(&content_type);
        if kind == ContentKind::Unsupported {
            debug!("Ignoring response with content type {:?}", content_type);
            return Ok(MetricSample::empty());
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read response body: {}", e);
                return Ok(MetricSample::empty());
            }
        };

        match kind {
            ContentKind::Text => Ok(MetricSample::new(body.to_vec())),
            _ => Ok(self.parse_json_metrics(&body)),
        }
    }

    /// Update one gauge per numeric field and encode the whole registry.
    ///
    /// Empty or malformed bodies are logged and produce an empty sample.
    fn parse_json_metrics(&self, body: &[u8]) -> MetricSample {
        if body.trim_ascii().is_empty() {
            debug!("Empty JSON body");
            return MetricSample::empty();
        }

        let fields: Map<String, Value> = match serde_json::from_slice(body) {
            Ok(fields) => fields,
            Err(e) => {
                warn!("Failed to parse JSON metrics: {}", e);
                return MetricSample::empty();
            }
        };

        for (key, value) in &fields {
            let Some(value) = value.as_f64() else {
                continue;
            };
            let name = key.replace('-', "_");
            let help = key.replace('-', " ");
            if let Err(e) = self.registry.set_gauge(&name, &help, value) {
                warn!("Skipping field {:?}: {}", key, e);
            }
        }

        MetricSample::new(self.registry.encode())
    }
}

#[async_trait]
impl MetricSource for HttpSource {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn collect(&self) -> Result<MetricSample, CollectError> {
        self.fetch().instrument(self.span.clone()).await
    }
}
