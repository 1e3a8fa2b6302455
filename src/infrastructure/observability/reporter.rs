//! Asynchronous sample reporter.
//!
//! Collection tasks hand samples to a bounded queue; a single dedicated
//! thread drains the queue into a buffered writer over the output sink.
//! When the queue is full, producers wait: that is the only backpressure in
//! the pipeline, and it is applied to collection rather than dropping data.

use crate::domain::sample::MetricSample;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{Span, debug, error, info, warn};

/// Pending samples allowed in the queue before producers block.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Size of the write buffer in front of the sink.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

/// Anything the consumer thread can own and append to.
pub type Sink = Box<dyn Write + Send>;

enum Consumer {
    Idle {
        rx: mpsc::Receiver<MetricSample>,
        sink: Sink,
    },
    Running(JoinHandle<()>),
}

/// Bounded-queue reporter owning one output sink.
pub struct Reporter {
    tx: mpsc::Sender<MetricSample>,
    consumer: Option<Consumer>,
    buffer_capacity: usize,
    span: Span,
}

/// Cloneable producer side of a [`Reporter`], handed to collection tasks.
#[derive(Clone)]
pub struct ReporterHandle {
    tx: mpsc::Sender<MetricSample>,
    span: Span,
}

impl Reporter {
    pub fn new(sink: Sink, span: Span) -> Self {
        Self::with_capacity(sink, DEFAULT_QUEUE_CAPACITY, DEFAULT_BUFFER_CAPACITY, span)
    }

    /// # Panics
    /// If `queue_capacity` is zero.
    pub fn with_capacity(
        sink: Sink,
        queue_capacity: usize,
        buffer_capacity: usize,
        span: Span,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity);
        Self {
            tx,
            consumer: Some(Consumer::Idle { rx, sink }),
            buffer_capacity,
            span,
        }
    }

    /// Open `path` in append/create mode and report into it.
    pub fn open_file(path: &Path, queue_capacity: usize, span: Span) -> std::io::Result<Self> {
        let mut options = OpenOptions::new();
        options.append(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }
        let file = options.open(path)?;
        span.in_scope(|| info!("Reporting metrics to {:?}", path));

        Ok(Self::with_capacity(
            Box::new(file),
            queue_capacity,
            DEFAULT_BUFFER_CAPACITY,
            span,
        ))
    }

    pub fn handle(&self) -> ReporterHandle {
        ReporterHandle {
            tx: self.tx.clone(),
            span: self.span.clone(),
        }
    }

    /// Start the consumer thread. Calling it again is a no-op.
    pub fn report(&mut self) -> std::io::Result<()> {
        match self.consumer.take() {
            Some(Consumer::Idle { rx, sink }) => {
                let handle = spawn_consumer(rx, sink, self.buffer_capacity, self.span.clone())?;
                self.consumer = Some(Consumer::Running(handle));
            }
            other => {
                self.span
                    .in_scope(|| warn!("Reporter consumer already running"));
                self.consumer = other;
            }
        }
        Ok(())
    }

    /// Enqueue a sample, waiting while the queue is full.
    pub async fn write(&self, sample: MetricSample) {
        enqueue(&self.tx, sample, &self.span).await;
    }

    /// Stop accepting samples, drain the queue, flush and release the sink.
    ///
    /// Returns once every sample queued before the call has been written.
    /// Outstanding [`ReporterHandle`]s keep the queue open, so callers must
    /// drop them first.
    pub async fn close(self) {
        let Reporter {
            tx,
            consumer,
            buffer_capacity,
            span,
        } = self;
        drop(tx);

        let handle = match consumer {
            Some(Consumer::Running(handle)) => handle,
            Some(Consumer::Idle { rx, sink }) => {
                match spawn_consumer(rx, sink, buffer_capacity, span.clone()) {
                    Ok(handle) => handle,
                    Err(e) => {
                        span.in_scope(|| error!("Failed to start reporter drain: {}", e));
                        return;
                    }
                }
            }
            None => return,
        };

        match tokio::task::spawn_blocking(move || handle.join()).await {
            Ok(Ok(())) => span.in_scope(|| info!("Reporter closed")),
            Ok(Err(_)) => span.in_scope(|| error!("Reporter consumer panicked")),
            Err(e) => span.in_scope(|| error!("Failed to join reporter consumer: {}", e)),
        }
    }
}

impl ReporterHandle {
    /// Enqueue a sample, waiting while the queue is full.
    pub async fn write(&self, sample: MetricSample) {
        enqueue(&self.tx, sample, &self.span).await;
    }
}

async fn enqueue(tx: &mpsc::Sender<MetricSample>, sample: MetricSample, span: &Span) {
    if tx.send(sample).await.is_err() {
        span.in_scope(|| error!("Reporter is closed, dropping sample"));
    }
}

fn spawn_consumer(
    rx: mpsc::Receiver<MetricSample>,
    sink: Sink,
    buffer_capacity: usize,
    span: Span,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("metrics-reporter".to_string())
        .spawn(move || consume(rx, sink, buffer_capacity, span))
}

/// Consumer loop: runs until every producer is gone and the queue is empty.
fn consume(mut rx: mpsc::Receiver<MetricSample>, sink: Sink, buffer_capacity: usize, span: Span) {
    let _entered = span.enter();
    let mut buffer = BufWriter::with_capacity(buffer_capacity, sink);

    while let Some(sample) = rx.blocking_recv() {
        if let Err(e) = buffer.write_all(sample.as_bytes()) {
            error!("Failed to write {} byte sample: {}", sample.len(), e);
            buffer = reset(buffer);
        }
    }

    debug!("Reporter queue drained, flushing sink");
    if let Err(e) = buffer.flush() {
        error!("Failed to flush reporter sink: {}", e);
        buffer = reset(buffer);
    }
    // Dropping the writer releases the sink.
    drop(buffer);
}

/// Discard whatever is buffered and start over on the same sink.
fn reset(buffer: BufWriter<Sink>) -> BufWriter<Sink> {
    let capacity = buffer.capacity();
    let (sink, discarded) = buffer.into_parts();
    if let Ok(bytes) = discarded {
        if !bytes.is_empty() {
            warn!("Discarded {} buffered bytes", bytes.len());
        }
    }
    BufWriter::with_capacity(capacity, sink)
}
