/// One cycle's output from a single source, already in text exposition format.
///
/// The reporter never looks inside; the bytes are written verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricSample(Vec<u8>);

impl MetricSample {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// A sample carrying nothing to report for this cycle.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for MetricSample {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&str> for MetricSample {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}
