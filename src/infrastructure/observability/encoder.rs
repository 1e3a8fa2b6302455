//! Text exposition encoding.
//!
//! Families are encoded one at a time so that a single bad family is dropped
//! without losing the rest of the output.

use prometheus::proto::MetricFamily;
use prometheus::{Encoder, TextEncoder};

/// A family that could not be encoded and was left out of the output.
#[derive(Debug)]
pub struct EncodeFailure {
    pub family: String,
    pub error: prometheus::Error,
}

/// Result of encoding a registry snapshot.
#[derive(Debug, Default)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub failures: Vec<EncodeFailure>,
}

/// Encode families in the order given, as `# HELP`, `# TYPE` and value lines.
pub fn encode_families(families: &[MetricFamily]) -> Encoded {
    let encoder = TextEncoder::new();
    let mut out = Encoded::default();

    for family in families {
        let mut chunk = Vec::new();
        match encoder.encode(std::slice::from_ref(family), &mut chunk) {
            Ok(()) => out.bytes.extend_from_slice(&chunk),
            Err(error) => out.failures.push(EncodeFailure {
                family: family.name().to_string(),
                error,
            }),
        }
    }

    out
}
