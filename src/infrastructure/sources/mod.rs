//! Metric sources polled by the agent.

pub mod http;
pub mod procfs;
pub mod system;

pub use http::HttpSource;
pub use procfs::{ProcessProbe, ProcfsProbe};
pub use system::SystemSource;
