//! Instrument registries and text exposition encoding.
//!
//! Every source keeps a private [`InstrumentRegistry`]; its contents are
//! rendered with [`encode_families`] each time the source is collected.

pub mod encoder;
pub mod registry;
pub mod reporter;

pub use encoder::encode_families;
pub use registry::InstrumentRegistry;
pub use reporter::Reporter;
