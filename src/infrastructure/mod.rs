pub mod http_client_factory;
pub mod observability;
pub mod sources;

pub use http_client_factory::HttpClientFactory;
