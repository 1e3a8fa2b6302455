use reqwest::Client;
use std::time::Duration;

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Creates the client shared by one HTTP source.
    ///
    /// No retries: a failed request only loses that source's sample for the
    /// current tick. Without a timeout a hung endpoint holds its task (and
    /// shutdown) until the connection gives up.
    pub fn create_client(timeout: Option<Duration>) -> reqwest::Result<Client> {
        let mut builder = Client::builder()
            .pool_max_idle_per_host(5)
            .user_agent(concat!("metrics-agent/", env!("CARGO_PKG_VERSION")));

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout).connect_timeout(timeout);
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_with_and_without_timeout() {
        assert!(HttpClientFactory::create_client(None).is_ok());
        assert!(HttpClientFactory::create_client(Some(Duration::from_secs(10))).is_ok());
    }
}
