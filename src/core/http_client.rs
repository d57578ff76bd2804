use std::time::Duration;

use reqwest::Client;

/// Tunables for the pooled HTTP client shared by embedding providers.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub max_idle_per_host: usize,
    pub idle_timeout: Duration,
    pub keepalive: Duration,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 8,
            idle_timeout: Duration::from_secs(90),
            keepalive: Duration::from_secs(60),
            timeout: Duration::from_secs(30),
            user_agent: format!("rci-service/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// A reqwest client pre-configured with connection pooling, shared across
/// embedding provider instances so repeated calls reuse TCP connections.
#[derive(Debug, Clone)]
pub struct HttpClientPool {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClientPool {
    pub fn new() -> crate::error::Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> crate::error::Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.max_idle_per_host)
            .pool_idle_timeout(config.idle_timeout)
            .tcp_keepalive(config.keepalive)
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| crate::error::Error::internal(format!("building http client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Builds a fresh client with a per-call timeout override, reusing the
    /// rest of the pool's tuning. Used when a single request needs a longer
    /// or shorter deadline than the pool default.
    pub fn client_with_timeout(&self, timeout: Duration) -> crate::error::Result<Client> {
        Client::builder()
            .pool_max_idle_per_host(self.config.max_idle_per_host)
            .pool_idle_timeout(self.config.idle_timeout)
            .tcp_keepalive(self.config.keepalive)
            .timeout(timeout)
            .user_agent(self.config.user_agent.clone())
            .build()
            .map_err(|e| crate::error::Error::internal(format!("building http client: {e}")))
    }
}
