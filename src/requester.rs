use crate::config::ReplayConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::cookie::Jar;
use std::sync::Arc;

pub const USER_AGENT: &str = concat!("logreplay/", env!("CARGO_PKG_VERSION"));

/// Idle connections kept per host, whatever the worker count.
pub const MIN_IDLE_CONNECTIONS: usize = 100;

/// Issues one replayed GET. Each worker owns its own instance.
#[async_trait]
pub trait Requester: Send + Sync {
    /// Resolves once the response body has been fully read. Any error means
    /// the request does not count as a hit.
    async fn get(&self, url: &str) -> Result<()>;
}

/// A worker's HTTP session: its own connection pool and, when cookies are
/// kept, its own cookie jar. Nothing here is shared with other workers.
pub struct HttpRequester {
    client: Client,
}

impl HttpRequester {
    pub fn new(worker_id: usize, config: &ReplayConfig) -> Result<Self> {
        let idle = config.concurrency.max(MIN_IDLE_CONNECTIONS);
        let mut builder = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(idle);

        if config.keep_cookies {
            builder = builder.cookie_provider(Arc::new(Jar::default()));
        }

        let client = builder.build()?;
        log::debug!(
            "[worker {}] HTTP session ready (idle pool {}, cookies {})",
            worker_id,
            idle,
            config.keep_cookies
        );
        Ok(Self { client })
    }
}

#[async_trait]
impl Requester for HttpRequester {
    async fn get(&self, url: &str) -> Result<()> {
        let mut res = self.client.get(url).send().await?;
        let status = res.status();

        // Drain so the connection goes back to the pool.
        while res.chunk().await?.is_some() {}

        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(())
    }
}
