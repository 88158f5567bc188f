use std::cmp;
use std::num::NonZeroUsize;
use std::time::Duration;

use anyhow::bail;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    #[serde(default = "default_limit")]
    pub limit: usize,

    #[serde(default = "default_throttle")]
    pub throttle: Option<Throttle>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_handle_sigint")]
    pub handle_sigint: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            num_workers: default_num_workers(),
            limit: default_limit(),
            throttle: default_throttle(),
            request_timeout_secs: default_request_timeout_secs(),
            handle_sigint: default_handle_sigint(),
        }
    }
}

fn default_user_agent() -> String {
    String::from(concat!("webtrawl/", env!("CARGO_PKG_VERSION")))
}

fn default_num_workers() -> usize {
    cmp::max(1, num_cpus::get().saturating_sub(2))
}

fn default_limit() -> usize {
    100
}

fn default_throttle() -> Option<Throttle> {
    None
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_handle_sigint() -> bool {
    true
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.num_workers == 0 {
            bail!("numWorkers must be at least 1");
        }
        if self.limit == 0 {
            bail!("limit must be at least 1");
        }
        if let Some(Throttle::Delay(secs)) = self.throttle {
            // Everything from_secs_f32 would panic on: negative, NaN,
            // infinite, or too large for a Duration.
            if let Err(e) = Duration::try_from_secs_f32(secs) {
                bail!("invalid throttle delay of {secs} seconds: {e}");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Throttle {
    /// The delay in seconds before each request
    Delay(f32),
    /// The maximum number of requests per second, all workers combined
    PerSecond(NonZeroUsize),
}
