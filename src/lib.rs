//! Bounded concurrent web crawler. A fixed pool of workers drains a
//! shared frontier, every discovered address passes a scope filter and a
//! budgeted admission gate exactly once, and the run ends as soon as no
//! work is queued or in flight.

mod config;
mod crawler;
mod extract;
mod fetch;
mod frontier;
mod gate;
mod limiter;
mod scope;

pub use config::{CrawlerConfig, Throttle};
pub use crawler::{CrawlReport, Crawler};
pub use extract::{AnchorExtractor, ExtractError, LinkExtractor};
pub use fetch::{FetchError, FetchedPage, Fetcher, HttpFetcher};
pub use scope::{ScopeFilter, UrlScope};

pub use anyhow;
pub use url::Url;
