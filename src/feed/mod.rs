use anyhow::Result;
use async_trait::async_trait;

use crate::model::FetchedPayload;

pub mod http;
pub mod poller;

pub use http::HttpSource;
pub use poller::{CycleReport, Poller};

/// Where a poll cycle gets its payload from.
#[async_trait]
pub trait PayloadSource: Send + Sync {
    async fn fetch(&self) -> Result<FetchedPayload>;

    /// Human-readable origin for logs.
    fn describe(&self) -> String;
}
