use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::GovernorResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total: usize,
}

/// Capability seam for external search/data providers. The governor gates
/// calls to implementations of this trait; it never speaks a provider
/// protocol itself.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> GovernorResult<SearchResponse>;

    fn name(&self) -> &str;

    fn rate_limit(&self) -> Duration;
}
