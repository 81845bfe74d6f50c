use async_trait::async_trait;

use crate::error::ScrapeError;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// URL を 1 回だけ GET して HTML 本文を返す（2xx 以外は `ScrapeError::Fetch`）
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError>;
}
