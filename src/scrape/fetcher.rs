use async_trait::async_trait;
use tracing::debug;

use crate::config::AppConfig;
use crate::error::ScrapeError;
use crate::traits::PageFetcher;

/// reqwest による HTTP 取得（リトライなし）
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &AppConfig) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.fetch_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| ScrapeError::Fetch(format!("HTTPクライアント初期化エラー: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        debug!("取得完了: {} ({}bytes)", url, body.len());
        Ok(body)
    }
}
