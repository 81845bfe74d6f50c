//! 商品ページスクレイパーモジュール
//!
//! URL を 1 回だけ取得し、商品名・価格・説明文（HTML 書式付き）を抽出する

mod extract;
mod fetcher;
mod markup;
mod types;

use std::sync::Arc;

use reqwest::Url;
use tracing::{info, warn};

use crate::error::ScrapeError;
use crate::traits::PageFetcher;

pub use extract::{clean_text, extract_product, generate_sku, normalize_price};
pub use fetcher::HttpFetcher;
pub use markup::{collapse_whitespace, sanitize_fragment, KEPT_TAGS};
pub use types::{BatchReport, ProductRecord, ScrapeBatch, ScrapeFailure};

/// 取得対象外のホスト
const UNSUPPORTED_HOSTS: &[&str] = &["amazon.", "amzn."];

/// 商品スクレイパー
#[derive(Clone)]
pub struct ProductScraper {
    fetcher: Arc<dyn PageFetcher>,
    max_description_chars: usize,
}

impl ProductScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            max_description_chars: 2000,
        }
    }

    pub fn with_max_description_chars(mut self, max: usize) -> Self {
        self.max_description_chars = max;
        self
    }

    /// 1 URL をスクレイプする
    pub async fn scrape(&self, url: &str) -> Result<ProductRecord, ScrapeError> {
        let url = url.trim();
        if let Err(e) = check_url(url) {
            warn!("スクレイプ対象外: {} ({})", url, e);
            return Err(e);
        }

        info!("Scraping: {}", url);
        let html = match self.fetcher.fetch(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("取得失敗: {} ({})", url, e);
                return Err(e);
            }
        };

        let record = extract_product(url, &html, self.max_description_chars).map_err(|e| {
            warn!("解析失敗: {} ({})", url, e);
            e
        })?;
        info!("Scraped: {} ({})", record.name, record.sku);
        Ok(record)
    }
}

/// http(s) かつ対応サイトかを確認
fn check_url(url: &str) -> Result<(), ScrapeError> {
    let parsed =
        Url::parse(url).map_err(|e| ScrapeError::Fetch(format!("不正なURL {}: {}", url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ScrapeError::Fetch(format!(
            "未対応のスキーム: {}",
            parsed.scheme()
        )));
    }
    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    if UNSUPPORTED_HOSTS.iter().any(|h| host.contains(h)) {
        return Err(ScrapeError::UnsupportedSite(host));
    }
    Ok(())
}
