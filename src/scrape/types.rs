//! スクレイピング関連の型定義

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;

/// 1 商品分のスクレイプ結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub sku: String,
    pub source_url: String,
    pub name: String,
    /// 小数表記（例: "9.99"）
    pub price: Option<String>,
    /// 限定タグのみを残した HTML
    pub description: String,
    pub image_url: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

/// 失敗した URL とその理由
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeFailure {
    pub url: String,
    pub kind: String,
    pub message: String,
}

impl ScrapeFailure {
    pub fn new(url: impl Into<String>, error: &ScrapeError) -> Self {
        Self {
            url: url.into(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// スクレイピングリクエスト（複数 URL）
#[derive(Debug, Clone, Default)]
pub struct ScrapeBatch {
    pub urls: Vec<String>,
}

impl ScrapeBatch {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
        }
    }

    /// 改行区切りのテキストから作成（空行は無視）
    pub fn from_lines(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// バッチ結果。成功・失敗とも入力順を保持する。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub records: Vec<ProductRecord>,
    pub failures: Vec<ScrapeFailure>,
}

impl BatchReport {
    pub fn push(&mut self, url: &str, outcome: Result<ProductRecord, ScrapeError>) {
        match outcome {
            Ok(record) => self.records.push(record),
            Err(e) => self.failures.push(ScrapeFailure::new(url, &e)),
        }
    }

    pub fn attempted(&self) -> usize {
        self.records.len() + self.failures.len()
    }
}
