use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::StreamExt;
use tower::Service;
use tracing::info;

use crate::error::AppError;
use crate::scrape::{BatchReport, ProductScraper, ScrapeBatch};

/// tower::Serviceを実装したバッチスクレイパーサービス
///
/// 1 URL の失敗はバッチ全体を中断せず、`BatchReport::failures` に記録される。
#[derive(Clone)]
pub struct ScraperService {
    scraper: ProductScraper,
    concurrency: usize,
}

impl ScraperService {
    pub fn new(scraper: ProductScraper) -> Self {
        Self {
            scraper,
            concurrency: 4,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

impl Service<ScrapeBatch> for ScraperService {
    type Response = BatchReport;
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, batch: ScrapeBatch) -> Self::Future {
        let scraper = self.scraper.clone();
        let concurrency = self.concurrency;

        Box::pin(async move {
            if batch.is_empty() {
                return Err(AppError::BadRequest("URLが指定されていません".into()));
            }
            info!("スクレイピングリクエスト受信: {}件", batch.urls.len());

            // buffered は入力順で結果を返す
            let outcomes: Vec<_> = futures::stream::iter(batch.urls)
                .map(|url| {
                    let scraper = scraper.clone();
                    async move {
                        let outcome = scraper.scrape(&url).await;
                        (url, outcome)
                    }
                })
                .buffered(concurrency)
                .collect()
                .await;

            let mut report = BatchReport::default();
            for (url, outcome) in outcomes {
                report.push(&url, outcome);
            }

            info!(
                "スクレイピング完了: 成功={}件, 失敗={}件",
                report.records.len(),
                report.failures.len()
            );
            Ok(report)
        })
    }
}
