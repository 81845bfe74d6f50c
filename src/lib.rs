//! 商品ページスクレイパー Web サービス
//!
//! - 固定ユーザーでログインし、セッションを発行
//! - 商品ページ URL から商品名・価格・説明文（HTML 書式付き）を抽出
//! - 収集結果を XLSX（説明文はリッチテキスト）でダウンロード
//!
//! # サーバー起動例
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use product_scraper::{router, AppConfig, AppState, CredentialStore, HttpFetcher};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::from_env().with_port(8080);
//!     let credentials = Arc::new(CredentialStore::from_env());
//!     let fetcher = Arc::new(HttpFetcher::new(&config)?);
//!
//!     let app = router(AppState::new(&config, credentials, fetcher));
//!     let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! # バッチスクレイプ使用例
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use product_scraper::{AppConfig, HttpFetcher, ProductScraper, ScrapeBatch, ScraperService};
//! use tower::ServiceExt;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let fetcher = Arc::new(HttpFetcher::new(&config).unwrap());
//!     let service = ScraperService::new(ProductScraper::new(fetcher));
//!
//!     let batch = ScrapeBatch::new(["https://shop.example/products/widget"]);
//!     let report = service.oneshot(batch).await.unwrap();
//!     let xlsx = product_scraper::export::export(&report.records).unwrap();
//!     println!("{} records, {} bytes", report.records.len(), xlsx.len());
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod scrape;
pub mod service;
pub mod traits;
pub mod web;

// 主要な型をリエクスポート
pub use auth::{Authenticator, CredentialStore, Session, SessionStore};
pub use config::AppConfig;
pub use error::{AppError, ExportError, ScrapeError};
pub use scrape::{BatchReport, HttpFetcher, ProductRecord, ProductScraper, ScrapeBatch};
pub use service::ScraperService;
pub use traits::PageFetcher;
pub use web::{router, AppState};
