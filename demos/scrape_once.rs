use product_scraper::{export, AppConfig, HttpFetcher, ProductScraper, ScrapeBatch, ScraperService};
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::main]
async fn main() {
    // ログ設定
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // 引数: URL（複数可）
    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        eprintln!("使い方: cargo run --example scrape_once -- <URL>...");
        return;
    }

    let config = AppConfig::from_env();
    let fetcher = Arc::new(HttpFetcher::new(&config).expect("HTTPクライアント初期化失敗"));
    let service = ScraperService::new(ProductScraper::new(fetcher))
        .with_concurrency(config.scrape_concurrency);

    println!("=== Product Scraper Test ===");

    let report = match service.oneshot(ScrapeBatch::new(urls)).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("エラー: {}", e);
            return;
        }
    };

    for record in &report.records {
        println!(
            "[{}] {} / {} / {}",
            record.sku,
            record.name,
            record.price.as_deref().unwrap_or("-"),
            record.source_url
        );
    }
    for failure in &report.failures {
        eprintln!("失敗: {} ({})", failure.url, failure.message);
    }

    let filename = export::export_filename(&chrono::Local::now());
    match export::export(&report.records) {
        Ok(bytes) => match std::fs::write(&filename, bytes) {
            Ok(()) => println!("成功! XLSX保存先: {}", filename),
            Err(e) => eprintln!("保存エラー: {}", e),
        },
        Err(e) => eprintln!("エラー: {}", e),
    }
}
