use std::net::IpAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use product_scraper::{router, AppConfig, AppState, CredentialStore, HttpFetcher};

/// 商品ページスクレイパー Web サーバー
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// 待ち受けポート
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// 待ち受けアドレス
    #[arg(long, env = "BIND", default_value = "0.0.0.0")]
    bind: IpAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env があれば読み込む（AUTHORIZED_USERS など）
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,product_scraper=debug")),
        )
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env()
        .with_bind(args.bind)
        .with_port(args.port);

    let credentials = Arc::new(CredentialStore::from_env());
    let fetcher = Arc::new(HttpFetcher::new(&config).context("HTTPクライアント初期化失敗")?);
    let app = router(AppState::new(&config, credentials, fetcher));

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("{} で待ち受けできません", addr))?;

    info!("サーバー起動: http://{}", addr);
    info!(
        "セッション有効期限={}秒, 取得タイムアウト={}秒",
        config.session_ttl.as_secs(),
        config.fetch_timeout.as_secs()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("サーバーエラー")?;

    info!("サーバー停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("シグナル待機エラー: {}", e);
    }
}
