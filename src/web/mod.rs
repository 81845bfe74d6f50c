//! HTTP サーバー（axum）
//!
//! | メソッド | パス       | 認証 | 内容                         |
//! |----------|------------|------|------------------------------|
//! | GET      | `/`        | 不要 | 操作用 HTML                  |
//! | GET      | `/health`  | 不要 | 死活監視                     |
//! | POST     | `/login`   | 不要 | ログイン（Cookie 発行）      |
//! | POST     | `/logout`  | 必要 | セッション破棄               |
//! | POST     | `/scrape`  | 必要 | URL 一覧をスクレイプ         |
//! | GET      | `/records` | 必要 | 収集済みレコード一覧         |
//! | DELETE   | `/records` | 必要 | 収集済みレコードを破棄       |
//! | GET      | `/export`  | 必要 | XLSX ダウンロード            |

mod handlers;
mod page;
mod session;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::error;

use crate::auth::{Authenticator, CredentialStore, SessionStore};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::scrape::ProductScraper;
use crate::service::ScraperService;
use crate::traits::PageFetcher;

pub use session::{AuthSession, SESSION_COOKIE};

/// ハンドラ間で共有する状態
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Authenticator,
    pub sessions: SessionStore,
    pub scraper: ScraperService,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        credentials: Arc<CredentialStore>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        let scraper = ProductScraper::new(fetcher)
            .with_max_description_chars(config.max_description_chars);
        Self {
            authenticator: Authenticator::new(credentials, config.session_ttl),
            sessions: SessionStore::new(),
            scraper: ScraperService::new(scraper).with_concurrency(config.scrape_concurrency),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(page::index))
        .route("/health", get(handlers::health))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/scrape", post(handlers::scrape))
        .route(
            "/records",
            get(handlers::list_records).delete(handlers::clear_records),
        )
        .route("/export", get(handlers::export_xlsx))
        .with_state(state)
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Unauthorized => "unauthorized",
            AppError::BadRequest(_) => "bad_request",
            AppError::Export(_) => "export_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("リクエスト処理エラー: {}", self);
        }
        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
