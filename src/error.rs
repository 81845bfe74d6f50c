use thiserror::Error;

/// 1 URL 分のスクレイピングエラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    #[error("取得エラー: {0}")]
    Fetch(String),

    #[error("解析エラー: {0}")]
    Parse(String),

    #[error("未対応のサイト: {0}")]
    UnsupportedSite(String),
}

impl ScrapeError {
    /// レポート用の種別名
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::Fetch(_) => "fetch_error",
            ScrapeError::Parse(_) => "parse_error",
            ScrapeError::UnsupportedSite(_) => "unsupported_site",
        }
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ScrapeError::Fetch(format!("タイムアウト: {}", e))
        } else if let Some(status) = e.status() {
            ScrapeError::Fetch(format!("HTTP {}", status))
        } else {
            ScrapeError::Fetch(e.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("XLSX生成エラー: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// HTTP リクエスト単位のエラー
#[derive(Error, Debug)]
pub enum AppError {
    #[error("ユーザー名またはパスワードが正しくありません")]
    InvalidCredentials,

    #[error("認証が必要です")]
    Unauthorized,

    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Export(#[from] ExportError),
}
