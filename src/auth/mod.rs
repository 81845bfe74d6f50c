//! 認証モジュール
//!
//! 固定ユーザー一覧との照合とセッション発行を行う

mod credentials;
mod session;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::AppError;

pub use credentials::{CredentialStore, AUTHORIZED_USERS_ENV};
pub use session::{Session, SessionStore};

/// 認証器（ユーザー一覧は起動時に構築したものを共有参照する）
#[derive(Debug, Clone)]
pub struct Authenticator {
    credentials: Arc<CredentialStore>,
    session_ttl: Duration,
}

impl Authenticator {
    pub fn new(credentials: Arc<CredentialStore>, session_ttl: Duration) -> Self {
        Self {
            credentials,
            session_ttl,
        }
    }

    /// 認証に成功したら新しいセッションを発行する
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Session, AppError> {
        if !self.credentials.verify(username, password) {
            warn!("ログイン失敗: user={}", username);
            return Err(AppError::InvalidCredentials);
        }
        info!("ログイン成功: user={}", username);
        Ok(Session::issue(username, self.session_ttl))
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }
}
