//! セッションとセッション毎のレコードバッファ

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::AppError;
use crate::scrape::ProductRecord;

/// トークンのバイト長（base64url で 43 文字）
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    #[serde(skip)]
    pub token: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    /// `None` なら無期限
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// 新しいトークンでセッションを発行
    pub fn issue(username: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|d| now.checked_add_signed(d));
        Self {
            token: generate_token(),
            username: username.into(),
            created_at: now,
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Debug)]
struct SessionEntry {
    session: Session,
    records: Vec<ProductRecord>,
}

/// トークン → セッション + レコードバッファ
///
/// バッファへの追加は書き込みロック下で行うため、同一セッションへの並行スクレイプでも
/// 成功レコードはちょうど 1 回ずつ格納される。
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: Session) {
        let mut map = self.inner.write().await;
        map.insert(
            session.token.clone(),
            SessionEntry {
                session,
                records: Vec::new(),
            },
        );
    }

    /// 有効なセッションを取得する。期限切れならその場で破棄する。
    pub async fn get(&self, token: &str) -> Option<Session> {
        {
            let map = self.inner.read().await;
            match map.get(token) {
                None => return None,
                Some(entry) if !entry.session.is_expired() => {
                    return Some(entry.session.clone())
                }
                Some(_) => {}
            }
        }
        debug!("期限切れセッションを破棄");
        self.inner.write().await.remove(token);
        None
    }

    /// ログアウト
    pub async fn remove(&self, token: &str) -> bool {
        self.inner.write().await.remove(token).is_some()
    }

    /// レコードを追加し、追加後のバッファ件数を返す
    pub async fn append_records(
        &self,
        token: &str,
        records: Vec<ProductRecord>,
    ) -> Result<usize, AppError> {
        let mut map = self.inner.write().await;
        let entry = live_entry(&mut map, token)?;
        entry.records.extend(records);
        Ok(entry.records.len())
    }

    /// バッファの内容（追加順）
    pub async fn records(&self, token: &str) -> Result<Vec<ProductRecord>, AppError> {
        let mut map = self.inner.write().await;
        let entry = live_entry(&mut map, token)?;
        Ok(entry.records.clone())
    }

    /// バッファを空にし、削除件数を返す
    pub async fn clear_records(&self, token: &str) -> Result<usize, AppError> {
        let mut map = self.inner.write().await;
        let entry = live_entry(&mut map, token)?;
        let cleared = entry.records.len();
        entry.records.clear();
        Ok(cleared)
    }

    /// 期限切れセッションをまとめて破棄
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut map = self.inner.write().await;
        let before = map.len();
        map.retain(|_, entry| !entry.session.is_expired_at(now));
        before - map.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

fn live_entry<'a>(
    map: &'a mut HashMap<String, SessionEntry>,
    token: &str,
) -> Result<&'a mut SessionEntry, AppError> {
    let expired = match map.get(token) {
        None => return Err(AppError::Unauthorized),
        Some(entry) => entry.session.is_expired(),
    };
    if expired {
        map.remove(token);
        return Err(AppError::Unauthorized);
    }
    map.get_mut(token).ok_or(AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str) -> ProductRecord {
        ProductRecord {
            sku: "TESTX1000".into(),
            source_url: url.into(),
            name: "Test".into(),
            price: None,
            description: String::new(),
            image_url: None,
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn test_tokens_are_unique_and_url_safe() {
        let a = Session::issue("alice", Duration::from_secs(60));
        let b = Session::issue("alice", Duration::from_secs(60));
        assert_ne!(a.token, b.token);
        assert_eq!(a.token.len(), 43);
        assert!(a
            .token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_zero_ttl_is_expired() {
        let session = Session::issue("alice", Duration::ZERO);
        assert!(session.is_expired());
    }

    #[tokio::test]
    async fn test_get_and_remove() {
        let store = SessionStore::new();
        let session = Session::issue("alice", Duration::from_secs(60));
        let token = session.token.clone();
        store.insert(session).await;

        assert_eq!(store.get(&token).await.map(|s| s.username), Some("alice".into()));
        assert!(store.remove(&token).await);
        assert!(store.get(&token).await.is_none());
        assert!(!store.remove(&token).await);
    }

    #[tokio::test]
    async fn test_expired_session_is_dropped() {
        let store = SessionStore::new();
        let session = Session::issue("alice", Duration::ZERO);
        let token = session.token.clone();
        store.insert(session).await;

        assert!(store.get(&token).await.is_none());
        assert_eq!(store.len().await, 0);
        assert!(matches!(
            store.append_records(&token, vec![record("https://a")]).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_every_record() {
        let store = SessionStore::new();
        let session = Session::issue("alice", Duration::from_secs(60));
        let token = session.token.clone();
        store.insert(session).await;

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            let token = token.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append_records(&token, vec![record(&format!("https://shop.example/{}", i))])
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let records = store.records(&token).await.unwrap();
        assert_eq!(records.len(), 16);
        let mut urls: Vec<_> = records.iter().map(|r| r.source_url.clone()).collect();
        urls.sort();
        urls.dedup();
        assert_eq!(urls.len(), 16);

        assert_eq!(store.clear_records(&token).await.unwrap(), 16);
        assert!(store.records(&token).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = SessionStore::new();
        store.insert(Session::issue("a", Duration::ZERO)).await;
        store.insert(Session::issue("b", Duration::from_secs(60))).await;
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 1);
    }
}
