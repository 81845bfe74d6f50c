//! 認証ユーザー一覧（起動時に 1 回だけ構築し、以後は読み取り専用）

use std::collections::HashMap;
use std::fmt;

use tracing::{info, warn};

/// 環境変数名（形式: `USER1:PASS1,USER2:PASS2`）
pub const AUTHORIZED_USERS_ENV: &str = "AUTHORIZED_USERS";

/// `AUTHORIZED_USERS` 未設定時の開発用ユーザー
const BUILTIN_USERS: &[(&str, &str)] = &[
    ("admin", "password123"),
    ("user1", "user1pass"),
    ("user2", "user2pass"),
];

#[derive(Clone, Default)]
pub struct CredentialStore {
    users: HashMap<String, String>,
}

// パスワードをログに出さない
impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.users.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("CredentialStore")
            .field("users", &names)
            .finish()
    }
}

impl CredentialStore {
    pub fn from_pairs<I, U, P>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (U, P)>,
        U: Into<String>,
        P: Into<String>,
    {
        Self {
            users: pairs
                .into_iter()
                .map(|(u, p)| (u.into(), p.into()))
                .collect(),
        }
    }

    /// 開発用の組み込みユーザー
    pub fn builtin() -> Self {
        Self::from_pairs(BUILTIN_USERS.iter().copied())
    }

    /// `USER:PASS,USER:PASS` 形式を解析する
    ///
    /// 不正なエントリ（`:` なし、ユーザー名またはパスワードが空）は警告を出してスキップする。
    /// パスワード中の `:` はそのまま保持される。
    pub fn parse(raw: &str) -> Self {
        let mut users = HashMap::new();
        for (idx, entry) in raw.split(',').enumerate() {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            match entry.split_once(':') {
                Some((user, pass)) if !user.trim().is_empty() && !pass.is_empty() => {
                    users.insert(user.trim().to_string(), pass.to_string());
                }
                _ => warn!(
                    "{} の {} 番目のエントリが不正なためスキップしました",
                    AUTHORIZED_USERS_ENV,
                    idx + 1
                ),
            }
        }
        Self { users }
    }

    /// `AUTHORIZED_USERS` から読み込む。未設定なら組み込みユーザーを使う。
    pub fn from_env() -> Self {
        match std::env::var(AUTHORIZED_USERS_ENV) {
            Ok(raw) => {
                let store = Self::parse(&raw);
                if store.is_empty() {
                    warn!("{} に有効なユーザーがありません。ログインできません", AUTHORIZED_USERS_ENV);
                }
                info!("認証ユーザー読み込み: {}件", store.len());
                store
            }
            Err(_) => {
                warn!(
                    "{} が未設定のため開発用ユーザーを使用します（本番環境では必ず設定してください）",
                    AUTHORIZED_USERS_ENV
                );
                Self::builtin()
            }
        }
    }

    /// ユーザー名とパスワードが一致するか
    pub fn verify(&self, username: &str, password: &str) -> bool {
        match self.users.get(username) {
            Some(expected) => constant_time_eq(expected.as_bytes(), password.as_bytes()),
            None => false,
        }
    }

    pub fn contains_user(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let store = CredentialStore::parse("alice:secret, bob:hunter2");
        assert_eq!(store.len(), 2);
        assert!(store.verify("alice", "secret"));
        assert!(store.verify("bob", "hunter2"));
    }

    #[test]
    fn test_parse_skips_malformed_entries() {
        let store = CredentialStore::parse("alice:secret,broken,:nopass,carol:,dave:pa:ss,,");
        assert_eq!(store.len(), 2);
        assert!(store.verify("alice", "secret"));
        assert!(store.verify("dave", "pa:ss"));
        assert!(!store.contains_user("broken"));
        assert!(!store.contains_user("carol"));
    }

    #[test]
    fn test_verify_rejects_wrong_password_and_unknown_user() {
        let store = CredentialStore::from_pairs([("alice", "secret")]);
        assert!(!store.verify("alice", "secret "));
        assert!(!store.verify("alice", "Secret"));
        assert!(!store.verify("alice", ""));
        assert!(!store.verify("mallory", "secret"));
    }

    #[test]
    fn test_debug_hides_passwords() {
        let store = CredentialStore::from_pairs([("alice", "topsecret")]);
        let printed = format!("{:?}", store);
        assert!(printed.contains("alice"));
        assert!(!printed.contains("topsecret"));
    }

    #[test]
    fn test_builtin_users() {
        let store = CredentialStore::builtin();
        assert!(store.verify("admin", "password123"));
    }
}
