use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tracing::warn;

/// ブラウザと同等の User-Agent（ボット判定回避用）
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub session_ttl: Duration,
    pub fetch_timeout: Duration,
    pub user_agent: String,
    /// 説明文テキストの最大文字数
    pub max_description_chars: usize,
    /// 1 バッチ内の同時取得数
    pub scrape_concurrency: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            session_ttl: Duration::from_secs(3600),
            fetch_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_description_chars: 2000,
            scrape_concurrency: 4,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 環境変数から読み込む（起動時に 1 回だけ）
    ///
    /// - `SESSION_TTL_SECS`
    /// - `FETCH_TIMEOUT_SECS`（0 は無視）
    /// - `SCRAPE_CONCURRENCY`（0 は 1 に丸める）
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の取得関数から読み込む
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(secs) = parse_var::<u64, _>(&lookup, "SESSION_TTL_SECS") {
            config = config.with_session_ttl(Duration::from_secs(secs));
        }
        match parse_var::<u64, _>(&lookup, "FETCH_TIMEOUT_SECS") {
            Some(0) => warn!("FETCH_TIMEOUT_SECS=0 は無効なため既定値を使います"),
            Some(secs) => config = config.with_fetch_timeout(Duration::from_secs(secs)),
            None => {}
        }
        if let Some(n) = parse_var::<usize, _>(&lookup, "SCRAPE_CONCURRENCY") {
            config = config.with_scrape_concurrency(n);
        }
        config
    }

    pub fn with_bind(mut self, bind: IpAddr) -> Self {
        self.bind = bind;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_max_description_chars(mut self, max: usize) -> Self {
        self.max_description_chars = max;
        self
    }

    pub fn with_scrape_concurrency(mut self, n: usize) -> Self {
        self.scrape_concurrency = n.max(1);
        self
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("環境変数 {} の値が不正なため無視します: {:?}", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = AppConfig::new()
            .with_port(9000)
            .with_session_ttl(Duration::from_secs(60))
            .with_fetch_timeout(Duration::from_secs(5))
            .with_scrape_concurrency(0);

        assert_eq!(config.port, 9000);
        assert_eq!(config.session_ttl, Duration::from_secs(60));
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.scrape_concurrency, 1);
        assert_eq!(config.listen_addr().port(), 9000);
    }

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.max_description_chars, 2000);
    }

    fn lookup_from(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_from_lookup_reads_values() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SESSION_TTL_SECS", "120"),
            ("FETCH_TIMEOUT_SECS", "10"),
            ("SCRAPE_CONCURRENCY", "8"),
        ]));
        assert_eq!(config.session_ttl, Duration::from_secs(120));
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.scrape_concurrency, 8);
    }

    #[test]
    fn test_from_lookup_rejects_zero_and_invalid_values() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SESSION_TTL_SECS", "soon"),
            ("FETCH_TIMEOUT_SECS", "0"),
            ("SCRAPE_CONCURRENCY", "0"),
        ]));
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.scrape_concurrency, 1);
    }
}
