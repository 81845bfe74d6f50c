use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Form, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;
use tracing::info;

use super::{AppState, AuthSession, SESSION_COOKIE};
use crate::error::AppError;
use crate::export::{self, export_filename, XLSX_CONTENT_TYPE};
use crate::scrape::{ProductRecord, ScrapeBatch, ScrapeFailure};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeForm {
    /// 改行区切りの URL
    pub urls: String,
}

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub records: Vec<ProductRecord>,
    pub failures: Vec<ScrapeFailure>,
    /// セッションに蓄積済みの件数
    pub buffered: usize,
}

#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub username: String,
    pub count: usize,
    pub records: Vec<ProductRecord>,
}

pub async fn health() -> &'static str {
    "ok"
}

/// フォーム本文、なければ Basic 認証ヘッダーで認証する
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let (username, password) = match form {
        Ok(Form(f)) => (f.username, f.password),
        Err(_) => basic_credentials(&headers).ok_or_else(|| {
            AppError::BadRequest("username と password を指定してください".into())
        })?,
    };

    let session = state.authenticator.authenticate(&username, &password)?;

    let purged = state.sessions.purge_expired().await;
    if purged > 0 {
        info!("期限切れセッションを破棄: {}件", purged);
    }
    state.sessions.insert(session.clone()).await;

    let cookie = Cookie::build((SESSION_COOKIE, session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            token: session.token,
            username: session.username,
            expires_at: session.expires_at,
        }),
    ))
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

pub async fn logout(
    State(state): State<AppState>,
    auth: AuthSession,
    jar: CookieJar,
) -> (CookieJar, StatusCode) {
    state.sessions.remove(&auth.token).await;
    info!("ログアウト: user={}", auth.session.username);
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        StatusCode::NO_CONTENT,
    )
}

/// 成功分のみセッションのバッファに追加し、失敗は URL ごとに返す
pub async fn scrape(
    State(state): State<AppState>,
    auth: AuthSession,
    Form(form): Form<ScrapeForm>,
) -> Result<Json<ScrapeResponse>, AppError> {
    let batch = ScrapeBatch::from_lines(&form.urls);
    let report = state.scraper.clone().oneshot(batch).await?;

    let buffered = state
        .sessions
        .append_records(&auth.token, report.records.clone())
        .await?;

    Ok(Json(ScrapeResponse {
        records: report.records,
        failures: report.failures,
        buffered,
    }))
}

pub async fn list_records(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<Json<RecordsResponse>, AppError> {
    let records = state.sessions.records(&auth.token).await?;
    Ok(Json(RecordsResponse {
        username: auth.session.username,
        count: records.len(),
        records,
    }))
}

pub async fn clear_records(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<Json<serde_json::Value>, AppError> {
    let cleared = state.sessions.clear_records(&auth.token).await?;
    Ok(Json(serde_json::json!({ "cleared": cleared })))
}

pub async fn export_xlsx(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<impl IntoResponse, AppError> {
    let records = state.sessions.records(&auth.token).await?;
    let bytes = export::export(&records)?;
    let filename = export_filename(&Local::now());
    info!(
        "エクスポート: user={}, {}件 -> {}",
        auth.session.username,
        records.len(),
        filename
    );

    Ok((
        [
            (CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_basic_credentials() {
        let mut headers = HeaderMap::new();
        let encoded = STANDARD.encode("alice:pa:ss");
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {}", encoded)).unwrap(),
        );
        assert_eq!(
            basic_credentials(&headers),
            Some(("alice".to_string(), "pa:ss".to_string()))
        );

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
        assert_eq!(basic_credentials(&headers), None);
    }
}
