//! # チャレンジCookieとセッションCookie
//!
//! HMACタグ付きCookieの発行・読み取りをまとめる。ナンスは5分、
//! セッションは24時間で失効する。タグ検証は`tiergate_crypto`側で
//! 定数時間比較により行われる。

use axum::http::HeaderMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cookies;
use crate::error::GateError;

/// チャレンジナンスを保持するCookie名。
pub const NONCE_COOKIE: &str = "tiergate_nonce";
/// 認証セッションを保持するCookie名。
pub const SESSION_COOKIE: &str = "tiergate_session";
/// ナンスCookieの寿命（秒）。
pub const NONCE_TTL_SECS: u64 = 300;
/// セッションCookieの寿命（秒）。
pub const SESSION_TTL_SECS: u64 = 86_400;

/// UNIXエポックからの経過ミリ秒。
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// ナンスを封印したチャレンジCookieを発行する。
pub fn issue_nonce_cookie(secret: &[u8], nonce: &str, secure: bool) -> String {
    let sealed = tiergate_crypto::seal(secret, nonce);
    cookies::build_cookie(NONCE_COOKIE, &sealed, NONCE_TTL_SECS, secure)
}

/// チャレンジCookieを開封してナンスを取り出す。
/// Cookieが無い・タグ不一致の場合はNone。
pub fn read_nonce(secret: &[u8], headers: &HeaderMap) -> Option<String> {
    let sealed = cookies::cookie_value(headers, NONCE_COOKIE)?;
    tiergate_crypto::open(secret, &sealed)
}

/// 認証済みウォレットに対するセッションCookieを発行する。
pub fn issue_session_cookie(secret: &[u8], wallet: &str, secure: bool) -> Result<String, GateError> {
    let token = tiergate_crypto::seal_session(secret, wallet, now_ms())
        .map_err(|e| GateError::Internal(format!("セッションの生成に失敗: {e}")))?;
    Ok(cookies::build_cookie(
        SESSION_COOKIE,
        &token,
        SESSION_TTL_SECS,
        secure,
    ))
}

/// セッションCookieを検証してウォレットアドレスを取り出す。
/// Cookieが無い・タグ不一致・期限切れの場合はNone。
pub fn session_wallet(secret: &[u8], headers: &HeaderMap) -> Option<String> {
    let token = cookies::cookie_value(headers, SESSION_COOKIE)?;
    tiergate_crypto::open_session(secret, &token, now_ms(), SESSION_TTL_SECS * 1000)
        .map(|claims| claims.wallet)
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;
    use axum::http::HeaderValue;

    const SECRET: &[u8] = b"test-secret-0123456789abcdef0123";

    fn headers_with(raw: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(raw).unwrap());
        headers
    }

    fn cookie_pair(set_cookie: &str) -> &str {
        set_cookie.split(';').next().unwrap()
    }

    /// 発行したナンスCookieを読み戻せることを確認。
    #[test]
    fn nonce_cookie_round_trip() {
        let nonce = tiergate_crypto::generate_nonce();
        let set_cookie = issue_nonce_cookie(SECRET, &nonce, false);
        assert!(set_cookie.starts_with("tiergate_nonce="));
        assert!(set_cookie.contains("Max-Age=300"));

        let headers = headers_with(cookie_pair(&set_cookie));
        assert_eq!(read_nonce(SECRET, &headers), Some(nonce));
    }

    /// タグを改竄したナンスCookieは開封できないことを確認。
    #[test]
    fn tampered_nonce_cookie_is_rejected() {
        let nonce = tiergate_crypto::generate_nonce();
        let set_cookie = issue_nonce_cookie(SECRET, &nonce, false);
        let pair = cookie_pair(&set_cookie);
        let tampered = format!("{}00", pair);
        let headers = headers_with(&tampered);
        assert_eq!(read_nonce(SECRET, &headers), None);
    }

    /// 発行したセッションCookieからウォレットを取り出せることを確認。
    #[test]
    fn session_cookie_round_trip() {
        let wallet = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
        let set_cookie = issue_session_cookie(SECRET, wallet, false).unwrap();
        assert!(set_cookie.contains("Max-Age=86400"));

        let headers = headers_with(cookie_pair(&set_cookie));
        assert_eq!(session_wallet(SECRET, &headers), Some(wallet.to_string()));
    }

    /// 別のシークレットで発行されたセッションは拒否されることを確認。
    #[test]
    fn session_from_other_secret_is_rejected() {
        let wallet = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
        let set_cookie = issue_session_cookie(b"another-secret", wallet, false).unwrap();
        let headers = headers_with(cookie_pair(&set_cookie));
        assert_eq!(session_wallet(SECRET, &headers), None);
    }
}
