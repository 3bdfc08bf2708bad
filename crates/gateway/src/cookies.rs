//! # Cookieヘルパー
//!
//! `Cookie`リクエストヘッダの読み取りと`Set-Cookie`値の組み立て。
//! 発行するCookieは常にHttpOnly + SameSite=Lax + Path=/ で、
//! Secure属性は設定値に従う。

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

/// リクエストヘッダから指定した名前のCookie値を取り出す。
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        for pair in raw.split(';') {
            if let Some((key, value)) = pair.trim().split_once('=') {
                if key == name {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// `Set-Cookie`ヘッダ値を組み立てる。
pub fn build_cookie(name: &str, value: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie =
        format!("{name}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Cookieを失効させる`Set-Cookie`ヘッダ値を組み立てる。
pub fn expire_cookie(name: &str, secure: bool) -> String {
    build_cookie(name, "", 0, secure)
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------
