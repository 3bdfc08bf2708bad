//! # ログアウトエンドポイント

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::{HeaderName, SET_COOKIE};
use axum::response::AppendHeaders;
use axum::Json;

use crate::config::AppState;
use crate::cookies;
use crate::session;

/// POST /api/auth/logout
///
/// セッションCookieとナンスCookieを失効させる。Cookieを持たない
/// リクエストにも同じ応答を返す。
pub async fn handle_logout(
    State(state): State<Arc<AppState>>,
) -> (
    AppendHeaders<[(HeaderName, String); 2]>,
    Json<serde_json::Value>,
) {
    let secure = state.config.secure_cookies;
    tracing::debug!("セッションを破棄");
    (
        AppendHeaders([
            (
                SET_COOKIE,
                cookies::expire_cookie(session::SESSION_COOKIE, secure),
            ),
            (
                SET_COOKIE,
                cookies::expire_cookie(session::NONCE_COOKIE, secure),
            ),
        ]),
        Json(serde_json::json!({ "success": true })),
    )
}
