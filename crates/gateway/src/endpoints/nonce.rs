//! # チャレンジナンス発行エンドポイント

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::{HeaderName, SET_COOKIE};
use axum::response::AppendHeaders;
use axum::Json;
use tiergate_types::ChallengeResponse;

use crate::config::AppState;
use crate::session;

/// GET /api/auth/nonce
///
/// ランダムナンスと署名対象メッセージを発行する。ナンスはHMACタグ付き
/// Cookieとしても返し、検証時にクライアント申告値と突き合わせる。
pub async fn handle_nonce(
    State(state): State<Arc<AppState>>,
) -> (
    AppendHeaders<[(HeaderName, String); 1]>,
    Json<ChallengeResponse>,
) {
    let nonce = tiergate_crypto::generate_nonce();
    let message = tiergate_crypto::challenge_message(&nonce, session::now_ms());
    let cookie =
        session::issue_nonce_cookie(&state.config.secret, &nonce, state.config.secure_cookies);

    tracing::debug!("チャレンジナンスを発行");
    (
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(ChallengeResponse { nonce, message }),
    )
}
