//! # ウォレット署名検証エンドポイント
//!
//! チャレンジに対するEd25519署名を検証し、成功したらセッションを発行する。
//! 検証は必ず「フィールド → Cookie → ナンス照合 → 署名 → 一回性」の順で行い、
//! 失敗理由の詳細はログにのみ残す。

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::{HeaderName, SET_COOKIE};
use axum::http::HeaderMap;
use axum::response::AppendHeaders;
use axum::Json;
use tiergate_types::{VerifyRequest, VerifyResponse};

use crate::config::AppState;
use crate::cookies;
use crate::error::GateError;
use crate::session;

/// POST /api/auth/verify
///
/// チャレンジ署名を検証してセッションCookieを発行する。
/// 使用済みナンスの記録は署名検証が成功した後にのみ行う。
pub async fn handle_verify(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<VerifyRequest>,
) -> Result<
    (
        AppendHeaders<[(HeaderName, String); 2]>,
        Json<VerifyResponse>,
    ),
    GateError,
> {
    // Step 1: 必須フィールドの存在確認
    let (Some(public_key), Some(signature), Some(message)) = (
        body.public_key.as_deref().filter(|s| !s.is_empty()),
        body.signature.as_deref().filter(|s| !s.is_empty()),
        body.message.as_deref().filter(|s| !s.is_empty()),
    ) else {
        return Err(GateError::MissingFields(
            "publicKey, signature, message".to_string(),
        ));
    };

    // Step 2: チャレンジCookieの開封（タグ検証込み）
    let nonce = session::read_nonce(&state.config.secret, &headers)
        .ok_or(GateError::ChallengeExpiredOrMissing)?;

    // Step 3: 署名対象メッセージが発行済みナンスを含むか
    if !message.contains(&nonce) {
        tracing::warn!(wallet = %public_key, "メッセージにナンスが含まれていない認証試行を拒否");
        return Err(GateError::NonceMismatch);
    }

    // Step 4: Ed25519署名の検証
    tiergate_crypto::verify_wallet_signature(public_key, message.as_bytes(), signature).map_err(
        |e| {
            tracing::warn!(wallet = %public_key, error = %e, "ウォレット署名の検証に失敗");
            GateError::InvalidSignature
        },
    )?;

    // Step 5: ナンスの一回性。消費済みなら再認証を要求する
    if !state.nonces.consume(&nonce) {
        tracing::warn!(wallet = %public_key, "使用済みナンスによる認証試行を拒否");
        return Err(GateError::ChallengeExpiredOrMissing);
    }

    // Step 6: セッション発行とナンスCookieの破棄
    let session_cookie =
        session::issue_session_cookie(&state.config.secret, public_key, state.config.secure_cookies)?;
    let clear_nonce = cookies::expire_cookie(session::NONCE_COOKIE, state.config.secure_cookies);

    tracing::info!(wallet = %public_key, "ウォレット認証に成功。セッションを発行");
    Ok((
        AppendHeaders([(SET_COOKIE, session_cookie), (SET_COOKIE, clear_nonce)]),
        Json(VerifyResponse {
            success: true,
            message: "Authentication successful".to_string(),
            verified_wallet: public_key.to_string(),
        }),
    ))
}
