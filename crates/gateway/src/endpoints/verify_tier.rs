//! # 公開ティア照会エンドポイント
//!
//! 任意のウォレットアドレスに対するティア判定。認証不要の公開APIのため、
//! クライアントIPごとのレート制限をかける。

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tiergate_types::{VerifyTierRequest, VerifyTierResponse};

use crate::classifier;
use crate::config::AppState;
use crate::error::GateError;

/// Base58表現のSolanaアドレスが取りうる長さの範囲。
const WALLET_LEN_MIN: usize = 32;
const WALLET_LEN_MAX: usize = 44;

/// POST /api/verify-tier
///
/// ウォレットアドレスを受け取り、ティアと残高の概要を返す。
/// 残高はSOLが小数6桁、USDが小数2桁に丸めて返す。
pub async fn handle_verify_tier(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<VerifyTierRequest>,
) -> Result<Json<VerifyTierResponse>, GateError> {
    let ip = client_ip(&headers);
    if !state.limiter.check(&ip) {
        tracing::warn!(ip = %ip, "verify-tierのレート制限を超過");
        return Err(GateError::RateLimited);
    }

    let wallet = body
        .wallet_address
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GateError::MissingFields("walletAddress".to_string()))?;
    if wallet.len() < WALLET_LEN_MIN || wallet.len() > WALLET_LEN_MAX {
        return Err(GateError::BadRequest(
            "ウォレットアドレスの形式が不正です".to_string(),
        ));
    }

    let mut info = classifier::classify(&state, &wallet).await?;
    info.balance = round_to(info.balance, 6);
    info.balance_usd = round_to(info.balance_usd, 2);
    let message = info.tier.mint_message(info.nft_number);

    Ok(Json(VerifyTierResponse {
        wallet_address: wallet,
        info,
        verified: true,
        message,
    }))
}

/// クライアントIPをプロキシヘッダから取り出す。
/// x-forwarded-forの先頭エントリ、無ければx-real-ip、どちらも無ければループバック。
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        })
        .unwrap_or_else(|| "127.0.0.1".to_string())
}

/// 小数`decimals`桁への丸め。
fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------
