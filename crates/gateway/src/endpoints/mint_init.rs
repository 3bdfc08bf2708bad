//! # ミントトランザクション発行エンドポイント
//!
//! セッション認証済みウォレットに対してmintV2トランザクションを構築し、
//! アセット鍵で部分署名した上でBase64で返す。fee payerスロットは空の
//! ままで、最終署名と送信はクライアントのウォレットが行う。

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use base64::Engine;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signer::keypair::Keypair;
use solana_sdk::signer::Signer;
use tiergate_types::MintInitResponse;

use crate::classifier;
use crate::config::AppState;
use crate::error::GateError;
use crate::session;
use crate::solana_tx;

/// Base64エンコーダ（標準アルファベット、パディングあり）。
pub(crate) fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

/// POST /api/mint/init
///
/// ティアを再判定した上でミントトランザクションを構築する。
/// アセット鍵の秘密鍵はこのハンドラのスコープを出ない。
pub async fn handle_mint_init(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MintInitResponse>, GateError> {
    // Step 1: セッション認証
    let wallet =
        session::session_wallet(&state.config.secret, &headers).ok_or(GateError::Unauthorized)?;
    let minter = Pubkey::from_str(&wallet)
        .map_err(|e| GateError::Internal(format!("セッションのウォレットが不正: {e}")))?;

    // Step 2: ティアの再判定。クライアント申告は信用しない
    let info = classifier::classify(&state, &wallet).await?;
    if !info.tier.allows_mint() {
        tracing::warn!(wallet = %wallet, tier = %info.tier, "ミント不可ティアからのミント要求を拒否");
        return Err(GateError::TierNotEligible(info.tier.label().to_string()));
    }

    // Step 3: 最新ブロックハッシュの取得
    let blockhash = state
        .ledger
        .latest_blockhash()
        .await
        .map_err(|e| GateError::MintBuildFailed(format!("blockhashの取得に失敗: {e}")))?;

    // Step 4: 新規アセット鍵の生成
    let asset_keypair = Keypair::new();
    let asset_pubkey = asset_keypair.pubkey();

    // Step 5: トランザクション構築とアセット鍵による部分署名
    let mut tx = solana_tx::build_mint_tx(&state.config.mint, &minter, &asset_pubkey, &blockhash);
    let signature = asset_keypair.sign_message(&tx.message.serialize());
    solana_tx::apply_partial_signature(&mut tx, &asset_pubkey, signature.as_ref())
        .map_err(GateError::MintBuildFailed)?;

    // Step 6: シリアライズしてBase64で返す
    let tx_bytes = solana_tx::serialize_transaction(&tx).map_err(GateError::MintBuildFailed)?;

    tracing::info!(
        wallet = %wallet,
        mint = %asset_pubkey,
        tier = %info.tier,
        nft_number = ?info.nft_number,
        "ミントトランザクションを発行"
    );
    Ok(Json(MintInitResponse {
        success: true,
        transaction: b64().encode(&tx_bytes),
        mint: asset_pubkey.to_string(),
        message: "Transaction initialized. Please sign in wallet.".to_string(),
    }))
}
