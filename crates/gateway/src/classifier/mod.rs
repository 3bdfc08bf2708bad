//! # ティア判定パイプライン
//!
//! ウォレットの総資産（USD換算）を求めてティアを決定し、ミント可能な
//! ティアにはNFTシリアル番号を割り当てる。残高はウォレットごとに
//! 30秒キャッシュし、RPC障害時は期限切れキャッシュへフォールバックする。

pub mod ledger;
pub mod prices;

use solana_sdk::native_token::LAMPORTS_PER_SOL;
use tiergate_types::{Tier, TierInfo};

use crate::config::AppState;
use crate::error::GateError;

/// SOL残高を取得する（キャッシュ優先）。
/// RPC失敗時は期限切れキャッシュがあればそれで継続し、無ければエラー。
async fn sol_balance(state: &AppState, wallet: &str) -> Result<f64, GateError> {
    if let Some(balance) = state.sol_cache.fresh(wallet) {
        tracing::debug!(wallet = %wallet, balance, "SOL残高キャッシュを使用");
        return Ok(balance);
    }

    match state.ledger.native_balance(wallet).await {
        Ok(lamports) => {
            let balance = lamports as f64 / LAMPORTS_PER_SOL as f64;
            state.sol_cache.put(wallet, balance);
            Ok(balance)
        }
        Err(e) => {
            if let Some(stale) = state.sol_cache.stale(wallet) {
                tracing::warn!(wallet = %wallet, error = %e, "SOL残高の取得に失敗。期限切れキャッシュで継続");
                return Ok(stale);
            }
            Err(GateError::TierComputationFailed(format!(
                "SOL残高の取得に失敗: {e}"
            )))
        }
    }
}

/// SPLトークン保有額のUSD合計を取得する（キャッシュ優先）。
/// 一覧取得の失敗は期限切れキャッシュ、それも無ければ0で継続する。
/// 個々のアカウントの読み取り失敗は警告してスキップする。
async fn token_value_usd(state: &AppState, wallet: &str) -> f64 {
    if let Some(value) = state.token_cache.fresh(wallet) {
        tracing::debug!(wallet = %wallet, value, "トークン評価額キャッシュを使用");
        return value;
    }

    let accounts = match state.ledger.token_accounts(wallet).await {
        Ok(accounts) => accounts,
        Err(e) => {
            return match state.token_cache.stale(wallet) {
                Some(stale) => {
                    tracing::warn!(wallet = %wallet, error = %e, "トークン一覧の取得に失敗。期限切れキャッシュで継続");
                    stale
                }
                None => {
                    tracing::warn!(wallet = %wallet, error = %e, "トークン一覧の取得に失敗。トークン分0で継続");
                    0.0
                }
            };
        }
    };

    let mut total = 0.0;
    for account in &accounts {
        match state.ledger.parsed_token_account(account).await {
            Ok(Some(holding)) if holding.ui_amount > 0.0 => {
                total += holding.ui_amount * prices::token_price_usd(&holding.mint);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(account = %account, error = %e, "トークンアカウントの読み取りに失敗。スキップ");
            }
        }
    }

    state.token_cache.put(wallet, total);
    total
}

/// ウォレットを分類してティア情報を返す。
/// ミント可能なティアには未使用のシリアル番号を1つ割り当てる。
/// 範囲が枯渇している場合、ティアはそのままで番号だけNoneになる。
pub async fn classify(state: &AppState, wallet: &str) -> Result<TierInfo, GateError> {
    let balance_sol = sol_balance(state, wallet).await?;
    let sol_price = prices::fetch_sol_price_usd(&state.http_client, &state.price_sources).await;
    let token_usd = token_value_usd(state, wallet).await;
    let total_usd = balance_sol * sol_price + token_usd;

    let tier = Tier::classify(total_usd);
    let nft_number = if tier.allows_mint() {
        state.mint_registry.allocate(tier)
    } else {
        None
    };

    tracing::info!(
        wallet = %wallet,
        tier = %tier,
        balance_sol,
        total_usd,
        "ティアを判定"
    );
    Ok(TierInfo::new(tier, balance_sol, total_usd, nft_number))
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------
