//! # SOL価格オラクル
//!
//! 複数の公開価格APIを同時に叩き、最初に妥当な値を返したソースを採用する。
//! 全ソースが失敗またはタイムアウトした場合は価格0の縮退モードで継続し、
//! ティア判定はトークン保有分のみで行われる。

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinSet;

/// 各価格ソースに与える応答期限。
const PRICE_SOURCE_TIMEOUT: Duration = Duration::from_secs(2);

/// SOL/USD価格の取得元。`parse`は応答JSONからUSD価格を取り出す。
pub struct PriceSource {
    pub name: &'static str,
    pub url: String,
    pub parse: fn(&serde_json::Value) -> Option<f64>,
}

/// 既定の価格ソース一覧。
pub fn default_price_sources() -> Vec<PriceSource> {
    vec![
        PriceSource {
            name: "CoinGecko",
            url: "https://api.coingecko.com/api/v3/simple/price?ids=solana&vs_currencies=usd"
                .to_string(),
            parse: |body| {
                body.get("solana")
                    .and_then(|s| s.get("usd"))
                    .and_then(|p| p.as_f64())
            },
        },
        PriceSource {
            name: "CoinPaprika",
            url: "https://api.coinpaprika.com/v1/tickers/sol-solana".to_string(),
            parse: |body| {
                body.get("quotes")
                    .and_then(|q| q.get("USD"))
                    .and_then(|u| u.get("price"))
                    .and_then(|p| p.as_f64())
            },
        },
        PriceSource {
            name: "CryptoCompare",
            url: "https://min-api.cryptocompare.com/data/price?fsym=SOL&tsyms=USD".to_string(),
            parse: |body| body.get("USD").and_then(|p| p.as_f64()),
        },
    ]
}

/// 複数の非同期タスクを同時に走らせ、最初にSomeを返したものを採用する。
/// 各タスクには個別のタイムアウトを適用する。全滅ならNone。
/// 勝者が決まった時点で残りのタスクは破棄される。
pub async fn race_first_some<T, F>(tasks: Vec<F>, per_task_timeout: Duration) -> Option<T>
where
    T: Send + 'static,
    F: Future<Output = Option<T>> + Send + 'static,
{
    let mut set = JoinSet::new();
    for task in tasks {
        set.spawn(async move {
            tokio::time::timeout(per_task_timeout, task)
                .await
                .ok()
                .flatten()
        });
    }

    while let Some(joined) = set.join_next().await {
        if let Ok(Some(value)) = joined {
            return Some(value);
        }
    }
    None
}

/// SOLの現在価格（USD）を取得する。
/// 全ソース失敗時は0.0を返し、呼び出し側はSOL分を無視して継続する。
pub async fn fetch_sol_price_usd(client: &reqwest::Client, sources: &[PriceSource]) -> f64 {
    let tasks: Vec<_> = sources
        .iter()
        .map(|source| {
            let client = client.clone();
            let name = source.name;
            let url = source.url.clone();
            let parse = source.parse;
            async move {
                let response = match client.get(&url).send().await {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::debug!(source = name, error = %e, "価格ソースへの接続に失敗");
                        return None;
                    }
                };
                if !response.status().is_success() {
                    tracing::debug!(source = name, status = %response.status(), "価格ソースがエラーを返した");
                    return None;
                }
                let body: serde_json::Value = response.json().await.ok()?;
                let price = parse(&body)?;
                if price.is_finite() && price > 0.0 {
                    tracing::debug!(source = name, price, "SOL価格を取得");
                    Some(price)
                } else {
                    tracing::debug!(source = name, price, "価格ソースが不正な値を返した");
                    None
                }
            }
        })
        .collect();

    match race_first_some(tasks, PRICE_SOURCE_TIMEOUT).await {
        Some(price) => price,
        None => {
            tracing::warn!("全ての価格ソースが失敗しました。SOL価格0として継続します");
            0.0
        }
    }
}

/// 既知ステーブルコインの固定価格テーブル（USD）。未知のミントは0。
pub fn token_price_usd(mint: &str) -> f64 {
    match mint {
        // USDC (mainnet)
        "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v" => 1.0,
        // USDC (devnet)
        "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU" => 1.0,
        // USDT (mainnet)
        "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB" => 1.0,
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------
