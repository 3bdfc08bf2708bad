//! # ゲートウェイ設定・共有状態
//!
//! 環境変数からの設定読み込みと、全ハンドラが共有するアプリケーション状態の定義。
//! Candy Machine関連のアドレスは必須で、欠けていれば起動時に失敗させる。

use std::str::FromStr;
use std::time::Duration;

use rand::rngs::OsRng;
use rand::RngCore;
use solana_sdk::pubkey::Pubkey;

use crate::cache::TtlCache;
use crate::classifier::ledger::{LedgerQuery, RpcLedger};
use crate::classifier::prices::{default_price_sources, PriceSource};
use crate::ratelimit::RateLimiter;
use crate::registry::{MintRegistry, NonceRegistry};

/// ミント先のオンチェーン構成。全て環境変数から与えられる固定値。
pub struct MintProgramConfig {
    /// Candy Machineアカウント
    pub candy_machine: Pubkey,
    /// Candy Guardアカウント
    pub candy_guard: Pubkey,
    /// コレクションNFTのミント
    pub collection_mint: Pubkey,
    /// コレクションのupdate authority
    pub collection_authority: Pubkey,
    /// solPaymentガードの支払い先
    pub payment_destination: Pubkey,
    /// compute unit上限
    pub compute_unit_limit: u32,
    /// compute unit単価（micro-lamports）
    pub compute_unit_price: u64,
}

/// ゲートウェイの起動設定。
pub struct AppConfig {
    /// 待ち受けアドレス
    pub bind_addr: String,
    /// Cookie署名用HMACシークレット
    pub secret: Vec<u8>,
    /// CookieにSecure属性を付けるか
    pub secure_cookies: bool,
    /// Solana RPCエンドポイント
    pub rpc_url: String,
    /// ミント先構成
    pub mint: MintProgramConfig,
}

impl AppConfig {
    /// 環境変数から設定を読み込む。
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr =
            std::env::var("TIERGATE_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        // シークレット未設定時はランダム値で起動する。再起動で全Cookieが無効になる
        let secret = match std::env::var("TIERGATE_SECRET") {
            Ok(value) if !value.is_empty() => value.into_bytes(),
            _ => {
                tracing::warn!(
                    "TIERGATE_SECRETが未設定です。ランダムシークレットで起動します（再起動で全セッションが無効になります）"
                );
                let mut bytes = [0u8; 32];
                OsRng.fill_bytes(&mut bytes);
                bytes.to_vec()
            }
        };

        let secure_cookies = std::env::var("TIERGATE_SECURE_COOKIES")
            .map(|v| v == "true")
            .unwrap_or(false);

        let rpc_url = std::env::var("SOLANA_RPC_URL")
            .unwrap_or_else(|_| "https://api.devnet.solana.com".to_string());

        let mint = MintProgramConfig {
            candy_machine: required_pubkey("CANDY_MACHINE_ID")?,
            candy_guard: required_pubkey("CANDY_GUARD_ID")?,
            collection_mint: required_pubkey("COLLECTION_MINT")?,
            collection_authority: required_pubkey("COLLECTION_AUTHORITY")?,
            payment_destination: required_pubkey("PAYMENT_DESTINATION")?,
            compute_unit_limit: parsed_or_default("COMPUTE_UNIT_LIMIT", 400_000)?,
            compute_unit_price: parsed_or_default("COMPUTE_UNIT_PRICE", 0)?,
        };

        Ok(AppConfig {
            bind_addr,
            secret,
            secure_cookies,
            rpc_url,
            mint,
        })
    }
}

/// 必須のPubkey環境変数を読む。
fn required_pubkey(name: &str) -> anyhow::Result<Pubkey> {
    let value = std::env::var(name)
        .map_err(|_| anyhow::anyhow!("環境変数 {name} が設定されていません"))?;
    Pubkey::from_str(&value)
        .map_err(|e| anyhow::anyhow!("環境変数 {name} がPubkeyとして不正です: {e}"))
}

/// 数値環境変数を読む。未設定ならデフォルト、パース不能ならエラー。
fn parsed_or_default<T: FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("環境変数 {name} のパースに失敗: {e}")),
        Err(_) => Ok(default),
    }
}

/// 全ハンドラが共有するアプリケーション状態。
pub struct AppState {
    /// 起動設定
    pub config: AppConfig,
    /// 外部API用HTTPクライアント
    pub http_client: reqwest::Client,
    /// チェーン状態の問い合わせ面（テストでモックに差し替える）
    pub ledger: Box<dyn LedgerQuery>,
    /// SOL価格の取得元一覧
    pub price_sources: Vec<PriceSource>,
    /// ウォレット別SOL残高キャッシュ
    pub sol_cache: TtlCache,
    /// ウォレット別トークン評価額キャッシュ
    pub token_cache: TtlCache,
    /// ティア別NFTシリアル番号台帳
    pub mint_registry: MintRegistry,
    /// 使用済みナンス台帳
    pub nonces: NonceRegistry,
    /// verify-tier用レートリミッタ
    pub limiter: RateLimiter,
}

/// 残高キャッシュの保持時間。
const BALANCE_CACHE_TTL: Duration = Duration::from_secs(30);
/// 外部HTTP呼び出しの全体タイムアウト。
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
/// verify-tierのウィンドウあたり許容リクエスト数。
const RATE_LIMIT_MAX: u32 = 10;
/// verify-tierのレート制限ウィンドウ。
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

impl AppState {
    /// 設定から状態を組み立てる。
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent("tiergate/0.1")
            .build()?;
        let ledger = RpcLedger::new(http_client.clone(), config.rpc_url.clone());

        Ok(AppState {
            http_client,
            ledger: Box::new(ledger),
            price_sources: default_price_sources(),
            sol_cache: TtlCache::new(BALANCE_CACHE_TTL),
            token_cache: TtlCache::new(BALANCE_CACHE_TTL),
            mint_registry: MintRegistry::new(),
            nonces: NonceRegistry::new(),
            limiter: RateLimiter::new(RATE_LIMIT_MAX, RATE_LIMIT_WINDOW),
            config,
        })
    }
}
