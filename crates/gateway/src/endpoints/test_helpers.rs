//! # エンドポイントテスト用共通ヘルパー
//!
//! モックLedger、テスト用AppState、モックHTTPサーバーの起動ヘルパー。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use axum::Json;
use base58::ToBase58;
use ed25519_dalek::Signer;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;

use crate::cache::TtlCache;
use crate::classifier::ledger::{LedgerError, LedgerQuery, TokenHolding};
use crate::config::{AppConfig, AppState, MintProgramConfig};
use crate::ratelimit::RateLimiter;
use crate::registry::{MintRegistry, NonceRegistry};

/// テスト用の決め打ちLedger実装。
pub(crate) struct MockLedger {
    /// native_balanceが返すlamports
    pub lamports: u64,
    /// ウォレットが保有するトークン
    pub holdings: Vec<TokenHolding>,
    /// native_balanceを失敗させる
    pub fail_native: bool,
    /// token_accountsを失敗させる
    pub fail_token_accounts: bool,
    /// 指定インデックスのparsed_token_accountだけを失敗させる
    pub fail_account_index: Option<usize>,
    /// latest_blockhashが返す値
    pub blockhash: Hash,
    /// RPC呼び出し回数（キャッシュ検証用）
    pub calls: Arc<AtomicUsize>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self {
            lamports: 0,
            holdings: Vec::new(),
            fail_native: false,
            fail_token_accounts: false,
            fail_account_index: None,
            blockhash: Hash::new_unique(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl LedgerQuery for MockLedger {
    async fn native_balance(&self, _wallet: &str) -> Result<u64, LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_native {
            return Err(LedgerError::Transport("mock: RPC停止中".to_string()));
        }
        Ok(self.lamports)
    }

    async fn token_accounts(&self, _wallet: &str) -> Result<Vec<String>, LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_token_accounts {
            return Err(LedgerError::Transport("mock: RPC停止中".to_string()));
        }
        Ok((0..self.holdings.len())
            .map(|index| format!("MockTokenAccount{index}"))
            .collect())
    }

    async fn parsed_token_account(
        &self,
        account: &str,
    ) -> Result<Option<TokenHolding>, LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let index: usize = account
            .strip_prefix("MockTokenAccount")
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| LedgerError::Malformed("mock: 不明なアカウント".to_string()))?;
        if self.fail_account_index == Some(index) {
            return Err(LedgerError::Malformed("mock: パース不能アカウント".to_string()));
        }
        Ok(self.holdings.get(index).cloned())
    }

    async fn latest_blockhash(&self) -> Result<Hash, LedgerError> {
        Ok(self.blockhash)
    }
}

/// モックLedgerを差し込んだテスト用AppStateを作る。
/// 価格ソースは空にしてあり、SOL価格は常に0へ縮退する。
pub(crate) fn test_state(ledger: MockLedger) -> Arc<AppState> {
    let config = AppConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        secret: b"test-secret-0123456789abcdef0123".to_vec(),
        secure_cookies: false,
        rpc_url: "http://127.0.0.1:0".to_string(),
        mint: MintProgramConfig {
            candy_machine: Pubkey::new_unique(),
            candy_guard: Pubkey::new_unique(),
            collection_mint: Pubkey::new_unique(),
            collection_authority: Pubkey::new_unique(),
            payment_destination: Pubkey::new_unique(),
            compute_unit_limit: 400_000,
            compute_unit_price: 0,
        },
    };

    Arc::new(AppState {
        config,
        http_client: reqwest::Client::new(),
        ledger: Box::new(ledger),
        price_sources: Vec::new(),
        sol_cache: TtlCache::new(Duration::from_secs(30)),
        token_cache: TtlCache::new(Duration::from_secs(30)),
        mint_registry: MintRegistry::new(),
        nonces: NonceRegistry::new(),
        limiter: RateLimiter::new(10, Duration::from_secs(60)),
    })
}

/// テスト用ウォレット。Ed25519鍵を持ち、アドレスと署名をBase58で返す。
pub(crate) struct TestWallet {
    signing_key: ed25519_dalek::SigningKey,
}

impl TestWallet {
    pub(crate) fn new() -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    /// ウォレットアドレス（公開鍵のBase58）。
    pub(crate) fn address(&self) -> String {
        self.signing_key.verifying_key().to_bytes().to_base58()
    }

    /// メッセージへの署名（Base58）。
    pub(crate) fn sign_b58(&self, message: &str) -> String {
        self.signing_key
            .sign(message.as_bytes())
            .to_bytes()
            .to_base58()
    }
}

/// Set-Cookie値から"name=value"部分だけを取り出す。
pub(crate) fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap_or("").to_string()
}

/// 指定のCookieペアを持つリクエストヘッダを作る。
pub(crate) fn headers_with_cookies(pairs: &[String]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if !pairs.is_empty() {
        headers.insert(COOKIE, HeaderValue::from_str(&pairs.join("; ")).unwrap());
    }
    headers
}

/// モックのSolana RPCサーバーを起動し、ポート番号を返す。
/// `responses`はメソッド名から`result`値へのマップ。`__error`キーが
/// あれば全メソッドにそのエラーを返す。
pub(crate) async fn start_mock_rpc(responses: serde_json::Value) -> u16 {
    let app = axum::Router::new().route(
        "/",
        axum::routing::post(move |Json(request): Json<serde_json::Value>| {
            let responses = responses.clone();
            async move {
                if let Some(error) = responses.get("__error") {
                    return Json(serde_json::json!({
                        "jsonrpc": "2.0",
                        "id": 1,
                        "error": error,
                    }));
                }
                let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");
                match responses.get(method) {
                    Some(result) => Json(serde_json::json!({
                        "jsonrpc": "2.0",
                        "id": 1,
                        "result": result,
                    })),
                    None => Json(serde_json::json!({
                        "jsonrpc": "2.0",
                        "id": 1,
                        "error": { "code": -32601, "message": "Method not found" },
                    })),
                }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // サーバー起動待ち
    tokio::time::sleep(Duration::from_millis(50)).await;
    port
}

/// モックの価格APIサーバーを起動し、ポート番号を返す。
/// `/price`へのGETに`delay_ms`待ってから`body`を返す。
pub(crate) async fn start_mock_price_source(body: serde_json::Value, delay_ms: u64) -> u16 {
    let app = axum::Router::new().route(
        "/price",
        axum::routing::get(move || {
            let body = body.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Json(body)
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // サーバー起動待ち
    tokio::time::sleep(Duration::from_millis(50)).await;
    port
}
