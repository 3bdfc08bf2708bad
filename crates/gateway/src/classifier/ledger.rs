//! # Solana RPCクライアント
//!
//! ティア判定とトランザクション構築に必要な読み取り系RPCの薄いラッパー。
//! テストでモックに差し替えられるよう、問い合わせ面はトレイトで切る。

use std::str::FromStr;

use solana_sdk::hash::Hash;

/// SPLトークンプログラムのアドレス。
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// RPC問い合わせのエラー。
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// HTTPレベルの失敗
    #[error("RPC送信に失敗: {0}")]
    Transport(String),
    /// RPCサーバーがerrorフィールドを返した
    #[error("RPCエラー応答: {0}")]
    Rpc(String),
    /// 応答JSONが期待した形をしていない
    #[error("RPC応答の形式が不正: {0}")]
    Malformed(String),
}

/// パース済みトークンアカウントの保有情報。
#[derive(Debug, Clone)]
pub struct TokenHolding {
    /// トークンのミントアドレス（Base58）
    pub mint: String,
    /// UI表記の保有量（decimals適用済み）
    pub ui_amount: f64,
}

/// チェーン状態の問い合わせ面。
#[async_trait::async_trait]
pub trait LedgerQuery: Send + Sync {
    /// ウォレットのネイティブ残高（lamports）。
    async fn native_balance(&self, wallet: &str) -> Result<u64, LedgerError>;

    /// ウォレットが保有するSPLトークンアカウントのアドレス一覧。
    async fn token_accounts(&self, wallet: &str) -> Result<Vec<String>, LedgerError>;

    /// トークンアカウントをパースして保有情報を返す。
    /// トークンアカウントとして解釈できない場合はNone。
    async fn parsed_token_account(&self, account: &str)
        -> Result<Option<TokenHolding>, LedgerError>;

    /// 最新のブロックハッシュ。
    async fn latest_blockhash(&self) -> Result<Hash, LedgerError>;
}

/// JSON-RPC over HTTPによる実装。
pub struct RpcLedger {
    rpc_url: String,
    http_client: reqwest::Client,
}

impl RpcLedger {
    pub fn new(http_client: reqwest::Client, rpc_url: String) -> Self {
        Self {
            rpc_url,
            http_client,
        }
    }

    /// JSON-RPCリクエストを送り、`result`フィールドを取り出す。
    async fn rpc_call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, LedgerError> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("{method} の送信に失敗: {e}")))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LedgerError::Transport(format!("{method} 応答のパースに失敗: {e}")))?;

        if let Some(error) = body.get("error") {
            return Err(LedgerError::Rpc(format!("{method}: {error}")));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| LedgerError::Malformed(format!("{method} 応答にresultがありません")))
    }
}

#[async_trait::async_trait]
impl LedgerQuery for RpcLedger {
    async fn native_balance(&self, wallet: &str) -> Result<u64, LedgerError> {
        let result = self
            .rpc_call("getBalance", serde_json::json!([wallet]))
            .await?;
        result
            .get("value")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| LedgerError::Malformed("getBalanceのvalueが数値ではありません".into()))
    }

    async fn token_accounts(&self, wallet: &str) -> Result<Vec<String>, LedgerError> {
        let result = self
            .rpc_call(
                "getTokenAccountsByOwner",
                serde_json::json!([
                    wallet,
                    { "programId": TOKEN_PROGRAM_ID },
                    { "encoding": "base64" },
                ]),
            )
            .await?;

        let accounts = result
            .get("value")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                LedgerError::Malformed("getTokenAccountsByOwnerのvalueが配列ではありません".into())
            })?;

        Ok(accounts
            .iter()
            .filter_map(|account| account.get("pubkey").and_then(|p| p.as_str()))
            .map(String::from)
            .collect())
    }

    async fn parsed_token_account(
        &self,
        account: &str,
    ) -> Result<Option<TokenHolding>, LedgerError> {
        let result = self
            .rpc_call(
                "getAccountInfo",
                serde_json::json!([account, { "encoding": "jsonParsed" }]),
            )
            .await?;

        // value.data.parsed.info が無いものはトークンアカウントではない
        let info = result
            .get("value")
            .and_then(|v| v.get("data"))
            .and_then(|d| d.get("parsed"))
            .and_then(|p| p.get("info"));
        let Some(info) = info else {
            return Ok(None);
        };

        let mint = info.get("mint").and_then(|m| m.as_str());
        let ui_amount = info
            .get("tokenAmount")
            .and_then(|a| a.get("uiAmountString"))
            .and_then(|s| s.as_str())
            .and_then(|s| s.parse::<f64>().ok())
            .or_else(|| {
                info.get("tokenAmount")
                    .and_then(|a| a.get("uiAmount"))
                    .and_then(|a| a.as_f64())
            });

        match (mint, ui_amount) {
            (Some(mint), Some(ui_amount)) => Ok(Some(TokenHolding {
                mint: mint.to_string(),
                ui_amount,
            })),
            _ => Ok(None),
        }
    }

    async fn latest_blockhash(&self) -> Result<Hash, LedgerError> {
        let result = self
            .rpc_call("getLatestBlockhash", serde_json::json!([]))
            .await?;
        let blockhash = result
            .get("value")
            .and_then(|v| v.get("blockhash"))
            .and_then(|b| b.as_str())
            .ok_or_else(|| {
                LedgerError::Malformed("getLatestBlockhashの応答にblockhashがありません".into())
            })?;
        Hash::from_str(blockhash)
            .map_err(|e| LedgerError::Malformed(format!("blockhashのデコードに失敗: {e}")))
    }
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------
