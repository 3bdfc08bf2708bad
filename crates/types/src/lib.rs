//! # Tiergate 共有型定義
//!
//! ティア判定のドメインモデルと、各APIエンドポイントのリクエスト/レスポンス構造体を提供する。
//!
//! ## エンコーディング規則
//! - Base58: ウォレットアドレス、署名（Solana標準の人間可読表現）
//! - Base64: バイナリデータ（シリアライズ済みトランザクション等）
//! - JSONフィールド名はcamelCase（Webクライアントとの互換性のため）

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ティア分類
// ---------------------------------------------------------------------------

/// low ティアの下限USD金額。これ未満はミント不可。
pub const TIER_BOUNDARY_LOW: f64 = 10.0;
/// mid ティアの下限USD金額。
pub const TIER_BOUNDARY_MID: f64 = 1_000.0;
/// high ティアの下限USD金額。
pub const TIER_BOUNDARY_HIGH: f64 = 10_000.0;

/// ウォレット総資産額から決まるミントティア。
///
/// 区間は下限含む・上限含まない半開区間。最上位ティアのみ上限なし。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// 総資産 $10 未満。ミント不可。
    Ineligible,
    /// $10 以上 $1,000 未満。シリアル #1-100。
    Low,
    /// $1,000 以上 $10,000 未満。シリアル #100-200。
    Mid,
    /// $10,000 以上。シリアル #200-300。
    High,
}

impl Tier {
    /// 総資産額(USD)からティアを決定する。純粋関数。
    pub fn classify(total_usd: f64) -> Tier {
        if total_usd < TIER_BOUNDARY_LOW {
            Tier::Ineligible
        } else if total_usd < TIER_BOUNDARY_MID {
            Tier::Low
        } else if total_usd < TIER_BOUNDARY_HIGH {
            Tier::Mid
        } else {
            Tier::High
        }
    }

    /// ティア区間の下限(USD)。
    pub fn min_threshold_usd(self) -> f64 {
        match self {
            Tier::Ineligible => 0.0,
            Tier::Low => TIER_BOUNDARY_LOW,
            Tier::Mid => TIER_BOUNDARY_MID,
            Tier::High => TIER_BOUNDARY_HIGH,
        }
    }

    /// ティア区間の上限(USD)。最上位ティアはNone。
    pub fn max_threshold_usd(self) -> Option<f64> {
        match self {
            Tier::Ineligible => Some(TIER_BOUNDARY_LOW),
            Tier::Low => Some(TIER_BOUNDARY_MID),
            Tier::Mid => Some(TIER_BOUNDARY_HIGH),
            Tier::High => None,
        }
    }

    /// ティアに割り当てられたNFTシリアル番号の範囲（両端含む）。
    ///
    /// 隣接ティアとは端の番号(100, 200)を共有する。レジストリはティア毎に
    /// 独立なので、同一ティア内での重複は起きない。
    pub fn serial_range(self) -> Option<(u32, u32)> {
        match self {
            Tier::Ineligible => None,
            Tier::Low => Some((1, 100)),
            Tier::Mid => Some((100, 200)),
            Tier::High => Some((200, 300)),
        }
    }

    /// このティアがミントを許可されているか。
    pub fn allows_mint(self) -> bool {
        self.serial_range().is_some()
    }

    /// JSONワイヤ表現と同じ小文字ラベル。ログ出力用。
    pub fn label(self) -> &'static str {
        match self {
            Tier::Ineligible => "ineligible",
            Tier::Low => "low",
            Tier::Mid => "mid",
            Tier::High => "high",
        }
    }

    /// ティア判定結果をユーザー向けに説明する一文。
    ///
    /// `serial` は割り当て済みシリアル番号。ミント可能ティアでもレンジが
    /// 枯渇していればNoneになる。
    pub fn mint_message(self, serial: Option<u32>) -> String {
        let Some((min, max)) = self.serial_range() else {
            return format!(
                "You need at least ${:.0} in total holdings to mint.",
                TIER_BOUNDARY_LOW
            );
        };
        match serial {
            Some(n) => format!(
                "You qualify for the {} tier - you can mint NFT #{n} (range #{min}-{max}).",
                self.label()
            ),
            None => format!(
                "You qualify for the {} tier but all NFTs in range #{min}-{max} have been minted.",
                self.label()
            ),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// ティア判定の結果一式。分類リクエスト毎に新しく計算される。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierInfo {
    /// 判定されたティア
    pub tier: Tier,
    /// ネイティブ残高（SOL単位）
    pub balance: f64,
    /// SOL + トークンを合算した総資産額（USD）
    #[serde(rename = "balanceUSD")]
    pub balance_usd: f64,
    /// ティア区間の下限（USD）
    #[serde(rename = "minThreshold")]
    pub min_threshold: f64,
    /// ティア区間の上限（USD）。最上位ティアはnull
    #[serde(rename = "maxThreshold")]
    pub max_threshold: Option<f64>,
    /// NFTシリアル番号の範囲（両端含む）。ミント不可ティアはnull
    #[serde(rename = "nftRange")]
    pub nft_range: Option<(u32, u32)>,
    /// 割り当てられたシリアル番号。未割り当てまたは枯渇時はnull
    #[serde(rename = "nftNumber")]
    pub nft_number: Option<u32>,
}

impl TierInfo {
    /// ティアと残高から閾値・レンジ欄を埋めた結果を組み立てる。
    pub fn new(tier: Tier, balance_sol: f64, total_usd: f64, nft_number: Option<u32>) -> Self {
        TierInfo {
            tier,
            balance: balance_sol,
            balance_usd: total_usd,
            min_threshold: tier.min_threshold_usd(),
            max_threshold: tier.max_threshold_usd(),
            nft_range: tier.serial_range(),
            nft_number,
        }
    }
}

// ---------------------------------------------------------------------------
// /api/auth/nonce
// ---------------------------------------------------------------------------

/// GET /api/auth/nonce レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeResponse {
    /// hexエンコードされたランダムナンス（16バイト）
    pub nonce: String,
    /// ウォレットで署名すべきチャレンジメッセージ全文
    pub message: String,
}

// ---------------------------------------------------------------------------
// /api/auth/verify
// ---------------------------------------------------------------------------

/// POST /api/auth/verify リクエスト。
///
/// 全フィールドOptionalで受け、欠落はハンドラ側で400にマップする。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    /// Base58エンコードされたウォレット公開鍵
    #[serde(rename = "publicKey")]
    pub public_key: Option<String>,
    /// Base58エンコードされたEd25519署名（64バイト）
    pub signature: Option<String>,
    /// 署名対象となったチャレンジメッセージ全文
    pub message: Option<String>,
}

/// POST /api/auth/verify レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub message: String,
    /// 検証に成功したウォレットアドレス（Base58）
    #[serde(rename = "verifiedWallet")]
    pub verified_wallet: String,
}

// ---------------------------------------------------------------------------
// /api/tiers/current
// ---------------------------------------------------------------------------

/// GET /api/tiers/current レスポンス。セッション必須。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentTierResponse {
    pub success: bool,
    /// サーバー側で計算したティア判定結果
    pub data: TierInfo,
    /// セッションに紐づくウォレットアドレス（Base58）
    pub wallet: String,
}

// ---------------------------------------------------------------------------
// /api/verify-tier
// ---------------------------------------------------------------------------

/// POST /api/verify-tier リクエスト。認証不要の公開エンドポイント。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyTierRequest {
    /// 判定対象のウォレットアドレス（Base58）
    #[serde(rename = "walletAddress")]
    pub wallet_address: Option<String>,
}

/// POST /api/verify-tier レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyTierResponse {
    #[serde(rename = "walletAddress")]
    pub wallet_address: String,
    /// ティア判定結果（balanceは小数6桁、balanceUSDは小数2桁に丸め済み）
    #[serde(flatten)]
    pub info: TierInfo,
    pub verified: bool,
    /// ティアと割り当て番号を説明する一文
    pub message: String,
}

// ---------------------------------------------------------------------------
// /api/mint/init
// ---------------------------------------------------------------------------

/// POST /api/mint/init レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintInitResponse {
    pub success: bool,
    /// Base64エンコードされた部分署名済みトランザクション
    pub transaction: String,
    /// 新規アセットのミントアドレス（Base58）
    pub mint: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// エラーレスポンス
// ---------------------------------------------------------------------------

/// 全エンドポイント共通のエラーレスポンス本体。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// 機械可読なエラーカテゴリ（snake_case）
    pub error: String,
    /// 人間可読な説明
    pub message: String,
}
