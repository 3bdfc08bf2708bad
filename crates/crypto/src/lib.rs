//! # Tiergate 暗号処理
//!
//! チャレンジナンスの生成、Cookieトークンの完全性保護、セッションクレームの
//! 封印/開封、ウォレット署名の検証を実装する。
//!
//! ## 暗号アルゴリズム
//! | 用途 | アルゴリズム |
//! |------|------------|
//! | Cookieトークン完全性 | HMAC-SHA256 |
//! | ウォレット署名検証 | Ed25519 (verify_strict) |
//! | ナンス生成 | OSエントロピー 16バイト |

use base58::FromBase58;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature, VerifyingKey};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// 暗号処理のエラー型
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// ウォレットアドレスがBase58の32バイト公開鍵でない
    #[error("ウォレットアドレスの形式が不正です")]
    InvalidWalletAddress,
    /// 署名がBase58の64バイト列でない
    #[error("署名の形式が不正です")]
    InvalidSignatureEncoding,
    /// Ed25519署名検証エラー
    #[error("Ed25519署名検証に失敗しました")]
    SignatureVerifyError,
    /// セッションクレームのシリアライズエラー
    #[error("セッションクレームのシリアライズに失敗しました: {0}")]
    SerializeError(String),
}

// ---------------------------------------------------------------------------
// チャレンジナンス
// ---------------------------------------------------------------------------

/// ナンスのエントロピー長（バイト）
const NONCE_BYTES: usize = 16;

/// チャレンジメッセージの固定プリアンブル
const CHALLENGE_PREAMBLE: &str = "Verify Tiergate Wallet Ownership";

/// ランダムナンスを生成してhexエンコードで返す。
///
/// エントロピー源の失敗は回復不能としてパニックする（プロセスレベルの障害）。
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// ウォレットに署名させるチャレンジメッセージを組み立てる。
///
/// タイムスタンプは人間向けの表示専用。検証はCookieに封印されたナンスのみに
/// 依存する。
pub fn challenge_message(nonce: &str, timestamp_ms: u64) -> String {
    format!("{CHALLENGE_PREAMBLE}\n\nNonce: {nonce}\nTimestamp: {timestamp_ms}")
}

// ---------------------------------------------------------------------------
// HMAC封印トークン（Cookie値の改ざん防止）
// ---------------------------------------------------------------------------

/// HMAC-SHA256タグをhexエンコードで計算する。
pub fn hmac_tag(secret: &[u8], data: &[u8]) -> String {
    // HMACは任意長の鍵を受け付けるためnew_from_sliceは失敗しない
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// 値にHMACタグを付与した封印トークン `<value>.<tag>` を作る。
pub fn seal(secret: &[u8], value: &str) -> String {
    format!("{value}.{tag}", tag = hmac_tag(secret, value.as_bytes()))
}

/// 封印トークンを開封し、タグが正当なら値を返す。
///
/// タグ比較は`Mac::verify_slice`による定数時間比較。形式不正・改ざんは
/// 一律Noneにする。
pub fn open(secret: &[u8], sealed: &str) -> Option<String> {
    let (value, tag_hex) = sealed.rsplit_once('.')?;
    if value.is_empty() || tag_hex.is_empty() {
        return None;
    }
    let tag = hex::decode(tag_hex).ok()?;
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(value.as_bytes());
    mac.verify_slice(&tag).ok()?;
    Some(value.to_string())
}

// ---------------------------------------------------------------------------
// セッショントークン
// ---------------------------------------------------------------------------

/// セッショントークンに封印されるクレーム。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// 検証済みウォレットアドレス（Base58）
    pub wallet: String,
    /// 発行時刻（UNIXミリ秒）
    pub iat: u64,
}

/// セッショントークン `<base64url(クレームJSON)>.<tag>` を発行する。
///
/// タグはBase64前の生JSONバイト列に対して計算する。ペイロードのエンコードは
/// Cookie値に収まるようURL-safe Base64（パディングなし）。
pub fn seal_session(secret: &[u8], wallet: &str, issued_at_ms: u64) -> Result<String, CryptoError> {
    let claims = SessionClaims {
        wallet: wallet.to_string(),
        iat: issued_at_ms,
    };
    let payload =
        serde_json::to_string(&claims).map_err(|e| CryptoError::SerializeError(e.to_string()))?;
    let tag = hmac_tag(secret, payload.as_bytes());
    Ok(format!(
        "{payload_b64}.{tag}",
        payload_b64 = URL_SAFE_NO_PAD.encode(payload.as_bytes())
    ))
}

/// セッショントークンを検証して開封する。
///
/// タグ不一致、形式不正、`iat + max_age_ms`超過はいずれもNone。
/// タグ比較は定数時間。
pub fn open_session(
    secret: &[u8],
    token: &str,
    now_ms: u64,
    max_age_ms: u64,
) -> Option<SessionClaims> {
    let (payload_b64, tag_hex) = token.rsplit_once('.')?;
    let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
    let tag = hex::decode(tag_hex).ok()?;
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(&payload);
    mac.verify_slice(&tag).ok()?;

    let claims: SessionClaims = serde_json::from_slice(&payload).ok()?;
    if now_ms.saturating_sub(claims.iat) > max_age_ms {
        return None;
    }
    Some(claims)
}

// ---------------------------------------------------------------------------
// ウォレット署名検証
// ---------------------------------------------------------------------------

/// Base58ウォレットアドレスとBase58署名でEd25519検証を行う。
///
/// メッセージは提示されたバイト列そのものを検証対象とする。弱鍵・可鍛性を
/// 排除するため`verify_strict`を使う。
pub fn verify_wallet_signature(
    wallet_b58: &str,
    message: &[u8],
    signature_b58: &str,
) -> Result<(), CryptoError> {
    let key_bytes = wallet_b58
        .from_base58()
        .map_err(|_| CryptoError::InvalidWalletAddress)?;
    let key_bytes: [u8; 32] = key_bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidWalletAddress)?;
    let verifying_key =
        VerifyingKey::from_bytes(&key_bytes).map_err(|_| CryptoError::InvalidWalletAddress)?;

    let sig_bytes = signature_b58
        .from_base58()
        .map_err(|_| CryptoError::InvalidSignatureEncoding)?;
    let sig_bytes: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidSignatureEncoding)?;
    let signature = Signature::from_bytes(&sig_bytes);

    verifying_key
        .verify_strict(message, &signature)
        .map_err(|_| CryptoError::SignatureVerifyError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base58::ToBase58;
    use ed25519_dalek::{Signer, SigningKey};

    const SECRET: &[u8] = b"test-secret-0123456789abcdef0123";

    /// ナンスが32文字のhexで毎回異なることを確認。
    #[test]
    fn nonce_is_fresh_hex() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_eq!(a.len(), NONCE_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    /// チャレンジメッセージがプリアンブルとナンスを含むことを確認。
    #[test]
    fn challenge_message_embeds_nonce() {
        let nonce = generate_nonce();
        let message = challenge_message(&nonce, 1_700_000_000_000);
        assert!(message.starts_with(CHALLENGE_PREAMBLE));
        assert!(message.contains(&nonce));
        assert!(message.contains("1700000000000"));
    }

    /// 封印トークンの開封が元の値を返すことを確認。
    #[test]
    fn seal_open_roundtrip() {
        let sealed = seal(SECRET, "deadbeef");
        assert_eq!(open(SECRET, &sealed), Some("deadbeef".to_string()));
    }

    /// 値またはタグの1文字改ざんで開封が失敗することを確認。
    #[test]
    fn open_rejects_tampering() {
        let sealed = seal(SECRET, "deadbeef");

        let mut tampered_value = sealed.clone();
        tampered_value.replace_range(0..1, "f");
        assert_eq!(open(SECRET, &tampered_value), None);

        let mut tampered_tag = sealed.clone();
        let last = tampered_tag.pop().unwrap();
        tampered_tag.push(if last == '0' { '1' } else { '0' });
        assert_eq!(open(SECRET, &tampered_tag), None);
    }

    /// 別の鍵や形式不正の開封が失敗することを確認。
    #[test]
    fn open_rejects_wrong_key_and_malformed_input() {
        let sealed = seal(SECRET, "deadbeef");
        assert_eq!(open(b"another-secret", &sealed), None);
        assert_eq!(open(SECRET, "no-dot-here"), None);
        assert_eq!(open(SECRET, ".abcdef"), None);
        assert_eq!(open(SECRET, "value."), None);
    }

    /// セッショントークンの往復でクレームが保たれることを確認。
    #[test]
    fn session_roundtrip() {
        let token = seal_session(SECRET, "SomeWalletAddr", 1_000).unwrap();
        let claims = open_session(SECRET, &token, 2_000, 86_400_000).unwrap();
        assert_eq!(claims.wallet, "SomeWalletAddr");
        assert_eq!(claims.iat, 1_000);
    }

    /// 有効期限切れセッションの開封が失敗することを確認。
    #[test]
    fn session_expires_after_max_age() {
        let token = seal_session(SECRET, "SomeWalletAddr", 1_000).unwrap();
        assert!(open_session(SECRET, &token, 1_000 + 86_400_001, 86_400_000).is_none());
        assert!(open_session(SECRET, &token, 1_000 + 86_400_000, 86_400_000).is_some());
    }

    /// ペイロード改ざんでセッション開封が失敗することを確認。
    #[test]
    fn session_rejects_payload_tampering() {
        let token = seal_session(SECRET, "SomeWalletAddr", 1_000).unwrap();
        let (payload_b64, tag) = token.rsplit_once('.').unwrap();
        let forged_payload =
            URL_SAFE_NO_PAD.encode(br#"{"wallet":"AttackerAddr","iat":1000}"#);
        let forged = format!("{forged_payload}.{tag}");
        assert!(open_session(SECRET, &forged, 2_000, 86_400_000).is_none());
        // 正当なペイロードはそのまま通る
        let intact = format!("{payload_b64}.{tag}");
        assert!(open_session(SECRET, &intact, 2_000, 86_400_000).is_some());
    }

    /// 正しい鍵ペアの署名が検証を通ることを確認。
    #[test]
    fn wallet_signature_verifies() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let wallet = signing_key.verifying_key().to_bytes().to_base58();
        let message = challenge_message(&generate_nonce(), 0);
        let signature = signing_key.sign(message.as_bytes()).to_bytes().to_base58();
        assert!(verify_wallet_signature(&wallet, message.as_bytes(), &signature).is_ok());
    }

    /// 別メッセージへの署名流用が検証で弾かれることを確認。
    #[test]
    fn wallet_signature_rejects_wrong_message() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let wallet = signing_key.verifying_key().to_bytes().to_base58();
        let signature = signing_key.sign(b"message A").to_bytes().to_base58();
        let err = verify_wallet_signature(&wallet, b"message B", &signature).unwrap_err();
        assert!(matches!(err, CryptoError::SignatureVerifyError));
    }

    /// 形式不正な鍵・署名が検証前に弾かれることを確認。
    #[test]
    fn wallet_signature_rejects_malformed_inputs() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let wallet = signing_key.verifying_key().to_bytes().to_base58();
        let signature = signing_key.sign(b"msg").to_bytes().to_base58();

        let err = verify_wallet_signature("0OIl", b"msg", &signature).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidWalletAddress));

        let err = verify_wallet_signature(&wallet, b"msg", "abc").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidSignatureEncoding));
    }
}
