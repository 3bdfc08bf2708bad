//! # ゲートウェイエラー型
//!
//! 全ハンドラ共通のエラー型。HTTPステータスと機械可読なカテゴリ文字列への
//! 対応付けをここに集約する。認証系のエラーは呼び出し側でログに詳細を残し、
//! レスポンス本文には内部情報を含めない。

use axum::http::StatusCode;
use axum::Json;
use tiergate_types::ErrorBody;

/// ゲートウェイの処理エラー。
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// 必須フィールドの欠落（400）
    #[error("必須フィールドが欠落しています: {0}")]
    MissingFields(String),
    /// リクエスト内容の不正（400）
    #[error("リクエストが不正です: {0}")]
    BadRequest(String),
    /// チャレンジCookieが無い・改竄・期限切れ・使用済み（401）
    #[error("チャレンジが無効または期限切れです。ナンスを再取得してください")]
    ChallengeExpiredOrMissing,
    /// 署名対象メッセージが発行済みナンスを含まない（401）
    #[error("メッセージ内のナンスが発行内容と一致しません")]
    NonceMismatch,
    /// Ed25519署名の検証失敗（401）
    #[error("署名の検証に失敗しました")]
    InvalidSignature,
    /// セッションCookieが無い・改竄・期限切れ（401）
    #[error("認証されていません。サインインしてください")]
    Unauthorized,
    /// ミント不可ティアからのミント要求（403）
    #[error("このティアではミントできません: {0}")]
    TierNotEligible(String),
    /// レート制限超過（429）
    #[error("リクエストが多すぎます。しばらくしてから再試行してください")]
    RateLimited,
    /// 残高取得・価格取得の失敗でティアを決定できない（500）
    #[error("ティア判定に失敗しました: {0}")]
    TierComputationFailed(String),
    /// ミントトランザクションの構築失敗（500）
    #[error("ミントトランザクションの構築に失敗しました: {0}")]
    MintBuildFailed(String),
    /// その他の内部エラー（500）
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl GateError {
    /// HTTPステータスコードへの対応付け。
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::MissingFields(_) | GateError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GateError::ChallengeExpiredOrMissing
            | GateError::NonceMismatch
            | GateError::InvalidSignature
            | GateError::Unauthorized => StatusCode::UNAUTHORIZED,
            GateError::TierNotEligible(_) => StatusCode::FORBIDDEN,
            GateError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GateError::TierComputationFailed(_)
            | GateError::MintBuildFailed(_)
            | GateError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 機械可読なエラーカテゴリ。レスポンス本文の`error`フィールドに入る。
    pub fn category(&self) -> &'static str {
        match self {
            GateError::MissingFields(_) => "missing_fields",
            GateError::BadRequest(_) => "bad_request",
            GateError::ChallengeExpiredOrMissing => "challenge_expired",
            GateError::NonceMismatch => "nonce_mismatch",
            GateError::InvalidSignature => "invalid_signature",
            GateError::Unauthorized => "unauthorized",
            GateError::TierNotEligible(_) => "tier_not_eligible",
            GateError::RateLimited => "rate_limited",
            GateError::TierComputationFailed(_) => "tier_computation_failed",
            GateError::MintBuildFailed(_) => "mint_build_failed",
            GateError::Internal(_) => "internal",
        }
    }
}

impl axum::response::IntoResponse for GateError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody {
            error: self.category().to_string(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// 各バリアントが想定どおりのステータスコードに対応することを確認。
    #[test]
    fn status_mapping_covers_all_variants() {
        assert_eq!(
            GateError::MissingFields("walletAddress".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GateError::ChallengeExpiredOrMissing.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(GateError::NonceMismatch.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(GateError::InvalidSignature.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(GateError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            GateError::TierNotEligible("ineligible".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(GateError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            GateError::TierComputationFailed("rpc".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GateError::MintBuildFailed("blockhash".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GateError::Internal("clock".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    /// カテゴリ文字列が安定していることを確認。クライアントはこの値で分岐する。
    #[test]
    fn category_strings_are_stable() {
        assert_eq!(
            GateError::ChallengeExpiredOrMissing.category(),
            "challenge_expired"
        );
        assert_eq!(GateError::NonceMismatch.category(), "nonce_mismatch");
        assert_eq!(GateError::InvalidSignature.category(), "invalid_signature");
        assert_eq!(GateError::Unauthorized.category(), "unauthorized");
        assert_eq!(GateError::RateLimited.category(), "rate_limited");
        assert_eq!(
            GateError::TierNotEligible("low".into()).category(),
            "tier_not_eligible"
        );
    }

    /// 認証系エラーのメッセージに検証の内部詳細が含まれないことを確認。
    #[test]
    fn auth_errors_carry_no_detail() {
        let message = GateError::InvalidSignature.to_string();
        assert!(!message.contains("ed25519"));
        assert!(!message.contains("base58"));
    }
}
