//! # セッションウォレットのティア照会エンドポイント

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tiergate_types::CurrentTierResponse;

use crate::classifier;
use crate::config::AppState;
use crate::error::GateError;
use crate::session;

/// GET /api/tiers/current
///
/// セッションCookieのウォレットに対してティア判定を実行する。
/// セッションが無い・無効な場合は401。
pub async fn handle_current_tier(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<CurrentTierResponse>, GateError> {
    let wallet =
        session::session_wallet(&state.config.secret, &headers).ok_or(GateError::Unauthorized)?;

    let info = classifier::classify(&state, &wallet).await?;
    Ok(Json(CurrentTierResponse {
        success: true,
        data: info,
        wallet,
    }))
}
