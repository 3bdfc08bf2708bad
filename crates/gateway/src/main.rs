//! # Tiergate ミントゲートウェイ
//!
//! ウォレット署名認証と資産ティア判定を経て、Candy MachineのmintV2
//! トランザクションを発行するHTTPサーバー。
//!
//! ## API エンドポイント
//! - `GET /api/auth/nonce` — チャレンジナンス発行
//! - `POST /api/auth/verify` — ウォレット署名検証 + セッション発行
//! - `POST /api/auth/logout` — セッション破棄
//! - `GET /api/tiers/current` — セッションウォレットのティア照会
//! - `POST /api/verify-tier` — 任意ウォレットの公開ティア照会（レート制限付き）
//! - `POST /api/mint/init` — 部分署名済みミントトランザクション発行

mod cache;
mod classifier;
mod config;
mod cookies;
mod endpoints;
mod error;
mod ratelimit;
mod registry;
mod session;
mod solana_tx;

use std::sync::Arc;

use config::{AppConfig, AppState};
use endpoints::{
    handle_current_tier, handle_logout, handle_mint_init, handle_nonce, handle_verify,
    handle_verify_tier,
};

// ---------------------------------------------------------------------------
// エントリポイント
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    let addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config)?);

    let app = axum::Router::new()
        .route("/api/auth/nonce", axum::routing::get(handle_nonce))
        .route("/api/auth/verify", axum::routing::post(handle_verify))
        .route("/api/auth/logout", axum::routing::post(handle_logout))
        .route(
            "/api/tiers/current",
            axum::routing::get(handle_current_tier),
        )
        .route("/api/verify-tier", axum::routing::post(handle_verify_tier))
        .route("/api/mint/init", axum::routing::post(handle_mint_init))
        .with_state(state);

    tracing::info!("Tiergateゲートウェイを {} で起動します", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
