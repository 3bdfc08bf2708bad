//! # ゲートウェイエンドポイント

pub mod logout;
pub mod mint_init;
pub mod nonce;
pub mod tier;
pub mod verify;
pub mod verify_tier;

pub use logout::handle_logout;
pub use mint_init::handle_mint_init;
pub use nonce::handle_nonce;
pub use tier::handle_current_tier;
pub use verify::handle_verify;
pub use verify_tier::handle_verify_tier;

#[cfg(test)]
pub(crate) mod test_helpers;
