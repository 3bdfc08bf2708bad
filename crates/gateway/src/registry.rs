//! # ミント台帳と使用済みナンス台帳
//!
//! どちらもプロセス内のMutexで守る所有データ。ミント台帳はティアごとに
//! 割り当て済みシリアル番号を記録し、空き番号からランダムに1つ選んで
//! その場で確保する。選択と記録は同一のロック区間で行い、並行リクエスト
//! が同じ番号を得ることはない。

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::Rng;
use tiergate_types::Tier;

/// 使用済みナンスを保持する期間。ナンスCookie自体は5分で失効するため、
/// この期間を過ぎたエントリは再利用攻撃に使えず破棄してよい。
const NONCE_RETENTION: Duration = Duration::from_secs(3600);

/// ティアごとの割り当て済みNFTシリアル番号台帳。
pub struct MintRegistry {
    minted: Mutex<HashMap<Tier, HashSet<u32>>>,
}

impl MintRegistry {
    pub fn new() -> Self {
        Self {
            minted: Mutex::new(HashMap::new()),
        }
    }

    /// ティアの範囲から未割り当てのシリアル番号をランダムに1つ確保する。
    /// ミント不可ティア、または範囲が枯渇している場合はNone。
    pub fn allocate(&self, tier: Tier) -> Option<u32> {
        let (min, max) = tier.serial_range()?;
        let mut minted = self.minted.lock().unwrap();
        let taken = minted.entry(tier).or_default();

        let available: Vec<u32> = (min..=max).filter(|n| !taken.contains(n)).collect();
        if available.is_empty() {
            tracing::warn!(tier = %tier, "ティアのNFTシリアル番号が枯渇しています");
            return None;
        }

        let number = available[rand::thread_rng().gen_range(0..available.len())];
        taken.insert(number);
        Some(number)
    }

    /// ティアの割り当て済み件数。
    pub fn allocated_count(&self, tier: Tier) -> usize {
        let minted = self.minted.lock().unwrap();
        minted.get(&tier).map(|set| set.len()).unwrap_or(0)
    }
}

/// 認証に使用されたナンスの台帳。各ナンスは一度しか受理しない。
pub struct NonceRegistry {
    used: Mutex<HashMap<String, Instant>>,
}

impl NonceRegistry {
    pub fn new() -> Self {
        Self {
            used: Mutex::new(HashMap::new()),
        }
    }

    /// ナンスを使用済みとして記録する。初回ならtrue、既に使用済みならfalse。
    /// 保持期間を過ぎた古いエントリはこのタイミングで破棄する。
    pub fn consume(&self, nonce: &str) -> bool {
        let mut used = self.used.lock().unwrap();
        let now = Instant::now();
        used.retain(|_, recorded_at| now.duration_since(*recorded_at) < NONCE_RETENTION);

        if used.contains_key(nonce) {
            return false;
        }
        used.insert(nonce.to_string(), now);
        true
    }
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------
