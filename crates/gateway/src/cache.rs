//! # 残高キャッシュ
//!
//! ウォレットごとの残高・評価額を30秒だけ保持する小さなキャッシュ。
//! RPCが落ちている間は期限切れエントリを代替値として返せるよう、
//! 期限内の読み出しと期限無視の読み出しを分けている。

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

struct CacheEntry {
    value: f64,
    stored_at: Instant,
}

/// 文字列キーに対するf64値のTTLキャッシュ。
pub struct TtlCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// TTL内のエントリだけを返す。
    pub fn fresh(&self, key: &str) -> Option<f64> {
        let entries = self.entries.read().unwrap();
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            Some(entry.value)
        } else {
            None
        }
    }

    /// 期限切れでもエントリがあれば返す。取得失敗時のフォールバック用。
    pub fn stale(&self, key: &str) -> Option<f64> {
        let entries = self.entries.read().unwrap();
        entries.get(key).map(|entry| entry.value)
    }

    pub fn put(&self, key: &str, value: f64) {
        let mut entries = self.entries.write().unwrap();
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------
