//! # レートリミッタ
//!
//! クライアントIPごとの固定ウィンドウ方式。ウィンドウ開始時刻と件数だけを
//! 持ち、ウィンドウを跨いだ最初のリクエストでカウントをリセットする。

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// テーブルがこの件数を超えたら期限切れバケットを掃除する。
const PRUNE_THRESHOLD: usize = 1024;

/// 固定ウィンドウのレートリミッタ。
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    buckets: Mutex<HashMap<String, (Instant, u32)>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// キーに対するリクエストを1件計上する。制限内ならtrue。
    pub fn check(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock().unwrap();
        let now = Instant::now();

        if buckets.len() > PRUNE_THRESHOLD {
            let window = self.window;
            buckets.retain(|_, (started_at, _)| now.duration_since(*started_at) < window);
        }

        let entry = buckets.entry(key.to_string()).or_insert((now, 0));
        if now.duration_since(entry.0) >= self.window {
            *entry = (now, 0);
        }
        if entry.1 >= self.max_requests {
            return false;
        }
        entry.1 += 1;
        true
    }
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// 上限までは通り、超過分が拒否されることを確認。
    #[test]
    fn allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));
    }

    /// キーごとに独立してカウントされることを確認。
    #[test]
    fn keys_are_counted_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.2"));
    }

    /// ウィンドウ経過後にカウントがリセットされることを確認。
    #[test]
    fn window_expiry_resets_count() {
        let limiter = RateLimiter::new(2, Duration::from_millis(30));
        assert!(limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));

        std::thread::sleep(Duration::from_millis(40));
        assert!(limiter.check("10.0.0.1"));
    }
}
