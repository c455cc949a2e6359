//! Lease - 開いているオブザーバー接続の数
//!
//! 最初の接続（0→1）でサンプラーを起動する。切断は数を減らすだけで、
//! 0 になってもサンプラーは止めない（停止はホストが決める）。

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Default)]
pub struct LeaseCounter {
    active: Arc<AtomicUsize>,
}

impl LeaseCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a lease. Released when the returned guard is dropped.
    pub fn acquire(&self) -> Lease {
        let previous = self.active.fetch_add(1, Ordering::AcqRel);
        Lease {
            active: Arc::clone(&self.active),
            first: previous == 0,
        }
    }

    /// Number of open leases.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

/// Guard for one open connection.
#[derive(Debug)]
pub struct Lease {
    active: Arc<AtomicUsize>,
    first: bool,
}

impl Lease {
    /// This lease took the counter from 0 to 1.
    pub fn is_first(&self) -> bool {
        self.first
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_open_leases() {
        let counter = LeaseCounter::new();
        let a = counter.acquire();
        let b = counter.acquire();
        assert_eq!(counter.active(), 2);
        assert!(a.is_first());
        assert!(!b.is_first());

        drop(a);
        assert_eq!(counter.active(), 1);
        drop(b);
        assert_eq!(counter.active(), 0);
    }

    #[test]
    fn reopening_after_zero_is_first_again() {
        let counter = LeaseCounter::new();
        drop(counter.acquire());

        let again = counter.acquire();
        assert!(again.is_first());
        assert_eq!(counter.active(), 1);
    }
}
