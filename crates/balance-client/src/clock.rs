//! 时钟抽象
//!
//! 控制律的 dt 和遥测时间戳都来自 `Clock`，测试使用 `ManualClock` 精确控制时间。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 单调时钟
pub trait Clock: Send + Sync {
    /// 自启动以来的时间
    fn now(&self) -> Duration;
}

/// 基于 `Instant` 的单调时钟
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// 手动推进的时钟（克隆共享同一时间）
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// 推进时间
    pub fn advance(&self, delta: Duration) {
        self.micros
            .fetch_add(delta.as_micros() as u64, Ordering::Relaxed);
    }

    /// 设置绝对时间
    pub fn set(&self, now: Duration) {
        self.micros.store(now.as_micros() as u64, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::Relaxed))
    }
}
