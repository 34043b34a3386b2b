//! Clock port - source of epoch-millisecond timestamps

use chrono::Utc;

/// Wall clock used for post/comment timestamps and ids
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// System time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}
