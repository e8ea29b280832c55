use std::time::Instant;

use chrono::Utc;

/// Wall-clock time in epoch milliseconds, the unit graph drafts are written in.
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
