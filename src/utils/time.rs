use std::time::{Duration, Instant, SystemTime};
use time::{macros::format_description, OffsetDateTime};

#[inline]
pub fn sleep_for_ms(ms: u64) {
    std::thread::sleep(Duration::from_millis(ms));
}

/// Formats a file modification time for log messages.
pub fn format_system_time(ts: SystemTime) -> String {
    let ts: OffsetDateTime = ts.into();
    ts.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| String::from("unknown"))
}

/// Time left of `budget` after `start`, `None` once it is used up.
#[inline]
pub fn remaining(start: Instant, budget: Duration) -> Option<Duration> {
    budget.checked_sub(start.elapsed()).filter(|d| !d.is_zero())
}
