use std::time::Duration;

pub mod time;

pub use self::time::*;

pub fn is_blank(path: &str) -> bool {
    path.trim().is_empty()
}

/// Converts a configured wait in milliseconds to an admission timeout,
/// values `<= 0` mean waiting forever.
#[inline]
pub fn timeout_from_millis(ms: i64) -> Option<Duration> {
    if ms <= 0 {
        None
    } else {
        Some(Duration::from_millis(ms as u64))
    }
}

/// Splits a comma separated property value, dropping blank items.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
