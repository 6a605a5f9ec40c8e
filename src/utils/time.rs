use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

const TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year][month][day][hour][minute][second][subsecond digits:9]");

fn since_epoch() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is set before the unix epoch")
}

pub fn curr_time_millis() -> u64 {
    since_epoch().as_millis() as u64
}

pub fn curr_time_nanos() -> u64 {
    since_epoch().as_nanos() as u64
}

/// Compact wall-clock timestamp, used as the default resource name.
pub fn format_time_nanos_curr() -> String {
    OffsetDateTime::now_utc()
        .format(TIME_FORMAT)
        .unwrap_or_else(|_| curr_time_nanos().to_string())
}

pub fn sleep_for_ms(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}
