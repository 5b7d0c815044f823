use std::time::Duration;

pub const TICK_RATE_MS: u64 = 250;
pub const SAMPLE_INTERVAL_MS: u64 = 1000;
pub const HISTORY_WINDOW_SECS: u64 = 60;
pub const MAX_RATE_SAMPLES: usize = (HISTORY_WINDOW_SECS * 1000 / SAMPLE_INTERVAL_MS) as usize;

// Messages arriving faster than a 60Hz frame budget are coalesced into one count.
pub const DEBOUNCE_FLOOR: Duration = Duration::from_millis(16);

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:9001";
pub const DEFAULT_CAPTURE_DEV: &str = "/dev/video0";
