use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::constants::{MAX_RATE_SAMPLES, SAMPLE_INTERVAL_MS};
use crate::rate::RateEstimator;

// From bridge threads to the UI thread.
pub struct SharedFeed {
    pub last_message: Option<Value>,
    pub last_received_at: Option<DateTime<Local>>,
    pub estimator: RateEstimator,
    pub accepted_total: u64,
    pub parse_errors: u64,
}

impl SharedFeed {
    pub fn new(now: Instant) -> Self {
        Self {
            last_message: None,
            last_received_at: None,
            estimator: RateEstimator::new(now),
            accepted_total: 0,
            parse_errors: 0,
        }
    }
}

// UI-facing snapshot, replaced wholesale at each refresh.
pub struct DisplayState {
    pub last_message: Option<Value>,
    pub current_rate: u64,
}

pub struct AddressInput {
    pub buffer: String,
    pub editing: bool,
}

// Main application state
pub struct App {
    pub display: DisplayState,
    pub rate_history: Vec<f64>,
    pub peak_rate_record: (u64, DateTime<Local>),
    pub accepted_total: u64,
    pub parse_errors: u64,
    pub last_received_at: Option<DateTime<Local>>,

    pub input: AddressInput,
    pub tree_scroll: u16,
    pub status: Option<String>,

    pub last_sample: Instant,
    pub last_tick: Instant,
}

impl App {
    pub fn new(listen_addr: &str) -> App {
        App {
            display: DisplayState {
                last_message: None,
                current_rate: 0,
            },
            rate_history: vec![0.0; MAX_RATE_SAMPLES],
            peak_rate_record: (0, Local::now()),
            accepted_total: 0,
            parse_errors: 0,
            last_received_at: None,
            input: AddressInput {
                buffer: listen_addr.to_string(),
                editing: false,
            },
            tree_scroll: 0,
            status: None,
            last_sample: Instant::now(),
            last_tick: Instant::now(),
        }
    }

    // Refresh the snapshot from the shared feed. The rate is only re-sampled
    // once per sampling interval; in between the previous figure is carried
    // over while the latest message still tracks every tick.
    pub fn on_tick(&mut self, feed: &Arc<Mutex<SharedFeed>>) {
        let now = Instant::now();
        let mut feed = feed.lock().unwrap();

        self.accepted_total = feed.accepted_total;
        self.parse_errors = feed.parse_errors;
        self.last_received_at = feed.last_received_at;

        let sample_due =
            now.duration_since(self.last_sample).as_millis() as u64 >= SAMPLE_INTERVAL_MS;
        let current_rate = if sample_due {
            let rate = feed.estimator.sample(now);
            self.last_sample = now;

            self.rate_history.remove(0);
            self.rate_history.push(rate as f64);
            if rate > self.peak_rate_record.0 {
                self.peak_rate_record = (rate, Local::now());
            }
            rate
        } else {
            self.display.current_rate
        };

        self.display = DisplayState {
            last_message: feed.last_message.clone(),
            current_rate,
        };
    }
}
