use std::{sync::Mutex, time::Instant};

use chrono::Local;
use serde_json::Value;
use tracing::warn;

use crate::app::SharedFeed;

/// Handles one raw text frame from the bridge. Malformed payloads are logged
/// and tallied but never touch the last-message slot or reach the caller.
pub fn ingest_text(feed: &Mutex<SharedFeed>, raw: &str, now: Instant) {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => {
            let mut feed = feed.lock().unwrap();
            feed.last_message = Some(value);
            feed.last_received_at = Some(Local::now());
            feed.accepted_total += 1;
            feed.estimator.record_event(now);
        }
        Err(err) => {
            warn!(error = %err, payload_len = raw.len(), "dropping malformed message");
            feed.lock().unwrap().parse_errors += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn new_feed() -> Mutex<SharedFeed> {
        Mutex::new(SharedFeed::new(Instant::now()))
    }

    #[test]
    fn valid_json_replaces_the_last_message() {
        let feed = new_feed();
        let now = Instant::now();
        ingest_text(&feed, r#"{"a": 1}"#, now);
        ingest_text(&feed, "[1, 2]", now + Duration::from_millis(20));

        let mut feed = feed.lock().unwrap();
        assert_eq!(feed.last_message, Some(json!([1, 2])));
        assert_eq!(feed.accepted_total, 2);
        assert!(feed.last_received_at.is_some());
        // Both arrivals were spaced past the floor, so both counted.
        assert_eq!(feed.estimator.sample(now + Duration::from_secs(1)), 2);
    }

    #[test]
    fn malformed_json_leaves_the_feed_untouched() {
        let feed = new_feed();
        let now = Instant::now();
        ingest_text(&feed, r#"{"a": 1}"#, now);
        ingest_text(&feed, "{not json", now + Duration::from_millis(20));

        let mut feed = feed.lock().unwrap();
        assert_eq!(feed.last_message, Some(json!({"a": 1})));
        assert_eq!(feed.accepted_total, 1);
        assert_eq!(feed.parse_errors, 1);
        assert_eq!(feed.estimator.sample(now + Duration::from_secs(1)), 1);
    }

    #[test]
    fn scalar_payloads_are_accepted() {
        let feed = new_feed();
        ingest_text(&feed, "42", Instant::now());
        assert_eq!(feed.lock().unwrap().last_message, Some(json!(42)));
    }

    #[test]
    fn burst_updates_message_but_debounces_the_count() {
        let feed = new_feed();
        let now = Instant::now();
        ingest_text(&feed, "1", now);
        ingest_text(&feed, "2", now + Duration::from_millis(5));

        let mut feed = feed.lock().unwrap();
        // Latest wins for display even when the count coalesces.
        assert_eq!(feed.last_message, Some(json!(2)));
        assert_eq!(feed.accepted_total, 2);
        assert_eq!(feed.estimator.sample(now + Duration::from_secs(1)), 1);
    }
}
