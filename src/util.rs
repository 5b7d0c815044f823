// Format helpers for the rate panel and status bar.
pub fn format_rate(rate: u64) -> String {
    format!("{} msg/s", format_count(rate))
}

pub fn format_count(count: u64) -> String {
    const K: u64 = 1_000;
    const M: u64 = 1_000 * K;
    const G: u64 = 1_000 * M;
    if count >= G {
        format!("{:.2}G", count as f64 / G as f64)
    } else if count >= M {
        format!("{:.2}M", count as f64 / M as f64)
    } else if count >= K {
        format!("{:.1}k", count as f64 / K as f64)
    } else {
        format!("{count}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_counts_are_verbatim() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
    }

    #[test]
    fn large_counts_scale_units() {
        assert_eq!(format_count(1_500), "1.5k");
        assert_eq!(format_count(2_340_000), "2.34M");
    }

    #[test]
    fn rate_carries_the_unit() {
        assert_eq!(format_rate(12), "12 msg/s");
    }
}
