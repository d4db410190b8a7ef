//! Human-readable sizes, durations and rates.

use std::time::Duration;

/// `512 B`, `1.5 KB`, `3.2 GB` (binary multiples).
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }
    let mut div = UNIT;
    let mut exp = 0usize;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let suffix = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {}B", bytes as f64 / div as f64, suffix)
}

/// `250ms`, `12.5s`, `3.0m`, `1.2h`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if d < Duration::from_secs(1) {
        format!("{:.0}ms", secs * 1000.0)
    } else if d < Duration::from_secs(60) {
        format!("{:.1}s", secs)
    } else if d < Duration::from_secs(3600) {
        format!("{:.1}m", secs / 60.0)
    } else {
        format!("{:.1}h", secs / 3600.0)
    }
}

/// Average rate as `format_bytes(rate) + "/s"`; `0 B/s` for a zero duration.
pub fn calculate_speed(bytes: u64, elapsed: Duration) -> String {
    if elapsed.is_zero() {
        return "0 B/s".to_string();
    }
    let rate = bytes as f64 / elapsed.as_secs_f64();
    format!("{}/s", format_bytes(rate as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.0 MB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.0 GB");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(12_500)), "12.5s");
        assert_eq!(format_duration(Duration::from_secs(180)), "3.0m");
        assert_eq!(format_duration(Duration::from_secs(4320)), "1.2h");
    }

    #[test]
    fn speed() {
        assert_eq!(calculate_speed(100, Duration::ZERO), "0 B/s");
        assert_eq!(calculate_speed(2048, Duration::from_secs(2)), "1.0 KB/s");
        assert_eq!(calculate_speed(10, Duration::from_secs(1)), "10 B/s");
    }
}
