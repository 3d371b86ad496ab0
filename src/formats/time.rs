use once_cell::sync::Lazy;
use regex::Regex;

static TIMECODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2}):(\d{2})(?:\.(\d{1,3}))?$").expect("valid timecode regex")
});

/// `HH:MM:SS.mmm`. Negative and non-finite input formats as zero.
///
/// Milliseconds are floored after snapping to 0.1 µs, so values within
/// 0.05 µs below a millisecond boundary count as reaching it.
pub fn format_time(secs: f64) -> String {
    format_timestamp(secs, '.')
}

/// SRT flavour of [`format_time`], with a comma before the milliseconds.
pub fn format_srt_timestamp(secs: f64) -> String {
    format_timestamp(secs, ',')
}

fn format_timestamp(secs_in: f64, ms_sep: char) -> String {
    let secs = if secs_in.is_finite() && secs_in > 0.0 {
        secs_in
    } else {
        0.0
    };

    // Snap to 0.1 µs first so 3723.456 does not floor to .455.
    let ticks = (secs * 10_000_000.0).round() as u64;
    let ms = ticks / 10_000;

    let milli = ms % 1000;
    let total_seconds = ms / 1000;
    let sec = total_seconds % 60;
    let min = (total_seconds / 60) % 60;
    let hour = total_seconds / 3600;

    format!("{hour:02}:{min:02}:{sec:02}{ms_sep}{milli:03}")
}

/// Parses `H:MM:SS`, `HH:MM:SS.mmm` or `HH:MM:SS,mmm`.
///
/// Returns `None` when the text does not match, so callers can reject the
/// edit and keep their last valid value. Fraction digits are read as a
/// count of milliseconds, so `.5` is 5 ms.
pub fn parse_time(input: &str) -> Option<f64> {
    let s = input.trim().replacen(',', ".", 1);
    let caps = TIMECODE_RE.captures(&s)?;

    let h: u64 = caps[1].parse().ok()?;
    let m: u64 = caps[2].parse().ok()?;
    let sec: u64 = caps[3].parse().ok()?;
    let milli: u64 = match caps.get(4) {
        Some(x) => x.as_str().parse().ok()?,
        None => 0,
    };

    let total_ms = ((h * 60 + m) * 60 + sec) * 1000 + milli;
    Some(total_ms as f64 / 1000.0)
}

/// Accepts a timecode or a plain number of seconds.
pub fn parse_time_or_seconds(input: &str) -> Option<f64> {
    if let Some(v) = parse_time(input) {
        return Some(v);
    }
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_fixed_width() {
        assert_eq!(format_time(0.0), "00:00:00.000");
        assert_eq!(format_time(3723.456), "01:02:03.456");
        assert_eq!(format_time(59.9999), "00:00:59.999");
        assert_eq!(format_srt_timestamp(61.5), "00:01:01,500");
    }

    #[test]
    fn sub_millisecond_values_floor() {
        assert_eq!(format_time(0.0009996), "00:00:00.000");
        assert_eq!(format_time(1.0019), "00:00:01.001");
        assert_eq!(format_time(2.999_999), "00:00:02.999");
    }

    #[test]
    fn hours_are_not_capped() {
        assert_eq!(format_time(100.0 * 3600.0 + 1.25), "100:00:01.250");
    }

    #[test]
    fn bad_input_formats_as_zero() {
        assert_eq!(format_time(-3.0), "00:00:00.000");
        assert_eq!(format_time(f64::NAN), "00:00:00.000");
        assert_eq!(format_time(f64::INFINITY), "00:00:00.000");
    }

    #[test]
    fn format_shape_holds() {
        let re = Regex::new(r"^\d{2,}:\d{2}:\d{2}\.\d{3}$").unwrap();
        for t in [0.0, 0.001, 1.5, 59.999, 3599.999, 86_399.5, 359_999.999, 1e7] {
            assert!(re.is_match(&format_time(t)), "{t}");
        }
    }

    #[test]
    fn parses_both_separators() {
        assert_eq!(parse_time("01:02:03.456"), Some(3723.456));
        assert_eq!(parse_time("01:02:03,456"), Some(3723.456));
        assert_eq!(parse_time("  1:02:03  "), Some(3723.0));
    }

    #[test]
    fn short_fields_are_rejected() {
        assert_eq!(parse_time("1:2:3"), None);
        assert_eq!(parse_time("01:2:03"), None);
        assert_eq!(parse_time("001:02:03"), None);
        assert_eq!(parse_time("01:02:03.4567"), None);
        assert_eq!(parse_time("01:02:03."), None);
        assert_eq!(parse_time(""), None);
        assert_eq!(parse_time("abc"), None);
    }

    #[test]
    fn fraction_digits_count_milliseconds() {
        assert_eq!(parse_time("00:00:01.5"), Some(1.005));
        assert_eq!(parse_time("00:00:01.50"), Some(1.05));
    }

    #[test]
    fn round_trips_every_millisecond_sampled() {
        // Full range at a prime stride, plus the boundaries.
        let mut n: u64 = 0;
        while n <= 359_999_999 {
            let t = n as f64 / 1000.0;
            assert_eq!(parse_time(&format_time(t)), Some(t), "{n}");
            n += 7_919;
        }
        let t = 359_999_999_f64 / 1000.0;
        assert_eq!(parse_time(&format_time(t)), Some(t));
        for n in 0..5_000u64 {
            let t = n as f64 / 1000.0;
            assert_eq!(parse_time(&format_time(t)), Some(t));
        }
    }

    #[test]
    fn seconds_fallback() {
        assert_eq!(parse_time_or_seconds("12.5"), Some(12.5));
        assert_eq!(parse_time_or_seconds("00:00:12.500"), Some(12.5));
        assert_eq!(parse_time_or_seconds("-1"), None);
    }
}
