//! Human readable formatting of sizes and durations

const SIZE_UNITS: [&str; 8] = ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "Zi"];

/// Format a byte count with binary prefixes, e.g. `1.5 KiB`
pub fn format_size(bytes: f64) -> String {
    let mut value = bytes;

    for unit in SIZE_UNITS {
        if value.abs() < 1024.0 {
            return format!("{value:3.1} {unit}B");
        }
        value /= 1024.0;
    }

    format!("{value:.1} YiB")
}

// insert `,` between groups of three digits of the integer part
fn group_thousands(number: &str) -> String {
    let (sign, unsigned) = match number.strip_prefix('-') {
        Some(unsigned) => ("-", unsigned),
        None => ("", number),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(number.len() + integer.len() / 3);
    for (position, digit) in integer.chars().enumerate() {
        if position > 0 && (integer.len() - position) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Format milliseconds as `1,234.50ms = HH:MM:SS`, seconds are rounded up
pub fn format_duration(millis: f64) -> String {
    let seconds = ((millis / 1000.0).ceil() as i64) % 60;
    let minutes = (((millis - 1000.0 * seconds as f64) / 60_000.0).ceil() as i64) % 60;
    let hours = ((millis - 1000.0 * seconds as f64 - 60_000.0 * minutes as f64) / 3_600_000.0)
        .ceil() as i64;

    format!(
        "{}ms = {hours:02}:{minutes:02}:{seconds:02}",
        group_thousands(&format!("{millis:.2}"))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(format_size(512.0), "512.0 B");
        assert_eq!(format_size(1536.0), "1.5 KiB");
        assert_eq!(format_size(3.0 * 1024.0 * 1024.0 * 1024.0), "3.0 GiB");
        assert_eq!(format_size(0.0), "0.0 B");
        assert_eq!(format_size(2f64.powi(80)), "1.0 YiB");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(1234.5), "1,234.50ms = 00:00:02");
        assert_eq!(format_duration(3_723_000.0), "3,723,000.00ms = 01:02:03");
        assert_eq!(format_duration(0.0), "0.00ms = 00:00:00");
    }

    #[test]
    fn thousands() {
        assert_eq!(group_thousands("999.00"), "999.00");
        assert_eq!(group_thousands("1000"), "1,000");
        assert_eq!(group_thousands("-1234567.5"), "-1,234,567.5");
    }
}
