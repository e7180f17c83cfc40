//! Units formatting and conversion utilities
//!
//! Human-readable sizes, speeds and nanosecond durations for the report,
//! and size parsing for the command line.

use byte_unit::{Byte, UnitType};

/// Format bytes with binary units
///
/// # Examples
/// ```
/// use blkbench::util::units::format_bytes;
///
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(1536), "1.50 KiB");
/// assert_eq!(format_bytes(1073741824), "1.00 GiB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let adjusted = Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary);
    format!("{:.2} {}", adjusted.get_value(), adjusted.get_unit())
}

/// Format a transfer rate given in bytes per second
///
/// # Examples
/// ```
/// use blkbench::util::units::format_speed;
///
/// assert_eq!(format_speed(150.0 * 1048576.0), "150.00 MiB/s");
/// ```
pub fn format_speed(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec.max(0.0).round() as u64))
}

/// Format a nanosecond count with three significant digits in the largest
/// unit that keeps the value at or above one
///
/// # Examples
/// ```
/// use blkbench::util::units::format_nanos;
///
/// assert_eq!(format_nanos(850), "850 ns");
/// assert_eq!(format_nanos(8_451_000), "8.45 ms");
/// assert_eq!(format_nanos(2_000_000_000), "2.00 s");
/// ```
pub fn format_nanos(nanos: u64) -> String {
    const UNITS: &[(u64, &str)] = &[
        (1_000_000_000, "s"),
        (1_000_000, "ms"),
        (1_000, "μs"),
    ];

    for &(scale, unit) in UNITS {
        if nanos >= scale {
            let value = nanos as f64 / scale as f64;
            let decimals = if value >= 100.0 {
                0
            } else if value >= 10.0 {
                1
            } else {
                2
            };
            return format!("{:.*} {}", decimals, value, unit);
        }
    }

    format!("{} ns", nanos)
}

/// Parse a human-readable size into bytes
///
/// `KiB, MiB, GiB…` are powers of 1024, `KB, MB, GB…` powers of 1000, and
/// a bare `K, M, G…` is taken as a power of 1024.
///
/// # Examples
/// ```
/// use blkbench::util::units::parse_size;
///
/// assert_eq!(parse_size("4096").unwrap(), 4096);
/// assert_eq!(parse_size("64M").unwrap(), 64 * 1024 * 1024);
/// assert_eq!(parse_size("1 GB").unwrap(), 1_000_000_000);
/// ```
pub fn parse_size(input: &str) -> Result<u64, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("Empty size".to_string());
    }
    if trimmed.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }

    let normalized = match trimmed.char_indices().last() {
        Some((pos, c)) if "kmgtpe".contains(c.to_ascii_lowercase()) => {
            format!("{}{}iB", &trimmed[..pos], c.to_ascii_uppercase())
        }
        _ => trimmed.to_string(),
    };

    Byte::parse_str(&normalized, true)
        .map(|byte| byte.as_u64())
        .map_err(|e| format!("Invalid size '{}': {}", trimmed, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KiB");
        assert_eq!(format_bytes(1536), "1.50 KiB");
        assert_eq!(format_bytes(128 * 1048576), "128.00 MiB");
        assert_eq!(format_bytes(1099511627776), "1.00 TiB");
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(1048576.0), "1.00 MiB/s");
        assert_eq!(format_speed(100.0), "100 B/s");
        assert_eq!(format_speed(-5.0), "0 B/s");
    }

    #[test]
    fn test_format_nanos() {
        assert_eq!(format_nanos(0), "0 ns");
        assert_eq!(format_nanos(999), "999 ns");
        assert_eq!(format_nanos(1_000), "1.00 μs");
        assert_eq!(format_nanos(12_340), "12.3 μs");
        assert_eq!(format_nanos(123_400), "123 μs");
        assert_eq!(format_nanos(8_451_000), "8.45 ms");
        assert_eq!(format_nanos(3_600_000_000_000), "3600 s");
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("1 KiB").unwrap(), 1024);
        assert_eq!(parse_size("1.5 MiB").unwrap(), 1572864);
        assert_eq!(parse_size("2 GB").unwrap(), 2_000_000_000);
        assert_eq!(parse_size("10M").unwrap(), 10 * 1048576);
        assert_eq!(parse_size("4k").unwrap(), 4096);

        assert!(parse_size("").is_err());
        assert!(parse_size("invalid").is_err());
        assert!(parse_size("-1 MB").is_err());
    }
}
