//! Duration and bandwidth literal parsing (component A).
//!
//! Accepts `<integer><optional whitespace><suffix>`. An empty suffix means
//! microseconds for durations, bits/second for bandwidth.

use crate::error::ConfigError;

/// Parse a duration literal (e.g. `"500ms"`, `"10s"`, `"2500"`) into microseconds.
pub fn usecs_from_str(s: &str) -> Result<u64, ConfigError> {
    let (digits, suffix) = split_digits_suffix(s)?;

    let multiplier: u64 = match suffix {
        "" | "us" => 1,
        "ms" => 1_000,
        "s" => 1_000_000,
        "m" => 60 * 1_000_000,
        "h" => 3_600 * 1_000_000,
        other => return Err(ConfigError::UnknownTimeSuffix(other.to_string())),
    };

    Ok(digits * multiplier)
}

/// Parse a bandwidth literal (e.g. `"1Mbps"`, `"56Kbps"`, `"0"`) into bits/second.
pub fn bps_from_str(s: &str) -> Result<u64, ConfigError> {
    let (digits, suffix) = split_digits_suffix(s)?;

    let multiplier: u64 = match suffix {
        "" | "bps" => 1,
        "Kbps" => 1 << 10,
        "Mbps" => 1 << 20,
        "Gbps" => 1 << 30,
        other => return Err(ConfigError::UnknownBandwidthSuffix(other.to_string())),
    };

    Ok(digits * multiplier)
}

fn split_digits_suffix(s: &str) -> Result<(u64, &str), ConfigError> {
    let s = s.trim();
    let digit_len = s.bytes().take_while(u8::is_ascii_digit).count();

    if digit_len == 0 {
        return Err(ConfigError::InvalidLiteral(s.to_string()));
    }

    let (digits, rest) = s.split_at(digit_len);
    let digits: u64 = digits
        .parse()
        .map_err(|_| ConfigError::InvalidLiteral(s.to_string()))?;

    Ok((digits, rest.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_suffixes() {
        assert_eq!(usecs_from_str("500ms").unwrap(), 500_000);
        assert_eq!(usecs_from_str("10s").unwrap(), 10_000_000);
        assert_eq!(usecs_from_str("2m").unwrap(), 120_000_000);
        assert_eq!(usecs_from_str("1h").unwrap(), 3_600_000_000);
        assert_eq!(usecs_from_str("42").unwrap(), 42);
        assert_eq!(usecs_from_str("42us").unwrap(), 42);
        assert_eq!(usecs_from_str(" 42 us ").unwrap(), 42);
    }

    #[test]
    fn bandwidth_suffixes() {
        assert_eq!(bps_from_str("1Mbps").unwrap(), 1 << 20);
        assert_eq!(bps_from_str("56Kbps").unwrap(), 56 * (1 << 10));
        assert_eq!(bps_from_str("0").unwrap(), 0);
        assert_eq!(bps_from_str("100bps").unwrap(), 100);
        assert_eq!(bps_from_str("3Gbps").unwrap(), 3 * (1 << 30));
    }

    #[test]
    fn rejects_unknown_suffix() {
        assert!(matches!(
            usecs_from_str("5fortnights"),
            Err(ConfigError::UnknownTimeSuffix(_))
        ));
        assert!(matches!(
            bps_from_str("5Tbps"),
            Err(ConfigError::UnknownBandwidthSuffix(_))
        ));
    }

    #[test]
    fn rejects_malformed() {
        assert!(matches!(
            usecs_from_str("ms"),
            Err(ConfigError::InvalidLiteral(_))
        ));
        assert!(matches!(
            usecs_from_str(""),
            Err(ConfigError::InvalidLiteral(_))
        ));
    }
}
