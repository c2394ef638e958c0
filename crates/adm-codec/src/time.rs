//! ADM time strings.
//!
//! Times are written as `hh:mm:ss.fffffffff` (nine fractional digits, i.e.
//! nanoseconds). On read, shorter fractions are accepted, as is the
//! sample-count form `hh:mm:ss.NNNNNSrrrrr` (NNNNN samples at rate rrrrr).

use adm_model::Nanos;

use crate::error::{CodecError, Result};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

pub fn format_time(t: Nanos) -> String {
    let seconds = t / NANOS_PER_SECOND;
    let fraction = t % NANOS_PER_SECOND;
    format!(
        "{:02}:{:02}:{:02}.{:09}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60,
        fraction
    )
}

pub fn parse_time(s: &str) -> Result<Nanos> {
    let invalid = || CodecError::InvalidTime(s.to_string());
    let mut parts = s.splitn(3, ':');
    let (Some(h), Some(m), Some(rest)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };
    let (sec, fraction) = rest.split_once('.').unwrap_or((rest, ""));

    let hours = digits(h).ok_or_else(invalid)?;
    let minutes = digits(m).filter(|m| *m < 60).ok_or_else(invalid)?;
    let secs = digits(sec).filter(|s| *s < 60).ok_or_else(invalid)?;

    let sub = match fraction.split_once('S') {
        Some((samples, rate)) => {
            let samples = digits(samples).ok_or_else(invalid)?;
            let rate = digits(rate).filter(|r| *r > 0).ok_or_else(invalid)?;
            if samples >= rate {
                return Err(invalid());
            }
            (samples as u128 * NANOS_PER_SECOND as u128 / rate as u128) as u64
        }
        None if fraction.is_empty() => 0,
        None => {
            if fraction.len() > 9 {
                return Err(invalid());
            }
            let value = digits(fraction).ok_or_else(invalid)?;
            value * 10u64.pow(9 - fraction.len() as u32)
        }
    };

    hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + secs))
        .and_then(|s| s.checked_mul(NANOS_PER_SECOND))
        .and_then(|ns| ns.checked_add(sub))
        .ok_or_else(invalid)
}

fn digits(s: &str) -> Option<u64> {
    if s.is_empty() || s.len() > 19 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        assert_eq!(format_time(0), "00:00:00.000000000");
        assert_eq!(format_time(1_500_000_000), "00:00:01.500000000");
        assert_eq!(format_time(3_723_000_000_007), "01:02:03.000000007");
    }

    #[test]
    fn test_parse_inverts_format() {
        for t in [0, 1, 999_999_999, 61_000_000_000, 86_400_000_000_123] {
            assert_eq!(parse_time(&format_time(t)).unwrap(), t);
        }
    }

    #[test]
    fn test_parse_short_fraction_and_samples() {
        assert_eq!(parse_time("00:00:01.5").unwrap(), 1_500_000_000);
        assert_eq!(parse_time("00:00:02").unwrap(), 2_000_000_000);
        assert_eq!(parse_time("00:00:00.24000S48000").unwrap(), 500_000_000);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for s in [
            "",
            "00:00",
            "00:60:00.0",
            "00:00:61.0",
            "aa:00:00.0",
            "00:00:00.1234567890",
            "00:00:00.48000S48000",
            "00:00:00.1S0",
            "00:00:00.-1",
        ] {
            assert!(
                matches!(parse_time(s), Err(CodecError::InvalidTime(_))),
                "{s} should be rejected"
            );
        }
    }
}
