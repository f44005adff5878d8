//! UTCTime and GeneralizedTime parsing.

use chrono::{DateTime, NaiveDate, Utc};
use pemview_types::Asn1Error;

/// Parse a UTCTime value, `YYMMDDHHMMSSZ`.
///
/// Two-digit years of 50 and above map to 19YY, below 50 to 20YY.
pub fn parse_utc_time(value: &[u8]) -> Result<DateTime<Utc>, Asn1Error> {
    let digits = zulu_digits(value, 12)?;
    let yy = number(&digits[0..2]) as i32;
    let year = if yy >= 50 { 1900 + yy } else { 2000 + yy };
    build(year, &digits[2..])
}

/// Parse a GeneralizedTime value, `YYYYMMDDHHMMSSZ`.
pub fn parse_generalized_time(value: &[u8]) -> Result<DateTime<Utc>, Asn1Error> {
    let digits = zulu_digits(value, 14)?;
    let year = number(&digits[0..4]) as i32;
    build(year, &digits[4..])
}

/// Check for exactly `count` ASCII digits followed by `Z`.
fn zulu_digits(value: &[u8], count: usize) -> Result<&[u8], Asn1Error> {
    let digits = value
        .strip_suffix(b"Z")
        .ok_or(Asn1Error::InvalidValue("time is not in UTC (missing Z)"))?;
    if digits.len() != count {
        return Err(Asn1Error::InvalidValue("time has unexpected length"));
    }
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(Asn1Error::InvalidValue("time contains non-digit characters"));
    }
    Ok(digits)
}

fn number(digits: &[u8]) -> u32 {
    digits
        .iter()
        .fold(0, |acc, &d| acc * 10 + (d - b'0') as u32)
}

/// Build a timestamp from `MMDDHHMMSS` following the year digits.
fn build(year: i32, rest: &[u8]) -> Result<DateTime<Utc>, Asn1Error> {
    let month = number(&rest[0..2]);
    let day = number(&rest[2..4]);
    let hour = number(&rest[4..6]);
    let minute = number(&rest[6..8]);
    let second = number(&rest[8..10]);
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .map(|dt| dt.and_utc())
        .ok_or(Asn1Error::InvalidValue("time out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_utc_time() {
        let t = parse_utc_time(b"260221144314Z").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2026, 2, 21, 14, 43, 14).unwrap());
    }

    #[test]
    fn test_utc_time_century_pivot() {
        let t = parse_utc_time(b"500101000000Z").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(1950, 1, 1, 0, 0, 0).unwrap());
        let t = parse_utc_time(b"491231235959Z").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2049, 12, 31, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_parse_generalized_time() {
        let t = parse_generalized_time(b"21260110120000Z").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2126, 1, 10, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_rejects_malformed_times() {
        // Missing Z
        assert!(parse_utc_time(b"260221144314").is_err());
        // Local offset instead of Z
        assert!(parse_utc_time(b"2602211443+0100").is_err());
        // Seconds omitted
        assert!(parse_utc_time(b"2602211443Z").is_err());
        // Fractional seconds
        assert!(parse_generalized_time(b"20260221144314.5Z").is_err());
        // Non-digit
        assert!(parse_utc_time(b"26022114431xZ").is_err());
        // Month 13
        assert!(parse_utc_time(b"261321144314Z").is_err());
        // February 30th
        assert!(parse_generalized_time(b"20260230000000Z").is_err());
    }
}
