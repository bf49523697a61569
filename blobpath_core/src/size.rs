use std::fmt;
use std::str::FromStr;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;
const TB: u64 = GB * 1024;
const PB: u64 = TB * 1024;

/// Largest first, so `Display` picks the coarsest exact unit.
const UNITS: [(&str, u64); 5] = [("pb", PB), ("tb", TB), ("gb", GB), ("mb", MB), ("kb", KB)];

/// A size in bytes, parsed from strings such as `512b`, `64kb`, `1.5mb`
/// or a bare byte count. Units are binary multiples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteSize(u64);

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ParseByteSizeError {
    #[error("empty byte size")]
    Empty,
    #[error("'{0}' is not a number of bytes")]
    InvalidNumber(String),
    #[error("byte size must not be negative")]
    Negative,
    #[error("byte size overflows 64 bits")]
    Overflow,
}

impl ByteSize {
    pub const fn b(bytes: u64) -> Self {
        ByteSize(bytes)
    }

    pub const fn kb(kb: u64) -> Self {
        ByteSize(kb * KB)
    }

    pub const fn mb(mb: u64) -> Self {
        ByteSize(mb * MB)
    }

    pub const fn bytes(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ByteSize {
    fn from(bytes: u64) -> Self {
        ByteSize(bytes)
    }
}

impl FromStr for ByteSize {
    type Err = ParseByteSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower.is_empty() {
            return Err(ParseByteSizeError::Empty);
        }

        let (number, multiplier) = split_unit(&lower);
        if multiplier == 1 {
            return parse_whole(number).map(ByteSize);
        }

        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| ParseByteSizeError::InvalidNumber(s.to_owned()))?;
        if !value.is_finite() {
            return Err(ParseByteSizeError::InvalidNumber(s.to_owned()));
        }
        if value < 0.0 {
            return Err(ParseByteSizeError::Negative);
        }
        let bytes = value * multiplier as f64;
        if bytes >= u64::MAX as f64 {
            return Err(ParseByteSizeError::Overflow);
        }
        Ok(ByteSize(bytes as u64))
    }
}

fn split_unit(s: &str) -> (&str, u64) {
    for (suffix, multiplier) in [
        ("kb", KB),
        ("k", KB),
        ("mb", MB),
        ("m", MB),
        ("gb", GB),
        ("g", GB),
        ("tb", TB),
        ("t", TB),
        ("pb", PB),
        ("p", PB),
        ("b", 1),
    ] {
        if let Some(number) = s.strip_suffix(suffix) {
            return (number, multiplier);
        }
    }
    (s, 1)
}

fn parse_whole(number: &str) -> Result<u64, ParseByteSizeError> {
    let number = number.trim();
    if number.starts_with('-') {
        return Err(ParseByteSizeError::Negative);
    }
    number.parse::<u64>().map_err(|e| match e.kind() {
        std::num::IntErrorKind::PosOverflow => ParseByteSizeError::Overflow,
        _ => ParseByteSizeError::InvalidNumber(number.to_owned()),
    })
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 > 0 {
            for (suffix, multiplier) in UNITS {
                if self.0 % multiplier == 0 {
                    return write!(f, "{}{suffix}", self.0 / multiplier);
                }
            }
        }
        write!(f, "{}b", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> u64 {
        s.parse::<ByteSize>().unwrap().bytes()
    }

    #[test]
    fn parses_units() {
        assert_eq!(parse("102400"), 102400);
        assert_eq!(parse("512b"), 512);
        assert_eq!(parse("64kb"), 65536);
        assert_eq!(parse("64k"), 65536);
        assert_eq!(parse("64KB"), 65536);
        assert_eq!(parse(" 2mb "), 2 * 1024 * 1024);
        assert_eq!(parse("1.5mb"), 1024 * 1024 * 3 / 2);
        assert_eq!(parse("1g"), 1 << 30);
        assert_eq!(parse("1tb"), 1 << 40);
        assert_eq!(parse("1pb"), 1 << 50);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!("".parse::<ByteSize>(), Err(ParseByteSizeError::Empty));
        assert_eq!("-1kb".parse::<ByteSize>(), Err(ParseByteSizeError::Negative));
        assert_eq!("-5".parse::<ByteSize>(), Err(ParseByteSizeError::Negative));
        assert!(matches!(
            "lots".parse::<ByteSize>(),
            Err(ParseByteSizeError::InvalidNumber(_))
        ));
        assert!(matches!(
            "twelvekb".parse::<ByteSize>(),
            Err(ParseByteSizeError::InvalidNumber(_))
        ));
    }

    #[test]
    fn display_uses_coarsest_exact_unit() {
        assert_eq!(ByteSize::kb(100).to_string(), "100kb");
        assert_eq!(ByteSize::mb(3).to_string(), "3mb");
        assert_eq!(ByteSize::b(1000).to_string(), "1000b");
        assert_eq!(ByteSize::b(0).to_string(), "0b");
    }
}
