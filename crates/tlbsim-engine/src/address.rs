use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ParseError;

/// A `(page, offset)` pair as typed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogicalAddress {
    pub page: u64,
    pub offset: u64,
}

impl FromStr for LogicalAddress {
    type Err = ParseError;

    /// Parses `"<page>,<offset>"`, trimming whitespace around each field.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = input.split(',').map(str::trim).collect();
        let [page, offset] = fields[..] else {
            return Err(ParseError::WrongArity(fields.len()));
        };

        let page = parse_component(page, ParseError::InvalidPage, ParseError::NegativePage)?;
        let offset =
            parse_component(offset, ParseError::InvalidOffset, ParseError::NegativeOffset)?;
        Ok(Self { page, offset })
    }
}

/// Accepts the full `u64` range; the signed parse only classifies negatives.
fn parse_component(
    field: &str,
    invalid: fn(String) -> ParseError,
    negative: fn(i64) -> ParseError,
) -> Result<u64, ParseError> {
    if let Ok(value) = field.parse::<u64>() {
        return Ok(value);
    }
    match field.parse::<i64>() {
        // `-0` fails the unsigned parse but is still zero.
        Ok(value) => u64::try_from(value).map_err(|_| negative(value)),
        Err(_) => Err(invalid(field.to_string())),
    }
}

impl fmt::Display for LogicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.page, self.offset)
    }
}

/// A resolved `(frame, offset)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhysicalAddress {
    pub frame: usize,
    pub offset: u64,
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.frame, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trimmed_fields() {
        assert_eq!(
            " 2 ,  5 ".parse::<LogicalAddress>(),
            Ok(LogicalAddress { page: 2, offset: 5 })
        );
        assert_eq!(
            "0,0".parse::<LogicalAddress>(),
            Ok(LogicalAddress { page: 0, offset: 0 })
        );
    }

    #[test]
    fn rejects_wrong_arity() {
        assert_eq!(
            "3".parse::<LogicalAddress>(),
            Err(ParseError::WrongArity(1))
        );
        assert_eq!(
            "1,2,3".parse::<LogicalAddress>(),
            Err(ParseError::WrongArity(3))
        );
    }

    #[test]
    fn rejects_non_integers_and_empty_fields() {
        assert_eq!(
            "x,1".parse::<LogicalAddress>(),
            Err(ParseError::InvalidPage("x".into()))
        );
        assert_eq!(
            "1,1.5".parse::<LogicalAddress>(),
            Err(ParseError::InvalidOffset("1.5".into()))
        );
        assert_eq!(
            "2,".parse::<LogicalAddress>(),
            Err(ParseError::InvalidOffset(String::new()))
        );
    }

    #[test]
    fn rejects_negative_components() {
        assert_eq!(
            "-1,4".parse::<LogicalAddress>(),
            Err(ParseError::NegativePage(-1))
        );
        assert_eq!(
            "1,-4".parse::<LogicalAddress>(),
            Err(ParseError::NegativeOffset(-4))
        );
    }

    #[test]
    fn accepts_components_above_i64_max() {
        assert_eq!(
            "9223372036854775808,18446744073709551615".parse::<LogicalAddress>(),
            Ok(LogicalAddress {
                page: 1 << 63,
                offset: u64::MAX
            })
        );
        assert_eq!(
            "18446744073709551616,0".parse::<LogicalAddress>(),
            Err(ParseError::InvalidPage("18446744073709551616".into()))
        );
        assert_eq!(
            "-0,0".parse::<LogicalAddress>(),
            Ok(LogicalAddress { page: 0, offset: 0 })
        );
    }

    #[test]
    fn physical_address_displays_as_pair() {
        let pa = PhysicalAddress {
            frame: 3,
            offset: 17,
        };
        assert_eq!(pa.to_string(), "(3,17)");
    }
}
