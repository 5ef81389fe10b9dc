//! CSS-length values as they appear in saved documents.
//!
//! Concept sizes and connection label widths are stored as strings such as
//! `"100px"` or `"90"`. Only the numeric pixel magnitude matters; the unit
//! suffix is optional on input and always written back as `px`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use winnow::ascii::space0;
use winnow::combinator::opt;
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::take_while;

/// A length in canvas units (CSS pixels at scale 1).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Length(pub f64);

impl Length {
    pub const fn px(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Parse `"<number>"`, `"<number>px"`, surrounding whitespace allowed.
    pub fn parse(s: &str) -> Option<Self> {
        let mut input = s;
        let value = parse_length.parse_next(&mut input).ok()?;
        if !input.trim().is_empty() || !value.is_finite() {
            return None;
        }
        Some(Self(value))
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px", self.0)
    }
}

fn parse_length(input: &mut &str) -> ModalResult<f64> {
    let _ = space0.parse_next(input)?;
    let value = parse_number.parse_next(input)?;
    let _ = space0.parse_next(input)?;
    let _ = opt("px").parse_next(input)?;
    Ok(value)
}

fn parse_number(input: &mut &str) -> ModalResult<f64> {
    let start = *input;
    if input.starts_with('-') {
        *input = &input[1..];
    }
    let _ = take_while(0.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    if input.starts_with('.') {
        *input = &input[1..];
        let _ =
            take_while::<_, _, ContextError>(0.., |c: char| c.is_ascii_digit()).parse_next(input);
    }
    let matched = &start[..start.len() - input.len()];
    matched
        .parse::<f64>()
        .map_err(|_| winnow::error::ErrMode::Backtrack(ContextError::new()))
}

impl Serialize for Length {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Length {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LengthVisitor;

        impl Visitor<'_> for LengthVisitor {
            type Value = Length;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number or a CSS pixel length such as \"100px\"")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Length, E> {
                Length::parse(v).ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Length, E> {
                Ok(Length(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Length, E> {
                Ok(Length(v as f64))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Length, E> {
                Ok(Length(v as f64))
            }
        }

        deserializer.deserialize_any(LengthVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_suffixed_and_bare() {
        assert_eq!(Length::parse("100px"), Some(Length(100.0)));
        assert_eq!(Length::parse("90"), Some(Length(90.0)));
        assert_eq!(Length::parse(" 54.5 px "), Some(Length(54.5)));
        assert_eq!(Length::parse(".5px"), Some(Length(0.5)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(Length::parse("wide"), None);
        assert_eq!(Length::parse("10em"), None);
        assert_eq!(Length::parse(""), None);
    }

    #[test]
    fn serializes_with_px_suffix() {
        assert_eq!(serde_json::to_string(&Length(100.0)).unwrap(), "\"100px\"");
        assert_eq!(serde_json::to_string(&Length(12.5)).unwrap(), "\"12.5px\"");
    }

    #[test]
    fn deserializes_strings_and_numbers() {
        let a: Length = serde_json::from_str("\"120px\"").unwrap();
        let b: Length = serde_json::from_str("90").unwrap();
        assert_eq!(a, Length(120.0));
        assert_eq!(b, Length(90.0));
    }
}
