//! Phone number type.
//!
//! Customers and delivery staff are reached by SMS, so numbers are kept in a
//! compact normalized form: an optional leading `+` followed by digits only.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    #[error("phone number cannot be empty")]
    Empty,
    #[error("phone number may only contain digits, spaces, dashes, parentheses and a leading +")]
    InvalidCharacter,
    #[error("phone number must have between {min} and {max} digits")]
    InvalidLength { min: usize, max: usize },
}

/// A normalized phone number such as `+254712345678`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub const MIN_DIGITS: usize = 9;
    pub const MAX_DIGITS: usize = 15;

    /// Parse a phone number, stripping common separators.
    ///
    /// # Errors
    ///
    /// Returns a [`PhoneError`] when the input is empty, contains letters or
    /// symbols, or has too few or too many digits.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        let (prefix, rest) = s
            .strip_prefix('+')
            .map_or(("", s), |rest| ("+", rest));

        let mut digits = String::with_capacity(rest.len());
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '(' | ')' => {}
                _ => return Err(PhoneError::InvalidCharacter),
            }
        }

        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len()) {
            return Err(PhoneError::InvalidLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(format!("{prefix}{digits}")))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last four digits, used when matching a customer during order tracking.
    #[must_use]
    pub fn last_four(&self) -> &str {
        let len = self.0.len();
        self.0.get(len.saturating_sub(4)..).unwrap_or(&self.0)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(phone: PhoneNumber) -> Self {
        phone.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_separators() {
        let phone = PhoneNumber::parse("+254 (712) 345-678").unwrap();
        assert_eq!(phone.as_str(), "+254712345678");
        assert_eq!(phone.last_four(), "5678");
    }

    #[test]
    fn test_parse_local_format() {
        assert_eq!(PhoneNumber::parse("0712 345 678").unwrap().as_str(), "0712345678");
    }

    #[test]
    fn test_parse_rejections() {
        assert_eq!(PhoneNumber::parse(""), Err(PhoneError::Empty));
        assert_eq!(PhoneNumber::parse("07123x5678"), Err(PhoneError::InvalidCharacter));
        assert_eq!(PhoneNumber::parse("++254712345678"), Err(PhoneError::InvalidCharacter));
        assert!(matches!(
            PhoneNumber::parse("12345"),
            Err(PhoneError::InvalidLength { .. })
        ));
    }
}
