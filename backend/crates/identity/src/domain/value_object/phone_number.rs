//! Phone Number Value Object
//!
//! Accepted countries are configured as `code * 100 + national_length`
//! (`2010` = country code 20 with 10 national digits). With a non-empty
//! list the input must look like `+20 1012345678`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{IdentityError, IdentityResult};

static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?(\d{1,3}) (\d{10})$").expect("phone number pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Validate against the accepted country codes
    ///
    /// The number is stored as given once accepted.
    pub fn parse(raw: &str, accepted_codes: &[u32]) -> IdentityResult<Self> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(IdentityError::invalid("phoneNumber", "Phone number cannot be empty"));
        }

        if accepted_codes.is_empty() {
            return Ok(Self(value.to_string()));
        }

        let caps = PHONE_PATTERN
            .captures(value)
            .ok_or(IdentityError::UnsupportedPhoneNumber)?;

        let code: u32 = caps[1]
            .parse()
            .map_err(|_| IdentityError::UnsupportedPhoneNumber)?;
        let national_len = caps[2].len() as u32;

        if accepted_codes
            .iter()
            .any(|c| c / 100 == code && c % 100 == national_len)
        {
            Ok(Self(value.to_string()))
        } else {
            Err(IdentityError::UnsupportedPhoneNumber)
        }
    }

    /// Create from database value (assumed already validated)
    pub fn from_db(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EGYPT: u32 = 2010;

    #[test]
    fn test_accepts_anything_without_codes() {
        assert!(PhoneNumber::parse("0123", &[]).is_ok());
        assert!(PhoneNumber::parse("  ", &[]).is_err());
    }

    #[test]
    fn test_accepted_code_and_length() {
        let phone = PhoneNumber::parse("+20 1012345678", &[EGYPT]).unwrap();
        assert_eq!(phone.as_str(), "+20 1012345678");
        assert!(PhoneNumber::parse("20 1012345678", &[EGYPT]).is_ok());
    }

    #[test]
    fn test_rejects_other_countries() {
        assert!(matches!(
            PhoneNumber::parse("+1 2025550123", &[EGYPT]),
            Err(IdentityError::UnsupportedPhoneNumber)
        ));
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!(matches!(
            PhoneNumber::parse("+201012345678", &[EGYPT]),
            Err(IdentityError::UnsupportedPhoneNumber)
        ));
        assert!(PhoneNumber::parse("+20 12345", &[EGYPT]).is_err());
    }

    #[test]
    fn test_national_length_must_match() {
        // Code 20 only accepts 9-digit numbers here; the pattern requires 10
        assert!(PhoneNumber::parse("+20 1012345678", &[2009]).is_err());
    }
}
