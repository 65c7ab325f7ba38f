//! MAC Address Value Object
//!
//! Device identifier sent by clients in the `Mac-Address` header.
//! Six hex octets separated by `:` or `-`, case preserved as sent.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static MAC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9A-Fa-f]{2}[:-]){5}([0-9A-Fa-f]{2})$").expect("MAC address pattern is valid")
});

/// Well-formed MAC address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacAddress(String);

impl MacAddress {
    /// Parse a header value; `None` when malformed
    pub fn parse(raw: &str) -> Option<Self> {
        MAC_PATTERN.is_match(raw).then(|| Self(raw.to_string()))
    }

    /// Parse an optional header value
    pub fn from_header(raw: Option<&str>) -> Option<Self> {
        raw.and_then(Self::parse)
    }

    /// Create from database value (assumed already validated)
    pub fn from_db(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
