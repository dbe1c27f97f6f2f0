//! Transport-mode codes (`railway`, `auto_bus`, ...).

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Validated transport-type code.
///
/// Codes come from the header row of the source table. A code is non-empty
/// and made of ASCII letters, digits, `_` or `-`; surrounding whitespace is
/// trimmed on construction. The code is kept as written (no case folding) so
/// the column→type mapping stays exactly what the source declared.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransportType(String);

impl TransportType {
    pub fn new(code: impl AsRef<str>) -> DomainResult<Self> {
        let code = code.as_ref().trim();
        if code.is_empty() {
            return Err(DomainError::validation("transport type code is empty"));
        }
        if let Some(bad) = code
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(DomainError::validation(format!(
                "transport type code '{code}' contains invalid character '{bad}'"
            )));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display label used by summaries: `auto_bus` → `AUTO BUS`.
    pub fn label(&self) -> String {
        self.0.replace('_', " ").to_uppercase()
    }
}

impl ValueObject for TransportType {}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TransportType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TransportType {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TransportType> for String {
    fn from(value: TransportType) -> Self {
        value.0
    }
}

impl AsRef<str> for TransportType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
