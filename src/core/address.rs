//! Address decomposition: the only universally-trusted fact before any
//! probing happens.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::core::error::VerifyError;

/// Upper bound on the overall address length, enforced on every
/// construction path.
pub const MAX_ADDRESS_LENGTH: usize = 253;

/// A raw address split into its trusted components.
///
/// Built by locating the last `@` in the input. The domain is
/// case-normalized to lower case; the local part is preserved verbatim.
/// Immutable once constructed and owned by the caller; the reputation
/// cache never retains it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailAddressParts {
    /// The normalized full address (`local_part@domain`, domain lower-cased).
    pub full_address: String,
    /// Everything before the last `@`, verbatim.
    pub local_part: String,
    /// Everything after the last `@`, lower-cased.
    pub domain: String,
}

impl EmailAddressParts {
    /// Parse a raw address.
    ///
    /// Fails with [`VerifyError::AddressSyntaxInvalid`] when the `@` is
    /// missing, leading, or trailing, or when the address exceeds
    /// [`MAX_ADDRESS_LENGTH`].
    pub fn parse(raw: &str) -> Result<Self, VerifyError> {
        let raw = raw.trim();
        if raw.len() > MAX_ADDRESS_LENGTH {
            return Err(VerifyError::AddressSyntaxInvalid {
                address: raw.to_string(),
                reason: format!("address exceeds {MAX_ADDRESS_LENGTH} characters"),
            });
        }
        let at = raw.rfind('@').ok_or_else(|| VerifyError::AddressSyntaxInvalid {
            address: raw.to_string(),
            reason: "missing '@'".to_string(),
        })?;
        if at == 0 || at == raw.len() - 1 {
            return Err(VerifyError::AddressSyntaxInvalid {
                address: raw.to_string(),
                reason: "'@' must not be the first or last character".to_string(),
            });
        }

        let local_part = raw[..at].to_string();
        let domain = raw[at + 1..].to_ascii_lowercase();
        let full_address = format!("{local_part}@{domain}");
        Ok(EmailAddressParts {
            full_address,
            local_part,
            domain,
        })
    }
}

impl FromStr for EmailAddressParts {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EmailAddressParts::parse(s)
    }
}

impl fmt::Display for EmailAddressParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_address)
    }
}
