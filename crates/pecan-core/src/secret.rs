//! The secret a proof commits to

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::hex;

/// Secret error
#[derive(Debug, Error)]
pub enum Error {
    /// Secrets must not be empty
    #[error("Empty secret")]
    EmptySecret,
    /// Hex error
    #[error(transparent)]
    Hex(#[from] hex::Error),
}

/// The secret data that allows spending ecash
///
/// Either an opaque string or, in its well-known form, the JSON encoding of a
/// [`crate::conditions::WellKnownSecret`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Create new [`Secret`]
    pub fn new<S>(secret: S) -> Self
    where
        S: Into<String>,
    {
        Self(secret.into())
    }

    /// Generate a random secret: 32 random bytes, hex encoded
    pub fn generate() -> Self {
        use rand::RngCore;

        let mut random_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut random_bytes);

        Self(hex::encode(random_bytes))
    }

    /// [`Secret`] as bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// [`Secret`] to bytes
    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }

    /// Whether the secret is in the well-known spending-condition form
    pub fn is_well_known(&self) -> bool {
        crate::conditions::WellKnownSecret::from_str(&self.0).is_ok()
    }
}

impl FromStr for Secret {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::EmptySecret);
        }

        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn generate_length() {
        let secret = Secret::generate();

        // 32 bytes hex encoded
        assert_eq!(secret.to_string().len(), 64);
        assert!(hex::decode(secret.to_string()).is_ok());
    }

    #[test]
    fn opaque_secret_is_not_well_known() {
        let secret = Secret::from_str("someranadomsecret").unwrap();
        assert!(!secret.is_well_known());
    }

    #[test]
    fn empty_secret_rejected() {
        assert!(Secret::from_str("").is_err());
    }
}
