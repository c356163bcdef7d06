//! Mint URLs

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Mint url error
#[derive(Debug, Error)]
pub enum Error {
    /// Url error
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// URL of a mint
///
/// Kept in its string form, normalized without a trailing slash so the same
/// mint always maps to the same store key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MintUrl(String);

impl MintUrl {
    /// [`MintUrl`] as `&str`
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join path segments onto the mint url
    pub fn join(&self, path: &str) -> Result<url::Url, Error> {
        Ok(url::Url::parse(&format!("{}/{}", self.0, path))?)
    }
}

impl FromStr for MintUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = url::Url::parse(s)?;

        Ok(Self(url.to_string().trim_end_matches('/').to_string()))
    }
}

impl fmt::Display for MintUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for MintUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MintUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let url: String = String::deserialize(deserializer)?;
        Self::from_str(&url).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_normalized() {
        let with_slash = MintUrl::from_str("https://8333.space:3338/").unwrap();
        let without = MintUrl::from_str("https://8333.space:3338").unwrap();

        assert_eq!(with_slash, without);
        assert_eq!(without.to_string(), "https://8333.space:3338");
    }

    #[test]
    fn test_join() {
        let url = MintUrl::from_str("https://mint.example.com").unwrap();

        assert_eq!(
            url.join("v1/keysets").unwrap().to_string(),
            "https://mint.example.com/v1/keysets"
        );
    }

    #[test]
    fn test_invalid_rejected() {
        assert!(MintUrl::from_str("not a url").is_err());
    }
}
