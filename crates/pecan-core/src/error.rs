//! Wire errors returned by a mint

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Error response of a mint, `{detail, code}` with HTTP status 400
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human readable description
    #[serde(default)]
    pub detail: String,
    /// Error code
    pub code: ErrorCode,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code: {}, detail: {}", self.code, self.detail)
    }
}

impl std::error::Error for ErrorResponse {}

impl ErrorResponse {
    /// Create new [`ErrorResponse`]
    pub fn new(code: ErrorCode, detail: String) -> Self {
        Self { detail, code }
    }

    /// Parse an error response from a raw body
    ///
    /// Bodies that are not the `{detail, code}` shape are preserved verbatim
    /// in the detail under the standard code.
    pub fn from_json(json: &str) -> Self {
        let value: Value = match serde_json::from_str(json) {
            Ok(value) => value,
            Err(_) => {
                return Self {
                    detail: json.to_string(),
                    code: ErrorCode::Standard,
                }
            }
        };

        match serde_json::from_value::<ErrorResponse>(value.clone()) {
            Ok(response) => response,
            Err(_) => Self {
                detail: value.to_string(),
                code: ErrorCode::Standard,
            },
        }
    }
}

/// Stable error codes of the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Standard error (1000)
    Standard,
    /// Keyset error (1001)
    Keyset,
    /// Payment method error (1002)
    PaymentMethod,
    /// Unit error (1003)
    Unit,
    /// Quote error (1004)
    Quote,
    /// Invoice error (1005)
    Invoice,
    /// Proof error (1006)
    Proofs,
    /// P2PK condition error (30001)
    P2pk,
    /// HTLC condition error (30004)
    Htlc,
    /// Code this implementation does not know; preserved as-is
    Unknown(u16),
}

impl ErrorCode {
    /// [`ErrorCode`] from its wire number
    pub fn from_code(code: u16) -> Self {
        match code {
            1000 => Self::Standard,
            1001 => Self::Keyset,
            1002 => Self::PaymentMethod,
            1003 => Self::Unit,
            1004 => Self::Quote,
            1005 => Self::Invoice,
            1006 => Self::Proofs,
            30001 => Self::P2pk,
            30004 => Self::Htlc,
            code => Self::Unknown(code),
        }
    }

    /// Wire number of this [`ErrorCode`]
    pub fn to_code(&self) -> u16 {
        match self {
            Self::Standard => 1000,
            Self::Keyset => 1001,
            Self::PaymentMethod => 1002,
            Self::Unit => 1003,
            Self::Quote => 1004,
            Self::Invoice => 1005,
            Self::Proofs => 1006,
            Self::P2pk => 30001,
            Self::Htlc => 30004,
            Self::Unknown(code) => *code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_code())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u16(self.to_code())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = u16::deserialize(deserializer)?;
        Ok(Self::from_code(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_round_trip() {
        let json = r#"{"detail":"Keyset is not known","code":1001}"#;

        let response = ErrorResponse::from_json(json);

        assert_eq!(response.code, ErrorCode::Keyset);
        assert_eq!(response.detail, "Keyset is not known");
        assert_eq!(serde_json::to_string(&response).unwrap(), json);
    }

    #[test]
    fn test_unknown_code_preserved() {
        let response = ErrorResponse::from_json(r#"{"detail":"nope","code":20008}"#);

        assert_eq!(response.code, ErrorCode::Unknown(20008));
        assert!(serde_json::to_string(&response).unwrap().contains("20008"));
    }

    #[test]
    fn test_unstructured_body() {
        let response = ErrorResponse::from_json("internal server error");

        assert_eq!(response.code, ErrorCode::Standard);
        assert_eq!(response.detail, "internal server error");
    }
}
