//! Request and response types of the mint HTTP surface

use core::fmt;
use core::str::FromStr;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::amount::Amount;
use crate::keys::PublicKey;
use crate::proof::{BlindSignature, BlindedMessage, Proofs};
use crate::CurrencyUnit;

/// Message error
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown quote state tag
    #[error("Unknown quote state")]
    UnknownState,
}

/// State of a quote
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuoteState {
    /// Quote has not been paid
    #[default]
    Unpaid,
    /// Payment is in flight
    Pending,
    /// Quote has been paid
    Paid,
    /// Ecash has been issued for the quote
    Issued,
}

impl fmt::Display for QuoteState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unpaid => write!(f, "UNPAID"),
            Self::Pending => write!(f, "PENDING"),
            Self::Paid => write!(f, "PAID"),
            Self::Issued => write!(f, "ISSUED"),
        }
    }
}

impl FromStr for QuoteState {
    type Err = Error;

    fn from_str(state: &str) -> Result<Self, Self::Err> {
        match state {
            "UNPAID" => Ok(Self::Unpaid),
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "ISSUED" => Ok(Self::Issued),
            _ => Err(Error::UnknownState),
        }
    }
}

/// Mint quote request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintQuoteBolt11Request {
    /// Amount to mint
    pub amount: Amount,
    /// Unit to mint in
    pub unit: CurrencyUnit,
}

/// Mint quote response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintQuoteBolt11Response {
    /// Quote id
    pub quote: String,
    /// Bolt11 invoice to pay
    pub request: String,
    /// State of the quote
    pub state: QuoteState,
    /// Unix timestamp until which the quote is valid
    pub expiry: Option<u64>,
}

/// Mint request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintBolt11Request {
    /// Quote id
    pub quote: String,
    /// Outputs to sign
    pub outputs: Vec<BlindedMessage>,
}

/// Mint response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintBolt11Response {
    /// Blinded signatures on the requested outputs
    pub signatures: Vec<BlindSignature>,
}

/// Melt quote request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeltQuoteBolt11Request {
    /// Bolt11 invoice to be paid
    pub request: String,
    /// Unit to pay with
    pub unit: CurrencyUnit,
}

/// Melt quote response
///
/// Also the response of the melt itself, then carrying the preimage and any
/// change signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeltQuoteBolt11Response {
    /// Quote id
    pub quote: String,
    /// Amount that must be provided
    pub amount: Amount,
    /// Additional fee reserve required
    pub fee_reserve: Amount,
    /// State of the quote
    pub state: QuoteState,
    /// Unix timestamp until which the quote is valid
    pub expiry: Option<u64>,
    /// Preimage of the paid invoice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_preimage: Option<String>,
    /// Change for overpaid lightning fees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<Vec<BlindSignature>>,
}

/// Melt request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeltBolt11Request {
    /// Quote id
    pub quote: String,
    /// Proofs to melt
    pub inputs: Proofs,
    /// Blank outputs for change, amounts zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<BlindedMessage>>,
}

/// Swap request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    /// Proofs to spend
    pub inputs: Proofs,
    /// Outputs to sign
    pub outputs: Vec<BlindedMessage>,
}

impl SwapRequest {
    /// Create new [`SwapRequest`]
    pub fn new(inputs: Proofs, outputs: Vec<BlindedMessage>) -> Self {
        Self { inputs, outputs }
    }

    /// Total value of the inputs
    pub fn input_amount(&self) -> Amount {
        self.inputs.iter().map(|proof| proof.amount).sum()
    }

    /// Total value of the outputs
    pub fn output_amount(&self) -> Amount {
        self.outputs.iter().map(|output| output.amount).sum()
    }
}

/// Swap response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResponse {
    /// Blinded signatures on the requested outputs
    pub signatures: Vec<BlindSignature>,
}

/// State of a proof as known to the mint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProofStateKind {
    /// Has not been spent
    Unspent,
    /// In flight in some transaction
    Pending,
    /// Already spent
    Spent,
}

/// Check state request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStateRequest {
    /// `Y = hash_to_curve(secret)` of the proofs to check
    #[serde(rename = "Ys")]
    pub ys: Vec<PublicKey>,
}

/// State of one checked proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofState {
    /// `Y` of the proof
    #[serde(rename = "Y")]
    pub y: PublicKey,
    /// State of the proof
    pub state: ProofStateKind,
    /// Witness the proof was spent with, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<String>,
}

/// Check state response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStateResponse {
    /// States, in request order
    pub states: Vec<ProofState>,
}

/// Restore request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreRequest {
    /// Outputs to look up signatures for
    pub outputs: Vec<BlindedMessage>,
}

/// Restore response
///
/// Outputs the mint has seen before, with their signatures, in request
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreResponse {
    /// Previously seen outputs
    pub outputs: Vec<BlindedMessage>,
    /// Their signatures
    pub signatures: Vec<BlindSignature>,
}

/// Mint capability document, `/v1/info`
///
/// Parsed leniently: only the fields the wallet reads are typed, per-NUT
/// settings stay raw.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MintInfo {
    /// Name of the mint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Mint's public key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<PublicKey>,
    /// Implementation version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Short description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Message of the day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motd: Option<String>,
    /// Per-NUT support flags, keyed by NUT number
    #[serde(default)]
    pub nuts: HashMap<String, serde_json::Value>,
}

impl MintInfo {
    /// Whether the mint advertises support for a NUT
    pub fn supports_nut(&self, nut: u8) -> bool {
        match self.nuts.get(&nut.to_string()) {
            Some(settings) => settings
                .get("supported")
                .and_then(|s| s.as_bool())
                .unwrap_or(true),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_state_tags() {
        assert_eq!(
            serde_json::to_string(&QuoteState::Unpaid).unwrap(),
            "\"UNPAID\""
        );
        assert_eq!(
            serde_json::from_str::<QuoteState>("\"ISSUED\"").unwrap(),
            QuoteState::Issued
        );
        assert!(serde_json::from_str::<QuoteState>("\"SETTLED\"").is_err());
    }

    #[test]
    fn test_mint_quote_response() {
        let json = r#"{"quote":"DSGLX9kevM","request":"lnbc100n1pj4apw9pp5","state":"UNPAID","expiry":1701704757}"#;

        let response: MintQuoteBolt11Response = serde_json::from_str(json).unwrap();

        assert_eq!(response.quote, "DSGLX9kevM");
        assert_eq!(response.state, QuoteState::Unpaid);
    }

    #[test]
    fn test_restore_response() {
        let json = r#"{"outputs":[{"B_":"0204bbffa045f28ec836117a29ea0a00d77f1d692e38cf94f72a5145bfda6d8f41","amount":0,"id":"00ffd48b8f5ecf80","witness":null},{"B_":"025f0615ccba96f810582a6885ffdb04bd57c96dbc590f5aa560447b31258988d7","amount":0,"id":"00ffd48b8f5ecf80"}],"signatures":[{"C_":"02e9701b804dc05a5294b5a580b428237a27c7ee1690a0177868016799b1761c81","amount":8,"dleq":null,"id":"00ffd48b8f5ecf80"},{"C_":"031246ee046519b15648f1b8d8ffcb8e537409c84724e148c8d6800b2e62deb795","amount":2,"dleq":null,"id":"00ffd48b8f5ecf80"}]}"#;

        let response: RestoreResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.outputs.len(), 2);
        assert_eq!(response.signatures.len(), 2);
    }

    #[test]
    fn test_mint_info_nut_flags() {
        let json = r#"{
            "name":"pecan test mint",
            "nuts": {
                "4": {"methods":[["bolt11","sat"]],"disabled":false},
                "7": {"supported": true},
                "9": {"supported": false}
            }
        }"#;

        let info: MintInfo = serde_json::from_str(json).unwrap();

        assert!(info.supports_nut(4));
        assert!(info.supports_nut(7));
        assert!(!info.supports_nut(9));
        assert!(!info.supports_nut(11));
    }
}
