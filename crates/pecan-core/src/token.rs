//! Token containers: the two wire formats ecash travels in
//!
//! V3 is JSON in base64url behind a `cashuA` prefix; V4 is CBOR in unpadded
//! base64url behind `cashuB` with single-letter keys and raw byte fields.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bitcoin::base64::engine::{general_purpose, DecodePaddingMode, GeneralPurpose};
use bitcoin::base64::{alphabet, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::amount::Amount;
use crate::dleq::ProofDleq;
use crate::keys::{PublicKey, SecretKey};
use crate::keyset::Id;
use crate::mint_url::MintUrl;
use crate::proof::{self, Proof, Proofs, Witness};
use crate::secret::Secret;
use crate::CurrencyUnit;

/// Token error
#[derive(Debug, Error)]
pub enum Error {
    /// Tokens must carry at least one proof
    #[error("Proofs required in token")]
    ProofsRequired,
    /// Unknown prefix or version
    #[error("Unsupported token")]
    UnsupportedToken,
    /// V4 tokens carry exactly one mint
    #[error("Multiple mints cannot be carried in a V4 token")]
    MultiMintUnsupported,
    /// Base64 error
    #[error(transparent)]
    Base64(#[from] bitcoin::base64::DecodeError),
    /// Utf8 parse error
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
    /// Serde Json error
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    /// CBOR deserialization error
    #[error(transparent)]
    CiboriumDe(#[from] ciborium::de::Error<std::io::Error>),
    /// CBOR serialization error
    #[error(transparent)]
    CiboriumSer(#[from] ciborium::ser::Error<std::io::Error>),
    /// Amount error
    #[error(transparent)]
    Amount(#[from] crate::amount::Error),
    /// Proof error
    #[error(transparent)]
    Proof(#[from] crate::proof::Error),
}

/// Decode a token body, accepting both base64 alphabets and either padding
fn decode_body(s: &str) -> Result<Vec<u8>, Error> {
    let config = general_purpose::GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent);

    match GeneralPurpose::new(&alphabet::URL_SAFE, config).decode(s) {
        Ok(bytes) => Ok(bytes),
        Err(_) => Ok(GeneralPurpose::new(&alphabet::STANDARD, config).decode(s)?),
    }
}

/// A token in either encoding
///
/// One abstract value: mint, unit, memo and proofs, independent of which
/// wire format it was born from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Token {
    /// V3, JSON based
    TokenV3(TokenV3),
    /// V4, CBOR based
    TokenV4(TokenV4),
}

impl Token {
    /// Create new [`Token`] in the current (V4) encoding
    pub fn new(
        mint_url: MintUrl,
        proofs: Proofs,
        memo: Option<String>,
        unit: Option<CurrencyUnit>,
    ) -> Result<Self, Error> {
        if proofs.is_empty() {
            return Err(Error::ProofsRequired);
        }

        Ok(Token::TokenV4(TokenV4 {
            mint_url,
            unit,
            memo,
            token: group_by_keyset(proofs),
        }))
    }

    /// All proofs in the token
    pub fn proofs(&self) -> Proofs {
        match self {
            Self::TokenV3(token) => token
                .token
                .iter()
                .flat_map(|entry| entry.proofs.clone())
                .collect(),
            Self::TokenV4(token) => token.proofs(),
        }
    }

    /// The mint the token is drawn on
    ///
    /// Multi-mint V3 containers are not accepted as one abstract token.
    pub fn mint_url(&self) -> Result<MintUrl, Error> {
        match self {
            Self::TokenV3(token) => {
                let mints: Vec<&MintUrl> = token.token.iter().map(|entry| &entry.mint).collect();
                match mints.as_slice() {
                    [mint] => Ok((*mint).clone()),
                    _ => Err(Error::MultiMintUnsupported),
                }
            }
            Self::TokenV4(token) => Ok(token.mint_url.clone()),
        }
    }

    /// Unit of the token
    pub fn unit(&self) -> Option<&CurrencyUnit> {
        match self {
            Self::TokenV3(token) => token.unit.as_ref(),
            Self::TokenV4(token) => token.unit.as_ref(),
        }
    }

    /// Memo of the token
    pub fn memo(&self) -> Option<&String> {
        match self {
            Self::TokenV3(token) => token.memo.as_ref(),
            Self::TokenV4(token) => token.memo.as_ref(),
        }
    }

    /// Total value of the token
    pub fn total_amount(&self) -> Result<Amount, Error> {
        Ok(proof::total_amount(&self.proofs())?)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenV3(token) => write!(f, "{}", token),
            Self::TokenV4(token) => write!(f, "{}", token),
        }
    }
}

impl FromStr for Token {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match (s.strip_prefix("cashuA"), s.strip_prefix("cashuB")) {
            (Some(_), None) => Ok(Self::TokenV3(TokenV3::from_str(s)?)),
            (None, Some(_)) => Ok(Self::TokenV4(TokenV4::from_str(s)?)),
            _ => Err(Error::UnsupportedToken),
        }
    }
}

fn group_by_keyset(proofs: Proofs) -> Vec<TokenV4Group> {
    let mut by_keyset: HashMap<Id, Proofs> = HashMap::new();
    for proof in proofs {
        by_keyset.entry(proof.keyset_id).or_default().push(proof);
    }

    by_keyset
        .into_iter()
        .map(|(id, proofs)| TokenV4Group::new(id, proofs))
        .collect()
}

/// One mint's proofs inside a [`TokenV3`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenV3Entry {
    /// Url of the mint
    pub mint: MintUrl,
    /// Proofs drawn on the mint
    pub proofs: Proofs,
}

/// Token in the V3 (JSON) encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenV3 {
    /// Proofs grouped by mint
    pub token: Vec<TokenV3Entry>,
    /// Memo for the receiver
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// Unit of the proofs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<CurrencyUnit>,
}

impl TokenV3 {
    /// Create new [`TokenV3`] on a single mint
    pub fn new(
        mint_url: MintUrl,
        proofs: Proofs,
        memo: Option<String>,
        unit: Option<CurrencyUnit>,
    ) -> Result<Self, Error> {
        if proofs.is_empty() {
            return Err(Error::ProofsRequired);
        }

        Ok(Self {
            token: vec![TokenV3Entry {
                mint: mint_url,
                proofs,
            }],
            memo,
            unit,
        })
    }
}

impl FromStr for TokenV3 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("cashuA").ok_or(Error::UnsupportedToken)?;

        let decoded = decode_body(s)?;
        let decoded_str = String::from_utf8(decoded)?;

        Ok(serde_json::from_str(&decoded_str)?)
    }
}

impl fmt::Display for TokenV3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json_string = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        let encoded = general_purpose::URL_SAFE.encode(json_string);
        write!(f, "cashuA{}", encoded)
    }
}

/// Token in the V4 (CBOR) encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenV4 {
    /// Url of the mint
    #[serde(rename = "m")]
    pub mint_url: MintUrl,
    /// Unit of the proofs
    #[serde(rename = "u", skip_serializing_if = "Option::is_none")]
    pub unit: Option<CurrencyUnit>,
    /// Memo for the receiver
    #[serde(rename = "d", skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// Proofs grouped by keyset
    #[serde(rename = "t")]
    pub token: Vec<TokenV4Group>,
}

impl TokenV4 {
    /// All proofs in the token
    pub fn proofs(&self) -> Proofs {
        self.token
            .iter()
            .flat_map(|entry| entry.proofs.iter().map(|p| p.to_proof(&entry.keyset_id)))
            .collect()
    }
}

impl FromStr for TokenV4 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("cashuB").ok_or(Error::UnsupportedToken)?;

        let decoded = decode_body(s)?;

        Ok(ciborium::from_reader(&decoded[..])?)
    }
}

impl fmt::Display for TokenV4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use serde::ser::Error;
        let mut data = Vec::new();
        ciborium::into_writer(self, &mut data).map_err(|e| fmt::Error::custom(e.to_string()))?;
        let encoded = general_purpose::URL_SAFE_NO_PAD.encode(data);
        write!(f, "cashuB{}", encoded)
    }
}

impl From<TokenV4> for TokenV3 {
    fn from(token: TokenV4) -> Self {
        TokenV3 {
            token: vec![TokenV3Entry {
                mint: token.mint_url,
                proofs: token
                    .token
                    .iter()
                    .flat_map(|entry| entry.proofs.iter().map(|p| p.to_proof(&entry.keyset_id)))
                    .collect(),
            }],
            memo: token.memo,
            unit: token.unit,
        }
    }
}

impl TryFrom<TokenV3> for TokenV4 {
    type Error = Error;

    fn try_from(token: TokenV3) -> Result<Self, Self::Error> {
        let entry = match token.token.as_slice() {
            [entry] => entry.clone(),
            _ => return Err(Error::MultiMintUnsupported),
        };

        Ok(TokenV4 {
            mint_url: entry.mint,
            token: group_by_keyset(entry.proofs),
            memo: token.memo,
            unit: token.unit,
        })
    }
}

/// One keyset's proofs inside a [`TokenV4`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenV4Group {
    /// Keyset id, as its eight raw bytes
    #[serde(rename = "i", with = "v4_bytes::keyset_id")]
    pub keyset_id: Id,
    /// Proofs of the keyset
    #[serde(rename = "p")]
    pub proofs: Vec<TokenV4Proof>,
}

impl TokenV4Group {
    /// Create new [`TokenV4Group`]
    pub fn new(keyset_id: Id, proofs: Proofs) -> Self {
        Self {
            keyset_id,
            proofs: proofs.into_iter().map(Into::into).collect(),
        }
    }
}

/// Proof in the V4 encoding: no keyset id, `C` as raw bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenV4Proof {
    /// Amount
    #[serde(rename = "a")]
    pub amount: Amount,
    /// Secret message
    #[serde(rename = "s")]
    pub secret: Secret,
    /// Unblinded signature, 33 raw bytes
    #[serde(rename = "c", with = "v4_bytes::pubkey")]
    pub c: PublicKey,
    /// Witness
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<Witness>,
    /// DLEQ proof, fields as raw bytes
    #[serde(rename = "d", default, skip_serializing_if = "Option::is_none")]
    pub dleq: Option<TokenV4Dleq>,
}

impl TokenV4Proof {
    /// Rebuild a [`Proof`] under the keyset id of its group
    pub fn to_proof(&self, keyset_id: &Id) -> Proof {
        Proof {
            amount: self.amount,
            keyset_id: *keyset_id,
            secret: self.secret.clone(),
            c: self.c,
            witness: self.witness.clone(),
            dleq: self.dleq.clone().map(Into::into),
        }
    }
}

impl From<Proof> for TokenV4Proof {
    fn from(proof: Proof) -> Self {
        Self {
            amount: proof.amount,
            secret: proof.secret,
            c: proof.c,
            witness: proof.witness,
            dleq: proof.dleq.map(Into::into),
        }
    }
}

/// DLEQ proof in the V4 encoding, scalars as raw bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenV4Dleq {
    /// e
    #[serde(with = "v4_bytes::scalar")]
    pub e: SecretKey,
    /// s
    #[serde(with = "v4_bytes::scalar")]
    pub s: SecretKey,
    /// Blinding factor
    #[serde(with = "v4_bytes::scalar")]
    pub r: SecretKey,
}

impl From<ProofDleq> for TokenV4Dleq {
    fn from(dleq: ProofDleq) -> Self {
        Self {
            e: dleq.e,
            s: dleq.s,
            r: dleq.r,
        }
    }
}

impl From<TokenV4Dleq> for ProofDleq {
    fn from(dleq: TokenV4Dleq) -> Self {
        Self {
            e: dleq.e,
            s: dleq.s,
            r: dleq.r,
        }
    }
}

/// CBOR carries these fields as raw byte strings where the JSON model uses
/// hex; each submodule converts one field type.
mod v4_bytes {
    pub mod keyset_id {
        use serde::Deserialize;

        use crate::keyset::Id;

        pub fn serialize<S>(id: &Id, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            serializer.serialize_bytes(&id.to_bytes())
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Id, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            let bytes = Vec::<u8>::deserialize(deserializer)?;
            Id::from_bytes(&bytes).map_err(serde::de::Error::custom)
        }
    }

    pub mod pubkey {
        use serde::Deserialize;

        use crate::keys::PublicKey;

        pub fn serialize<S>(key: &PublicKey, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            serializer.serialize_bytes(&key.to_bytes())
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<PublicKey, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            let bytes = Vec::<u8>::deserialize(deserializer)?;
            PublicKey::from_slice(&bytes).map_err(serde::de::Error::custom)
        }
    }

    pub mod scalar {
        use serde::Deserialize;

        use crate::keys::SecretKey;

        pub fn serialize<S>(key: &SecretKey, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            serializer.serialize_bytes(&key.to_secret_bytes())
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<SecretKey, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            let bytes = Vec::<u8>::deserialize(deserializer)?;
            SecretKey::from_slice(&bytes).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const V3_TOKEN: &str = "cashuAeyJ0b2tlbiI6W3sibWludCI6Imh0dHBzOi8vODMzMy5zcGFjZTozMzM4IiwicHJvb2ZzIjpbeyJhbW91bnQiOjIsImlkIjoiMDA5YTFmMjkzMjUzZTQxZSIsInNlY3JldCI6IjQwNzkxNWJjMjEyYmU2MWE3N2UzZTZkMmFlYjRjNzI3OTgwYmRhNTFjZDA2YTZhZmMyOWUyODYxNzY4YTc4MzciLCJDIjoiMDJiYzkwOTc5OTdkODFhZmIyY2M3MzQ2YjVlNDM0NWE5MzQ2YmQyYTUwNmViNzk1ODU5OGE3MmYwY2Y4NTE2M2VhIn0seyJhbW91bnQiOjgsImlkIjoiMDA5YTFmMjkzMjUzZTQxZSIsInNlY3JldCI6ImZlMTUxMDkzMTRlNjFkNzc1NmIwZjhlZTBmMjNhNjI0YWNhYTNmNGUwNDJmNjE0MzNjNzI4YzcwNTdiOTMxYmUiLCJDIjoiMDI5ZThlNTA1MGI4OTBhN2Q2YzA5NjhkYjE2YmMxZDVkNWZhMDQwZWExZGUyODRmNmVjNjlkNjEyOTlmNjcxMDU5In1dfV0sInVuaXQiOiJzYXQiLCJtZW1vIjoiVGhhbmsgeW91LiJ9";

    #[test]
    fn test_v3_decode() {
        let token = Token::from_str(V3_TOKEN).unwrap();

        assert_eq!(
            token.mint_url().unwrap(),
            MintUrl::from_str("https://8333.space:3338").unwrap()
        );
        assert_eq!(token.unit().unwrap(), "sat");
        assert_eq!(token.memo().unwrap(), "Thank you.");

        let proofs = token.proofs();
        assert_eq!(proofs.len(), 2);
        assert_eq!(proofs[0].amount, Amount::from(2));
        assert_eq!(
            proofs[0].secret.to_string(),
            "407915bc212be61a77e3e6d2aeb4c727980bda51cd06a6afc29e2861768a7837"
        );
        assert_eq!(
            proofs[1].secret.to_string(),
            "fe15109314e61d7756b0f8ee0f23a624acaa3f4e042f61433c728c7057b931be"
        );
        assert_eq!(token.total_amount().unwrap(), Amount::from(10));
    }

    #[test]
    fn test_v3_round_trip() {
        let token = TokenV3::from_str(V3_TOKEN).unwrap();

        let encoded = token.to_string();
        assert!(encoded.starts_with("cashuA"));

        let decoded = TokenV3::from_str(&encoded).unwrap();
        assert_eq!(decoded, token);
    }

    #[test]
    fn test_v3_padding_indifferent() {
        let with_padding = "cashuAeyJ0b2tlbiI6W3sibWludCI6Imh0dHBzOi8vODMzMy5zcGFjZTozMzM4IiwicHJvb2ZzIjpbeyJhbW91bnQiOjIsImlkIjoiMDA5YTFmMjkzMjUzZTQxZSIsInNlY3JldCI6IjQwNzkxNWJjMjEyYmU2MWE3N2UzZTZkMmFlYjRjNzI3OTgwYmRhNTFjZDA2YTZhZmMyOWUyODYxNzY4YTc4MzciLCJDIjoiMDJiYzkwOTc5OTdkODFhZmIyY2M3MzQ2YjVlNDM0NWE5MzQ2YmQyYTUwNmViNzk1ODU5OGE3MmYwY2Y4NTE2M2VhIn0seyJhbW91bnQiOjgsImlkIjoiMDA5YTFmMjkzMjUzZTQxZSIsInNlY3JldCI6ImZlMTUxMDkzMTRlNjFkNzc1NmIwZjhlZTBmMjNhNjI0YWNhYTNmNGUwNDJmNjE0MzNjNzI4YzcwNTdiOTMxYmUiLCJDIjoiMDI5ZThlNTA1MGI4OTBhN2Q2YzA5NjhkYjE2YmMxZDVkNWZhMDQwZWExZGUyODRmNmVjNjlkNjEyOTlmNjcxMDU5In1dfV0sInVuaXQiOiJzYXQiLCJtZW1vIjoiVGhhbmsgeW91IHZlcnkgbXVjaC4ifQ==";
        let without_padding = &with_padding[..with_padding.len() - 2];

        let a = TokenV3::from_str(with_padding).unwrap();
        let b = TokenV3::from_str(without_padding).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_v4_round_trip() {
        let token_str = "cashuBpGF0gaJhaUgArSaMTR9YJmFwgaNhYQFhc3hAOWE2ZGJiODQ3YmQyMzJiYTc2ZGIwZGYxOTcyMTZiMjlkM2I4Y2MxNDU1M2NkMjc4MjdmYzFjYzk0MmZlZGI0ZWFjWCEDhhhUP_trhpXfStS6vN6So0qWvc2X3O4NfM-Y1HISZ5JhZGlUaGFuayB5b3VhbXVodHRwOi8vbG9jYWxob3N0OjMzMzhhdWNzYXQ=";

        let token = TokenV4::from_str(token_str).unwrap();

        assert_eq!(
            token.mint_url,
            MintUrl::from_str("http://localhost:3338").unwrap()
        );
        assert_eq!(
            token.token[0].keyset_id,
            Id::from_str("00ad268c4d1f5826").unwrap()
        );
        assert_eq!(token.memo.as_deref(), Some("Thank you"));

        let encoded = token.to_string();
        // Emitted without padding
        assert!(!encoded.ends_with('='));

        let decoded = TokenV4::from_str(&encoded).unwrap();
        assert_eq!(decoded, token);
    }

    #[test]
    fn test_v4_multi_keyset() {
        let token_str = "cashuBo2F0gqJhaUgA_9SLj17PgGFwgaNhYQFhc3hAYWNjMTI0MzVlN2I4NDg0YzNjZjE4NTAxNDkyMThhZjkwZjcxNmE1MmJmNGE1ZWQzNDdlNDhlY2MxM2Y3NzM4OGFjWCECRFODGd5IXVW-07KaZCvuWHk3WrnnpiDhHki6SCQh88-iYWlIAK0mjE0fWCZhcIKjYWECYXN4QDEzMjNkM2Q0NzA3YTU4YWQyZTIzYWRhNGU5ZjFmNDlmNWE1YjRhYzdiNzA4ZWIwZDYxZjczOGY0ODMwN2U4ZWVhY1ghAjRWqhENhLSsdHrr2Cw7AFrKUL9Ffr1XN6RBT6w659lNo2FhAWFzeEA1NmJjYmNiYjdjYzY0MDZiM2ZhNWQ1N2QyMTc0ZjRlZmY4YjQ0MDJiMTc2OTI2ZDNhNTdkM2MzZGNiYjU5ZDU3YWNYIQJzEpxXGeWZN5qXSmJjY8MzxWyvwObQGr5G1YCCgHicY2FtdWh0dHA6Ly9sb2NhbGhvc3Q6MzMzOGF1Y3NhdA==";

        let token = Token::from_str(token_str).unwrap();

        assert_eq!(token.total_amount().unwrap(), Amount::from(4));
        assert_eq!(token.unit().unwrap(), "sat");

        match token {
            Token::TokenV4(token) => {
                let ids: Vec<Id> = token.token.iter().map(|t| t.keyset_id).collect();

                assert_eq!(ids.len(), 2);
                assert!(ids.contains(&Id::from_str("00ffd48b8f5ecf80").unwrap()));
                assert!(ids.contains(&Id::from_str("00ad268c4d1f5826").unwrap()));
            }
            _ => panic!("expected a v4 token"),
        }
    }

    #[test]
    fn test_v3_to_v4_single_mint_only(){
        let multi_mint = r#"{"token":[
            {"mint":"https://a.example.com","proofs":[{"id":"009a1f293253e41e","amount":2,"secret":"s1","C":"02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea"}]},
            {"mint":"https://b.example.com","proofs":[{"id":"009a1f293253e41e","amount":8,"secret":"s2","C":"029e8e5050b890a7d6c0968db16bc1d5d5fa040ea1de284f6ec69d61299f671059"}]}
        ]}"#;

        let token: TokenV3 = serde_json::from_str(multi_mint).unwrap();

        assert!(matches!(
            TokenV4::try_from(token.clone()),
            Err(Error::MultiMintUnsupported)
        ));
        assert!(Token::TokenV3(token).mint_url().is_err());
    }

    #[test]
    fn test_v4_dleq_round_trip() {
        let dleq = ProofDleq {
            e: SecretKey::from_hex(
                "b31e58ac6527f34975ffab13e70a48b6d2b0d35abc4b03f0151f09ee1a9763d4",
            )
            .unwrap(),
            s: SecretKey::from_hex(
                "8fbae004c59e754d71df67e392b6ae4e29293113ddc2ec86592a0431d16306d8",
            )
            .unwrap(),
            r: SecretKey::from_hex(
                "a6d13fcd7a18442e6076f5e1e7c887ad5de40a019824bdfa9fe740d302e8d861",
            )
            .unwrap(),
        };

        let mut proof = Proof::new(
            Amount::from(1),
            Id::from_str("009a1f293253e41e").unwrap(),
            Secret::new("daf4dd00a2b68a0858a80450f52c8a7d2ccf87d375e43e216e0c571f089f63e9"),
            PublicKey::from_hex(
                "024369d2d22a80ecf78f3937da9d5f30c1b9f74f0c32684d583cca0fa6a61cdcfc",
            )
            .unwrap(),
        );
        proof.dleq = Some(dleq);

        let token = Token::new(
            MintUrl::from_str("https://8333.space:3338").unwrap(),
            vec![proof.clone()],
            None,
            Some("sat".to_string()),
        )
        .unwrap();

        let decoded = Token::from_str(&token.to_string()).unwrap();

        assert_eq!(decoded.proofs()[0].dleq, proof.dleq);
    }

    #[test]
    fn test_incorrect_prefix_rejected() {
        assert!(Token::from_str(&V3_TOKEN.replacen("cashuA", "casshuA", 1)).is_err());
        assert!(Token::from_str(&V3_TOKEN.replacen("cashuA", "", 1)).is_err());
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(Token::new(
            MintUrl::from_str("https://8333.space:3338").unwrap(),
            vec![],
            None,
            None
        )
        .is_err());
    }
}
