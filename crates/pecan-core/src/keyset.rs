//! Keysets and their identity

use core::fmt;
use core::str::FromStr;
use std::collections::HashMap;

use bitcoin::hashes::{sha256, Hash};
use serde::{Deserialize, Deserializer, Serialize};
use serde_with::{serde_as, VecSkipError};
use thiserror::Error;

use crate::amount::Amount;
use crate::keys::Keys;
use crate::util::hex;
use crate::CurrencyUnit;

/// Keyset error
#[derive(Debug, Error)]
pub enum Error {
    /// Hex error
    #[error(transparent)]
    Hex(#[from] hex::Error),
    /// Keyset id length invalid
    #[error("Keyset id invalid length")]
    Length,
    /// Unknown keyset id version
    #[error("Unknown keyset id version")]
    UnknownVersion,
    /// Keyset id does not match the key map it came with
    #[error("Keyset id does not match derived id")]
    IdMismatch,
    /// Keyset fee for id missing
    #[error("Keyset fee unknown for `{0}`")]
    FeeUnknown(Id),
}

/// A keyset id, eight bytes: the version byte `00` followed by the first
/// seven bytes of SHA-256 over the keyset's compressed keys, amounts
/// ascending.
///
/// Anyone with the key map can recompute it, so a token naming an id pins
/// the exact keys it was signed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id([u8; 8]);

impl Id {
    const VERSION: u8 = 0x00;

    /// The eight raw bytes
    pub fn to_bytes(&self) -> [u8; 8] {
        self.0
    }

    /// [`Id`] from its eight raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; 8] = bytes.try_into().map_err(|_| Error::Length)?;

        if bytes[0] != Self::VERSION {
            return Err(Error::UnknownVersion);
        }

        Ok(Self(bytes))
    }

    /// Where outputs under this keyset live in the derivation tree
    ///
    /// The id bytes read as a big-endian integer, reduced into hardened
    /// index range.
    pub fn derivation_index(&self) -> u32 {
        (u64::from_be_bytes(self.0) % (2_u64.pow(31) - 1)) as u32
    }
}

impl From<&Keys> for Id {
    fn from(keys: &Keys) -> Self {
        let mut engine = sha256::Hash::engine();
        for (_amount, key) in keys.iter() {
            bitcoin::hashes::HashEngine::input(&mut engine, &key.to_bytes());
        }
        let digest = sha256::Hash::from_engine(engine);

        let mut id = [0u8; 8];
        id[0] = Self::VERSION;
        id[1..].copy_from_slice(&digest.as_byte_array()[..7]);

        Self(id)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Id {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 16 {
            return Err(Error::Length);
        }

        Self::from_bytes(&hex::decode(s)?)
    }
}

impl Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let id = String::deserialize(deserializer)?;
        Id::from_str(&id).map_err(serde::de::Error::custom)
    }
}

/// A keyset: the full key map with its id and unit
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct KeySet {
    /// Keyset [`Id`]
    pub id: Id,
    /// Keyset unit
    pub unit: CurrencyUnit,
    /// Keyset [`Keys`]
    pub keys: Keys,
}

impl KeySet {
    /// Recompute the id from the key map and hold it against the claimed one
    pub fn verify_id(&self) -> Result<(), Error> {
        if Id::from(&self.keys) != self.id {
            return Err(Error::IdMismatch);
        }

        Ok(())
    }
}

/// One entry of the keyset listing
#[derive(Debug, Clone, Hash, PartialEq, Eq, Deserialize, Serialize)]
pub struct KeySetInfo {
    /// Keyset [`Id`]
    pub id: Id,
    /// Keyset unit
    pub unit: CurrencyUnit,
    /// Whether the mint still signs under this keyset
    pub active: bool,
    /// Fee per input, in parts per thousand
    #[serde(default)]
    pub input_fee_ppk: u64,
}

/// The keyset listing
///
/// Entries whose ids this implementation cannot parse (legacy base64
/// keysets) are dropped rather than failing the listing.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysetResponse {
    /// The mint's keysets
    #[serde_as(as = "VecSkipError<_>")]
    pub keysets: Vec<KeySetInfo>,
}

/// The key listing, same skip rule as [`KeysetResponse`]
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysResponse {
    /// Key maps
    #[serde_as(as = "VecSkipError<_>")]
    pub keysets: Vec<KeySet>,
}

/// Fee for spending a set of inputs
///
/// Every input costs its keyset's `input_fee_ppk`; the sum is rounded up to
/// whole units.
pub fn calculate_fee(
    proofs_count: &HashMap<Id, u64>,
    keyset_fee_ppk: &HashMap<Id, u64>,
) -> Result<Amount, Error> {
    let fee_ppk = proofs_count
        .iter()
        .map(|(id, count)| {
            keyset_fee_ppk
                .get(id)
                .map(|ppk| ppk * count)
                .ok_or(Error::FeeUnknown(*id))
        })
        .sum::<Result<u64, Error>>()?;

    Ok(Amount::from(fee_ppk.div_ceil(1000)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT_KEYSET_ID: &str = "00456a94ab4e1c46";
    const SHORT_KEYSET: &str = r#"
        {
            "1":"03a40f20667ed53513075dc51e715ff2046cad64eb68960632269ba7f0210e38bc",
            "2":"03fd4ce5a16b65576145949e6f99f445f8249fee17c606b688b504a849cdc452de",
            "4":"02648eccfa4c026960966276fa5a4cae46ce0fd432211a4f449bf84f13aa5f8303",
            "8":"02fdfd6796bfeac490cbee12f778f867f0a2c68f6508d17c649759ea0dc3547528"
        }
    "#;

    #[test]
    fn id_from_keys() {
        let keys: Keys = serde_json::from_str(SHORT_KEYSET).unwrap();

        assert_eq!(Id::from(&keys), Id::from_str(SHORT_KEYSET_ID).unwrap());
    }

    #[test]
    fn id_reacts_to_any_key() {
        let keys: Keys = serde_json::from_str(SHORT_KEYSET).unwrap();

        // Same keyset with the `8` key replaced
        let altered: Keys = serde_json::from_str(
            r#"
        {
            "1":"03a40f20667ed53513075dc51e715ff2046cad64eb68960632269ba7f0210e38bc",
            "2":"03fd4ce5a16b65576145949e6f99f445f8249fee17c606b688b504a849cdc452de",
            "4":"02648eccfa4c026960966276fa5a4cae46ce0fd432211a4f449bf84f13aa5f8303",
            "8":"03ba786a2c0745f8c30e490288acd7a72dd53d65afd292ddefa326a4a3fa14c566"
        }
    "#,
        )
        .unwrap();

        assert_ne!(Id::from(&keys), Id::from(&altered));
    }

    #[test]
    fn derivation_index() {
        let cases = [
            ("009a1f293253e41e", 864559728),
            ("0000000000000000", 0),
            ("00ffffffffffffff", 33554431),
        ];

        for (id, expected) in cases {
            assert_eq!(Id::from_str(id).unwrap().derivation_index(), expected);
        }
    }

    #[test]
    fn id_byte_round_trip() {
        let id = Id::from_str("009a1f293253e41e").unwrap();

        assert_eq!(Id::from_bytes(&id.to_bytes()).unwrap(), id);

        // Wrong length and wrong version are both refused
        assert!(matches!(Id::from_bytes(&[0u8; 7]), Err(Error::Length)));
        assert!(matches!(
            Id::from_bytes(&[1, 0, 0, 0, 0, 0, 0, 0]),
            Err(Error::UnknownVersion)
        ));
    }

    #[test]
    fn legacy_ids_are_skipped() {
        // The second entry carries a legacy base64 id; the listing must
        // survive it
        let json = r#"{"keysets":[
            {"id":"009a1f293253e41e","unit":"sat","active":true,"input_fee_ppk":100},
            {"id":"eGnEWtdJ0PIM","unit":"sat","active":true},
            {"id":"00ad268c4d1f5826","unit":"sat","active":false}
        ]}"#;

        let response: KeysetResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.keysets.len(), 2);
        assert_eq!(response.keysets[0].input_fee_ppk, 100);
        assert_eq!(response.keysets[1].input_fee_ppk, 0);
    }

    #[test]
    fn fee_rounds_up_per_thousand() {
        let keyset_id = Id::from_str("001711afb1de20cb").unwrap();

        let fees = HashMap::from([(keyset_id, 2u64)]);

        for (count, expected) in [(1, 1), (500, 1), (1000, 2), (2000, 4), (3500, 7), (3501, 8)] {
            let counts = HashMap::from([(keyset_id, count)]);

            assert_eq!(
                calculate_fee(&counts, &fees).unwrap(),
                Amount::from(expected)
            );
        }

        // Zero-fee keysets cost nothing at any count
        let free = HashMap::from([(keyset_id, 0u64)]);
        let counts = HashMap::from([(keyset_id, 100u64)]);
        assert_eq!(calculate_fee(&counts, &free).unwrap(), Amount::ZERO);
    }

    #[test]
    fn fee_requires_known_keysets() {
        let known = Id::from_str("001711afb1de20cb").unwrap();
        let unknown = Id::from_str("009a1f293253e41e").unwrap();

        let fees = HashMap::from([(known, 1u64)]);
        let counts = HashMap::from([(unknown, 1u64)]);

        assert!(matches!(
            calculate_fee(&counts, &fees),
            Err(Error::FeeUnknown(_))
        ));
    }
}
