//! Spending conditions: P2PK and HTLC locked ecash
//!
//! A well-known secret is a JSON array of exactly two elements, a kind tag
//! and `{nonce, data, tags}`. The wallet both constructs these (locked sends)
//! and verifies them the way the mint will (before accepting locked ecash).

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use bitcoin::hashes::sha256::Hash as Sha256Hash;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::schnorr::Signature;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::keys::{PublicKey, SecretKey};
use crate::proof::{BlindedMessage, Proof, Witness};
use crate::secret::Secret;
use crate::util::{hex, unix_time};

/// The most tags a well-known secret may carry
pub const MAX_TAGS: usize = 5;

/// Spending condition error
#[derive(Debug, Error)]
pub enum Error {
    /// Secret is not in the well-known form
    #[error("Secret is not a well-known secret")]
    NotWellKnown,
    /// Tag is malformed or unrecognized
    #[error("Invalid tag in secret")]
    InvalidTag,
    /// Unknown sig flag
    #[error("Unknown sigflag")]
    UnknownSigFlag,
    /// Locktime in the past at construction time
    #[error("Locktime in past")]
    LocktimeInPast,
    /// Witness signature is not valid
    #[error("Invalid signature")]
    InvalidSignature,
    /// Duplicate signature from the same pubkey
    #[error("Duplicate signature from the same pubkey")]
    DuplicateSignature,
    /// Witness signatures not provided
    #[error("Witness signatures not provided")]
    SignaturesNotProvided,
    /// Spend conditions not met
    #[error("Spend conditions are not met")]
    SpendConditionsNotMet,
    /// HTLC hash is not a valid SHA-256 digest
    #[error("Invalid hash")]
    InvalidHash,
    /// HTLC preimage does not hash to the lock
    #[error("Preimage does not match")]
    Preimage,
    /// Witness kind does not match the secret kind
    #[error("Witness kind does not match secret")]
    IncorrectWitnessKind,
    /// Parse int error
    #[error(transparent)]
    ParseInt(#[from] std::num::ParseIntError),
    /// Hex error
    #[error(transparent)]
    Hex(#[from] hex::Error),
    /// Serde Json error
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    /// Key error
    #[error(transparent)]
    Keys(#[from] crate::keys::Error),
    /// Secret error
    #[error(transparent)]
    Secret(#[from] crate::secret::Error),
}

/// Kind of a well-known secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// Pay to public key
    P2PK,
    /// Hashed time lock contract
    HTLC,
}

/// Data of a well-known secret
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretData {
    /// Unique random string
    pub nonce: String,
    /// Kind-specific commitment: a pubkey for P2PK, a SHA-256 digest for HTLC
    pub data: String,
    /// Additional conditions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Vec<String>>>,
}

/// A secret in the well-known spending-condition form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct WellKnownSecret {
    /// Kind of the spending condition
    pub kind: Kind,
    /// Secret data
    pub secret_data: SecretData,
}

impl WellKnownSecret {
    /// Create new [`WellKnownSecret`] with a fresh nonce
    pub fn new<S>(kind: Kind, data: S, conditions: Option<Conditions>) -> Self
    where
        S: Into<String>,
    {
        Self {
            kind,
            secret_data: SecretData {
                nonce: Secret::generate().to_string(),
                data: data.into(),
                tags: conditions.map(Into::into),
            },
        }
    }

    /// Parsed conditions from the tags
    pub fn conditions(&self) -> Result<Conditions, Error> {
        self.secret_data
            .tags
            .clone()
            .unwrap_or_default()
            .try_into()
    }
}

// On the wire the secret is a two element array: [kind, data]
impl Serialize for WellKnownSecret {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_tuple(2)?;

        s.serialize_element(&self.kind)?;
        s.serialize_element(&self.secret_data)?;
        s.end()
    }
}

impl FromStr for WellKnownSecret {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Reject anything that is not exactly a two element array before
        // letting serde map it onto the struct
        let value: serde_json::Value = serde_json::from_str(s).map_err(|_| Error::NotWellKnown)?;
        match value.as_array() {
            Some(array) if array.len() == 2 => {}
            _ => return Err(Error::NotWellKnown),
        }

        let secret: WellKnownSecret =
            serde_json::from_value(value).map_err(|_| Error::NotWellKnown)?;

        if let Some(tags) = &secret.secret_data.tags {
            if tags.len() > MAX_TAGS {
                return Err(Error::InvalidTag);
            }
        }

        Ok(secret)
    }
}

impl TryFrom<&Secret> for WellKnownSecret {
    type Error = Error;

    fn try_from(secret: &Secret) -> Result<Self, Self::Error> {
        Self::from_str(&secret.to_string())
    }
}

impl TryFrom<WellKnownSecret> for Secret {
    type Error = Error;

    fn try_from(secret: WellKnownSecret) -> Result<Self, Self::Error> {
        Ok(Secret::new(serde_json::to_string(&secret)?))
    }
}

/// Whether signatures cover only the proof's own secret or the whole swap
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigFlag {
    /// Signatures cover each input's secret
    #[default]
    SigInputs,
    /// Signatures cover the swap's entire input and output set
    SigAll,
}

impl fmt::Display for SigFlag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::SigInputs => write!(f, "SIG_INPUTS"),
            Self::SigAll => write!(f, "SIG_ALL"),
        }
    }
}

impl FromStr for SigFlag {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "SIG_INPUTS" => Ok(Self::SigInputs),
            "SIG_ALL" => Ok(Self::SigAll),
            _ => Err(Error::UnknownSigFlag),
        }
    }
}

fn key_list_tag(name: &str, keys: Vec<PublicKey>) -> Vec<String> {
    let mut tag = vec![name.to_string()];
    tag.extend(keys.into_iter().map(|key| key.to_hex()));
    tag
}

fn parse_key_list(values: &[String]) -> Result<Vec<PublicKey>, Error> {
    values
        .iter()
        .map(PublicKey::from_hex)
        .collect::<Result<_, _>>()
        .map_err(|_| Error::InvalidTag)
}

/// Additional conditions of a P2PK or HTLC secret
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Conditions {
    /// Unix locktime after which the refund path opens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locktime: Option<u64>,
    /// Additional authorized signers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubkeys: Option<Vec<PublicKey>>,
    /// Signers authorized only after the locktime
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_keys: Option<Vec<PublicKey>>,
    /// Number of signatures required, default 1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_sigs: Option<u64>,
    /// Signature flag, default SIG_INPUTS
    pub sig_flag: SigFlag,
}

impl Conditions {
    /// Create new [`Conditions`]
    ///
    /// Refuses a locktime that is already in the past.
    pub fn new(
        locktime: Option<u64>,
        pubkeys: Option<Vec<PublicKey>>,
        refund_keys: Option<Vec<PublicKey>>,
        num_sigs: Option<u64>,
        sig_flag: Option<SigFlag>,
    ) -> Result<Self, Error> {
        if let Some(locktime) = locktime {
            if locktime < unix_time() {
                return Err(Error::LocktimeInPast);
            }
        }

        Ok(Self {
            locktime,
            pubkeys,
            refund_keys,
            num_sigs,
            sig_flag: sig_flag.unwrap_or_default(),
        })
    }
}

impl From<Conditions> for Vec<Vec<String>> {
    fn from(conditions: Conditions) -> Vec<Vec<String>> {
        let Conditions {
            locktime,
            pubkeys,
            refund_keys,
            num_sigs,
            sig_flag,
        } = conditions;

        let mut tags = Vec::new();

        if let Some(pubkeys) = pubkeys {
            tags.push(key_list_tag("pubkeys", pubkeys));
        }

        if let Some(locktime) = locktime {
            tags.push(vec!["locktime".to_string(), locktime.to_string()]);
        }

        if let Some(num_sigs) = num_sigs {
            tags.push(vec!["n_sigs".to_string(), num_sigs.to_string()]);
        }

        if let Some(refund_keys) = refund_keys {
            tags.push(key_list_tag("refund", refund_keys));
        }

        tags.push(vec!["sigflag".to_string(), sig_flag.to_string()]);
        tags
    }
}

impl TryFrom<Vec<Vec<String>>> for Conditions {
    type Error = Error;

    fn try_from(tags: Vec<Vec<String>>) -> Result<Conditions, Self::Error> {
        if tags.len() > MAX_TAGS {
            return Err(Error::InvalidTag);
        }

        let mut conditions = Conditions::default();

        // A repeated tag name is not rejected; the later one wins
        for tag in &tags {
            let (name, values) = tag.split_first().ok_or(Error::InvalidTag)?;
            if values.is_empty() {
                return Err(Error::InvalidTag);
            }

            match name.as_str() {
                "sigflag" => conditions.sig_flag = values[0].parse()?,
                "n_sigs" => conditions.num_sigs = Some(values[0].parse()?),
                "locktime" => conditions.locktime = Some(values[0].parse()?),
                "pubkeys" => conditions.pubkeys = Some(parse_key_list(values)?),
                "refund" => conditions.refund_keys = Some(parse_key_list(values)?),
                _ => return Err(Error::InvalidTag),
            }
        }

        Ok(conditions)
    }
}

/// Spending conditions for constructing locked outputs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SpendingConditions {
    /// Lock to a public key
    P2PK {
        /// Receiver's public key
        data: PublicKey,
        /// Additional conditions
        conditions: Option<Conditions>,
    },
    /// Lock to a SHA-256 hash
    Htlc {
        /// Hash lock
        data: Sha256Hash,
        /// Additional conditions
        conditions: Option<Conditions>,
    },
}

impl SpendingConditions {
    /// New P2PK [`SpendingConditions`]
    pub fn new_p2pk(pubkey: PublicKey, conditions: Option<Conditions>) -> Self {
        Self::P2PK {
            data: pubkey,
            conditions,
        }
    }

    /// New HTLC [`SpendingConditions`] from the hex preimage
    pub fn new_htlc(preimage: &str, conditions: Option<Conditions>) -> Result<Self, Error> {
        let preimage_bytes = hex::decode(preimage)?;

        Ok(Self::Htlc {
            data: Sha256Hash::hash(&preimage_bytes),
            conditions,
        })
    }

    /// New HTLC [`SpendingConditions`] from the hash itself
    pub fn new_htlc_hash(hash: &str, conditions: Option<Conditions>) -> Result<Self, Error> {
        Ok(Self::Htlc {
            data: Sha256Hash::from_str(hash).map_err(|_| Error::InvalidHash)?,
            conditions,
        })
    }

    /// Kind of the conditions
    pub fn kind(&self) -> Kind {
        match self {
            Self::P2PK { .. } => Kind::P2PK,
            Self::Htlc { .. } => Kind::HTLC,
        }
    }

    /// Number of signatures required to unlock
    pub fn num_sigs(&self) -> Option<u64> {
        self.conditions().as_ref().and_then(|c| c.num_sigs)
    }

    /// All keys that may sign before the locktime
    pub fn pubkeys(&self) -> Option<Vec<PublicKey>> {
        match self {
            Self::P2PK { data, conditions } => {
                let mut pubkeys = vec![*data];
                if let Some(conditions) = conditions {
                    pubkeys.extend(conditions.pubkeys.clone().unwrap_or_default());
                }
                Some(pubkeys)
            }
            Self::Htlc { conditions, .. } => conditions.as_ref().and_then(|c| c.pubkeys.clone()),
        }
    }

    /// Locktime, if any
    pub fn locktime(&self) -> Option<u64> {
        self.conditions().as_ref().and_then(|c| c.locktime)
    }

    /// Refund keys, if any
    pub fn refund_keys(&self) -> Option<Vec<PublicKey>> {
        self.conditions()
            .as_ref()
            .and_then(|c| c.refund_keys.clone())
    }

    /// Signature flag
    pub fn sig_flag(&self) -> SigFlag {
        self.conditions()
            .as_ref()
            .map(|c| c.sig_flag)
            .unwrap_or_default()
    }

    /// Serialize into a [`Secret`] with a fresh nonce
    pub fn to_secret(&self) -> Result<Secret, Error> {
        WellKnownSecret::from(self.clone()).try_into()
    }

    fn conditions(&self) -> &Option<Conditions> {
        match self {
            Self::P2PK { conditions, .. } => conditions,
            Self::Htlc { conditions, .. } => conditions,
        }
    }
}

impl From<SpendingConditions> for WellKnownSecret {
    fn from(conditions: SpendingConditions) -> WellKnownSecret {
        match conditions {
            SpendingConditions::P2PK { data, conditions } => {
                WellKnownSecret::new(Kind::P2PK, data.to_hex(), conditions)
            }
            SpendingConditions::Htlc { data, conditions } => {
                WellKnownSecret::new(Kind::HTLC, data.to_string(), conditions)
            }
        }
    }
}

impl TryFrom<WellKnownSecret> for SpendingConditions {
    type Error = Error;

    fn try_from(secret: WellKnownSecret) -> Result<SpendingConditions, Self::Error> {
        let conditions = match &secret.secret_data.tags {
            Some(tags) => Some(tags.clone().try_into()?),
            None => None,
        };

        match secret.kind {
            Kind::P2PK => Ok(SpendingConditions::P2PK {
                data: PublicKey::from_hex(&secret.secret_data.data)?,
                conditions,
            }),
            Kind::HTLC => Ok(SpendingConditions::Htlc {
                data: Sha256Hash::from_str(&secret.secret_data.data)
                    .map_err(|_| Error::InvalidHash)?,
                conditions,
            }),
        }
    }
}

impl TryFrom<&Secret> for SpendingConditions {
    type Error = Error;

    fn try_from(secret: &Secret) -> Result<SpendingConditions, Self::Error> {
        let well_known: WellKnownSecret = secret.try_into()?;

        well_known.try_into()
    }
}

/// P2PK witness
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct P2PKWitness {
    /// Schnorr signatures, hex encoded
    pub signatures: Vec<String>,
}

impl P2PKWitness {
    /// Whether the witness carries no signatures
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

/// HTLC witness
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HTLCWitness {
    /// Preimage, hex encoded
    pub preimage: String,
    /// Schnorr signatures, hex encoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signatures: Option<Vec<String>>,
}

/// Serde helpers carrying a [`P2PKWitness`] as stringified JSON
pub mod serde_p2pk_witness {
    use serde::{de, ser, Deserialize, Deserializer, Serializer};

    use super::P2PKWitness;

    /// Serialize [`P2PKWitness`] as stringified JSON
    pub fn serialize<S>(x: &P2PKWitness, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&serde_json::to_string(&x).map_err(ser::Error::custom)?)
    }

    /// Deserialize [`P2PKWitness`] from stringified JSON
    pub fn deserialize<'de, D>(deserializer: D) -> Result<P2PKWitness, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        serde_json::from_str(&s).map_err(de::Error::custom)
    }
}

/// Serde helpers carrying an [`HTLCWitness`] as stringified JSON
pub mod serde_htlc_witness {
    use serde::{de, ser, Deserialize, Deserializer, Serializer};

    use super::HTLCWitness;

    /// Serialize [`HTLCWitness`] as stringified JSON
    pub fn serialize<S>(x: &HTLCWitness, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&serde_json::to_string(&x).map_err(ser::Error::custom)?)
    }

    /// Deserialize [`HTLCWitness`] from stringified JSON
    pub fn deserialize<'de, D>(deserializer: D) -> Result<HTLCWitness, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        serde_json::from_str(&s).map_err(de::Error::custom)
    }
}

/// Count the distinct pubkeys with a valid signature over `msg`
///
/// Two valid signatures from the same key are rejected outright.
pub fn valid_signatures(
    msg: &[u8],
    pubkeys: &[PublicKey],
    signatures: &[Signature],
) -> Result<u64, Error> {
    let mut verified_pubkeys = HashSet::new();

    for pubkey in pubkeys {
        for signature in signatures {
            if pubkey.verify(msg, signature).is_ok() && !verified_pubkeys.insert(*pubkey) {
                return Err(Error::DuplicateSignature);
            }
        }
    }

    Ok(verified_pubkeys.len() as u64)
}

fn parse_witness_signatures(witness: Option<&Witness>) -> Result<Vec<Signature>, Error> {
    witness
        .and_then(|w| w.signatures())
        .unwrap_or_default()
        .iter()
        .map(|s| Signature::from_str(s).map_err(|_| Error::InvalidSignature))
        .collect()
}

/// Outcome of the shared locktime check
enum LocktimeGate {
    /// Locktime not set or not yet reached; normal path applies
    Closed,
    /// Verification settled by the locktime branch
    Spendable,
}

/// After the locktime, a non-empty refund set must sign; an empty one makes
/// the proof anyone-can-spend.
fn check_locktime_gate(
    conditions: &Conditions,
    msg: &[u8],
    witness: Option<&Witness>,
) -> Result<LocktimeGate, Error> {
    match conditions.locktime {
        Some(locktime) if unix_time() >= locktime => {}
        _ => return Ok(LocktimeGate::Closed),
    }

    match &conditions.refund_keys {
        Some(refund_keys) if !refund_keys.is_empty() => {
            let required = conditions.num_sigs.unwrap_or(1);
            if required == 0 {
                return Ok(LocktimeGate::Spendable);
            }

            let signatures = parse_witness_signatures(witness)?;
            if signatures.is_empty() {
                return Err(Error::SignaturesNotProvided);
            }

            if valid_signatures(msg, refund_keys, &signatures)? >= required {
                Ok(LocktimeGate::Spendable)
            } else {
                Err(Error::SpendConditionsNotMet)
            }
        }
        // Locktime passed with no refund keys: anyone can spend
        _ => Ok(LocktimeGate::Spendable),
    }
}

impl Proof {
    /// Sign the proof's secret for SIG_INPUTS
    ///
    /// The signed message is SHA-256 of the UTF-8 bytes of the secret string.
    pub fn sign_p2pk(&mut self, secret_key: SecretKey) -> Result<(), Error> {
        let msg: Vec<u8> = self.secret.to_bytes();
        let signature: Signature = secret_key.sign(&msg)?;

        let signatures = vec![signature.to_string()];

        match self.witness.as_mut() {
            Some(witness) => witness.add_signatures(signatures),
            None => {
                let mut witness = Witness::P2pk(P2PKWitness::default());
                witness.add_signatures(signatures);
                self.witness = Some(witness);
            }
        };

        Ok(())
    }

    /// Attach an HTLC preimage, keeping any signatures already present
    pub fn add_preimage(&mut self, preimage: String) {
        let signatures = self
            .witness
            .as_ref()
            .and_then(|w| w.signatures());

        self.witness = Some(Witness::Htlc(HTLCWitness {
            preimage,
            signatures,
        }))
    }

    /// Verify the spending condition of this proof the way the mint will
    ///
    /// Used to validate locked ecash at receive time, before attempting the
    /// redeeming swap. An opaque secret has no conditions and verifies.
    pub fn verify_conditions(&self) -> Result<(), Error> {
        let secret: WellKnownSecret = match (&self.secret).try_into() {
            Ok(secret) => secret,
            Err(Error::NotWellKnown) => return Ok(()),
            Err(e) => return Err(e),
        };

        match secret.kind {
            Kind::P2PK => self.verify_p2pk(),
            Kind::HTLC => self.verify_htlc(),
        }
    }

    /// Verify a P2PK locked proof
    pub fn verify_p2pk(&self) -> Result<(), Error> {
        let secret: WellKnownSecret = (&self.secret).try_into()?;
        if secret.kind != Kind::P2PK {
            return Err(Error::NotWellKnown);
        }
        let conditions = secret.conditions()?;
        let msg: &[u8] = self.secret.as_bytes();

        if let LocktimeGate::Spendable =
            check_locktime_gate(&conditions, msg, self.witness.as_ref())?
        {
            return Ok(());
        }

        let mut pubkeys = conditions.pubkeys.clone().unwrap_or_default();
        pubkeys.push(PublicKey::from_hex(&secret.secret_data.data)?);

        let required = conditions.num_sigs.unwrap_or(1);
        if required == 0 {
            // Syntactically valid: nothing to sign for
            return Ok(());
        }

        let signatures = parse_witness_signatures(self.witness.as_ref())?;
        if signatures.is_empty() {
            return Err(Error::SignaturesNotProvided);
        }

        if valid_signatures(msg, &pubkeys, &signatures)? >= required {
            return Ok(());
        }

        Err(Error::SpendConditionsNotMet)
    }

    /// Verify an HTLC locked proof
    pub fn verify_htlc(&self) -> Result<(), Error> {
        let secret: WellKnownSecret = (&self.secret).try_into()?;
        if secret.kind != Kind::HTLC {
            return Err(Error::NotWellKnown);
        }
        let conditions = secret.conditions()?;
        let msg: &[u8] = self.secret.as_bytes();

        if let LocktimeGate::Spendable =
            check_locktime_gate(&conditions, msg, self.witness.as_ref())?
        {
            return Ok(());
        }

        let htlc_witness = match &self.witness {
            Some(Witness::Htlc(witness)) => witness,
            _ => return Err(Error::IncorrectWitnessKind),
        };

        // The preimage is the hex of any bytes hashing to the lock
        let hash_lock =
            Sha256Hash::from_str(&secret.secret_data.data).map_err(|_| Error::InvalidHash)?;
        let preimage_bytes = hex::decode(&htlc_witness.preimage)?;

        if Sha256Hash::hash(&preimage_bytes) != hash_lock {
            return Err(Error::Preimage);
        }

        // Signatures gate only when signing keys are declared
        if let Some(pubkeys) = &conditions.pubkeys {
            let required = conditions.num_sigs.unwrap_or(1);

            if required > 0 {
                let signatures = parse_witness_signatures(self.witness.as_ref())?;
                if signatures.is_empty() {
                    return Err(Error::SignaturesNotProvided);
                }

                if valid_signatures(msg, pubkeys, &signatures)? < required {
                    return Err(Error::SpendConditionsNotMet);
                }
            }
        }

        Ok(())
    }
}

impl BlindedMessage {
    /// Sign the blinded message for SIG_ALL
    ///
    /// The signed message is SHA-256 of the 33 raw bytes of `B_`.
    pub fn sign_p2pk(&mut self, secret_key: SecretKey) -> Result<(), Error> {
        let msg: [u8; 33] = self.blinded_secret.to_bytes();
        let signature: Signature = secret_key.sign(&msg)?;

        let signatures = vec![signature.to_string()];

        match self.witness.as_mut() {
            Some(witness) => witness.add_signatures(signatures),
            None => {
                let mut witness = Witness::P2pk(P2PKWitness::default());
                witness.add_signatures(signatures);
                self.witness = Some(witness);
            }
        };

        Ok(())
    }

    /// Verify SIG_ALL signatures on the blinded message
    pub fn verify_p2pk(&self, pubkeys: &[PublicKey], required_sigs: u64) -> Result<(), Error> {
        if required_sigs == 0 {
            return Ok(());
        }

        let signatures = parse_witness_signatures(self.witness.as_ref())?;
        if signatures.is_empty() {
            return Err(Error::SignaturesNotProvided);
        }

        if valid_signatures(&self.blinded_secret.to_bytes(), pubkeys, &signatures)? >= required_sigs
        {
            Ok(())
        } else {
            Err(Error::SpendConditionsNotMet)
        }
    }
}
