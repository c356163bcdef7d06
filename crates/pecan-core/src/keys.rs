//! Keys on secp256k1

use core::fmt;
use core::ops::Deref;
use core::str::FromStr;
use std::collections::BTreeMap;

use bitcoin::hashes::{sha256, Hash};
use bitcoin::secp256k1;
use bitcoin::secp256k1::rand::rngs::OsRng;
use bitcoin::secp256k1::schnorr::Signature;
use bitcoin::secp256k1::{Keypair, Message, Scalar};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::amount::Amount;
use crate::util::SECP256K1;

/// Key error
#[derive(Debug, Error)]
pub enum Error {
    /// Public keys travel as 33 compressed bytes
    #[error("Public keys are 33 compressed bytes, got {0}")]
    InvalidKeyLength(usize),
    /// Invalid signature
    #[error("Invalid signature")]
    InvalidSignature,
    /// Secp256k1 error
    #[error(transparent)]
    Secp256k1(#[from] secp256k1::Error),
}

/// Signatures commit to SHA256 of the raw message, on both sides
fn signed_digest(msg: &[u8]) -> Result<Message, Error> {
    let digest = sha256::Hash::hash(msg);

    Ok(Message::from_digest_slice(digest.as_ref())?)
}

/// A point on the curve, compressed hex on the wire
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey {
    inner: secp256k1::PublicKey,
}

impl PublicKey {
    /// Parse from 33 compressed bytes
    pub fn from_slice(slice: &[u8]) -> Result<Self, Error> {
        if slice.len() != 33 {
            return Err(Error::InvalidKeyLength(slice.len()));
        }

        Ok(secp256k1::PublicKey::from_slice(slice)?.into())
    }

    /// Parse from compressed hex
    pub fn from_hex<S>(hex: S) -> Result<Self, Error>
    where
        S: AsRef<str>,
    {
        let hex = hex.as_ref();

        if hex.len() != 66 {
            return Err(Error::InvalidKeyLength(hex.len() / 2));
        }

        Ok(secp256k1::PublicKey::from_str(hex)?.into())
    }

    /// The 33 compressed bytes
    #[inline]
    pub fn to_bytes(&self) -> [u8; 33] {
        self.inner.serialize()
    }

    /// Compressed hex
    #[inline]
    pub fn to_hex(&self) -> String {
        self.inner.to_string()
    }

    /// Verify a BIP-340 signature over SHA256 of `msg`
    pub fn verify(&self, msg: &[u8], signature: &Signature) -> Result<(), Error> {
        let (xonly, _parity) = self.inner.x_only_public_key();

        SECP256K1
            .verify_schnorr(signature, &signed_digest(msg)?, &xonly)
            .map_err(|_| Error::InvalidSignature)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Deref for PublicKey {
    type Target = secp256k1::PublicKey;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<secp256k1::PublicKey> for PublicKey {
    fn from(inner: secp256k1::PublicKey) -> Self {
        Self { inner }
    }
}

impl FromStr for PublicKey {
    type Err = Error;

    fn from_str(hex: &str) -> Result<Self, Self::Err> {
        Self::from_hex(hex)
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(hex).map_err(serde::de::Error::custom)
    }
}

/// A scalar; serves as signing key and as blinding factor
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey {
    inner: secp256k1::SecretKey,
}

impl SecretKey {
    /// Parse from 32 bytes
    pub fn from_slice(slice: &[u8]) -> Result<Self, Error> {
        Ok(secp256k1::SecretKey::from_slice(slice)?.into())
    }

    /// Parse from hex
    pub fn from_hex<S>(hex: S) -> Result<Self, Error>
    where
        S: AsRef<str>,
    {
        Ok(secp256k1::SecretKey::from_str(hex.as_ref())?.into())
    }

    /// Draw a fresh random key
    pub fn generate() -> Self {
        let (secret_key, _) = SECP256K1.generate_keypair(&mut OsRng);

        secret_key.into()
    }

    /// The scalar as hex
    pub fn to_secret_hex(&self) -> String {
        self.inner.display_secret().to_string()
    }

    /// The 32 scalar bytes
    pub fn to_secret_bytes(&self) -> [u8; 32] {
        self.inner.secret_bytes()
    }

    /// The point this scalar generates
    pub fn public_key(&self) -> PublicKey {
        self.inner.public_key(&SECP256K1).into()
    }

    /// BIP-340 signature over SHA256 of `msg`
    pub fn sign(&self, msg: &[u8]) -> Result<Signature, Error> {
        let keypair = Keypair::from_secret_key(&SECP256K1, &self.inner);

        Ok(SECP256K1.sign_schnorr(&signed_digest(msg)?, &keypair))
    }

    /// The key as a tweak scalar
    #[inline]
    pub fn as_scalar(&self) -> Scalar {
        Scalar::from(self.inner)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<secret>)")
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_secret_hex())
    }
}

impl Deref for SecretKey {
    type Target = secp256k1::SecretKey;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<secp256k1::SecretKey> for SecretKey {
    fn from(inner: secp256k1::SecretKey) -> Self {
        Self { inner }
    }
}

impl FromStr for SecretKey {
    type Err = Error;

    fn from_str(hex: &str) -> Result<Self, Self::Err> {
        Self::from_hex(hex)
    }
}

impl Serialize for SecretKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SecretKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(hex).map_err(serde::de::Error::custom)
    }
}

/// A mint's public key per amount
///
/// The map the whole scheme revolves around: every power-of-two denomination
/// has its own key, and a keyset's identity is derived from this map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keys(BTreeMap<Amount, PublicKey>);

impl Keys {
    /// Create new [`Keys`]
    pub fn new(keys: BTreeMap<Amount, PublicKey>) -> Self {
        Self(keys)
    }

    /// The key signing for `amount`
    pub fn amount_key(&self, amount: Amount) -> Option<PublicKey> {
        self.0.get(&amount).copied()
    }

    /// Iterate entries, amounts ascending
    pub fn iter(&self) -> impl Iterator<Item = (&Amount, &PublicKey)> {
        self.0.iter()
    }

    /// Number of denominations
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressed_keys_only() {
        assert!(PublicKey::from_hex(
            "02194603ffa36356f4a56b7df9371fc3192472351453ec7398b8da8117e7c3e104"
        )
        .is_ok());

        // Uncompressed encodings are not part of the protocol
        let uncompressed = "04fd4ce5a16b65576145949e6f99f445f8249fee17c606b688b504a849cdc452de3625246cb2c27dac965cb7200a5986467eee92eb7d496bbf1453b074e223e481";
        assert!(matches!(
            PublicKey::from_hex(uncompressed),
            Err(Error::InvalidKeyLength(65))
        ));
    }

    #[test]
    fn schnorr_round_trip() {
        let secret = SecretKey::generate();
        let signature = secret.sign(b"a message").unwrap();

        assert!(secret.public_key().verify(b"a message", &signature).is_ok());
        assert!(secret
            .public_key()
            .verify(b"another message", &signature)
            .is_err());
    }

    #[test]
    fn keys_wire_form_and_order() {
        let keys: Keys = serde_json::from_str(
            r#"{
                "8":"02fdfd6796bfeac490cbee12f778f867f0a2c68f6508d17c649759ea0dc3547528",
                "1":"03a40f20667ed53513075dc51e715ff2046cad64eb68960632269ba7f0210e38bc",
                "4":"02648eccfa4c026960966276fa5a4cae46ce0fd432211a4f449bf84f13aa5f8303",
                "2":"03fd4ce5a16b65576145949e6f99f445f8249fee17c606b688b504a849cdc452de"
            }"#,
        )
        .unwrap();

        assert_eq!(keys.len(), 4);
        assert!(keys.amount_key(Amount::from(4)).is_some());
        assert!(keys.amount_key(Amount::from(3)).is_none());

        // Iteration is ascending no matter the wire order
        let amounts: Vec<u64> = keys.iter().map(|(a, _)| u64::from(*a)).collect();
        assert_eq!(amounts, vec![1, 2, 4, 8]);
    }
}
