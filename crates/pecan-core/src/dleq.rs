//! Offline signature validation
//!
//! A mint hands out `(e, s)` alongside each blinded signature, proving that
//! the same `k` links its published key `A = k*G` and the signature
//! `C_ = k*B_`. The wallet only ever checks these proofs; producing them is
//! the mint's business.

use bitcoin::hashes::{sha256, Hash};
use bitcoin::secp256k1;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dhke::blind_message;
use crate::keys::{PublicKey, SecretKey};
use crate::proof::{BlindSignature, Proof};
use crate::util::{hex, SECP256K1};

/// DLEQ error
#[derive(Debug, Error)]
pub enum Error {
    /// No DLEQ proof present
    #[error("No DLEQ proof provided")]
    MissingDleqProof,
    /// DLEQ proof does not verify
    #[error("Invalid DLEQ proof")]
    InvalidDleqProof,
    /// DHKE error
    #[error(transparent)]
    Dhke(#[from] crate::dhke::Error),
    /// Key error
    #[error(transparent)]
    Keys(#[from] crate::keys::Error),
    /// Secp256k1 error
    #[error(transparent)]
    Secp256k1(#[from] secp256k1::Error),
}

/// DLEQ carried on a blinded signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindSignatureDleq {
    /// e
    pub e: SecretKey,
    /// s
    pub s: SecretKey,
}

/// DLEQ carried on a proof
///
/// Also holds the blinding factor, without which a later holder could not
/// reconstruct the blinded pair the mint actually signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofDleq {
    /// e
    pub e: SecretKey,
    /// s
    pub s: SecretKey,
    /// Blinding factor
    pub r: SecretKey,
}

impl ProofDleq {
    /// Create new [`ProofDleq`]
    pub fn new(e: SecretKey, s: SecretKey, r: SecretKey) -> Self {
        Self { e, s, r }
    }
}

/// The Fiat-Shamir challenge: SHA-256 over the hex of the uncompressed
/// encodings of the nonce commitments, the mint key and the signature
fn challenge(r1: &PublicKey, r2: &PublicKey, a: &PublicKey, c: &PublicKey) -> [u8; 32] {
    let mut transcript = String::with_capacity(4 * 130);
    for point in [r1, r2, a, c] {
        transcript.push_str(&hex::encode(point.serialize_uncompressed()));
    }

    sha256::Hash::hash(transcript.as_bytes()).to_byte_array()
}

/// `base*s - other*e`, the verifier's reconstruction of a nonce commitment
fn commitment(
    base: Option<&PublicKey>, // None means the generator
    s: &SecretKey,
    other: &PublicKey,
    e: &SecretKey,
) -> Result<PublicKey, Error> {
    let scaled = match base {
        Some(point) => point.mul_tweak(&SECP256K1, &s.as_scalar())?,
        None => *s.public_key(),
    };
    let subtracted = other.mul_tweak(&SECP256K1, &e.as_scalar())?.negate(&SECP256K1);

    Ok(scaled.combine(&subtracted)?.into())
}

/// Check that `(e, s)` proves `C_` was made with the `k` behind `A`
///
/// Rebuilds `R1 = s*G - e*A` and `R2 = s*B_ - e*C_`; the proof stands if
/// hashing the transcript reproduces `e`.
fn verify_pair(
    blinded_message: &PublicKey,   // B_
    blinded_signature: &PublicKey, // C_
    mint_pubkey: &PublicKey,       // A
    dleq_e: &SecretKey,
    dleq_s: &SecretKey,
) -> Result<(), Error> {
    let r1 = commitment(None, dleq_s, mint_pubkey, dleq_e)?;
    let r2 = commitment(Some(blinded_message), dleq_s, blinded_signature, dleq_e)?;

    let expected = challenge(&r1, &r2, mint_pubkey, blinded_signature);

    if dleq_e.to_secret_bytes() != expected {
        tracing::warn!("DLEQ challenge mismatch");
        return Err(Error::InvalidDleqProof);
    }

    Ok(())
}

impl BlindSignature {
    /// Verify the DLEQ carried on this blinded signature
    pub fn verify_dleq(
        &self,
        mint_pubkey: PublicKey,
        blinded_message: PublicKey,
    ) -> Result<(), Error> {
        let dleq = self.dleq.as_ref().ok_or(Error::MissingDleqProof)?;

        verify_pair(&blinded_message, &self.c, &mint_pubkey, &dleq.e, &dleq.s)
    }
}

impl Proof {
    /// Verify the DLEQ carried on this proof
    ///
    /// The stored blinding factor lets the holder rebuild the pair the mint
    /// signed: `B_ = hash_to_curve(secret) + r*G` and `C_ = C + r*A`.
    pub fn verify_dleq(&self, mint_pubkey: PublicKey) -> Result<(), Error> {
        let dleq = self.dleq.as_ref().ok_or(Error::MissingDleqProof)?;

        let (blinded_message, _r) =
            blind_message(self.secret.as_bytes(), Some(dleq.r.clone()))?;

        let reblinding = mint_pubkey.mul_tweak(&SECP256K1, &dleq.r.as_scalar())?;
        let blinded_signature: PublicKey = self.c.combine(&reblinding)?.into();

        verify_pair(
            &blinded_message,
            &blinded_signature,
            &mint_pubkey,
            &dleq.e,
            &dleq.s,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    // Protocol vector: a blinded signature with its DLEQ, against the key
    // for k = 1
    const SIGNATURE_WITH_DLEQ: &str = r#"{"amount":8,"id":"00882760bfa2eb41","C_":"02a9acc1e48c25eeeb9289b5031cc57da9fe72f3fe2861d264bdc074209b107ba2","dleq":{"e":"9818e061ee51d5c8edc3342369a554998ff7b4381c8652d724cdf46429be73d9","s":"9818e061ee51d5c8edc3342369a554998ff7b4381c8652d724cdf46429be73da"}}"#;

    // Protocol vector: a proof carrying `r`, against the mint key `A` below
    const PROOF_WITH_DLEQ: &str = r#"{"amount": 1,"id": "00882760bfa2eb41","secret": "daf4dd00a2b68a0858a80450f52c8a7d2ccf87d375e43e216e0c571f089f63e9","C": "024369d2d22a80ecf78f3937da9d5f30c1b9f74f0c32684d583cca0fa6a61cdcfc","dleq": {"e": "b31e58ac6527f34975ffab13e70a48b6d2b0d35abc4b03f0151f09ee1a9763d4","s": "8fbae004c59e754d71df67e392b6ae4e29293113ddc2ec86592a0431d16306d8","r": "a6d13fcd7a18442e6076f5e1e7c887ad5de40a019824bdfa9fe740d302e8d861"}}"#;

    const MINT_KEY: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    #[test]
    fn blind_signature_dleq_verifies() {
        let signature: BlindSignature = serde_json::from_str(SIGNATURE_WITH_DLEQ).unwrap();

        let mint_key = SecretKey::from_hex(
            "0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap()
        .public_key();

        // For this vector B_ equals C_
        let blinded_message = PublicKey::from_str(
            "02a9acc1e48c25eeeb9289b5031cc57da9fe72f3fe2861d264bdc074209b107ba2",
        )
        .unwrap();

        assert!(signature.verify_dleq(mint_key, blinded_message).is_ok());

        // The same proof against another key must not stand
        let other_key = SecretKey::generate().public_key();
        assert!(signature.verify_dleq(other_key, blinded_message).is_err());
    }

    #[test]
    fn proof_dleq_verifies() {
        let proof: Proof = serde_json::from_str(PROOF_WITH_DLEQ).unwrap();

        let mint_key = PublicKey::from_str(MINT_KEY).unwrap();

        assert!(proof.verify_dleq(mint_key).is_ok());
    }

    #[test]
    fn tampering_breaks_the_proof() {
        let reference: Proof = serde_json::from_str(PROOF_WITH_DLEQ).unwrap();
        let mint_key = PublicKey::from_str(MINT_KEY).unwrap();

        // Flip e
        let mut proof = reference.clone();
        let mut dleq = proof.dleq.clone().unwrap();
        dleq.e = SecretKey::from_hex(
            "b31e58ac6527f34975ffab13e70a48b6d2b0d35abc4b03f0151f09ee1a9763d5",
        )
        .unwrap();
        proof.dleq = Some(dleq);
        assert!(proof.verify_dleq(mint_key).is_err());

        // Flip s
        let mut proof = reference.clone();
        let mut dleq = proof.dleq.clone().unwrap();
        dleq.s = SecretKey::from_hex(
            "8fbae004c59e754d71df67e392b6ae4e29293113ddc2ec86592a0431d16306d9",
        )
        .unwrap();
        proof.dleq = Some(dleq);
        assert!(proof.verify_dleq(mint_key).is_err());

        // Wrong mint key
        let other_key = SecretKey::generate().public_key();
        assert!(reference.verify_dleq(other_key).is_err());
    }

    #[test]
    fn missing_dleq_is_its_own_error() {
        let mut proof: Proof = serde_json::from_str(PROOF_WITH_DLEQ).unwrap();
        proof.dleq = None;

        assert!(matches!(
            proof.verify_dleq(PublicKey::from_str(MINT_KEY).unwrap()),
            Err(Error::MissingDleqProof)
        ));
    }
}
