//! The blind key exchange
//!
//! The wallet maps a secret onto the curve, hides it behind a blinding
//! factor before the mint sees it, and strips the blinding off the mint's
//! signature afterwards. The mint side of the exchange lives in whoever
//! operates a mint; this crate only ever blinds and unblinds.

use bitcoin::hashes::{sha256, Hash};
use bitcoin::secp256k1;
use bitcoin::secp256k1::{Parity, XOnlyPublicKey};
use thiserror::Error;

use crate::amount::Amount;
use crate::keys::{PublicKey, SecretKey};
use crate::util::SECP256K1;

/// Prefix domain-separating the protocol's curve mapping from plain SHA-256
const HASH_TO_CURVE_TAG: &[u8] = b"Secp256k1_HashToCurve_Cashu_";

/// How many candidate x coordinates to try before giving up
///
/// Each candidate fails with probability ~1/2, so running out is not a thing
/// that happens outside of broken hash inputs.
const MAX_HASH_ITERATIONS: u32 = 1 << 16;

/// DHKE error
#[derive(Debug, Error)]
pub enum Error {
    /// Ran out of hash-to-curve candidates
    #[error("No curve point found for message")]
    NoValidPoint,
    /// Mint publishes no key for the amount
    #[error("No key for amount `{0}`")]
    AmountKey(Amount),
    /// Key error
    #[error(transparent)]
    Keys(#[from] crate::keys::Error),
    /// Secp256k1 error
    #[error(transparent)]
    Secp256k1(#[from] secp256k1::Error),
}

/// Map a message to a curve point nobody knows the discrete log of
///
/// Hashes the tagged message once, then walks a little-endian counter
/// through a second hash until the digest is a valid x coordinate, taken
/// with even parity.
pub fn hash_to_curve(message: &[u8]) -> Result<PublicKey, Error> {
    let tagged = sha256::Hash::hash(&[HASH_TO_CURVE_TAG, message].concat());

    let mut candidate = [0u8; 36];
    candidate[..32].copy_from_slice(tagged.as_ref());

    for counter in 0..MAX_HASH_ITERATIONS {
        candidate[32..].copy_from_slice(&counter.to_le_bytes());

        let digest = sha256::Hash::hash(&candidate);
        if let Ok(x) = XOnlyPublicKey::from_slice(digest.as_ref()) {
            return Ok(secp256k1::PublicKey::from_x_only_public_key(x, Parity::Even).into());
        }
    }

    Err(Error::NoValidPoint)
}

/// Blind a secret for submission
///
/// `B_ = hash_to_curve(secret) + r*G`. Draws a fresh `r` unless the caller
/// supplies one (deterministic derivation does).
pub fn blind_message(
    secret: &[u8],
    blinding_factor: Option<SecretKey>,
) -> Result<(PublicKey, SecretKey), Error> {
    let y = hash_to_curve(secret)?;
    let r = blinding_factor.unwrap_or_else(SecretKey::generate);

    let blinded = y.combine(&r.public_key())?;

    Ok((blinded.into(), r))
}

/// Strip the blinding off a signature
///
/// `C = C_ - r*A`, where `A` is the mint's key for the amount. What is left
/// is the mint's signature on the bare secret point.
pub fn unblind_message(
    blinded_signature: &PublicKey, // C_
    r: &SecretKey,
    mint_pubkey: &PublicKey, // A
) -> Result<PublicKey, Error> {
    let blinding_term = mint_pubkey
        .mul_tweak(&SECP256K1, &r.as_scalar())?
        .negate(&SECP256K1);

    Ok(blinded_signature.combine(&blinding_term)?.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::hex;

    /// What a mint does with `B_`: multiply by its key for the amount. Only
    /// tests ever need this side of the exchange here.
    fn mint_sign(k: &SecretKey, blinded: &PublicKey) -> PublicKey {
        blinded.mul_tweak(&SECP256K1, &k.as_scalar()).unwrap().into()
    }

    #[test]
    fn hash_to_curve_reference_points() {
        // Protocol vectors: message, expected point. The third message needs
        // several counter steps before a valid x coordinate falls out.
        let cases = [
            (
                "0000000000000000000000000000000000000000000000000000000000000000",
                "024cce997d3b518f739663b757deaec95bcd9473c30a14ac2fd04023a739d1a725",
            ),
            (
                "0000000000000000000000000000000000000000000000000000000000000001",
                "022e7158e11c9506f1aa4248bf531298daa7febd6194f003edcd9b93ade6253acf",
            ),
            (
                "0000000000000000000000000000000000000000000000000000000000000002",
                "026cdbe15362df59cd1dd3c9c11de8aedac2106eca69236ecd9fbe117af897be4f",
            ),
        ];

        for (message, expected) in cases {
            let point = hash_to_curve(&hex::decode(message).unwrap()).unwrap();
            assert_eq!(point, PublicKey::from_hex(expected).unwrap());
        }
    }

    #[test]
    fn blind_reference_points() {
        // Protocol vectors: message, blinding factor, expected B_
        let cases = [
            (
                "d341ee4871f1f889041e63cf0d3823c713eea6aff01e80f1719f08f9e5be98f6",
                "99fce58439fc37412ab3468b73db0569322588f62fb3a49182d67e23d877824a",
                "033b1a9737a40cc3fd9b6af4b723632b76a67a36782596304612a6c2bfb5197e6d",
            ),
            (
                "f1aaf16c2239746f369572c0784d9dd3d032d952c2d992175873fb58fae31a60",
                "f78476ea7cc9ade20f9e05e58a804cf19533f03ea805ece5fee88c8e2874ba50",
                "029bdf2d716ee366eddf599ba252786c1033f47e230248a4612a5670ab931f1763",
            ),
        ];

        for (message, factor, expected) in cases {
            let factor = SecretKey::from_hex(factor).unwrap();

            let (blinded, r) =
                blind_message(&hex::decode(message).unwrap(), Some(factor.clone())).unwrap();

            assert_eq!(r, factor);
            assert_eq!(blinded, PublicKey::from_hex(expected).unwrap());
        }
    }

    #[test]
    fn unblinding_recovers_signature_on_secret_point() {
        let mint_key = SecretKey::generate();

        let secret = crate::secret::Secret::generate();
        let (blinded, r) = blind_message(&secret.to_bytes(), None).unwrap();

        let blinded_signature = mint_sign(&mint_key, &blinded);

        let unblinded =
            unblind_message(&blinded_signature, &r, &mint_key.public_key()).unwrap();

        // What fell out must equal k * hash_to_curve(secret)
        let expected = mint_sign(&mint_key, &hash_to_curve(&secret.to_bytes()).unwrap());
        assert_eq!(unblinded, expected);
    }

    #[test]
    fn unblinding_with_wrong_mint_key_diverges() {
        let mint_key = SecretKey::generate();
        let other_key = SecretKey::generate();

        let secret = crate::secret::Secret::generate();
        let (blinded, r) = blind_message(&secret.to_bytes(), None).unwrap();

        let blinded_signature = mint_sign(&mint_key, &blinded);

        let unblinded =
            unblind_message(&blinded_signature, &r, &other_key.public_key()).unwrap();

        let valid = mint_sign(&mint_key, &hash_to_curve(&secret.to_bytes()).unwrap());
        assert_ne!(unblinded, valid);
    }
}
