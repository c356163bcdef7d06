//! Deterministic secrets and blinding factors
//!
//! Every output a wallet creates is derived from its seed on
//! `m/129372'/0'/keyset_id_int'/counter'/{0|1}`: child 0 is the secret,
//! child 1 the blinding factor. One counter value is reserved per output, so
//! a wallet can be rebuilt from the seed alone.

use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv};
use bitcoin::Network;
use thiserror::Error;

use crate::amount::Amount;
use crate::dhke::hash_to_curve;
use crate::keys::SecretKey;
use crate::keyset::Id;
use crate::proof::{BlindedMessage, OutputSet, PendingOutput};
use crate::secret::Secret;
use crate::util::{hex, SECP256K1};

/// Derivation error
#[derive(Debug, Error)]
pub enum Error {
    /// Bip32 error
    #[error(transparent)]
    Bip32(#[from] bitcoin::bip32::Error),
    /// DHKE error
    #[error(transparent)]
    Dhke(#[from] crate::dhke::Error),
    /// Key error
    #[error(transparent)]
    Keys(#[from] crate::keys::Error),
    /// Secp256k1 error
    #[error(transparent)]
    Secp256k1(#[from] bitcoin::secp256k1::Error),
}

fn derive_child(
    seed: &[u8; 64],
    keyset_id: Id,
    counter: u32,
    index: u32,
) -> Result<[u8; 32], Error> {
    let path = DerivationPath::from(vec![
        ChildNumber::from_hardened_idx(129372)?,
        ChildNumber::from_hardened_idx(0)?,
        ChildNumber::from_hardened_idx(keyset_id.derivation_index())?,
        ChildNumber::from_hardened_idx(counter)?,
        ChildNumber::from_normal_idx(index)?,
    ]);

    let master = Xpriv::new_master(Network::Bitcoin, seed)?;
    let child = master.derive_priv(&SECP256K1, &path)?;

    Ok(child.private_key.secret_bytes())
}

impl Secret {
    /// Derive the [`Secret`] for a keyset and counter from the seed
    ///
    /// The secret string is the hex of the derived key's 32 bytes.
    pub fn from_seed(seed: &[u8; 64], keyset_id: Id, counter: u32) -> Result<Self, Error> {
        Ok(Self::new(hex::encode(derive_child(
            seed, keyset_id, counter, 0,
        )?)))
    }
}

impl SecretKey {
    /// Derive the blinding factor for a keyset and counter from the seed
    pub fn from_seed(seed: &[u8; 64], keyset_id: Id, counter: u32) -> Result<Self, Error> {
        Ok(Self::from_slice(&derive_child(seed, keyset_id, counter, 1)?)?)
    }
}

/// One derived output at a counter position
fn derived_output(
    seed: &[u8; 64],
    keyset_id: Id,
    counter: u32,
    amount: Amount,
) -> Result<PendingOutput, Error> {
    let secret = Secret::from_seed(seed, keyset_id, counter)?;
    let r = SecretKey::from_seed(seed, keyset_id, counter)?;

    let blinded = hash_to_curve(&secret.to_bytes())?.combine(&r.public_key())?;

    Ok(PendingOutput {
        blinded_message: BlindedMessage::new(amount, keyset_id, blinded.into()),
        secret,
        r,
        amount,
    })
}

impl OutputSet {
    /// Derived outputs for `amount`, one counter value per denomination
    pub fn derived(
        keyset_id: Id,
        counter: u32,
        seed: &[u8; 64],
        amount: Amount,
    ) -> Result<Self, Error> {
        let outputs = amount
            .split()
            .into_iter()
            .enumerate()
            .map(|(i, amount)| derived_output(seed, keyset_id, counter + i as u32, amount))
            .collect::<Result<_, _>>()?;

        Ok(Self { outputs, keyset_id })
    }

    /// Derived blank outputs for absorbing melt change
    pub fn derived_blank(
        keyset_id: Id,
        counter: u32,
        seed: &[u8; 64],
        fee_reserve: Amount,
    ) -> Result<Self, Error> {
        let outputs = (0..fee_reserve.blank_count() as u32)
            .map(|i| derived_output(seed, keyset_id, counter + i, Amount::ZERO))
            .collect::<Result<_, _>>()?;

        Ok(Self { outputs, keyset_id })
    }

    /// Derived outputs for the counter range `[start, start + count)`
    ///
    /// The shape a restore round submits: amounts are unknown at this point
    /// and stay zero.
    pub fn derived_range(
        keyset_id: Id,
        seed: &[u8; 64],
        start: u32,
        count: u32,
    ) -> Result<Self, Error> {
        let outputs = (start..start + count)
            .map(|counter| derived_output(seed, keyset_id, counter, Amount::ZERO))
            .collect::<Result<_, _>>()?;

        Ok(Self { outputs, keyset_id })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bip39::Mnemonic;

    use super::*;

    const MNEMONIC: &str =
        "half depart obvious quality work element tank gorilla view sugar picture humble";

    fn seed() -> [u8; 64] {
        Mnemonic::from_str(MNEMONIC).unwrap().to_seed("")
    }

    #[test]
    fn secrets_from_reference_seed() {
        let seed = seed();
        let keyset_id = Id::from_str("009a1f293253e41e").unwrap();

        // Protocol vectors for counters 0..4
        let expected = [
            "485875df74771877439ac06339e284c3acfcd9be7abf3bc20b516faeadfe77ae",
            "8f2b39e8e594a4056eb1e6dbb4b0c38ef13b1b2c751f64f810ec04ee35b77270",
            "bc628c79accd2364fd31511216a0fab62afd4a18ff77a20deded7b858c9860c8",
            "59284fd1650ea9fa17db2b3acf59ecd0f2d52ec3261dd4152785813ff27a33bf",
            "576c23393a8b31cc8da6688d9c9a96394ec74b40fdaf1f693a6bb84284334ea0",
        ];

        for (counter, want) in expected.iter().enumerate() {
            let secret = Secret::from_seed(&seed, keyset_id, counter as u32).unwrap();
            assert_eq!(secret.to_string(), *want);
        }
    }

    #[test]
    fn blinding_factors_from_reference_seed() {
        let seed = seed();
        let keyset_id = Id::from_str("009a1f293253e41e").unwrap();

        // Protocol vectors for counters 0..4
        let expected = [
            "ad00d431add9c673e843d4c2bf9a778a5f402b985b8da2d5550bf39cda41d679",
            "967d5232515e10b81ff226ecf5a9e2e2aff92d66ebc3edf0987eb56357fd6248",
            "b20f47bb6ae083659f3aa986bfa0435c55c6d93f687d51a01f26862d9b9a4899",
            "fb5fca398eb0b1deb955a2988b5ac77d32956155f1c002a373535211a2dfdc29",
            "5f09bfbfe27c439a597719321e061e2e40aad4a36768bb2bcc3de547c9644bf9",
        ];

        for (counter, want) in expected.iter().enumerate() {
            let r = SecretKey::from_seed(&seed, keyset_id, counter as u32).unwrap();
            assert_eq!(r, SecretKey::from_hex(want).unwrap());
        }
    }

    #[test]
    fn derived_outputs_walk_the_counter() {
        let seed = seed();
        let keyset_id = Id::from_str("009a1f293253e41e").unwrap();

        // 13 splits into three denominations, so counters 5, 6 and 7
        let set = OutputSet::derived(keyset_id, 5, &seed, Amount::from(13)).unwrap();

        assert_eq!(set.len(), 3);

        for (i, output) in set.iter().enumerate() {
            let expected = Secret::from_seed(&seed, keyset_id, 5 + i as u32).unwrap();
            assert_eq!(output.secret, expected);
        }
    }

    #[test]
    fn derived_range_is_deterministic() {
        let seed = seed();
        let keyset_id = Id::from_str("009a1f293253e41e").unwrap();

        let batch = OutputSet::derived_range(keyset_id, &seed, 100, 100).unwrap();

        assert_eq!(batch.len(), 100);
        assert_eq!(
            batch.outputs[0].secret,
            Secret::from_seed(&seed, keyset_id, 100).unwrap()
        );

        // Same range, same outputs
        let again = OutputSet::derived_range(keyset_id, &seed, 100, 100).unwrap();
        assert_eq!(batch, again);
    }
}
