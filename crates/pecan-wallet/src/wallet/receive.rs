//! Receiving tokens

use std::collections::HashMap;
use std::str::FromStr;

use bitcoin::hashes::sha256::Hash as Sha256Hash;
use bitcoin::hashes::Hash;
use pecan_core::conditions::{Kind, SigFlag, WellKnownSecret};
use pecan_core::dleq;
use pecan_core::messages::SwapRequest;
use pecan_core::proof;
use pecan_core::util::hex;
use pecan_core::{Amount, OutputSet, Proofs, PublicKey, SecretKey, Token};
use tracing::instrument;

use super::Wallet;
use crate::error::Error;
use crate::types::ReceiveOptions;

impl Wallet {
    /// Redeem a received token
    ///
    /// Tokens drawn on this wallet's mint are swapped in place into
    /// wallet-owned outputs, unlocking P2PK/HTLC proofs with the keys and
    /// preimages in `options`. Tokens from any other mint are moved over
    /// lightning instead. Returns the amount credited.
    #[instrument(skip_all)]
    pub async fn receive(&self, token: &str, options: ReceiveOptions) -> Result<Amount, Error> {
        let token = Token::from_str(token)?;

        if let Some(unit) = token.unit() {
            if *unit != self.unit {
                return Err(Error::IncorrectUnit);
            }
        }

        if token.mint_url()? != self.mint_url {
            return self.receive_untrusted(&token, options).await;
        }

        let _guard = self.lock().lock().await;

        self.receive_proofs(token.proofs(), options).await
    }

    /// Swap `proofs` drawn on this wallet's mint into wallet-owned outputs
    pub(crate) async fn receive_proofs(
        &self,
        mut proofs: Proofs,
        options: ReceiveOptions,
    ) -> Result<Amount, Error> {
        if proofs.is_empty() {
            return Err(pecan_core::token::Error::ProofsRequired.into());
        }

        let keyset = self.active_keyset().await?;
        let keys = self.keys_for(keyset.id).await?;

        let matching_keys = prepare_proofs(&mut proofs, &options)?;
        let sig_all = has_sig_all(&proofs)?;

        for proof in &proofs {
            // DLEQ is verified whenever the proof carries one
            let proof_keys = self.keys_for(proof.keyset_id).await?;
            let key = proof_keys
                .amount_key(proof.amount)
                .ok_or(Error::AmountKey)?;
            match proof.verify_dleq(key) {
                Ok(()) | Err(dleq::Error::MissingDleqProof) => (),
                Err(_) => return Err(Error::CouldNotVerifyDleq),
            }

            // Mirror the mint's view before attempting redemption
            proof.verify_conditions()?;
        }

        let input_total = proof::total_amount(&proofs)?;
        let fee = self.input_fee(&proofs).await?;
        let output_amount = input_total
            .checked_sub(fee)
            .ok_or(Error::InsufficientBalance)?;

        let counter = self.store().get_keyset_counter(&keyset.id).await?;
        let outputs = OutputSet::derived(keyset.id, counter, self.seed(), output_amount)?;

        let mut request = SwapRequest::new(proofs, outputs.blinded_messages());

        // Under SIG_ALL the outputs are part of the signed transaction too
        if sig_all {
            for output in &mut request.outputs {
                for key in &matching_keys {
                    output.sign_p2pk(key.clone())?;
                }
            }
        }

        let response = self.client().post_swap(&self.mint_url, request).await?;

        self.commit_counter(keyset.id, outputs.len() as u32).await?;

        let new_proofs = self
            .unblind_signatures(&outputs, response.signatures, &keys)
            .await?;

        let received = proof::total_amount(&new_proofs)?;

        self.store()
            .add_proofs(self.mint_url.clone(), new_proofs)
            .await?;

        Ok(received)
    }
}

/// Attach witnesses to locked proofs; returns the signing keys that matched
/// a lock, for SIG_ALL output signing
pub(crate) fn prepare_proofs(
    proofs: &mut Proofs,
    options: &ReceiveOptions,
) -> Result<Vec<SecretKey>, Error> {
    // Preimages are matched to HTLC locks by their hash
    let preimage_by_hash: HashMap<String, &String> = options
        .preimages
        .iter()
        .filter_map(|preimage| {
            let bytes = hex::decode(preimage).ok()?;
            Some((Sha256Hash::hash(&bytes).to_string(), preimage))
        })
        .collect();

    let key_by_pubkey: HashMap<PublicKey, &SecretKey> = options
        .signing_keys
        .iter()
        .map(|key| (key.public_key(), key))
        .collect();

    let mut matching_keys: Vec<SecretKey> = Vec::new();

    for proof in proofs.iter_mut() {
        let secret: WellKnownSecret = match (&proof.secret).try_into() {
            Ok(secret) => secret,
            Err(_) => continue,
        };

        let conditions = secret.conditions()?;

        let locktime_passed = conditions
            .locktime
            .map(|locktime| pecan_core::util::unix_time() >= locktime)
            .unwrap_or(false);
        let refund_keys = conditions.refund_keys.clone().unwrap_or_default();

        // After the locktime with no refund keys the proof needs no witness
        if locktime_passed && refund_keys.is_empty() {
            continue;
        }

        let mut lock_keys: Vec<PublicKey>;
        let mut signatures_needed;

        if locktime_passed {
            // Only the refund set can sign now
            lock_keys = refund_keys;
            signatures_needed = true;
        } else {
            lock_keys = conditions.pubkeys.clone().unwrap_or_default();
            signatures_needed = conditions.pubkeys.is_some();

            match secret.kind {
                Kind::P2PK => {
                    lock_keys.push(PublicKey::from_hex(&secret.secret_data.data)?);
                    signatures_needed = true;
                }
                Kind::HTLC => {
                    let preimage = preimage_by_hash
                        .get(&secret.secret_data.data)
                        .ok_or(Error::PreimageNotProvided)?;
                    proof.add_preimage(preimage.to_string());
                }
            }
        }

        let mut signed = false;
        for lock_key in lock_keys {
            if let Some(signing_key) = key_by_pubkey.get(&lock_key) {
                proof.sign_p2pk((*signing_key).clone())?;
                if !matching_keys.contains(signing_key) {
                    matching_keys.push((*signing_key).clone());
                }
                signed = true;
            }
        }

        if signatures_needed && conditions.num_sigs.unwrap_or(1) > 0 && !signed {
            return Err(Error::NoMatchingKey);
        }
    }

    Ok(matching_keys)
}

/// Whether any input demands SIG_ALL, checking the flag's preconditions
///
/// SIG_ALL requires every input to carry the same lock, the same `n_sigs`
/// and the same flag.
pub(crate) fn has_sig_all(proofs: &Proofs) -> Result<bool, Error> {
    let mut sig_all_template: Option<(String, Option<u64>)> = None;
    let mut other_seen = false;

    for proof in proofs {
        let secret: WellKnownSecret = match (&proof.secret).try_into() {
            Ok(secret) => secret,
            Err(_) => {
                other_seen = true;
                continue;
            }
        };

        let conditions = secret.conditions()?;

        if conditions.sig_flag != SigFlag::SigAll {
            other_seen = true;
            continue;
        }

        let template = (secret.secret_data.data.clone(), conditions.num_sigs);

        match &sig_all_template {
            Some(existing) if *existing != template => {
                return Err(pecan_core::conditions::Error::SpendConditionsNotMet.into())
            }
            Some(_) => (),
            None => sig_all_template = Some(template),
        }
    }

    if sig_all_template.is_some() {
        if other_seen {
            return Err(pecan_core::conditions::Error::SpendConditionsNotMet.into());
        }
        return Ok(true);
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use pecan_core::conditions::Conditions;
    use pecan_core::{Id, Proof, SpendingConditions};

    use super::*;

    fn locked_proof(conditions: &SpendingConditions) -> Proof {
        Proof::new(
            Amount::from(1),
            Id::from_str("009a1f293253e41e").unwrap(),
            conditions.to_secret().unwrap(),
            PublicKey::from_hex(
                "02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea",
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_prepare_signs_p2pk() {
        let key = SecretKey::generate();
        let conditions = SpendingConditions::new_p2pk(key.public_key(), None);

        let mut proofs = vec![locked_proof(&conditions)];

        let matched = prepare_proofs(
            &mut proofs,
            &ReceiveOptions {
                signing_keys: vec![key],
                preimages: vec![],
            },
        )
        .unwrap();

        assert_eq!(matched.len(), 1);
        assert!(proofs[0].witness.is_some());
        assert!(proofs[0].verify_p2pk().is_ok());
    }

    #[test]
    fn test_prepare_requires_key() {
        let key = SecretKey::generate();
        let conditions = SpendingConditions::new_p2pk(key.public_key(), None);

        let mut proofs = vec![locked_proof(&conditions)];

        assert!(matches!(
            prepare_proofs(&mut proofs, &ReceiveOptions::default()),
            Err(Error::NoMatchingKey)
        ));
    }

    #[test]
    fn test_prepare_requires_preimage() {
        let conditions = SpendingConditions::new_htlc("aaaaaa", None).unwrap();

        let mut proofs = vec![locked_proof(&conditions)];

        assert!(matches!(
            prepare_proofs(&mut proofs, &ReceiveOptions::default()),
            Err(Error::PreimageNotProvided)
        ));

        let matched = prepare_proofs(
            &mut proofs,
            &ReceiveOptions {
                signing_keys: vec![],
                preimages: vec!["aaaaaa".to_string()],
            },
        )
        .unwrap();

        assert!(matched.is_empty());
        assert!(proofs[0].verify_htlc().is_ok());
    }

    #[test]
    fn test_sig_all_must_match_across_inputs() {
        let key = SecretKey::generate();

        let sig_all = SpendingConditions::new_p2pk(
            key.public_key(),
            Some(Conditions {
                sig_flag: SigFlag::SigAll,
                ..Default::default()
            }),
        );

        // A single SIG_ALL input is fine
        let proofs = vec![locked_proof(&sig_all)];
        assert!(has_sig_all(&proofs).unwrap());

        // Two inputs under the same lock are fine
        let proofs = vec![locked_proof(&sig_all), locked_proof(&sig_all)];
        assert!(has_sig_all(&proofs).unwrap());

        // Mixing SIG_ALL with a different lock is rejected
        let other = SpendingConditions::new_p2pk(
            SecretKey::generate().public_key(),
            Some(Conditions {
                sig_flag: SigFlag::SigAll,
                ..Default::default()
            }),
        );
        let proofs = vec![locked_proof(&sig_all), locked_proof(&other)];
        assert!(has_sig_all(&proofs).is_err());

        // Mixing SIG_ALL with SIG_INPUTS is rejected
        let plain = SpendingConditions::new_p2pk(key.public_key(), None);
        let proofs = vec![locked_proof(&sig_all), locked_proof(&plain)];
        assert!(has_sig_all(&proofs).is_err());

        // No SIG_ALL at all
        let proofs = vec![locked_proof(&plain)];
        assert!(!has_sig_all(&proofs).unwrap());
    }
}
