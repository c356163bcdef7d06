//! Restoring a wallet from its seed

use pecan_core::messages::{ProofStateKind, RestoreRequest};
use pecan_core::proof;
use pecan_core::{Amount, OutputSet, Proofs};
use tracing::instrument;

use super::Wallet;
use crate::error::Error;

/// Outputs derived per restore round
const RESTORE_BATCH: u32 = 100;

/// Consecutive empty rounds before a keyset is considered exhausted
const RESTORE_EMPTY_BATCHES: u32 = 3;

impl Wallet {
    /// Rebuild proofs from the seed by replaying derivation against the mint
    ///
    /// For every keyset, batches of derived outputs are submitted to the
    /// restore endpoint; returned signatures are unblinded and the resulting
    /// proofs kept if the mint reports them unspent. Returns the restored
    /// amount.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<Amount, Error> {
        let _guard = self.lock().lock().await;

        let keysets = self.refresh_keysets().await?;

        let mut restored = Amount::ZERO;

        for keyset in keysets {
            if keyset.unit != self.unit {
                continue;
            }

            let keys = self.keys_for(keyset.id).await?;

            let mut empty_batches = 0;
            let mut start_counter = 0;

            while empty_batches < RESTORE_EMPTY_BATCHES {
                let batch = OutputSet::derived_range(
                    keyset.id,
                    self.seed(),
                    start_counter,
                    RESTORE_BATCH,
                )?;

                tracing::debug!(
                    "Restoring counters {}..{} of keyset {}",
                    start_counter,
                    start_counter + RESTORE_BATCH,
                    keyset.id
                );

                let response = self
                    .client()
                    .post_restore(
                        &self.mint_url,
                        RestoreRequest {
                            outputs: batch.blinded_messages(),
                        },
                    )
                    .await?;

                // The counter walks forward a full batch either way
                self.commit_counter(keyset.id, RESTORE_BATCH).await?;
                start_counter += RESTORE_BATCH;

                if response.signatures.is_empty() {
                    empty_batches += 1;
                    continue;
                }
                empty_batches = 0;

                // Keep only the outputs the mint returned signatures for
                let seen = OutputSet {
                    keyset_id: keyset.id,
                    outputs: batch
                        .outputs
                        .into_iter()
                        .filter(|output| response.outputs.contains(&output.blinded_message))
                        .collect(),
                };

                let proofs = self
                    .unblind_signatures(&seen, response.signatures, &keys)
                    .await?;

                let states = self.check_proofs_spent(&proofs).await?;

                let unspent: Proofs = proofs
                    .into_iter()
                    .zip(states)
                    .filter(|(_, state)| {
                        state.state == ProofStateKind::Unspent && state.witness.is_none()
                    })
                    .map(|(proof, _)| proof)
                    .collect();

                tracing::debug!("Restored {} unspent proofs", unspent.len());

                restored = restored
                    .checked_add(proof::total_amount(&unspent)?)
                    .ok_or(pecan_core::amount::Error::AmountOverflow)?;

                self.store()
                    .add_proofs(self.mint_url.clone(), unspent)
                    .await?;
            }
        }

        Ok(restored)
    }
}
