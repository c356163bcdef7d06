//! Proof selection, swaps and sending

use std::collections::HashSet;

use pecan_core::keyset::calculate_fee;
use pecan_core::messages::SwapRequest;
use pecan_core::proof;
use pecan_core::{Amount, Id, OutputSet, Proofs, SpendingConditions, Token};
use tracing::instrument;

use super::Wallet;
use crate::error::Error;
use crate::types::SendOptions;

/// A swap ready for submission: the request plus what is needed to unblind
/// the response and tell send outputs from change
pub(crate) struct PreparedSwap {
    pub outputs: OutputSet,
    pub send_count: usize,
    pub derived_count: u32,
    pub request: SwapRequest,
    pub keyset_id: Id,
}

impl Wallet {
    /// Select proofs covering `amount`, optionally including the input fee
    ///
    /// Proofs of inactive keysets are drained first; within each group the
    /// smallest proofs go in first. The input fee grows with the selection,
    /// so the target is re-checked after every pick.
    #[instrument(skip(self))]
    pub async fn select_proofs(&self, amount: Amount, include_fees: bool) -> Result<Proofs, Error> {
        let proofs = self.store().get_proofs(&self.mint_url).await?;
        let keysets = self.store().get_mint_keysets(&self.mint_url).await?;
        let fees = self.keyset_fees().await?;

        let in_unit: HashSet<Id> = keysets
            .iter()
            .filter(|keyset| keyset.unit == self.unit)
            .map(|keyset| keyset.id)
            .collect();
        let active: HashSet<Id> = keysets
            .iter()
            .filter(|keyset| keyset.active && keyset.unit == self.unit)
            .map(|keyset| keyset.id)
            .collect();

        let (mut inactive_proofs, mut active_proofs): (Proofs, Proofs) = proofs
            .into_iter()
            .filter(|proof| in_unit.contains(&proof.keyset_id))
            .partition(|proof| !active.contains(&proof.keyset_id));

        inactive_proofs.sort();
        active_proofs.sort();

        let mut selected: Proofs = Vec::new();
        let mut total = Amount::ZERO;

        for proof in inactive_proofs.into_iter().chain(active_proofs) {
            let target = if include_fees {
                let fee = calculate_fee(&proof::count_by_keyset(&selected), &fees)
                    .map_err(|_| Error::InsufficientBalance)?;
                amount
                    .checked_add(fee)
                    .ok_or(pecan_core::amount::Error::AmountOverflow)?
            } else {
                amount
            };

            if total >= target {
                return Ok(selected);
            }

            total = total
                .checked_add(proof.amount)
                .ok_or(pecan_core::amount::Error::AmountOverflow)?;
            selected.push(proof);
        }

        let target = if include_fees {
            let fee = calculate_fee(&proof::count_by_keyset(&selected), &fees)
                .map_err(|_| Error::InsufficientBalance)?;
            amount
                .checked_add(fee)
                .ok_or(pecan_core::amount::Error::AmountOverflow)?
        } else {
            amount
        };

        if total >= target {
            Ok(selected)
        } else {
            Err(Error::InsufficientBalance)
        }
    }

    /// Build the output set for swapping `inputs` into `send_amount` plus
    /// change
    ///
    /// Send outputs come first, ascending, then the change outputs. The
    /// change absorbs whatever the inputs carry beyond the send amount and
    /// the mint's input fee. Send outputs are derived from the seed unless a
    /// spending condition replaces their secrets; change is always derived.
    pub(crate) async fn prepare_swap(
        &self,
        send_amount: Amount,
        inputs: &Proofs,
        conditions: Option<SpendingConditions>,
    ) -> Result<PreparedSwap, Error> {
        let keyset = self.active_keyset().await?;

        let input_total = proof::total_amount(inputs)?;
        let fee = self.input_fee(inputs).await?;

        let change_amount = input_total
            .checked_sub(send_amount)
            .and_then(|rest| rest.checked_sub(fee))
            .ok_or(Error::InsufficientBalance)?;

        let counter = self.store().get_keyset_counter(&keyset.id).await?;

        // Condition-locked send outputs carry fresh random secrets and do
        // not consume derivation indices; everything else is derived.
        let (send_outputs, change_outputs, derived_count) = match conditions {
            Some(conditions) => {
                let send = OutputSet::locked(keyset.id, send_amount, &conditions)?;
                let change = OutputSet::derived(keyset.id, counter, self.seed(), change_amount)?;
                let derived = change.len() as u32;
                (send, change, derived)
            }
            None => {
                let send = OutputSet::derived(keyset.id, counter, self.seed(), send_amount)?;
                let change = OutputSet::derived(
                    keyset.id,
                    counter + send.len() as u32,
                    self.seed(),
                    change_amount,
                )?;
                let derived = (send.len() + change.len()) as u32;
                (send, change, derived)
            }
        };

        let send_count = send_outputs.len();

        let mut outputs = send_outputs;
        outputs.append(change_outputs);

        let request = SwapRequest::new(inputs.clone(), outputs.blinded_messages());

        Ok(PreparedSwap {
            outputs,
            send_count,
            derived_count,
            request,
            keyset_id: keyset.id,
        })
    }

    /// Swap `inputs` for `send_amount` of fresh proofs plus change
    ///
    /// Change proofs are persisted; the send proofs are returned and belong
    /// to the caller. Inputs are deleted from the store on success.
    #[instrument(skip(self, inputs, conditions))]
    pub(crate) async fn swap(
        &self,
        send_amount: Amount,
        inputs: Proofs,
        conditions: Option<SpendingConditions>,
    ) -> Result<Proofs, Error> {
        let prepared = self.prepare_swap(send_amount, &inputs, conditions).await?;

        let keys = self.keys_for(prepared.keyset_id).await?;

        let response = self
            .client()
            .post_swap(&self.mint_url, prepared.request)
            .await?;

        self.commit_counter(prepared.keyset_id, prepared.derived_count)
            .await?;

        let mut proofs = self
            .unblind_signatures(&prepared.outputs, response.signatures, &keys)
            .await?;

        let change_proofs = proofs.split_off(prepared.send_count);
        let send_proofs = proofs;

        self.store().remove_proofs(&self.mint_url, &inputs).await?;
        self.store()
            .add_proofs(self.mint_url.clone(), change_proofs)
            .await?;

        Ok(send_proofs)
    }

    /// Assemble a token for `amount`
    ///
    /// Selects proofs, swaps when the selection does not match exactly or a
    /// lock is requested, and returns the serialized token. With
    /// `include_fees` the receiver's redemption fee is sent along so the
    /// full face value arrives.
    #[instrument(skip(self, options))]
    pub async fn send(&self, amount: Amount, options: SendOptions) -> Result<Token, Error> {
        let _guard = self.lock().lock().await;

        self.refresh_keysets().await?;

        let send_amount = match options.include_fees {
            true => {
                let fees = self.keyset_fees().await?;
                let keyset = self.active_keyset().await?;
                let fee_ppk = *fees.get(&keyset.id).unwrap_or(&0);

                let redeem_fee =
                    Amount::from((amount.split().len() as u64 * fee_ppk).div_ceil(1000));

                amount
                    .checked_add(redeem_fee)
                    .ok_or(pecan_core::amount::Error::AmountOverflow)?
            }
            false => amount,
        };

        let selected = self.select_proofs(send_amount, true).await?;

        let send_proofs = if proof::total_amount(&selected)? == send_amount
            && options.conditions.is_none()
        {
            // Exact denominations on hand: hand them over as they are
            self.store().remove_proofs(&self.mint_url, &selected).await?;
            selected
        } else {
            self.swap(send_amount, selected, options.conditions).await?
        };

        Ok(Token::new(
            self.mint_url.clone(),
            send_proofs,
            options.memo,
            Some(self.unit.clone()),
        )?)
    }
}
