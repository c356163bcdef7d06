//! Melting ecash into lightning payments

use pecan_core::messages::{MeltBolt11Request, MeltQuoteBolt11Request, QuoteState};
use pecan_core::proof;
use pecan_core::util::unix_time;
use pecan_core::{Amount, OutputSet, Proofs};
use tracing::instrument;

use super::Wallet;
use crate::error::Error;
use crate::types::{Invoice, Melted};

impl Wallet {
    /// Request a quote to pay a bolt11 invoice with ecash
    #[instrument(skip(self, request))]
    pub async fn melt_quote(&self, request: &str) -> Result<Invoice, Error> {
        let response = self
            .client()
            .post_melt_quote(
                &self.mint_url,
                MeltQuoteBolt11Request {
                    request: request.to_string(),
                    unit: self.unit.clone(),
                },
            )
            .await?;

        let invoice = Invoice::from_melt_quote(self.mint_url.clone(), request, &response)?;

        self.store().add_invoice(invoice.clone()).await?;

        Ok(invoice)
    }

    /// Pay out a melt quote
    ///
    /// Selects inputs covering `amount + fee_reserve` plus the mint's input
    /// fee and submits them with blank change outputs. Inputs move to the
    /// pending bucket under the quote id before anything is sent, so a crash
    /// can never leave them half-spent.
    #[instrument(skip(self, quote_id))]
    pub async fn melt(&self, quote_id: &str) -> Result<Melted, Error> {
        let _guard = self.lock().lock().await;

        let invoice = self
            .store()
            .get_invoice(quote_id)
            .await?
            .ok_or(Error::QuoteUnknown)?;

        if invoice.is_expired() {
            return Err(Error::QuoteExpired);
        }

        let quote = self
            .client()
            .get_melt_quote_status(&self.mint_url, quote_id)
            .await?;

        let quote_target = quote
            .amount
            .checked_add(quote.fee_reserve)
            .ok_or(pecan_core::amount::Error::AmountOverflow)?;

        // The melt's own input fee has to ride on top of the quote target
        let keyset = self.active_keyset().await?;
        let fee_ppk = *self.keyset_fees().await?.get(&keyset.id).unwrap_or(&0);
        let melt_fee =
            Amount::from((quote_target.split().len() as u64 * fee_ppk).div_ceil(1000));

        let target = quote_target
            .checked_add(melt_fee)
            .ok_or(pecan_core::amount::Error::AmountOverflow)?;

        let selected = self.select_proofs(target, true).await?;

        // Overshooting inputs are swapped down first so the fee reserve
        // bounds what the blank outputs must absorb
        let inputs = if proof::total_amount(&selected)? > target {
            self.swap(target, selected, None).await?
        } else {
            selected
        };

        self.melt_inputs(quote_id, inputs, true).await
    }

    /// Pay out a melt quote with a fixed input set
    ///
    /// `owned` says whether the inputs came out of the store (and should
    /// return there if the payment fails) or were handed in from outside,
    /// like the proofs of a token in transit.
    pub(crate) async fn melt_inputs(
        &self,
        quote_id: &str,
        inputs: Proofs,
        owned: bool,
    ) -> Result<Melted, Error> {
        let quote = self
            .client()
            .get_melt_quote_status(&self.mint_url, quote_id)
            .await?;

        let keyset = self.active_keyset().await?;
        let keys = self.keys_for(keyset.id).await?;

        let counter = self.store().get_keyset_counter(&keyset.id).await?;
        let blanks =
            OutputSet::derived_blank(keyset.id, counter, self.seed(), quote.fee_reserve)?;

        // Inputs leave the active set and are parked under the quote before
        // the request goes out
        if owned {
            self.store().remove_proofs(&self.mint_url, &inputs).await?;
        }
        self.store()
            .add_pending_proofs(quote_id, inputs.clone())
            .await?;

        let response = self
            .client()
            .post_melt(
                &self.mint_url,
                MeltBolt11Request {
                    quote: quote_id.to_string(),
                    inputs: inputs.clone(),
                    outputs: (!blanks.is_empty()).then(|| blanks.blinded_messages()),
                },
            )
            .await?;

        match response.state {
            QuoteState::Paid => {
                self.commit_counter(keyset.id, blanks.len() as u32).await?;

                let change = match response.change {
                    Some(signatures) => {
                        Some(self.unblind_signatures(&blanks, signatures, &keys).await?)
                    }
                    None => None,
                };

                let change_amount = match &change {
                    Some(change) => proof::total_amount(change)?,
                    None => Amount::ZERO,
                };

                if let Some(change) = change.clone() {
                    self.store()
                        .add_proofs(self.mint_url.clone(), change)
                        .await?;
                }

                self.store().remove_pending_proofs(quote_id).await?;
                self.settle_invoice(quote_id, response.payment_preimage.clone())
                    .await?;

                tracing::debug!(
                    "Melt {} paid, lightning fee {}",
                    quote_id,
                    quote.fee_reserve - change_amount
                );

                Ok(Melted {
                    state: QuoteState::Paid,
                    preimage: response.payment_preimage,
                    change,
                    amount: quote.amount,
                    fee_paid: quote.fee_reserve - change_amount,
                })
            }
            QuoteState::Pending => {
                tracing::warn!("Melt quote {} is pending, proofs parked", quote_id);

                if let Some(mut invoice) = self.store().get_invoice(quote_id).await? {
                    invoice.state = QuoteState::Pending;
                    self.store().add_invoice(invoice).await?;
                }

                Ok(Melted {
                    state: QuoteState::Pending,
                    preimage: None,
                    change: None,
                    amount: quote.amount,
                    fee_paid: Amount::ZERO,
                })
            }
            QuoteState::Unpaid | QuoteState::Issued => {
                // Payment failed: the inputs are intact
                self.store().remove_pending_proofs(quote_id).await?;
                if owned {
                    self.store()
                        .add_proofs(self.mint_url.clone(), inputs)
                        .await?;
                }

                Ok(Melted {
                    state: QuoteState::Unpaid,
                    preimage: None,
                    change: None,
                    amount: quote.amount,
                    fee_paid: Amount::ZERO,
                })
            }
        }
    }

    async fn settle_invoice(
        &self,
        quote_id: &str,
        preimage: Option<String>,
    ) -> Result<(), Error> {
        if let Some(mut invoice) = self.store().get_invoice(quote_id).await? {
            invoice.state = QuoteState::Paid;
            invoice.preimage = preimage;
            invoice.settled_at = Some(unix_time());
            self.store().add_invoice(invoice).await?;
        }

        Ok(())
    }

    /// Reconcile outstanding pending melts against the mint
    ///
    /// Paid quotes destroy their pending proofs; resolved-unpaid quotes
    /// return them to the active set. Quotes still pending are left alone.
    #[instrument(skip(self))]
    pub async fn check_pending_melts(&self) -> Result<(), Error> {
        for quote_id in self.store().get_pending_quote_ids().await? {
            let invoice = self.store().get_invoice(&quote_id).await?;

            let at_this_mint = match &invoice {
                Some(invoice) => invoice.mint == self.mint_url,
                None => true,
            };
            if !at_this_mint {
                continue;
            }

            let quote = match self
                .client()
                .get_melt_quote_status(&self.mint_url, &quote_id)
                .await
            {
                Ok(quote) => quote,
                Err(Error::Mint(response)) => {
                    tracing::warn!("Pending quote {} unknown to mint: {}", quote_id, response);
                    continue;
                }
                Err(e) => return Err(e),
            };

            match quote.state {
                QuoteState::Paid => {
                    self.store().remove_pending_proofs(&quote_id).await?;
                    self.settle_invoice(&quote_id, quote.payment_preimage).await?;
                }
                QuoteState::Unpaid | QuoteState::Issued => {
                    let proofs = self.store().get_pending_proofs(&quote_id).await?;

                    self.store().remove_pending_proofs(&quote_id).await?;
                    self.store()
                        .add_proofs(self.mint_url.clone(), proofs)
                        .await?;
                }
                QuoteState::Pending => (),
            }
        }

        Ok(())
    }
}
