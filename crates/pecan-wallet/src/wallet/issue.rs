//! Mint quote and issuance

use pecan_core::messages::{MintBolt11Request, QuoteState};
use pecan_core::proof;
use pecan_core::util::unix_time;
use pecan_core::{Amount, OutputSet};
use tracing::instrument;

use super::Wallet;
use crate::error::Error;
use crate::types::Invoice;

impl Wallet {
    /// Request a quote to mint `amount`
    ///
    /// The returned invoice must be paid over lightning before [`Wallet::mint`]
    /// can issue the ecash.
    #[instrument(skip(self))]
    pub async fn mint_quote(&self, amount: Amount) -> Result<Invoice, Error> {
        let response = self
            .client()
            .post_mint_quote(&self.mint_url, amount, self.unit.clone())
            .await?;

        let invoice = Invoice::from_mint_quote(self.mint_url.clone(), amount, &response)?;

        self.store().add_invoice(invoice.clone()).await?;

        Ok(invoice)
    }

    /// Re-check a mint quote with the mint, updating the stored invoice
    #[instrument(skip(self, quote_id))]
    pub async fn mint_quote_state(&self, quote_id: &str) -> Result<QuoteState, Error> {
        let response = self
            .client()
            .get_mint_quote_status(&self.mint_url, quote_id)
            .await?;

        if let Some(mut invoice) = self.store().get_invoice(quote_id).await? {
            invoice.state = response.state;
            self.store().add_invoice(invoice).await?;
        }

        Ok(response.state)
    }

    /// Mint ecash for a paid quote
    ///
    /// Derives the outputs for the quoted amount, submits them, unblinds the
    /// returned signatures and persists the proofs. Returns the minted
    /// amount.
    #[instrument(skip(self, quote_id))]
    pub async fn mint(&self, quote_id: &str) -> Result<Amount, Error> {
        let _guard = self.lock().lock().await;

        let mut invoice = self
            .store()
            .get_invoice(quote_id)
            .await?
            .ok_or(Error::QuoteUnknown)?;

        match invoice.state {
            QuoteState::Issued => return Err(Error::QuoteAlreadyIssued),
            QuoteState::Unpaid if invoice.is_expired() => return Err(Error::QuoteExpired),
            _ => (),
        }

        match self.mint_quote_state(quote_id).await? {
            QuoteState::Paid => (),
            QuoteState::Issued => return Err(Error::QuoteAlreadyIssued),
            QuoteState::Unpaid | QuoteState::Pending => return Err(Error::QuoteNotPaid),
        }

        let keyset = self.active_keyset().await?;
        let keys = self.keys_for(keyset.id).await?;

        let counter = self.store().get_keyset_counter(&keyset.id).await?;
        let outputs = OutputSet::derived(keyset.id, counter, self.seed(), invoice.quote_amount)?;

        let response = self
            .client()
            .post_mint(
                &self.mint_url,
                MintBolt11Request {
                    quote: quote_id.to_string(),
                    outputs: outputs.blinded_messages(),
                },
            )
            .await?;

        self.commit_counter(keyset.id, outputs.len() as u32).await?;

        let proofs = self
            .unblind_signatures(&outputs, response.signatures, &keys)
            .await?;

        let minted = proof::total_amount(&proofs)?;

        self.store()
            .add_proofs(self.mint_url.clone(), proofs)
            .await?;

        invoice.state = QuoteState::Issued;
        invoice.settled_at = Some(unix_time());
        self.store().add_invoice(invoice).await?;

        tracing::debug!("Minted {} for quote {}", minted, quote_id);

        Ok(minted)
    }
}
