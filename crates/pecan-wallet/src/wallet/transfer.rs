//! Moving value between mints over lightning
//!
//! The receiving mint quotes an invoice, the source mint melts into it. The
//! lightning amount starts at 99% of what is available and walks down one
//! percent at a time until the melt quote plus its fee reserve fits.

use pecan_core::dleq;
use pecan_core::messages::{MeltQuoteBolt11Request, QuoteState};
use pecan_core::proof;
use pecan_core::{Amount, Token};
use tracing::instrument;

use super::receive::prepare_proofs;
use super::Wallet;
use crate::error::Error;
use crate::types::Invoice;

/// A feasible pair of quotes: mint at the target, melt at the source
struct TransferQuotes {
    mint_invoice: Invoice,
    melt_quote_id: String,
}

impl Wallet {
    /// Move `amount` from another of the wallet's mints into this one
    ///
    /// The source wallet melts into an invoice quoted by this wallet's mint;
    /// once paid, this wallet mints. Lightning fees come out of the moved
    /// amount.
    #[instrument(skip(self, source))]
    pub async fn transfer_from(&self, source: &Wallet, amount: Amount) -> Result<Amount, Error> {
        let quotes = self.quote_transfer(source, amount).await?;

        let melted = source.melt(&quotes.melt_quote_id).await?;

        self.finish_transfer(quotes, melted.state).await
    }

    /// Redeem a token drawn on a foreign mint by moving it over lightning
    pub(crate) async fn receive_untrusted(
        &self,
        token: &Token,
        options: crate::types::ReceiveOptions,
    ) -> Result<Amount, Error> {
        let source = self.sibling(token.mint_url()?);

        let mut proofs = token.proofs();
        prepare_proofs(&mut proofs, &options)?;

        // Received ecash is DLEQ-checked whether or not its mint is ours
        for proof in &proofs {
            let keys = source.keys_for(proof.keyset_id).await?;
            let key = keys.amount_key(proof.amount).ok_or(Error::AmountKey)?;

            match proof.verify_dleq(key) {
                Ok(()) | Err(dleq::Error::MissingDleqProof) => (),
                Err(_) => return Err(Error::CouldNotVerifyDleq),
            }
        }

        let budget = proof::total_amount(&proofs)?;

        let quotes = self.quote_transfer(&source, budget).await?;

        let melted = source
            .melt_inputs(&quotes.melt_quote_id, proofs, false)
            .await?;

        self.finish_transfer(quotes, melted.state).await
    }

    /// Walk the transfer amount down until source melt fits under `budget`
    async fn quote_transfer(
        &self,
        source: &Wallet,
        budget: Amount,
    ) -> Result<TransferQuotes, Error> {
        for percent in (1..=99u64).rev() {
            let target_amount = Amount::from(u64::from(budget) * percent / 100);
            if target_amount == Amount::ZERO {
                break;
            }

            let mint_invoice = self.mint_quote(target_amount).await?;

            let melt_response = source
                .client()
                .post_melt_quote(
                    &source.mint_url,
                    MeltQuoteBolt11Request {
                        request: mint_invoice.payment_request.clone(),
                        unit: source.unit.clone(),
                    },
                )
                .await?;

            let needed = melt_response
                .amount
                .checked_add(melt_response.fee_reserve)
                .ok_or(pecan_core::amount::Error::AmountOverflow)?;

            if needed > budget {
                tracing::debug!(
                    "Transfer of {} needs {}, over budget {}; stepping down",
                    target_amount,
                    needed,
                    budget
                );
                continue;
            }

            // Record the melt side so pending reconciliation can find it
            let melt_invoice = Invoice::from_melt_quote(
                source.mint_url.clone(),
                &mint_invoice.payment_request,
                &melt_response,
            )?;
            source.store().add_invoice(melt_invoice).await?;

            return Ok(TransferQuotes {
                mint_invoice,
                melt_quote_id: melt_response.quote,
            });
        }

        Err(Error::TransferInfeasible)
    }

    async fn finish_transfer(
        &self,
        quotes: TransferQuotes,
        melt_state: QuoteState,
    ) -> Result<Amount, Error> {
        match melt_state {
            QuoteState::Paid => self.mint(&quotes.mint_invoice.id).await,
            QuoteState::Pending => Err(Error::MeltPending),
            QuoteState::Unpaid | QuoteState::Issued => Err(Error::PaymentFailed),
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_transfer_step_down() {
        // The ladder the quote loop walks: 99%, 98%, ... of the budget
        let budget: u64 = 1000;

        let ladder: Vec<u64> = (1..=99u64)
            .rev()
            .map(|percent| budget * percent / 100)
            .collect();

        assert_eq!(ladder[0], 990);
        assert_eq!(ladder[1], 980);
        assert_eq!(*ladder.last().unwrap(), 10);
        assert!(ladder.windows(2).all(|w| w[0] > w[1]));
    }
}
