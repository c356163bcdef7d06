//! Wallet-side records

use core::fmt;
use std::str::FromStr;

use lightning_invoice::Bolt11Invoice;
use pecan_core::messages::{MeltQuoteBolt11Response, MintQuoteBolt11Response, QuoteState};
use pecan_core::mint_url::MintUrl;
use pecan_core::util::unix_time;
use pecan_core::{Amount, Proofs, SecretKey, SpendingConditions};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Which side of lightning an invoice belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceKind {
    /// Paying the invoice funds the wallet
    Mint,
    /// The mint pays the invoice with the wallet's ecash
    Melt,
}

impl fmt::Display for InvoiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mint => write!(f, "mint"),
            Self::Melt => write!(f, "melt"),
        }
    }
}

/// A lightning invoice the wallet is tracking, tied to a mint or melt quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Mint or melt
    pub kind: InvoiceKind,
    /// Quote id the invoice is tied to
    pub id: String,
    /// Mint the quote was requested from
    pub mint: MintUrl,
    /// Amount quoted on the ecash side
    pub quote_amount: Amount,
    /// Amount of the bolt11 invoice itself
    pub invoice_amount: Amount,
    /// The bolt11 payment request
    pub payment_request: String,
    /// Payment hash of the bolt11 invoice
    pub payment_hash: String,
    /// State of the quote
    pub state: QuoteState,
    /// Unix timestamp until which the quote is valid
    pub expiry: u64,
    /// Preimage, once a melt has been paid
    pub preimage: Option<String>,
    /// Unix timestamp the invoice was recorded
    pub created_at: u64,
    /// Unix timestamp the quote settled (issued or paid)
    pub settled_at: Option<u64>,
}

impl Invoice {
    /// Record a mint quote
    pub fn from_mint_quote(
        mint: MintUrl,
        amount: Amount,
        response: &MintQuoteBolt11Response,
    ) -> Result<Self, Error> {
        let bolt11 = Bolt11Invoice::from_str(&response.request)?;

        Ok(Self {
            kind: InvoiceKind::Mint,
            id: response.quote.clone(),
            mint,
            quote_amount: amount,
            invoice_amount: Amount::from(bolt11.amount_milli_satoshis().unwrap_or_default() / 1000),
            payment_request: response.request.clone(),
            payment_hash: bolt11.payment_hash().to_string(),
            state: response.state,
            expiry: response.expiry.unwrap_or_default(),
            preimage: None,
            created_at: unix_time(),
            settled_at: None,
        })
    }

    /// Record a melt quote
    pub fn from_melt_quote(
        mint: MintUrl,
        request: &str,
        response: &MeltQuoteBolt11Response,
    ) -> Result<Self, Error> {
        let bolt11 = Bolt11Invoice::from_str(request)?;

        Ok(Self {
            kind: InvoiceKind::Melt,
            id: response.quote.clone(),
            mint,
            quote_amount: response.amount,
            invoice_amount: Amount::from(bolt11.amount_milli_satoshis().unwrap_or_default() / 1000),
            payment_request: request.to_string(),
            payment_hash: bolt11.payment_hash().to_string(),
            state: response.state,
            expiry: response.expiry.unwrap_or_default(),
            preimage: None,
            created_at: unix_time(),
            settled_at: None,
        })
    }

    /// Whether the quote has expired
    pub fn is_expired(&self) -> bool {
        self.expiry != 0 && self.expiry <= unix_time()
    }
}

/// Result of a melt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Melted {
    /// Final state of the quote
    pub state: QuoteState,
    /// Preimage of the paid invoice
    pub preimage: Option<String>,
    /// Change for unspent fee reserve
    pub change: Option<Proofs>,
    /// Amount melted
    pub amount: Amount,
    /// Lightning fee actually paid out of the reserve
    pub fee_paid: Amount,
}

/// How a send should be assembled
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Cover the swap input fee on top of the amount, so the receiver can
    /// redeem the full face value
    pub include_fees: bool,
    /// Memo to embed in the token
    pub memo: Option<String>,
    /// Lock the sent ecash to a spending condition
    pub conditions: Option<SpendingConditions>,
}

/// Keys and preimages available for redeeming locked ecash
#[derive(Debug, Clone, Default)]
pub struct ReceiveOptions {
    /// Keys to sign P2PK locked proofs with
    pub signing_keys: Vec<SecretKey>,
    /// Preimages for HTLC locked proofs, hex encoded
    pub preimages: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOLT11: &str = "lnbc2500u1pvjluezsp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygshp58yjmdan79s6qqdhdzgynm4zwqd5d7xmw5fk98klysy043l2ahrqspp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqdq5xysxxatsyp3k7enxv4jsxqzpu9qrsgquk0rl77nj30yxdy8j9vdx85fkpmdla2087ne0xh8nhedh8w27kyke0lp53pe5clth2l6j95s92zcz2v5h9z8xrzm0j2w3sye65pjzqgpl44gc8";

    #[test]
    fn test_invoice_from_mint_quote() {
        let response = MintQuoteBolt11Response {
            quote: "quote-1".to_string(),
            request: BOLT11.to_string(),
            state: QuoteState::Unpaid,
            expiry: Some(1701704757),
        };

        let invoice = Invoice::from_mint_quote(
            MintUrl::from_str("https://mint.example.com").unwrap(),
            Amount::from(250000),
            &response,
        )
        .unwrap();

        assert_eq!(invoice.kind, InvoiceKind::Mint);
        assert_eq!(invoice.quote_amount, Amount::from(250000));
        // 2500u of bitcoin
        assert_eq!(invoice.invoice_amount, Amount::from(250000));
        assert_eq!(
            invoice.payment_hash,
            "0001020304050607080900010203040506070809000102030405060708090102"
        );
        assert_eq!(invoice.state, QuoteState::Unpaid);
        assert!(invoice.is_expired());
    }
}
