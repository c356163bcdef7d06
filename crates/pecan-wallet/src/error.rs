//! Wallet errors

use pecan_core::keyset::Id;
use pecan_core::ErrorResponse;
use thiserror::Error;

/// Wallet error
#[derive(Debug, Error)]
pub enum Error {
    /// Not enough usable proofs to cover the amount
    #[error("Insufficient balance")]
    InsufficientBalance,
    /// Token is drawn on a different mint than this wallet
    #[error("Token does not match wallet mint")]
    IncorrectMint,
    /// Token unit does not match this wallet
    #[error("Token unit does not match wallet unit")]
    IncorrectUnit,
    /// Mint has no active keyset for the unit
    #[error("No active keyset for unit")]
    NoActiveKeyset,
    /// Keyset is not known
    #[error("Keyset not known: `{0}`")]
    KeysetUnknown(Id),
    /// Mint does not publish a key for the amount
    #[error("No key for amount")]
    AmountKey,
    /// Quote is not known
    #[error("Unknown quote")]
    QuoteUnknown,
    /// Quote has expired
    #[error("Quote expired")]
    QuoteExpired,
    /// Quote has not been paid yet
    #[error("Quote not paid")]
    QuoteNotPaid,
    /// Ecash has already been issued for the quote
    #[error("Quote already issued")]
    QuoteAlreadyIssued,
    /// DLEQ verification failed on a received signature or proof
    #[error("Could not verify DLEQ proof")]
    CouldNotVerifyDleq,
    /// Locked ecash received without a key that can unlock it
    #[error("No key to unlock locked ecash")]
    NoMatchingKey,
    /// HTLC locked ecash received without the preimage
    #[error("Preimage not provided")]
    PreimageNotProvided,
    /// A transfer could not be fitted under the available amount
    #[error("Transfer amount with fees exceeds available proofs")]
    TransferInfeasible,
    /// A melt settled as failed at the mint
    #[error("Lightning payment failed")]
    PaymentFailed,
    /// A melt is still in flight; its inputs are parked under the quote id
    #[error("Melt is pending")]
    MeltPending,
    /// The mint rejected the request
    #[error("Mint error: {0}")]
    Mint(ErrorResponse),
    /// Transport error
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// Storage error
    #[error(transparent)]
    Store(#[from] crate::localstore::Error),
    /// Bolt11 parse error
    #[error(transparent)]
    Invoice(#[from] lightning_invoice::ParseOrSemanticError),
    /// Mnemonic error
    #[error(transparent)]
    Bip39(#[from] bip39::Error),
    /// Serde Json error
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    /// Amount error
    #[error(transparent)]
    Amount(#[from] pecan_core::amount::Error),
    /// Spending condition error
    #[error(transparent)]
    Conditions(#[from] pecan_core::conditions::Error),
    /// Derivation error
    #[error(transparent)]
    Derive(#[from] pecan_core::derive::Error),
    /// DHKE error
    #[error(transparent)]
    Dhke(#[from] pecan_core::dhke::Error),
    /// DLEQ error
    #[error(transparent)]
    Dleq(#[from] pecan_core::dleq::Error),
    /// Key error
    #[error(transparent)]
    Keys(#[from] pecan_core::keys::Error),
    /// Keyset error
    #[error(transparent)]
    Keyset(#[from] pecan_core::keyset::Error),
    /// Mint url error
    #[error(transparent)]
    MintUrl(#[from] pecan_core::mint_url::Error),
    /// Proof error
    #[error(transparent)]
    Proof(#[from] pecan_core::proof::Error),
    /// Secret error
    #[error(transparent)]
    Secret(#[from] pecan_core::secret::Error),
    /// Token error
    #[error(transparent)]
    Token(#[from] pecan_core::token::Error),
}

impl From<ErrorResponse> for Error {
    fn from(response: ErrorResponse) -> Self {
        Self::Mint(response)
    }
}
