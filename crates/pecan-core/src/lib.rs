//! Protocol types and cryptography for Chaumian ecash.
//!
//! This crate holds everything a wallet (or a test double of a mint) needs
//! that does not perform I/O: amounts, secrets, the blind signature scheme
//! over secp256k1, DLEQ proofs, keyset identity, spending conditions and the
//! token wire formats.

#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod amount;
pub mod conditions;
pub mod derive;
pub mod dhke;
pub mod dleq;
pub mod error;
pub mod keys;
pub mod keyset;
pub mod messages;
pub mod mint_url;
pub mod proof;
pub mod secret;
pub mod token;
pub mod util;

pub use amount::Amount;
pub use conditions::{Conditions, Kind, SigFlag, SpendingConditions, WellKnownSecret};
pub use error::{ErrorCode, ErrorResponse};
pub use keys::{Keys, PublicKey, SecretKey};
pub use keyset::{Id, KeySet, KeySetInfo};
pub use mint_url::MintUrl;
pub use proof::{
    BlindSignature, BlindedMessage, OutputSet, PendingOutput, Proof, Proofs, Witness,
};
pub use secret::Secret;
pub use token::{Token, TokenV3, TokenV4};
pub use util::SECP256K1;

/// Currency unit of a keyset, quote or token
///
/// Units are free-form on the wire; the protocol multiplexes on them.
pub type CurrencyUnit = String;
