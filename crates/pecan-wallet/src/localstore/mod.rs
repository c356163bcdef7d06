//! Wallet persistence
//!
//! The wallet consumes a narrow key/value surface: keysets, keys, proofs,
//! pending proofs (keyed by melt quote id), invoices, keyset counters and the
//! mnemonic. [`MemoryStore`] implements it in memory; persistent backends
//! implement the same trait.

use async_trait::async_trait;
use pecan_core::keyset::{Id, KeySetInfo};
use pecan_core::mint_url::MintUrl;
use pecan_core::{Keys, Proofs};
use thiserror::Error;

use crate::types::Invoice;

mod memory;

pub use memory::MemoryStore;

/// Storage error
#[derive(Debug, Error)]
pub enum Error {
    /// Backend error
    #[error(transparent)]
    Database(Box<dyn std::error::Error + Send + Sync>),
}

/// Storage consumed by the wallet
#[async_trait]
pub trait WalletStore {
    /// Upsert keysets of a mint, keyed by keyset id
    async fn add_mint_keysets(
        &self,
        mint_url: MintUrl,
        keysets: Vec<KeySetInfo>,
    ) -> Result<(), Error>;

    /// All known keysets of a mint
    async fn get_mint_keysets(&self, mint_url: &MintUrl) -> Result<Vec<KeySetInfo>, Error>;

    /// All mints the store has keysets for
    async fn get_mints(&self) -> Result<Vec<MintUrl>, Error>;

    /// Store the key map of a keyset
    async fn add_keys(&self, keys: Keys) -> Result<(), Error>;

    /// Key map of a keyset
    async fn get_keys(&self, id: &Id) -> Result<Option<Keys>, Error>;

    /// Add proofs for a mint
    async fn add_proofs(&self, mint_url: MintUrl, proofs: Proofs) -> Result<(), Error>;

    /// All proofs of a mint
    async fn get_proofs(&self, mint_url: &MintUrl) -> Result<Proofs, Error>;

    /// Remove proofs of a mint
    async fn remove_proofs(&self, mint_url: &MintUrl, proofs: &Proofs) -> Result<(), Error>;

    /// Record proofs as pending under a melt quote id
    async fn add_pending_proofs(&self, quote_id: &str, proofs: Proofs) -> Result<(), Error>;

    /// Pending proofs of a melt quote
    async fn get_pending_proofs(&self, quote_id: &str) -> Result<Proofs, Error>;

    /// Melt quote ids with pending proofs
    async fn get_pending_quote_ids(&self) -> Result<Vec<String>, Error>;

    /// Drop the pending record of a melt quote
    async fn remove_pending_proofs(&self, quote_id: &str) -> Result<(), Error>;

    /// Upsert an invoice, keyed by quote id
    async fn add_invoice(&self, invoice: Invoice) -> Result<(), Error>;

    /// Invoice by quote id
    async fn get_invoice(&self, quote_id: &str) -> Result<Option<Invoice>, Error>;

    /// Invoice by bolt11 payment hash
    async fn get_invoice_by_payment_hash(
        &self,
        payment_hash: &str,
    ) -> Result<Option<Invoice>, Error>;

    /// All invoices
    async fn get_invoices(&self) -> Result<Vec<Invoice>, Error>;

    /// Advance a keyset's counter by `count` derivation indices
    async fn increment_keyset_counter(&self, keyset_id: &Id, count: u32) -> Result<(), Error>;

    /// Next unused derivation index of a keyset, 0 if never used
    async fn get_keyset_counter(&self, keyset_id: &Id) -> Result<u32, Error>;

    /// Persist the wallet mnemonic
    async fn set_mnemonic(&self, mnemonic: String) -> Result<(), Error>;

    /// The persisted mnemonic, if any
    async fn get_mnemonic(&self) -> Result<Option<String>, Error>;
}
