//! The wallet handle and keyset lifecycle

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use bip39::Mnemonic;
use pecan_core::dleq;
use pecan_core::keyset::{calculate_fee, KeySetInfo};
use pecan_core::messages::ProofState;
use pecan_core::mint_url::MintUrl;
use pecan_core::proof;
use pecan_core::{Amount, BlindSignature, CurrencyUnit, Id, Keys, OutputSet, Proofs};
use tokio::sync::Mutex;
use tracing::instrument;

use crate::client::MintConnector;
use crate::error::Error;
use crate::localstore::WalletStore;

mod issue;
mod melt;
mod receive;
mod restore;
mod send;
mod transfer;

/// A wallet on one mint, in one unit
///
/// Owns exclusive access to its derivation counters: mint, swap, melt and
/// send serialize on an internal lock so counters only ever move forward.
/// Wallets on different mints are independent; any number can share one
/// store and one connector.
#[derive(Clone)]
pub struct Wallet {
    /// Url of the wallet's mint
    pub mint_url: MintUrl,
    /// Unit of the wallet
    pub unit: CurrencyUnit,
    client: Arc<dyn MintConnector + Send + Sync>,
    store: Arc<dyn WalletStore + Send + Sync>,
    seed: [u8; 64],
    op_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("mint_url", &self.mint_url)
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}

impl Wallet {
    /// Create new [`Wallet`]
    pub fn new(
        mint_url: MintUrl,
        unit: CurrencyUnit,
        client: Arc<dyn MintConnector + Send + Sync>,
        store: Arc<dyn WalletStore + Send + Sync>,
        mnemonic: &Mnemonic,
    ) -> Self {
        Self {
            mint_url,
            unit,
            client,
            store,
            seed: mnemonic.to_seed(""),
            op_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Load the store's mnemonic, generating and persisting one on first use
    pub async fn load_or_generate_mnemonic(
        store: &(dyn WalletStore + Send + Sync),
    ) -> Result<Mnemonic, Error> {
        match store.get_mnemonic().await? {
            Some(mnemonic) => Ok(Mnemonic::from_str(&mnemonic)?),
            None => {
                let mnemonic = Mnemonic::generate(12)?;
                store.set_mnemonic(mnemonic.to_string()).await?;
                Ok(mnemonic)
            }
        }
    }

    /// Spendable balance at the wallet's mint
    #[instrument(skip(self))]
    pub async fn balance(&self) -> Result<Amount, Error> {
        Ok(proof::total_amount(
            &self.store.get_proofs(&self.mint_url).await?,
        )?)
    }

    /// Value parked in pending melts at the wallet's mint
    #[instrument(skip(self))]
    pub async fn pending_balance(&self) -> Result<Amount, Error> {
        let mut balance = Amount::ZERO;

        for quote_id in self.store.get_pending_quote_ids().await? {
            let at_this_mint = match self.store.get_invoice(&quote_id).await? {
                Some(invoice) => invoice.mint == self.mint_url,
                None => false,
            };

            if at_this_mint {
                let pending = self.store.get_pending_proofs(&quote_id).await?;
                balance = balance
                    .checked_add(proof::total_amount(&pending)?)
                    .ok_or(pecan_core::amount::Error::AmountOverflow)?;
            }
        }

        Ok(balance)
    }

    /// Poll the mint's keyset list and reconcile the store with it
    ///
    /// Keysets that dropped out of the active set are marked inactive;
    /// `input_fee_ppk` is re-read on every poll. Returns the up-to-date
    /// keysets of the mint.
    #[instrument(skip(self))]
    pub async fn refresh_keysets(&self) -> Result<Vec<KeySetInfo>, Error> {
        let fetched = self.client.get_mint_keysets(&self.mint_url).await?.keysets;

        let known = self.store.get_mint_keysets(&self.mint_url).await?;

        // A keyset the mint no longer lists as active stays known, inactive
        let mut reconciled: Vec<KeySetInfo> = known
            .into_iter()
            .filter(|keyset| !fetched.iter().any(|f| f.id == keyset.id))
            .map(|keyset| KeySetInfo {
                active: false,
                ..keyset
            })
            .collect();
        reconciled.extend(fetched);

        self.store
            .add_mint_keysets(self.mint_url.clone(), reconciled.clone())
            .await?;

        Ok(reconciled)
    }

    /// The mint's active keyset for this wallet's unit
    ///
    /// Refreshes the keyset list and makes sure the active keyset's keys are
    /// cached and verified before anything is derived under it.
    #[instrument(skip(self))]
    pub async fn active_keyset(&self) -> Result<KeySetInfo, Error> {
        let keysets = self.refresh_keysets().await?;

        let active = keysets
            .into_iter()
            .find(|keyset| keyset.active && keyset.unit == self.unit)
            .ok_or(Error::NoActiveKeyset)?;

        // Cache keys before the first derivation under this keyset
        self.keys_for(active.id).await?;

        Ok(active)
    }

    /// Keys of a keyset, from the store or fetched and verified
    #[instrument(skip(self))]
    pub async fn keys_for(&self, keyset_id: Id) -> Result<Keys, Error> {
        if let Some(keys) = self.store.get_keys(&keyset_id).await? {
            return Ok(keys);
        }

        let keyset = self.client.get_mint_keyset(&self.mint_url, keyset_id).await?;
        keyset.verify_id()?;

        self.store.add_keys(keyset.keys.clone()).await?;

        Ok(keyset.keys)
    }

    /// Current `input_fee_ppk` per keyset of the wallet's mint
    pub(crate) async fn keyset_fees(&self) -> Result<HashMap<Id, u64>, Error> {
        Ok(self
            .store
            .get_mint_keysets(&self.mint_url)
            .await?
            .into_iter()
            .map(|keyset| (keyset.id, keyset.input_fee_ppk))
            .collect())
    }

    /// Input fee the mint will charge for spending `proofs`
    pub(crate) async fn input_fee(&self, proofs: &Proofs) -> Result<Amount, Error> {
        Ok(calculate_fee(
            &proof::count_by_keyset(proofs),
            &self.keyset_fees().await?,
        )?)
    }

    /// Ask the mint for the state of each proof
    #[instrument(skip(self, proofs))]
    pub async fn check_proofs_spent(&self, proofs: &Proofs) -> Result<Vec<ProofState>, Error> {
        let response = self
            .client
            .post_check_state(&self.mint_url, proof::ys(proofs)?)
            .await?;

        Ok(response.states)
    }

    /// Reserve `count` derivation indices of a keyset
    ///
    /// Committed before the response is touched, so a crash after the mint
    /// has seen the outputs can never reuse an index.
    pub(crate) async fn commit_counter(&self, keyset_id: Id, count: u32) -> Result<(), Error> {
        self.store
            .increment_keyset_counter(&keyset_id, count)
            .await?;

        Ok(())
    }

    /// Unblind a batch of signatures, verifying any DLEQ they carry
    pub(crate) async fn unblind_signatures(
        &self,
        outputs: &OutputSet,
        signatures: Vec<BlindSignature>,
        keys: &Keys,
    ) -> Result<Proofs, Error> {
        for (signature, output) in signatures.iter().zip(outputs.iter()) {
            let key = keys.amount_key(signature.amount).ok_or(Error::AmountKey)?;

            match signature.verify_dleq(key, output.blinded_message.blinded_secret) {
                Ok(()) | Err(dleq::Error::MissingDleqProof) => (),
                Err(_) => return Err(Error::CouldNotVerifyDleq),
            }
        }

        Ok(outputs.unblind(signatures, keys)?)
    }

    /// A wallet on another mint sharing this wallet's seed, store and client
    pub(crate) fn sibling(&self, mint_url: MintUrl) -> Wallet {
        Wallet {
            mint_url,
            unit: self.unit.clone(),
            client: Arc::clone(&self.client),
            store: Arc::clone(&self.store),
            seed: self.seed,
            op_lock: Arc::new(Mutex::new(())),
        }
    }

    pub(crate) fn client(&self) -> &(dyn MintConnector + Send + Sync) {
        &*self.client
    }

    pub(crate) fn store(&self) -> &(dyn WalletStore + Send + Sync) {
        &*self.store
    }

    pub(crate) fn seed(&self) -> &[u8; 64] {
        &self.seed
    }

    pub(crate) fn lock(&self) -> &Mutex<()> {
        &self.op_lock
    }
}
