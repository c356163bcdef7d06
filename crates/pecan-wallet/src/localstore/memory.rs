//! In-memory store

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use pecan_core::keyset::{Id, KeySetInfo};
use pecan_core::mint_url::MintUrl;
use pecan_core::{Keys, Proof, Proofs};
use tokio::sync::Mutex;

use super::{Error, WalletStore};
use crate::types::Invoice;

/// Store keeping everything in process memory
///
/// Useful for tests and throwaway wallets; nothing survives a restart.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    mint_keysets: Arc<Mutex<HashMap<MintUrl, HashMap<Id, KeySetInfo>>>>,
    keys: Arc<Mutex<HashMap<Id, Keys>>>,
    proofs: Arc<Mutex<HashMap<MintUrl, HashSet<Proof>>>>,
    pending_proofs: Arc<Mutex<HashMap<String, Proofs>>>,
    invoices: Arc<Mutex<HashMap<String, Invoice>>>,
    keyset_counters: Arc<Mutex<HashMap<Id, u32>>>,
    mnemonic: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    /// Create new empty [`MemoryStore`]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn add_mint_keysets(
        &self,
        mint_url: MintUrl,
        keysets: Vec<KeySetInfo>,
    ) -> Result<(), Error> {
        let mut mint_keysets = self.mint_keysets.lock().await;

        let entries = mint_keysets.entry(mint_url).or_default();
        for keyset in keysets {
            entries.insert(keyset.id, keyset);
        }

        Ok(())
    }

    async fn get_mint_keysets(&self, mint_url: &MintUrl) -> Result<Vec<KeySetInfo>, Error> {
        Ok(self
            .mint_keysets
            .lock()
            .await
            .get(mint_url)
            .map(|keysets| keysets.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_mints(&self) -> Result<Vec<MintUrl>, Error> {
        Ok(self.mint_keysets.lock().await.keys().cloned().collect())
    }

    async fn add_keys(&self, keys: Keys) -> Result<(), Error> {
        self.keys.lock().await.insert(Id::from(&keys), keys);
        Ok(())
    }

    async fn get_keys(&self, id: &Id) -> Result<Option<Keys>, Error> {
        Ok(self.keys.lock().await.get(id).cloned())
    }

    async fn add_proofs(&self, mint_url: MintUrl, proofs: Proofs) -> Result<(), Error> {
        let mut all_proofs = self.proofs.lock().await;

        all_proofs.entry(mint_url).or_default().extend(proofs);

        Ok(())
    }

    async fn get_proofs(&self, mint_url: &MintUrl) -> Result<Proofs, Error> {
        Ok(self
            .proofs
            .lock()
            .await
            .get(mint_url)
            .map(|proofs| proofs.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn remove_proofs(&self, mint_url: &MintUrl, proofs: &Proofs) -> Result<(), Error> {
        let mut all_proofs = self.proofs.lock().await;

        if let Some(mint_proofs) = all_proofs.get_mut(mint_url) {
            for proof in proofs {
                mint_proofs.remove(proof);
            }
        }

        Ok(())
    }

    async fn add_pending_proofs(&self, quote_id: &str, proofs: Proofs) -> Result<(), Error> {
        self.pending_proofs
            .lock()
            .await
            .entry(quote_id.to_string())
            .or_default()
            .extend(proofs);

        Ok(())
    }

    async fn get_pending_proofs(&self, quote_id: &str) -> Result<Proofs, Error> {
        Ok(self
            .pending_proofs
            .lock()
            .await
            .get(quote_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_pending_quote_ids(&self) -> Result<Vec<String>, Error> {
        Ok(self.pending_proofs.lock().await.keys().cloned().collect())
    }

    async fn remove_pending_proofs(&self, quote_id: &str) -> Result<(), Error> {
        self.pending_proofs.lock().await.remove(quote_id);
        Ok(())
    }

    async fn add_invoice(&self, invoice: Invoice) -> Result<(), Error> {
        self.invoices
            .lock()
            .await
            .insert(invoice.id.clone(), invoice);
        Ok(())
    }

    async fn get_invoice(&self, quote_id: &str) -> Result<Option<Invoice>, Error> {
        Ok(self.invoices.lock().await.get(quote_id).cloned())
    }

    async fn get_invoice_by_payment_hash(
        &self,
        payment_hash: &str,
    ) -> Result<Option<Invoice>, Error> {
        Ok(self
            .invoices
            .lock()
            .await
            .values()
            .find(|invoice| invoice.payment_hash == payment_hash)
            .cloned())
    }

    async fn get_invoices(&self) -> Result<Vec<Invoice>, Error> {
        Ok(self.invoices.lock().await.values().cloned().collect())
    }

    async fn increment_keyset_counter(&self, keyset_id: &Id, count: u32) -> Result<(), Error> {
        let mut counters = self.keyset_counters.lock().await;

        *counters.entry(*keyset_id).or_insert(0) += count;

        Ok(())
    }

    async fn get_keyset_counter(&self, keyset_id: &Id) -> Result<u32, Error> {
        Ok(self
            .keyset_counters
            .lock()
            .await
            .get(keyset_id)
            .copied()
            .unwrap_or(0))
    }

    async fn set_mnemonic(&self, mnemonic: String) -> Result<(), Error> {
        *self.mnemonic.lock().await = Some(mnemonic);
        Ok(())
    }

    async fn get_mnemonic(&self) -> Result<Option<String>, Error> {
        Ok(self.mnemonic.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pecan_core::{Amount, PublicKey, Secret};

    use super::*;

    fn proof(amount: u64, secret: &str) -> Proof {
        Proof::new(
            Amount::from(amount),
            Id::from_str("009a1f293253e41e").unwrap(),
            Secret::new(secret),
            PublicKey::from_hex(
                "02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea",
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_proofs_round_trip() {
        let store = MemoryStore::new();
        let mint_url = MintUrl::from_str("https://mint.example.com").unwrap();

        store
            .add_proofs(mint_url.clone(), vec![proof(1, "a"), proof(2, "b")])
            .await
            .unwrap();

        let mut proofs = store.get_proofs(&mint_url).await.unwrap();
        proofs.sort();
        assert_eq!(proofs.len(), 2);

        store
            .remove_proofs(&mint_url, &vec![proofs[0].clone()])
            .await
            .unwrap();

        let proofs = store.get_proofs(&mint_url).await.unwrap();
        assert_eq!(proofs.len(), 1);
        assert_eq!(proofs[0].amount, Amount::from(2));
    }

    #[tokio::test]
    async fn test_pending_proofs_keyed_by_quote() {
        let store = MemoryStore::new();

        store
            .add_pending_proofs("quote-1", vec![proof(4, "c")])
            .await
            .unwrap();

        assert_eq!(store.get_pending_quote_ids().await.unwrap(), ["quote-1"]);
        assert_eq!(store.get_pending_proofs("quote-1").await.unwrap().len(), 1);
        assert!(store.get_pending_proofs("quote-2").await.unwrap().is_empty());

        store.remove_pending_proofs("quote-1").await.unwrap();
        assert!(store.get_pending_quote_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_counter_monotone() {
        let store = MemoryStore::new();
        let id = Id::from_str("009a1f293253e41e").unwrap();

        assert_eq!(store.get_keyset_counter(&id).await.unwrap(), 0);

        store.increment_keyset_counter(&id, 3).await.unwrap();
        store.increment_keyset_counter(&id, 2).await.unwrap();

        assert_eq!(store.get_keyset_counter(&id).await.unwrap(), 5);
    }
}
