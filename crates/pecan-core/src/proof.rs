//! Proofs and the outputs that become them

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::amount::Amount;
use crate::conditions::{
    serde_htlc_witness, serde_p2pk_witness, HTLCWitness, P2PKWitness, SpendingConditions,
};
use crate::dhke::{blind_message, hash_to_curve, unblind_message};
use crate::dleq::{BlindSignatureDleq, ProofDleq};
use crate::keys::{Keys, PublicKey, SecretKey};
use crate::keyset::Id;
use crate::secret::Secret;

/// Proof error
#[derive(Debug, Error)]
pub enum Error {
    /// Amount error
    #[error(transparent)]
    Amount(#[from] crate::amount::Error),
    /// DHKE error
    #[error(transparent)]
    Dhke(#[from] crate::dhke::Error),
    /// Spending condition error
    #[error(transparent)]
    Conditions(#[from] crate::conditions::Error),
}

/// Blinded message, also called an output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlindedMessage {
    /// Amount the signature is requested for
    pub amount: Amount,
    /// Id of the keyset the signature is requested from
    #[serde(rename = "id")]
    pub keyset_id: Id,
    /// Blinded secret message (`B_`)
    #[serde(rename = "B_")]
    pub blinded_secret: PublicKey,
    /// Witness, for SIG_ALL swaps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<Witness>,
}

impl BlindedMessage {
    /// Compose new [`BlindedMessage`]
    #[inline]
    pub fn new(amount: Amount, keyset_id: Id, blinded_secret: PublicKey) -> Self {
        Self {
            amount,
            keyset_id,
            blinded_secret,
            witness: None,
        }
    }
}

/// Blinded signature, also called a promise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindSignature {
    /// Amount of the signature
    pub amount: Amount,
    /// Id of the keyset that signed
    #[serde(rename = "id")]
    pub keyset_id: Id,
    /// Blinded signature (`C_`) on the [`BlindedMessage`]'s `B_`
    #[serde(rename = "C_")]
    pub c: PublicKey,
    /// DLEQ proof tying `C_` to the mint key for the amount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dleq: Option<BlindSignatureDleq>,
}

impl Ord for BlindSignature {
    fn cmp(&self, other: &Self) -> Ordering {
        self.amount.cmp(&other.amount)
    }
}

impl PartialOrd for BlindSignature {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Witness attached to a proof or blinded message
///
/// Carried as a JSON string inside the surrounding JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Witness {
    /// HTLC witness
    #[serde(with = "serde_htlc_witness")]
    Htlc(HTLCWitness),
    /// P2PK witness
    #[serde(with = "serde_p2pk_witness")]
    P2pk(P2PKWitness),
}

impl From<P2PKWitness> for Witness {
    fn from(witness: P2PKWitness) -> Self {
        Self::P2pk(witness)
    }
}

impl From<HTLCWitness> for Witness {
    fn from(witness: HTLCWitness) -> Self {
        Self::Htlc(witness)
    }
}

impl Witness {
    /// Add signatures to [`Witness`]
    pub fn add_signatures(&mut self, signatures: Vec<String>) {
        match self {
            Self::P2pk(p2pk_witness) => p2pk_witness.signatures.extend(signatures),
            Self::Htlc(htlc_witness) => match &mut htlc_witness.signatures {
                Some(sigs) => sigs.extend(signatures),
                None => htlc_witness.signatures = Some(signatures),
            },
        }
    }

    /// Signatures on [`Witness`]
    pub fn signatures(&self) -> Option<Vec<String>> {
        match self {
            Self::P2pk(witness) => Some(witness.signatures.clone()),
            Self::Htlc(witness) => witness.signatures.clone(),
        }
    }

    /// Preimage on [`Witness`]
    pub fn preimage(&self) -> Option<String> {
        match self {
            Self::P2pk(_) => None,
            Self::Htlc(witness) => Some(witness.preimage.clone()),
        }
    }
}

/// Proof: transferable, bearer ecash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Amount
    pub amount: Amount,
    /// Id of the keyset that signed
    #[serde(rename = "id")]
    pub keyset_id: Id,
    /// Secret message
    pub secret: Secret,
    /// Unblinded signature
    #[serde(rename = "C")]
    pub c: PublicKey,
    /// Witness unlocking a spending condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<Witness>,
    /// DLEQ proof
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dleq: Option<ProofDleq>,
}

impl Proof {
    /// Create new [`Proof`]
    pub fn new(amount: Amount, keyset_id: Id, secret: Secret, c: PublicKey) -> Self {
        Proof {
            amount,
            keyset_id,
            secret,
            c,
            witness: None,
            dleq: None,
        }
    }

    /// `Y = hash_to_curve(secret)`, how the mint tracks this proof
    pub fn y(&self) -> Result<PublicKey, Error> {
        Ok(hash_to_curve(self.secret.as_bytes())?)
    }
}

impl Hash for Proof {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.secret.hash(state);
    }
}

impl Ord for Proof {
    fn cmp(&self, other: &Self) -> Ordering {
        self.amount.cmp(&other.amount)
    }
}

impl PartialOrd for Proof {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// List of [`Proof`]s
pub type Proofs = Vec<Proof>;

/// Sum of the proofs' amounts, erroring on overflow
pub fn total_amount(proofs: &[Proof]) -> Result<Amount, Error> {
    Ok(Amount::try_sum(proofs.iter().map(|proof| proof.amount))?)
}

/// `Y` of every proof, in order
pub fn ys(proofs: &[Proof]) -> Result<Vec<PublicKey>, Error> {
    proofs.iter().map(Proof::y).collect()
}

/// How many proofs each keyset contributes
pub fn count_by_keyset(proofs: &[Proof]) -> HashMap<Id, u64> {
    let mut counts = HashMap::new();
    for proof in proofs {
        *counts.entry(proof.keyset_id).or_insert(0) += 1;
    }
    counts
}

/// One output in flight: the blinded message plus what it takes to unblind
/// the answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOutput {
    /// Blinded message
    pub blinded_message: BlindedMessage,
    /// Secret
    pub secret: Secret,
    /// Blinding factor
    pub r: SecretKey,
    /// Amount
    pub amount: Amount,
}

impl PendingOutput {
    fn build(keyset_id: Id, amount: Amount, secret: Secret) -> Result<Self, Error> {
        let (blinded, r) = blind_message(&secret.to_bytes(), None)?;

        Ok(Self {
            blinded_message: BlindedMessage::new(amount, keyset_id, blinded),
            secret,
            r,
            amount,
        })
    }
}

impl Ord for PendingOutput {
    fn cmp(&self, other: &Self) -> Ordering {
        self.amount.cmp(&other.amount)
    }
}

impl PartialOrd for PendingOutput {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A batch of outputs in flight against one keyset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSet {
    /// The outputs
    pub outputs: Vec<PendingOutput>,
    /// Keyset the signatures are requested from
    pub keyset_id: Id,
}

impl OutputSet {
    /// New empty [`OutputSet`]
    pub fn new(keyset_id: Id) -> Self {
        Self {
            outputs: Vec::new(),
            keyset_id,
        }
    }

    /// Outputs for `amount` in canonical denominations, fresh random secrets
    pub fn fresh(keyset_id: Id, amount: Amount) -> Result<Self, Error> {
        let outputs = amount
            .split()
            .into_iter()
            .map(|amount| PendingOutput::build(keyset_id, amount, Secret::generate()))
            .collect::<Result<_, _>>()?;

        Ok(Self { outputs, keyset_id })
    }

    /// Outputs for `amount` locked to a spending condition
    pub fn locked(
        keyset_id: Id,
        amount: Amount,
        conditions: &SpendingConditions,
    ) -> Result<Self, Error> {
        let outputs = amount
            .split()
            .into_iter()
            .map(|amount| PendingOutput::build(keyset_id, amount, conditions.to_secret()?))
            .collect::<Result<_, _>>()?;

        Ok(Self { outputs, keyset_id })
    }

    /// Zero-amount outputs for absorbing melt change
    ///
    /// The mint assigns amounts when it returns unspent fee reserve.
    pub fn blank(keyset_id: Id, fee_reserve: Amount) -> Result<Self, Error> {
        let outputs = (0..fee_reserve.blank_count())
            .map(|_| PendingOutput::build(keyset_id, Amount::ZERO, Secret::generate()))
            .collect::<Result<_, _>>()?;

        Ok(Self { outputs, keyset_id })
    }

    /// Unblind a batch of signatures into proofs
    ///
    /// Pairs signatures with this set's outputs in order; a signature's DLEQ
    /// travels into the proof together with the blinding factor. Extra
    /// outputs (a restore batch, unfilled blanks) are simply left behind.
    pub fn unblind(&self, signatures: Vec<BlindSignature>, keys: &Keys) -> Result<Proofs, Error> {
        signatures
            .into_iter()
            .zip(self.outputs.iter())
            .map(|(signature, output)| {
                let mint_key = keys
                    .amount_key(signature.amount)
                    .ok_or(crate::dhke::Error::AmountKey(signature.amount))?;

                let c = unblind_message(&signature.c, &output.r, &mint_key)?;

                Ok(Proof {
                    amount: signature.amount,
                    keyset_id: signature.keyset_id,
                    secret: output.secret.clone(),
                    c,
                    witness: None,
                    dleq: signature
                        .dleq
                        .map(|dleq| ProofDleq::new(dleq.e, dleq.s, output.r.clone())),
                })
            })
            .collect()
    }

    /// Iterate over the outputs
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &PendingOutput> {
        self.outputs.iter()
    }

    /// Number of outputs
    #[inline]
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Whether the set is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Total amount across the outputs
    pub fn total(&self) -> Result<Amount, Error> {
        Ok(Amount::try_sum(
            self.outputs.iter().map(|output| output.amount),
        )?)
    }

    /// The blinded messages, ready for a request body
    #[inline]
    pub fn blinded_messages(&self) -> Vec<BlindedMessage> {
        self.iter().map(|output| output.blinded_message.clone()).collect()
    }

    /// Move another set's outputs onto the end of this one
    #[inline]
    pub fn append(&mut self, mut other: Self) {
        self.outputs.append(&mut other.outputs)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn proof_wire_form() {
        let proof = "[{\"id\":\"009a1f293253e41e\",\"amount\":2,\"secret\":\"407915bc212be61a77e3e6d2aeb4c727980bda51cd06a6afc29e2861768a7837\",\"C\":\"02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea\"},{\"id\":\"009a1f293253e41e\",\"amount\":8,\"secret\":\"fe15109314e61d7756b0f8ee0f23a624acaa3f4e042f61433c728c7057b931be\",\"C\":\"029e8e5050b890a7d6c0968db16bc1d5d5fa040ea1de284f6ec69d61299f671059\"}]";
        let proofs: Proofs = serde_json::from_str(proof).unwrap();

        assert_eq!(
            proofs[0].keyset_id,
            Id::from_str("009a1f293253e41e").unwrap()
        );
        assert_eq!(proofs.len(), 2);
        assert_eq!(total_amount(&proofs).unwrap(), Amount::from(10));
    }

    #[test]
    fn fresh_outputs_use_canonical_denominations() {
        let keyset_id = Id::from_str("009a1f293253e41e").unwrap();

        let set = OutputSet::fresh(keyset_id, Amount::from(13)).unwrap();

        let amounts: Vec<u64> = set.iter().map(|output| u64::from(output.amount)).collect();
        assert_eq!(amounts, vec![1, 4, 8]);

        // Every secret is distinct
        let set_two = OutputSet::fresh(keyset_id, Amount::from(13)).unwrap();
        assert_ne!(set.outputs[0].secret, set_two.outputs[0].secret);
    }

    #[test]
    fn blank_output_count_law() {
        let keyset_id = Id::from_str("009a1f293253e41e").unwrap();

        let blanks = OutputSet::blank(keyset_id, Amount::from(1000)).unwrap();
        assert_eq!(blanks.len(), 10);
        assert!(blanks.iter().all(|output| output.amount == Amount::ZERO));

        assert_eq!(OutputSet::blank(keyset_id, Amount::from(1)).unwrap().len(), 1);
        assert!(OutputSet::blank(keyset_id, Amount::ZERO).unwrap().is_empty());
    }

    #[test]
    fn witness_wire_form() {
        let witness = Witness::Htlc(HTLCWitness {
            preimage: "preimage".to_string(),
            signatures: Some(vec!["sig1".to_string()]),
        });

        let encoded = serde_json::to_string(&witness).unwrap();
        let decoded: Witness = serde_json::from_str(&encoded).unwrap();
        assert!(matches!(decoded, Witness::Htlc(_)));

        let witness = Witness::P2pk(P2PKWitness {
            signatures: vec!["sig1".to_string(), "sig2".to_string()],
        });

        let encoded = serde_json::to_string(&witness).unwrap();
        let decoded: Witness = serde_json::from_str(&encoded).unwrap();
        assert!(matches!(decoded, Witness::P2pk(_)));
    }
}
