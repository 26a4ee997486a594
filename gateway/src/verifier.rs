//! The verifier capability table.
//!
//! One verifier identity per proof category, rotatable by the
//! administrator. Authorization for verdict delivery is checked against
//! whoever is registered *now*, not whoever answered historically. Nonces
//! are kept per identity and survive removal and re-registration, so a
//! rotated-out-and-back verifier cannot replay its own old payloads.

use std::collections::HashMap;

use crate::error::GatewayError;
use quest_types::{Address, ProofCategory};
use serde::{Deserialize, Serialize};

/// Maps proof categories to verifier identities and tracks replay nonces.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VerifierRegistry {
    by_category: HashMap<ProofCategory, Address>,
    /// Highest accepted nonce per verifier identity.
    nonces: HashMap<Address, u64>,
}

impl VerifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or rotate in) a verifier for a category.
    pub fn register(&mut self, identity: Address, category: ProofCategory) {
        self.by_category.insert(category, identity);
    }

    /// Remove a verifier from every category it serves.
    pub fn remove(&mut self, identity: &Address) {
        self.by_category.retain(|_, v| v != identity);
    }

    /// The verifier currently registered for a category.
    pub fn verifier_for(&self, category: ProofCategory) -> Option<&Address> {
        self.by_category.get(&category)
    }

    /// Whether `identity` currently serves `category`.
    pub fn is_registered_for(&self, identity: &Address, category: ProofCategory) -> bool {
        self.by_category.get(&category) == Some(identity)
    }

    /// Validate a delivery nonce and advance the verifier's watermark.
    ///
    /// A nonce must strictly exceed the last accepted one; an old signed
    /// payload replayed after the watermark advanced is rejected.
    pub fn check_and_advance_nonce(
        &mut self,
        identity: &Address,
        nonce: u64,
    ) -> Result<(), GatewayError> {
        let last = self.nonces.get(identity).copied().unwrap_or(0);
        if nonce <= last {
            return Err(GatewayError::StaleNonce {
                verifier: identity.to_string(),
                got: nonce,
                last,
            });
        }
        self.nonces.insert(identity.clone(), nonce);
        Ok(())
    }

    /// Number of categories with a registered verifier.
    pub fn category_count(&self) -> usize {
        self.by_category.len()
    }
}
