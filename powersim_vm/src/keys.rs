//! Deterministic key provider for simulated accounts.

use ed25519_dalek::{SigningKey, VerifyingKey};
use powersim_actors::Address;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

/// Provides deterministic Ed25519 account keys derived from a seed.
///
/// Keys are:
/// - Deterministic: same seed and index always produce the same key
/// - Unique: each index gets a different key
/// - Isolated: generating more keys doesn't change earlier ones
pub struct DeterministicKeyProvider {
    /// Master seed
    master_seed: u64,

    /// Cache of generated keys by account index
    key_cache: HashMap<u64, SigningKey>,
}

impl DeterministicKeyProvider {
    pub fn new(master_seed: u64) -> Self {
        Self {
            master_seed,
            key_cache: HashMap::new(),
        }
    }

    /// Generates or retrieves the signing key for an account index.
    ///
    /// The key seed is `master_seed * golden + index * prime`.
    pub fn account_key(&mut self, index: u64) -> SigningKey {
        if let Some(key) = self.key_cache.get(&index) {
            return key.clone();
        }

        let account_seed = self
            .master_seed
            .wrapping_mul(0x9e3779b97f4a7c15)
            .wrapping_add(index.wrapping_mul(0x517cc1b727220a95));

        let mut rng = ChaCha8Rng::seed_from_u64(account_seed);
        let key = SigningKey::generate(&mut rng);

        self.key_cache.insert(index, key.clone());
        key
    }

    /// Key address of the account at `index`.
    pub fn account_address(&mut self, index: u64) -> Address {
        let public: VerifyingKey = self.account_key(index).verifying_key();
        Address::new_key(public.as_bytes())
    }
}
