//! Ed25519 signing keypairs.
//!
//! Secret material is held inside `ed25519_dalek::SigningKey`, which wipes
//! itself on drop. Any temporary copies are zeroized here before returning.

use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use zeroize::{Zeroize, Zeroizing};

use crate::error::SolError;
use crate::pubkey::{Pubkey, PUBKEY_BYTES};

/// Seed (32) followed by the public key (32).
pub const SECRET_KEY_BYTES: usize = 64;

#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Build from a 32-byte Ed25519 seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self, SolError> {
        let mut bytes: [u8; PUBKEY_BYTES] = seed.try_into().map_err(|_| {
            SolError::InvalidPrivateKey(format!("expected 32-byte seed, got {}", seed.len()))
        })?;
        let signing_key = SigningKey::from_bytes(&bytes);
        bytes.zeroize();
        Ok(Self { signing_key })
    }

    /// Build from the 64-byte `seed || pubkey` form. The embedded public key
    /// must match the one derived from the seed.
    pub fn from_secret_key(secret: &[u8]) -> Result<Self, SolError> {
        let mut bytes: [u8; SECRET_KEY_BYTES] = secret.try_into().map_err(|_| {
            SolError::InvalidPrivateKey(format!(
                "expected {SECRET_KEY_BYTES}-byte secret key, got {}",
                secret.len()
            ))
        })?;
        let result = SigningKey::from_keypair_bytes(&bytes);
        bytes.zeroize();
        let signing_key = result.map_err(|_| {
            SolError::InvalidPrivateKey("public key half does not match seed".into())
        })?;
        Ok(Self { signing_key })
    }

    /// Build from the Base58 text of a 64-byte secret key.
    pub fn from_base58_secret(text: &str) -> Result<Self, SolError> {
        let decoded = Zeroizing::new(
            bs58::decode(text)
                .into_vec()
                .map_err(|e| SolError::InvalidPrivateKey(format!("invalid base58: {e}")))?,
        );
        Self::from_secret_key(&decoded)
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.signing_key.verifying_key().to_bytes())
    }

    /// The 64-byte `seed || pubkey` secret key.
    pub fn secret_key(&self) -> Zeroizing<[u8; SECRET_KEY_BYTES]> {
        Zeroizing::new(self.signing_key.to_keypair_bytes())
    }

    pub fn to_base58_secret(&self) -> Zeroizing<String> {
        Zeroizing::new(bs58::encode(&self.secret_key()[..]).into_string())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}
