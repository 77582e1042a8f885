//! Account keys.

use curve25519::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use rand::thread_rng;

use std::fmt;

use super::proofs::PEDERSEN_GENS;

/// Draws a scalar uniformly from the scalar field.
pub fn random_scalar() -> Scalar {
    Scalar::random(&mut thread_rng())
}

/// Public key of an account, `sk * B_blinding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    pub(crate) inner: RistrettoPoint,
}

impl PublicKey {
    pub(crate) const BYTE_LEN: usize = 32;

    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != Self::BYTE_LEN {
            return None;
        }
        CompressedRistretto::from_slice(slice)
            .decompress()
            .map(|inner| PublicKey { inner })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.compress().as_bytes().to_vec()
    }
}

/// Secret key of an account.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(pub(crate) Scalar);

impl SecretKey {
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != 32 {
            return None;
        }
        let mut bytes = [0_u8; 32];
        bytes.copy_from_slice(slice);
        Scalar::from_canonical_bytes(bytes).map(SecretKey)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: PEDERSEN_GENS.B_blinding * self.0,
        }
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("SecretKey(..)")
    }
}

/// Long-lived keypair of an account.
#[derive(Clone)]
pub struct KeyPair {
    public_key: PublicKey,
    secret_key: SecretKey,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl KeyPair {
    /// Generates a random keypair.
    pub fn random() -> Self {
        Self::from_secret(SecretKey(random_scalar()))
    }

    pub fn from_secret(secret_key: SecretKey) -> Self {
        KeyPair {
            public_key: secret_key.public_key(),
            secret_key,
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }
}

#[test]
fn public_key_is_derived_from_secret() {
    let keypair = KeyPair::random();
    let restored = SecretKey::from_slice(&keypair.secret_key().to_bytes()).expect("secret key");
    assert_eq!(restored.public_key(), *keypair.public_key());
    assert_eq!(
        PublicKey::from_slice(&keypair.public_key().to_bytes()),
        Some(*keypair.public_key())
    );
}

#[test]
fn keypair_debug_hides_secret() {
    let keypair = KeyPair::random();
    let secret_hex = format!("{:?}", keypair.secret_key().0);
    let debug = format!("{:?}", keypair);
    assert!(!debug.contains(&secret_hex));
    assert_eq!(format!("{:?}", keypair.secret_key()), "SecretKey(..)");
}
