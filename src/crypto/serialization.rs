//! Supporting routines for serializing crypto types.
//!
//! Points and scalars are represented as hex strings of their canonical 32-byte encodings.

use curve25519::scalar::Scalar;
use exonum::encoding::serialize::{decode_hex, encode_hex};
use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};

use super::keys::{PublicKey, SecretKey};
use super::proofs::{Commitment, RangeProof, Token};

fn hex_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let s = String::deserialize(deserializer)?;
    decode_hex(&s).map_err(|e| D::Error::custom(e.to_string()))
}

fn scalar_from_slice(slice: &[u8]) -> Option<Scalar> {
    if slice.len() != 32 {
        return None;
    }
    let mut bytes = [0_u8; 32];
    bytes.copy_from_slice(slice);
    Scalar::from_canonical_bytes(bytes)
}

macro_rules! impl_hex_serde {
    ($($name:ident),*) => {
        $(
            impl Serialize for $name {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.serialize_str(&encode_hex(&self.to_bytes()))
                }
            }

            impl<'de> Deserialize<'de> for $name {
                fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    let bytes = hex_bytes(deserializer)?;
                    $name::from_slice(&bytes).ok_or_else(|| {
                        D::Error::custom(concat!("non-canonical `", stringify!($name), "`"))
                    })
                }
            }
        )*
    };
}

impl_hex_serde!(Commitment, Token, PublicKey, SecretKey);

/// `serde` adapter for `Scalar` fields.
pub(crate) mod scalar {
    use super::*;

    pub fn serialize<S: Serializer>(scalar: &Scalar, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode_hex(&scalar.as_bytes()[..]))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Scalar, D::Error> {
        let bytes = hex_bytes(deserializer)?;
        scalar_from_slice(&bytes).ok_or_else(|| D::Error::custom("non-canonical `Scalar`"))
    }
}

/// `serde` adapter for `Vec<Scalar>` fields.
pub(crate) mod scalars {
    use super::*;

    pub fn serialize<S: Serializer>(
        scalars: &[Scalar],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let strings: Vec<_> = scalars
            .iter()
            .map(|scalar| encode_hex(&scalar.as_bytes()[..]))
            .collect();
        strings.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Scalar>, D::Error> {
        let strings = Vec::<String>::deserialize(deserializer)?;
        strings
            .iter()
            .map(|s| {
                let bytes = decode_hex(s).map_err(|e| D::Error::custom(e.to_string()))?;
                scalar_from_slice(&bytes).ok_or_else(|| D::Error::custom("non-canonical `Scalar`"))
            }).collect()
    }
}

#[derive(Serialize, Deserialize)]
struct RangeProofRepr {
    proof: String,
    committed: String,
}

impl Serialize for RangeProof {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RangeProofRepr {
            proof: encode_hex(&self.to_bytes()),
            committed: encode_hex(&self.committed_bytes()),
        }.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RangeProof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = RangeProofRepr::deserialize(deserializer)?;
        let proof = decode_hex(&repr.proof).map_err(|e| D::Error::custom(e.to_string()))?;
        let committed =
            decode_hex(&repr.committed).map_err(|e| D::Error::custom(e.to_string()))?;
        RangeProof::from_parts(&proof, &committed)
            .ok_or_else(|| D::Error::custom("invalid `RangeProof`"))
    }
}
