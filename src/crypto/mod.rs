// Copyright 2018 The Exonum Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cryptographic primitives used by the ledger.
//!
//! # Commitments and tokens
//!
//! Every transaction row stores, for each account, a Pedersen [`Commitment`] to the value
//! the account takes part with, and a spend [`Token`] binding the commitment blinding
//! to the account's [`PublicKey`]. Commitments are additively homomorphic, which allows
//! to accumulate the whole history of an account into a single commitment.
//!
//! # Range proofs
//!
//! [`RangeProof`]s are 64-bit Bulletproofs. Unlike ordinary Bulletproof usage,
//! the prover does not draw randomness when proving: all auxiliary randomness comes from
//! [`ProofRandomness`] scheduled on the ledger ahead of time.
//!
//! [`Commitment`]: ::crypto::Commitment
//! [`Token`]: ::crypto::Token
//! [`PublicKey`]: ::crypto::PublicKey
//! [`RangeProof`]: ::crypto::RangeProof
//! [`ProofRandomness`]: ::crypto::ProofRandomness

mod keys;
mod proofs;
pub(crate) mod serialization;

pub use self::keys::{random_scalar, KeyPair, PublicKey, SecretKey};
pub use self::proofs::{Commitment, Opening, ProofRandomness, RangeProof, Token, BITS};
pub use curve25519::scalar::Scalar;
