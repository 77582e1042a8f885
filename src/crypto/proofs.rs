use bulletproofs::{BulletproofGens, PedersenGens, ProofError, RangeProof as Bulletproof};
use byteorder::{ByteOrder, LittleEndian};
use curve25519::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
    traits::Identity,
};
use merlin::Transcript;
use rand::SeedableRng;
use rand_chacha::ChaChaRng;

use std::ops;

use super::keys::{random_scalar, PublicKey};

/// Bit size of range proofs and dimension of the proof blinding vectors.
pub const BITS: usize = 64;

lazy_static! {
    pub(crate) static ref PEDERSEN_GENS: PedersenGens = PedersenGens::default();
    static ref BULLETPROOF_GENS: BulletproofGens = BulletproofGens::new(BITS, 1);
}

/// Pedersen commitment to a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commitment {
    pub(crate) inner: RistrettoPoint,
}

impl Commitment {
    /// Size of the byte representation of the commitment (i.e., a compressed Ristretto point).
    pub(crate) const BYTE_LEN: usize = 32;

    /// Neutral element for commitment addition.
    pub fn identity() -> Self {
        Commitment {
            inner: RistrettoPoint::identity(),
        }
    }

    pub fn from_opening(opening: &Opening) -> Self {
        let inner = PEDERSEN_GENS.commit(Scalar::from(opening.value), opening.blinding);
        Commitment { inner }
    }

    /// Attempts to deserialize a commitment from byte slice.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != Self::BYTE_LEN {
            return None;
        }

        let compressed_point = CompressedRistretto::from_slice(slice);
        compressed_point
            .decompress()
            .map(|point| Commitment { inner: point })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.compress().as_bytes().to_vec()
    }

    pub fn verify(&self, opening: &Opening) -> bool {
        *self == Self::from_opening(opening)
    }
}

impl ops::Add for Commitment {
    type Output = Commitment;

    fn add(self, rhs: Self) -> Commitment {
        Commitment {
            inner: self.inner + rhs.inner,
        }
    }
}

impl ops::AddAssign for Commitment {
    fn add_assign(&mut self, rhs: Self) {
        self.inner += rhs.inner;
    }
}

/// Value together with the blinding factor of its commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opening {
    pub value: u64,
    pub blinding: Scalar,
}

impl Opening {
    pub fn new(value: u64, blinding: Scalar) -> Self {
        Opening { value, blinding }
    }

    pub fn with_no_blinding(value: u64) -> Self {
        Opening::new(value, Scalar::zero())
    }
}

impl ops::Add for Opening {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Opening {
            value: self.value.checked_add(rhs.value).expect("integer overflow"),
            blinding: self.blinding + rhs.blinding,
        }
    }
}

/// Spend token, `r * pk` for the commitment blinding `r` and the account key `pk`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub(crate) inner: RistrettoPoint,
}

impl Token {
    pub(crate) const BYTE_LEN: usize = 32;

    pub fn new(blinding: &Scalar, public_key: &PublicKey) -> Self {
        Token {
            inner: public_key.inner * blinding,
        }
    }

    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != Self::BYTE_LEN {
            return None;
        }
        CompressedRistretto::from_slice(slice)
            .decompress()
            .map(|inner| Token { inner })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.compress().as_bytes().to_vec()
    }
}

/// Auxiliary randomness for the range proofs of one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRandomness {
    #[serde(with = "super::serialization::scalar")]
    pub alpha: Scalar,
    #[serde(with = "super::serialization::scalar")]
    pub rho: Scalar,
    #[serde(with = "super::serialization::scalar")]
    pub tau1: Scalar,
    #[serde(with = "super::serialization::scalar")]
    pub tau2: Scalar,
    #[serde(with = "super::serialization::scalars")]
    pub s_l: Vec<Scalar>,
    #[serde(with = "super::serialization::scalars")]
    pub s_r: Vec<Scalar>,
}

impl ProofRandomness {
    const SEED_LABEL: &'static [u8] = b"confidential_ledger.proof_rng";

    /// Draws fresh randomness.
    pub fn random() -> Self {
        ProofRandomness {
            alpha: random_scalar(),
            rho: random_scalar(),
            tau1: random_scalar(),
            tau2: random_scalar(),
            s_l: (0..BITS).map(|_| random_scalar()).collect(),
            s_r: (0..BITS).map(|_| random_scalar()).collect(),
        }
    }

    /// Checks that the blinding vectors have the proof dimension.
    pub fn is_well_formed(&self) -> bool {
        self.s_l.len() == BITS && self.s_r.len() == BITS
    }

    /// Deterministic generator feeding the prover. The proved opening is absorbed
    /// together with the scheduled randomness, so that different openings proved with
    /// the same window never share prover nonces.
    fn rng_for(&self, opening: &Opening) -> ChaChaRng {
        let mut transcript = Transcript::new(Self::SEED_LABEL);
        transcript.append_message(b"alpha", self.alpha.as_bytes());
        transcript.append_message(b"rho", self.rho.as_bytes());
        transcript.append_message(b"tau1", self.tau1.as_bytes());
        transcript.append_message(b"tau2", self.tau2.as_bytes());
        for scalar in &self.s_l {
            transcript.append_message(b"s_l", scalar.as_bytes());
        }
        for scalar in &self.s_r {
            transcript.append_message(b"s_r", scalar.as_bytes());
        }

        let mut value_bytes = [0_u8; 8];
        LittleEndian::write_u64(&mut value_bytes, opening.value);
        transcript.append_message(b"value", &value_bytes);
        transcript.append_message(b"blinding", opening.blinding.as_bytes());

        let mut seed = [0_u8; 32];
        transcript.challenge_bytes(b"seed", &mut seed);
        ChaChaRng::from_seed(seed)
    }
}

/// Range proof asserting that a committed value lies in `[0, 2^64)`.
#[derive(Debug, Clone)]
pub struct RangeProof {
    pub(crate) inner: Bulletproof,
    pub(crate) committed: CompressedRistretto,
}

impl RangeProof {
    const DOMAIN_SEPARATOR: &'static [u8] = b"confidential_ledger.range_proof";

    /// Proves that `opening` holds a value in range, using only the scheduled `randomness`.
    pub fn prove(opening: &Opening, randomness: &ProofRandomness) -> Result<Self, ProofError> {
        let mut transcript = Transcript::new(Self::DOMAIN_SEPARATOR);
        let mut rng = randomness.rng_for(opening);
        let (proof, committed) = Bulletproof::prove_single_with_rng(
            &BULLETPROOF_GENS,
            &PEDERSEN_GENS,
            &mut transcript,
            opening.value,
            &opening.blinding,
            BITS,
            &mut rng,
        )?;

        Ok(RangeProof {
            inner: proof,
            committed,
        })
    }

    pub(crate) fn from_parts(proof: &[u8], committed: &[u8]) -> Option<Self> {
        if committed.len() != Commitment::BYTE_LEN {
            return None;
        }
        let committed = CompressedRistretto::from_slice(committed);
        committed.decompress()?;
        Some(RangeProof {
            inner: Bulletproof::from_bytes(proof).ok()?,
            committed,
        })
    }

    /// Commitment the proof is produced for.
    pub fn commitment(&self) -> Option<Commitment> {
        self.committed
            .decompress()
            .map(|inner| Commitment { inner })
    }

    /// Verifies the proof against the commitment it carries.
    pub fn verify(&self) -> bool {
        let mut transcript = Transcript::new(Self::DOMAIN_SEPARATOR);
        self.inner
            .verify_single(
                &BULLETPROOF_GENS,
                &PEDERSEN_GENS,
                &mut transcript,
                &self.committed,
                BITS,
            ).is_ok()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.to_bytes()
    }

    pub(crate) fn committed_bytes(&self) -> Vec<u8> {
        self.committed.as_bytes().to_vec()
    }
}

impl PartialEq for RangeProof {
    fn eq(&self, other: &Self) -> bool {
        self.committed == other.committed && self.to_bytes() == other.to_bytes()
    }
}

#[test]
fn commitment_arithmetic() {
    let opening1 = Opening::new(100, random_scalar());
    let opening2 = Opening::new(200, random_scalar());
    let comm1 = Commitment::from_opening(&opening1);
    let comm2 = Commitment::from_opening(&opening2);
    assert!((comm1 + comm2).verify(&(opening1.clone() + opening2.clone())));

    let mut sum = Commitment::identity();
    sum += comm1;
    sum += comm2;
    assert_eq!(sum, comm1 + comm2);
}

#[test]
fn token_depends_on_key_and_blinding() {
    use super::keys::KeyPair;

    let blinding = random_scalar();
    let (alice, bob) = (KeyPair::random(), KeyPair::random());
    let token = Token::new(&blinding, alice.public_key());
    assert_eq!(token, Token::new(&blinding, alice.public_key()));
    assert_ne!(token, Token::new(&blinding, bob.public_key()));
    assert_ne!(token, Token::new(&random_scalar(), alice.public_key()));
}

#[test]
fn proof_commits_to_opening() {
    let opening = Opening::new(12_345, random_scalar());
    let proof = RangeProof::prove(&opening, &ProofRandomness::random()).expect("prove");
    assert!(proof.verify());
    assert_eq!(proof.commitment(), Some(Commitment::from_opening(&opening)));
}

#[test]
fn proofs_are_determined_by_scheduled_randomness() {
    let randomness = ProofRandomness::random();
    let opening = Opening::new(70, random_scalar());
    let proof = RangeProof::prove(&opening, &randomness).expect("prove");
    let same_proof = RangeProof::prove(&opening, &randomness).expect("prove");
    assert_eq!(proof, same_proof);

    let other_randomness = ProofRandomness::random();
    let other_proof = RangeProof::prove(&opening, &other_randomness).expect("prove");
    assert_ne!(proof.to_bytes(), other_proof.to_bytes());

    let other_opening = Opening::new(70, random_scalar());
    let other_proof = RangeProof::prove(&other_opening, &randomness).expect("prove");
    assert_ne!(proof.to_bytes(), other_proof.to_bytes());
}

#[test]
fn tampered_proofs_do_not_verify() {
    let randomness = ProofRandomness::random();
    let proof = RangeProof::prove(&Opening::new(1, random_scalar()), &randomness).expect("prove");
    let other = RangeProof::prove(&Opening::new(2, random_scalar()), &randomness).expect("prove");
    let forged = RangeProof {
        inner: proof.inner.clone(),
        committed: other.committed,
    };
    assert!(!forged.verify());
}

#[test]
fn proof_randomness_has_proof_dimension() {
    let randomness = ProofRandomness::random();
    assert!(randomness.is_well_formed());
    assert_eq!(randomness.s_l.len(), BITS);
    assert_ne!(randomness.s_l, randomness.s_r);
}
