//! Cryptographic primitives: hashing and BLS12-381 signatures

pub mod bls;
pub mod hash;

pub use bls::{
    BlsError, BlsKeypair, BlsPublicKey, BlsSecretKey, BlsSignature, ProofOfPossession,
};
pub use hash::{EventId, Hash};
