//! BLS12-381 signatures for the Sonic certification chain
//!
//! Public keys live on G1 (48 bytes compressed), signatures and proofs of
//! possession on G2 (96 bytes compressed), so an aggregated certificate
//! carries one 96-byte signature regardless of committee size.
//!
//! # Security Features
//! - Proof of Possession (PoP) to prevent Rogue Key attacks
//! - Secure random key material from OS entropy
//! - Zeroization of secret keys on drop
//! - Domain separation for the different statement kinds
//!
//! # Implementation Notes
//! Uses the pure Rust bls12_381_plus library for cross-platform
//! compatibility. No C compiler required.

use bls12_381_plus::{
    multi_miller_loop, G1Affine, G1Projective, G2Affine, G2Prepared, G2Projective, Gt, Scalar,
};
use ff::Field;
use group::{Curve, Group};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Neg;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Domain Separation Tags (DST) for the different message types.
/// Signatures are only valid in their intended context.
pub mod dst {
    /// DST for general message signing
    pub const MESSAGE: &[u8] = b"SONIC_BLS_SIG_MESSAGE_V1";
    /// DST for Proof of Possession
    pub const PROOF_OF_POSSESSION: &[u8] = b"SONIC_BLS_POP_V1";
    /// DST for block certificate statements
    pub const BLOCK_STATEMENT: &[u8] = b"SONIC_BLS_SIG_BLOCK_V1";
    /// DST for committee certificate statements
    pub const COMMITTEE_STATEMENT: &[u8] = b"SONIC_BLS_SIG_COMMITTEE_V1";
}

/// BLS signature errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlsError {
    /// Secret key is all zeros (invalid)
    ZeroSecretKey,
    /// Public key is invalid or malformed
    InvalidPublicKey,
    /// Signature is invalid or malformed
    InvalidSignature,
    /// Proof of Possession verification failed
    InvalidProofOfPossession,
    /// Key generation failed
    KeyGenerationFailed,
    /// Deserialization failed
    DeserializationFailed,
    /// Empty signer set
    EmptySignerSet,
}

impl fmt::Display for BlsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSecretKey => write!(f, "secret key is all zeros"),
            Self::InvalidPublicKey => write!(f, "invalid or malformed public key"),
            Self::InvalidSignature => write!(f, "invalid or malformed signature"),
            Self::InvalidProofOfPossession => write!(f, "proof of possession verification failed"),
            Self::KeyGenerationFailed => write!(f, "key generation failed"),
            Self::DeserializationFailed => write!(f, "deserialization failed"),
            Self::EmptySignerSet => write!(f, "signer set is empty"),
        }
    }
}

impl std::error::Error for BlsError {}

/// Hash a message to a point on the G2 curve.
///
/// SHA-256 based construction with domain separation; the two-round hash
/// widens the digest to 64 bytes before scalar reduction.
fn hash_to_g2(message: &[u8], dst: &[u8]) -> G2Projective {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(dst);
    hasher.update((message.len() as u64).to_le_bytes());
    hasher.update(message);
    let hash1 = hasher.finalize();

    let mut hasher2 = Sha256::new();
    hasher2.update(hash1);
    hasher2.update(b"_second");
    let hash2 = hasher2.finalize();

    let mut combined = [0u8; 64];
    combined[..32].copy_from_slice(&hash1);
    combined[32..].copy_from_slice(&hash2);

    let scalar = Scalar::from_bytes_wide(&combined);

    G2Projective::generator() * scalar
}

/// BLS Secret Key (32-byte scalar)
///
/// # Security
/// - Zeroized on drop
/// - Never serialized directly (only the public key is serializable)
/// - Generated from OS entropy via getrandom
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BlsSecretKey {
    /// The underlying scalar value
    #[zeroize(skip)]
    scalar: Scalar,
    /// Raw bytes for zeroization
    bytes: [u8; 32],
}

impl BlsSecretKey {
    /// Secret key size in bytes
    pub const BYTES: usize = 32;

    /// Generate a new random secret key using OS entropy
    pub fn generate() -> Result<Self, BlsError> {
        let mut bytes = [0u8; 64];
        getrandom::getrandom(&mut bytes).map_err(|_| BlsError::KeyGenerationFailed)?;

        let scalar = Scalar::from_bytes_wide(&bytes);
        bytes.zeroize();

        if bool::from(scalar.is_zero()) {
            return Err(BlsError::ZeroSecretKey);
        }

        Ok(BlsSecretKey {
            scalar,
            bytes: scalar.to_le_bytes(),
        })
    }

    /// Derive a secret key from 32 bytes of key material
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, BlsError> {
        if bytes.iter().all(|&b| b == 0) {
            return Err(BlsError::ZeroSecretKey);
        }

        let scalar_opt = Scalar::from_le_bytes(bytes);
        if bool::from(scalar_opt.is_none()) {
            return Err(BlsError::DeserializationFailed);
        }
        let scalar = scalar_opt.unwrap();

        if bool::from(scalar.is_zero()) {
            return Err(BlsError::ZeroSecretKey);
        }

        Ok(BlsSecretKey {
            scalar,
            bytes: *bytes,
        })
    }

    /// Get the corresponding public key (G1 point)
    pub fn public_key(&self) -> BlsPublicKey {
        let pk = G1Projective::generator() * self.scalar;
        BlsPublicKey {
            point: pk.to_affine(),
        }
    }

    /// Sign a message with a specific domain separation tag
    pub fn sign(&self, message: &[u8], dst: &[u8]) -> BlsSignature {
        let h = hash_to_g2(message, dst);
        let sig = h * self.scalar;
        BlsSignature {
            point: sig.to_affine(),
        }
    }

    /// Sign a general message (uses MESSAGE DST)
    pub fn sign_message(&self, message: &[u8]) -> BlsSignature {
        self.sign(message, dst::MESSAGE)
    }

    /// Create a Proof of Possession over the serialized public key
    pub fn create_proof_of_possession(&self) -> ProofOfPossession {
        let pk = self.public_key();
        let pk_bytes = pk.to_bytes();
        let sig = self.sign(&pk_bytes, dst::PROOF_OF_POSSESSION);
        ProofOfPossession { signature: sig }
    }
}

impl fmt::Debug for BlsSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlsSecretKey([REDACTED])")
    }
}

/// BLS Public Key (48 bytes compressed G1 point)
#[derive(Clone, Copy)]
pub struct BlsPublicKey {
    point: G1Affine,
}

impl BlsPublicKey {
    /// Compressed public key size in bytes
    pub const BYTES: usize = 48;

    /// Create from compressed bytes (48 bytes)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlsError> {
        if bytes.len() != Self::BYTES {
            return Err(BlsError::InvalidPublicKey);
        }

        if bytes.iter().all(|&b| b == 0) {
            return Err(BlsError::InvalidPublicKey);
        }

        let mut arr = [0u8; 48];
        arr.copy_from_slice(bytes);

        let point_opt = G1Affine::from_compressed(&arr);
        if bool::from(point_opt.is_none()) {
            return Err(BlsError::InvalidPublicKey);
        }

        let point = point_opt.unwrap();

        if bool::from(point.is_identity()) {
            return Err(BlsError::InvalidPublicKey);
        }

        Ok(BlsPublicKey { point })
    }

    /// Serialize to compressed bytes (48 bytes)
    pub fn to_bytes(&self) -> [u8; 48] {
        self.point.to_compressed()
    }

    /// Check the key decodes to a valid non-identity curve point.
    ///
    /// Keys constructed through `from_bytes` already satisfy this; the check
    /// exists for keys that arrive through other codecs.
    pub fn validate(&self) -> Result<(), BlsError> {
        if bool::from(self.point.is_identity()) {
            return Err(BlsError::InvalidPublicKey);
        }
        Ok(())
    }

    /// Verify a signature using the pairing check
    /// `e(-g1, sig) * e(pk, H(m)) == 1`
    pub fn verify(&self, message: &[u8], signature: &BlsSignature, dst: &[u8]) -> bool {
        let h = hash_to_g2(message, dst).to_affine();

        let g1_neg = G1Affine::generator().neg();

        let sig_prepared = G2Prepared::from(signature.point);
        let h_prepared = G2Prepared::from(h);

        let result = multi_miller_loop(&[(&g1_neg, &sig_prepared), (&self.point, &h_prepared)])
            .final_exponentiation();

        result == Gt::identity()
    }

    /// Verify a general message signature
    pub fn verify_message(&self, message: &[u8], signature: &BlsSignature) -> bool {
        self.verify(message, signature, dst::MESSAGE)
    }

    /// Verify a Proof of Possession
    pub fn verify_proof_of_possession(&self, pop: &ProofOfPossession) -> bool {
        let pk_bytes = self.to_bytes();
        self.verify(&pk_bytes, &pop.signature, dst::PROOF_OF_POSSESSION)
    }

    /// Aggregate multiple public keys into one.
    ///
    /// Plain point addition: associative and commutative but not
    /// idempotent. Aggregating a key with itself doubles it.
    pub fn aggregate(pubkeys: &[&BlsPublicKey]) -> Result<Self, BlsError> {
        if pubkeys.is_empty() {
            return Err(BlsError::EmptySignerSet);
        }

        let mut sum = G1Projective::from(pubkeys[0].point);
        for pk in pubkeys.iter().skip(1) {
            sum += G1Projective::from(pk.point);
        }

        Ok(BlsPublicKey {
            point: sum.to_affine(),
        })
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl PartialEq for BlsPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BlsPublicKey {}

impl std::hash::Hash for BlsPublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

impl fmt::Debug for BlsPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlsPublicKey(0x{}...)", &self.to_hex()[..8])
    }
}

impl fmt::Display for BlsPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl Serialize for BlsPublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de> Deserialize<'de> for BlsPublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BlsPublicKeyVisitor;

        impl<'de> serde::de::Visitor<'de> for BlsPublicKeyVisitor {
            type Value = BlsPublicKey;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("48 bytes")
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<BlsPublicKey, E>
            where
                E: serde::de::Error,
            {
                BlsPublicKey::from_bytes(v).map_err(|e| E::custom(e.to_string()))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<BlsPublicKey, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut bytes = Vec::with_capacity(48);
                while let Some(byte) = seq.next_element()? {
                    bytes.push(byte);
                }
                BlsPublicKey::from_bytes(&bytes)
                    .map_err(|e| serde::de::Error::custom(e.to_string()))
            }
        }

        deserializer.deserialize_bytes(BlsPublicKeyVisitor)
    }
}

/// BLS Signature (96 bytes compressed G2 point)
#[derive(Clone, Copy)]
pub struct BlsSignature {
    point: G2Affine,
}

impl BlsSignature {
    /// Compressed signature size in bytes
    pub const BYTES: usize = 96;

    /// Create from compressed bytes (96 bytes)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlsError> {
        if bytes.len() != Self::BYTES {
            return Err(BlsError::InvalidSignature);
        }

        if bytes.iter().all(|&b| b == 0) {
            return Err(BlsError::InvalidSignature);
        }

        let mut arr = [0u8; 96];
        arr.copy_from_slice(bytes);

        let point_opt = G2Affine::from_compressed(&arr);
        if bool::from(point_opt.is_none()) {
            return Err(BlsError::InvalidSignature);
        }

        Ok(BlsSignature {
            point: point_opt.unwrap(),
        })
    }

    /// Serialize to compressed bytes (96 bytes)
    pub fn to_bytes(&self) -> [u8; 96] {
        self.point.to_compressed()
    }

    /// Aggregate multiple signatures into one.
    ///
    /// Plain point addition: associative and commutative but not
    /// idempotent. `aggregate(&[s, s])` is not `s`.
    pub fn aggregate(signatures: &[&BlsSignature]) -> Result<Self, BlsError> {
        if signatures.is_empty() {
            return Err(BlsError::EmptySignerSet);
        }

        let mut sum = G2Projective::from(signatures[0].point);
        for sig in signatures.iter().skip(1) {
            sum += G2Projective::from(sig.point);
        }

        Ok(BlsSignature {
            point: sum.to_affine(),
        })
    }

    /// Verify this signature as an aggregate over `pubkeys`, all of whom
    /// signed the same `message`.
    ///
    /// The public keys are summed on G1 first so the whole check costs one
    /// multi-Miller loop, which is the fast path for many keys on one
    /// message.
    pub fn verify_all(&self, pubkeys: &[&BlsPublicKey], message: &[u8], dst: &[u8]) -> bool {
        let agg_pk = match BlsPublicKey::aggregate(pubkeys) {
            Ok(pk) => pk,
            Err(_) => return false,
        };
        agg_pk.verify(message, self, dst)
    }

    /// Verify against a single public key
    pub fn verify(&self, message: &[u8], pubkey: &BlsPublicKey, dst: &[u8]) -> bool {
        pubkey.verify(message, self, dst)
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl PartialEq for BlsSignature {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BlsSignature {}

impl fmt::Debug for BlsSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlsSignature(0x{}...)", &self.to_hex()[..8])
    }
}

impl Serialize for BlsSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de> Deserialize<'de> for BlsSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BlsSignatureVisitor;

        impl<'de> serde::de::Visitor<'de> for BlsSignatureVisitor {
            type Value = BlsSignature;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("96 bytes")
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<BlsSignature, E>
            where
                E: serde::de::Error,
            {
                BlsSignature::from_bytes(v).map_err(|e| E::custom(e.to_string()))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<BlsSignature, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut bytes = Vec::with_capacity(96);
                while let Some(byte) = seq.next_element()? {
                    bytes.push(byte);
                }
                BlsSignature::from_bytes(&bytes)
                    .map_err(|e| serde::de::Error::custom(e.to_string()))
            }
        }

        deserializer.deserialize_bytes(BlsSignatureVisitor)
    }
}

/// Proof of Possession (PoP)
///
/// A signature over the signer's own serialized public key. Committees
/// reject members without a valid PoP, which defends signature aggregation
/// against rogue-key attacks.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfPossession {
    signature: BlsSignature,
}

impl ProofOfPossession {
    /// Proof size in bytes (a G2 signature)
    pub const BYTES: usize = 96;

    /// Get the signature bytes
    pub fn to_bytes(&self) -> [u8; 96] {
        self.signature.to_bytes()
    }

    /// Create from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlsError> {
        Ok(ProofOfPossession {
            signature: BlsSignature::from_bytes(bytes)
                .map_err(|_| BlsError::InvalidProofOfPossession)?,
        })
    }

    /// Verify this proof of possession against a public key
    pub fn verify(&self, pubkey: &BlsPublicKey) -> bool {
        pubkey.verify_proof_of_possession(self)
    }
}

impl fmt::Debug for ProofOfPossession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ProofOfPossession(0x{}...)",
            &hex::encode(self.to_bytes())[..8]
        )
    }
}

/// BLS Keypair (secret key + public key + proof of possession)
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct BlsKeypair {
    #[zeroize(skip)]
    secret_key: BlsSecretKey,
    #[zeroize(skip)]
    public_key: BlsPublicKey,
    #[zeroize(skip)]
    proof_of_possession: ProofOfPossession,
}

impl BlsKeypair {
    /// Generate a new random keypair with PoP
    pub fn generate() -> Result<Self, BlsError> {
        let secret_key = BlsSecretKey::generate()?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Create from existing secret key
    pub fn from_secret_key(secret_key: BlsSecretKey) -> Self {
        let public_key = secret_key.public_key();
        let proof_of_possession = secret_key.create_proof_of_possession();

        BlsKeypair {
            secret_key,
            public_key,
            proof_of_possession,
        }
    }

    /// Get the public key
    pub fn public_key(&self) -> &BlsPublicKey {
        &self.public_key
    }

    /// Get the proof of possession
    pub fn proof_of_possession(&self) -> &ProofOfPossession {
        &self.proof_of_possession
    }

    /// Sign a message under a domain separation tag
    pub fn sign(&self, message: &[u8], dst: &[u8]) -> BlsSignature {
        self.secret_key.sign(message, dst)
    }

    /// Sign a general message
    pub fn sign_message(&self, message: &[u8]) -> BlsSignature {
        self.secret_key.sign_message(message)
    }

    /// Verify the internal PoP is valid
    pub fn verify_self(&self) -> bool {
        self.public_key
            .verify_proof_of_possession(&self.proof_of_possession)
    }
}

impl fmt::Debug for BlsKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlsKeypair")
            .field("public_key", &self.public_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let keypair = BlsKeypair::generate().unwrap();
        assert!(keypair.verify_self());
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = BlsKeypair::generate().unwrap();
        let message = b"Hello, Sonic!";

        let signature = keypair.sign_message(message);
        assert!(keypair.public_key().verify_message(message, &signature));

        assert!(!keypair.public_key().verify_message(b"wrong message", &signature));
    }

    #[test]
    fn test_key_and_signature_sizes() {
        let keypair = BlsKeypair::generate().unwrap();
        assert_eq!(keypair.public_key().to_bytes().len(), 48);
        assert_eq!(keypair.sign_message(b"m").to_bytes().len(), 96);
        assert_eq!(keypair.proof_of_possession().to_bytes().len(), 96);
    }

    #[test]
    fn test_proof_of_possession() {
        let keypair = BlsKeypair::generate().unwrap();
        assert!(keypair
            .public_key()
            .verify_proof_of_possession(keypair.proof_of_possession()));

        let other = BlsKeypair::generate().unwrap();
        assert!(!keypair
            .public_key()
            .verify_proof_of_possession(other.proof_of_possession()));
    }

    #[test]
    fn test_aggregate_verify_all() {
        // Two keys sign "hello"; the aggregate verifies against exactly
        // those two keys and no other pair.
        let kp1 = BlsKeypair::generate().unwrap();
        let kp2 = BlsKeypair::generate().unwrap();
        let kp3 = BlsKeypair::generate().unwrap();

        let s1 = kp1.sign_message(b"hello");
        let s2 = kp2.sign_message(b"hello");

        let agg = BlsSignature::aggregate(&[&s1, &s2]).unwrap();

        assert!(agg.verify_all(&[kp1.public_key(), kp2.public_key()], b"hello", dst::MESSAGE));
        assert!(!agg.verify_all(&[kp1.public_key(), kp3.public_key()], b"hello", dst::MESSAGE));
    }

    #[test]
    fn test_aggregation_not_idempotent() {
        let kp = BlsKeypair::generate().unwrap();
        let s = kp.sign_message(b"m");

        let doubled = BlsSignature::aggregate(&[&s, &s]).unwrap();
        assert_ne!(doubled, s);
    }

    #[test]
    fn test_aggregation_commutative() {
        let kp1 = BlsKeypair::generate().unwrap();
        let kp2 = BlsKeypair::generate().unwrap();
        let s1 = kp1.sign_message(b"m");
        let s2 = kp2.sign_message(b"m");

        let ab = BlsSignature::aggregate(&[&s1, &s2]).unwrap();
        let ba = BlsSignature::aggregate(&[&s2, &s1]).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_serialization_round_trip() {
        let keypair = BlsKeypair::generate().unwrap();

        let pk_bytes = keypair.public_key().to_bytes();
        let pk_restored = BlsPublicKey::from_bytes(&pk_bytes).unwrap();
        assert_eq!(keypair.public_key(), &pk_restored);

        let message = b"round trip";
        let signature = keypair.sign_message(message);
        let sig_restored = BlsSignature::from_bytes(&signature.to_bytes()).unwrap();
        assert!(keypair.public_key().verify_message(message, &sig_restored));

        let sk_restored = BlsSecretKey::from_bytes(&keypair.secret_key.bytes).unwrap();
        assert_eq!(sk_restored.public_key(), *keypair.public_key());
    }

    #[test]
    fn test_domain_separation() {
        let keypair = BlsKeypair::generate().unwrap();
        let data = b"same data";

        let block_sig = keypair.sign(data, dst::BLOCK_STATEMENT);
        let committee_sig = keypair.sign(data, dst::COMMITTEE_STATEMENT);

        assert_ne!(block_sig.to_bytes(), committee_sig.to_bytes());
        assert!(keypair.public_key().verify(data, &block_sig, dst::BLOCK_STATEMENT));
        assert!(!keypair.public_key().verify(data, &block_sig, dst::COMMITTEE_STATEMENT));
    }

    #[test]
    fn test_reject_zero_keys() {
        let zero_bytes = [0u8; 32];
        assert!(BlsSecretKey::from_bytes(&zero_bytes).is_err());

        let zero_pk_bytes = [0u8; 48];
        assert!(BlsPublicKey::from_bytes(&zero_pk_bytes).is_err());

        let zero_sig_bytes = [0u8; 96];
        assert!(BlsSignature::from_bytes(&zero_sig_bytes).is_err());
    }

    #[test]
    fn test_reject_wrong_lengths() {
        assert!(BlsPublicKey::from_bytes(&[1u8; 96]).is_err());
        assert!(BlsSignature::from_bytes(&[1u8; 48]).is_err());
    }
}
