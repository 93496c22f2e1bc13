//! Account keys and signatures.
//!
//! Both public keys and signatures carry a one byte algorithm tag in their
//! binary and hex forms: `01` for Ed25519 and `02` for secp256k1.
use super::hashes::{blake2b256, HASH_LENGTH};
use crate::common::{invalid_data, io, serialize_tagged, BorshDeserialize, BorshSerialize};
use ed25519_dalek::{
    pkcs8::DecodePrivateKey,
    Signer,
    Verifier,
};
use std::{fmt, path::Path, str::FromStr};

const ED25519_TAG: u8 = 1;
const SECP256K1_TAG: u8 = 2;

const ED25519_PUBLIC_KEY_LENGTH: usize = 32;
const SECP256K1_PUBLIC_KEY_LENGTH: usize = 33;
const SIGNATURE_LENGTH: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("Unsupported key algorithm tag {0}.")]
    UnsupportedAlgorithm(u8),
    #[error("Invalid key material: {0}")]
    InvalidKey(String),
    #[error("Not a valid hex string: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("The PEM data is neither an Ed25519 nor a secp256k1 secret key.")]
    UnrecognizedPem,
    #[error("Could not read key file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Signature and public key use different algorithms.")]
    AlgorithmMismatch,
    #[error("The signature is not valid.")]
    InvalidSignature,
}

/// Public key of an account.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PublicKey {
    Ed25519([u8; ED25519_PUBLIC_KEY_LENGTH]),
    /// Compressed SEC1 encoding of the point.
    Secp256k1([u8; SECP256K1_PUBLIC_KEY_LENGTH]),
}

impl PublicKey {
    fn tag(&self) -> u8 {
        match self {
            PublicKey::Ed25519(_) => ED25519_TAG,
            PublicKey::Secp256k1(_) => SECP256K1_TAG,
        }
    }

    fn algorithm_name(&self) -> &'static str {
        match self {
            PublicKey::Ed25519(_) => "ed25519",
            PublicKey::Secp256k1(_) => "secp256k1",
        }
    }

    /// The key bytes without the algorithm tag.
    pub fn key_bytes(&self) -> &[u8] {
        match self {
            PublicKey::Ed25519(bytes) => bytes,
            PublicKey::Secp256k1(bytes) => bytes,
        }
    }

    /// The account hash that identifies the account with this main key.
    /// It is the hash of the lowercase algorithm name, a zero byte and the
    /// key bytes.
    pub fn to_account_hash(&self) -> [u8; HASH_LENGTH] {
        blake2b256([self.algorithm_name().as_bytes(), &[0u8], self.key_bytes()])
    }

    /// Check that the signature on the message was produced by the secret
    /// key corresponding to this public key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), KeyError> {
        match (self, signature) {
            (PublicKey::Ed25519(key), Signature::Ed25519(sig)) => {
                let key = ed25519_dalek::VerifyingKey::from_bytes(key)
                    .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
                key.verify(message, &ed25519_dalek::Signature::from_bytes(sig))
                    .map_err(|_| KeyError::InvalidSignature)
            }
            (PublicKey::Secp256k1(key), Signature::Secp256k1(sig)) => {
                let key = k256::ecdsa::VerifyingKey::from_sec1_bytes(key)
                    .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
                let sig = k256::ecdsa::Signature::from_slice(sig)
                    .map_err(|_| KeyError::InvalidSignature)?;
                key.verify(message, &sig)
                    .map_err(|_| KeyError::InvalidSignature)
            }
            _ => Err(KeyError::AlgorithmMismatch),
        }
    }

    /// Parse from the tagged bytes.
    pub fn from_tagged_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let (tag, rest) = bytes
            .split_first()
            .ok_or_else(|| KeyError::InvalidKey("empty key".into()))?;
        let wrong_length = || KeyError::InvalidKey(format!("unexpected length {}", rest.len()));
        match *tag {
            ED25519_TAG => Ok(PublicKey::Ed25519(
                rest.try_into().map_err(|_| wrong_length())?,
            )),
            SECP256K1_TAG => Ok(PublicKey::Secp256k1(
                rest.try_into().map_err(|_| wrong_length())?,
            )),
            tag => Err(KeyError::UnsupportedAlgorithm(tag)),
        }
    }
}

/// Tagged lowercase hex, e.g., `01` followed by 64 hex digits for an Ed25519
/// key.
impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{}", self.tag(), hex::encode(self.key_bytes()))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(self, f) }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::from_tagged_bytes(&hex::decode(s)?) }
}

impl BorshSerialize for PublicKey {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            PublicKey::Ed25519(bytes) => serialize_tagged(ED25519_TAG, bytes, writer),
            PublicKey::Secp256k1(bytes) => serialize_tagged(SECP256K1_TAG, bytes, writer),
        }
    }
}

impl BorshDeserialize for PublicKey {
    fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
        match u8::deserialize_reader(reader)? {
            ED25519_TAG => Ok(PublicKey::Ed25519(BorshDeserialize::deserialize_reader(reader)?)),
            SECP256K1_TAG => Ok(PublicKey::Secp256k1(BorshDeserialize::deserialize_reader(
                reader,
            )?)),
            tag => Err(invalid_data(format!("Unsupported public key tag {}.", tag))),
        }
    }
}

/// A signature together with the algorithm that produced it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signature {
    Ed25519([u8; SIGNATURE_LENGTH]),
    Secp256k1([u8; SIGNATURE_LENGTH]),
}

impl Signature {
    fn tag(&self) -> u8 {
        match self {
            Signature::Ed25519(_) => ED25519_TAG,
            Signature::Secp256k1(_) => SECP256K1_TAG,
        }
    }

    pub fn signature_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        match self {
            Signature::Ed25519(bytes) | Signature::Secp256k1(bytes) => bytes,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{}", self.tag(), hex::encode(self.signature_bytes()))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(self, f) }
}

impl FromStr for Signature {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let (tag, rest) = bytes
            .split_first()
            .ok_or(KeyError::InvalidSignature)?;
        let rest: [u8; SIGNATURE_LENGTH] = rest.try_into().map_err(|_| KeyError::InvalidSignature)?;
        match *tag {
            ED25519_TAG => Ok(Signature::Ed25519(rest)),
            SECP256K1_TAG => Ok(Signature::Secp256k1(rest)),
            tag => Err(KeyError::UnsupportedAlgorithm(tag)),
        }
    }
}

impl BorshSerialize for Signature {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        serialize_tagged(self.tag(), self.signature_bytes(), writer)
    }
}

macro_rules! serde_via_string {
    ($ty:ty) => {
        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
                ser.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(des: D) -> Result<Self, D::Error> {
                let s = <String as serde::Deserialize>::deserialize(des)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

serde_via_string!(PublicKey);
serde_via_string!(Signature);

/// A secret key that can sign deploys.
#[derive(Clone)]
pub enum SecretKey {
    Ed25519(ed25519_dalek::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey({})", DeploySigner::public_key(self))
    }
}

impl SecretKey {
    /// Parse a PEM encoded secret key. Ed25519 keys are expected in PKCS#8
    /// form. secp256k1 keys may be in either SEC1 or PKCS#8 form.
    pub fn from_pem(pem: &str) -> Result<Self, KeyError> {
        if let Ok(key) = ed25519_dalek::SigningKey::from_pkcs8_pem(pem) {
            return Ok(SecretKey::Ed25519(key));
        }
        if let Ok(key) = k256::SecretKey::from_sec1_pem(pem) {
            return Ok(SecretKey::Secp256k1(key.into()));
        }
        if let Ok(key) = k256::SecretKey::from_pkcs8_pem(pem) {
            return Ok(SecretKey::Secp256k1(key.into()));
        }
        Err(KeyError::UnrecognizedPem)
    }

    /// Read a PEM encoded secret key from a file, e.g., the `secret_key.pem`
    /// produced by the node's key generator.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        let pem = std::fs::read_to_string(path)?;
        Self::from_pem(&pem)
    }

    pub fn ed25519_from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; ed25519_dalek::SECRET_KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| KeyError::InvalidKey(format!("unexpected length {}", bytes.len())))?;
        Ok(SecretKey::Ed25519(ed25519_dalek::SigningKey::from_bytes(&bytes)))
    }

    pub fn secp256k1_from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let key = k256::ecdsa::SigningKey::from_slice(bytes)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
        Ok(SecretKey::Secp256k1(key))
    }

    pub fn generate_ed25519<R: rand::RngCore + rand::CryptoRng>(rng: &mut R) -> Self {
        SecretKey::Ed25519(ed25519_dalek::SigningKey::generate(rng))
    }

    pub fn generate_secp256k1<R: rand::RngCore + rand::CryptoRng>(rng: &mut R) -> Self {
        SecretKey::Secp256k1(k256::ecdsa::SigningKey::random(rng))
    }
}

/// Anything that can sign deploys on behalf of an account.
pub trait DeploySigner {
    fn public_key(&self) -> PublicKey;

    /// Sign the given message. For deploys the message is the deploy hash.
    fn sign(&self, message: &[u8]) -> Signature;
}

impl DeploySigner for SecretKey {
    fn public_key(&self) -> PublicKey {
        match self {
            SecretKey::Ed25519(key) => PublicKey::Ed25519(key.verifying_key().to_bytes()),
            SecretKey::Secp256k1(key) => {
                let point = key.verifying_key().to_encoded_point(true);
                let mut bytes = [0u8; SECP256K1_PUBLIC_KEY_LENGTH];
                bytes.copy_from_slice(point.as_bytes());
                PublicKey::Secp256k1(bytes)
            }
        }
    }

    fn sign(&self, message: &[u8]) -> Signature {
        match self {
            SecretKey::Ed25519(key) => Signature::Ed25519(key.sign(message).to_bytes()),
            SecretKey::Secp256k1(key) => {
                let sig: k256::ecdsa::Signature = key.sign(message);
                let mut bytes = [0u8; SIGNATURE_LENGTH];
                bytes.copy_from_slice(&sig.to_bytes());
                Signature::Secp256k1(bytes)
            }
        }
    }
}

impl<S: DeploySigner + ?Sized> DeploySigner for &S {
    fn public_key(&self) -> PublicKey { (*self).public_key() }

    fn sign(&self, message: &[u8]) -> Signature { (*self).sign(message) }
}
