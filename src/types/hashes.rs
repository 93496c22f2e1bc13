//! Hashes used by the platform. All of them are 32 byte BLAKE2b digests that
//! are distinguished at the type level by their purpose.
use crate::common::{io, BorshDeserialize, BorshSerialize};
use blake2::{digest::consts::U32, Blake2b, Digest};
use std::{fmt, marker::PhantomData, str::FromStr};

/// Length of every hash and hash-addressed identifier on the chain.
pub const HASH_LENGTH: usize = 32;

type Blake2b256 = Blake2b<U32>;

/// Compute the BLAKE2b-256 digest of the concatenation of the given chunks.
pub fn blake2b256<'a>(chunks: impl IntoIterator<Item = &'a [u8]>) -> [u8; HASH_LENGTH] {
    let mut hasher = Blake2b256::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    let mut out = [0u8; HASH_LENGTH];
    out.copy_from_slice(&hasher.finalize());
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Marker for the hash of a deploy header, which identifies a deploy.
pub enum DeployMarker {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Marker for the hash of the payment and session items of a deploy.
pub enum BodyMarker {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Marker for the derived address of a dictionary item.
pub enum DictionaryMarker {}

/// A 32 byte hash whose meaning is determined by the `Purpose` parameter.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct HashBytes<Purpose> {
    bytes:    [u8; HASH_LENGTH],
    _phantom: PhantomData<Purpose>,
}

/// Hash of a deploy. This is the transaction identifier on the chain.
pub type DeployHash = HashBytes<DeployMarker>;
/// Hash of the serialized payment and session of a deploy.
pub type BodyHash = HashBytes<BodyMarker>;
/// Address of an item in a contract dictionary.
pub type DictionaryAddress = HashBytes<DictionaryMarker>;

impl<Purpose> HashBytes<Purpose> {
    pub fn new(bytes: [u8; HASH_LENGTH]) -> Self {
        Self {
            bytes,
            _phantom: PhantomData,
        }
    }

    /// Hash the concatenation of the given chunks.
    pub fn digest<'a>(chunks: impl IntoIterator<Item = &'a [u8]>) -> Self {
        Self::new(blake2b256(chunks))
    }

    pub fn bytes(&self) -> &[u8; HASH_LENGTH] { &self.bytes }
}

impl<Purpose> Clone for HashBytes<Purpose> {
    fn clone(&self) -> Self { *self }
}

impl<Purpose> Copy for HashBytes<Purpose> {}

impl<Purpose> AsRef<[u8]> for HashBytes<Purpose> {
    fn as_ref(&self) -> &[u8] { &self.bytes }
}

impl<Purpose> From<[u8; HASH_LENGTH]> for HashBytes<Purpose> {
    fn from(bytes: [u8; HASH_LENGTH]) -> Self { Self::new(bytes) }
}

impl<Purpose> fmt::Display for HashBytes<Purpose> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.bytes))
    }
}

impl<Purpose> fmt::Debug for HashBytes<Purpose> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(self, f) }
}

#[derive(Debug, thiserror::Error)]
pub enum HashFromStrError {
    #[error("Not a valid hex string: {0}")]
    HexDecodeError(#[from] hex::FromHexError),
    #[error("A hash must be exactly 32 bytes, but {0} were given.")]
    IncorrectLength(usize),
}

impl<Purpose> FromStr for HashBytes<Purpose> {
    type Err = HashFromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let bytes: [u8; HASH_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| HashFromStrError::IncorrectLength(bytes.len()))?;
        Ok(Self::new(bytes))
    }
}

impl<Purpose> BorshSerialize for HashBytes<Purpose> {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.bytes)
    }
}

impl<Purpose> BorshDeserialize for HashBytes<Purpose> {
    fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self::new(<[u8; HASH_LENGTH]>::deserialize_reader(reader)?))
    }
}

impl<Purpose> serde::Serialize for HashBytes<Purpose> {
    fn serialize<S: serde::Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.collect_str(self)
    }
}

impl<'de, Purpose> serde::Deserialize<'de> for HashBytes<Purpose> {
    fn deserialize<D: serde::Deserializer<'de>>(des: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(des)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake2b256_known_vector() {
        // BLAKE2b-256 of the empty input.
        let expected = "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8";
        assert_eq!(hex::encode(blake2b256([])), expected);
    }

    #[test]
    fn test_chunks_are_concatenated() {
        let joined = blake2b256([b"hello world".as_slice()]);
        let split = blake2b256([b"hello".as_slice(), b" world".as_slice()]);
        assert_eq!(joined, split);
    }

    #[test]
    fn test_hash_string_round_trip() {
        let hash = DeployHash::digest([b"deploy".as_slice()]);
        let parsed: DeployHash = hash.to_string().parse().expect("Valid hash");
        assert_eq!(parsed, hash);
        assert!(matches!(
            "abcd".parse::<DeployHash>(),
            Err(HashFromStrError::IncorrectLength(2))
        ));
    }
}
