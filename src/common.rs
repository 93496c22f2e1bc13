//! Canonical binary serialization used by the platform for deploys, runtime
//! arguments and stored values.
//!
//! The layout of primitives coincides with borsh: integers are little endian,
//! strings, byte blobs and lists are prefixed by their length as a `u32`,
//! optional values by a `0` or `1` tag byte, and booleans are a single byte.
//! Types whose layout is specific to the platform, e.g., big integers, keys
//! and typed values, implement the borsh traits by hand.
pub use borsh::{io, BorshDeserialize, BorshSerialize};

/// Result of parsing a value from its binary representation.
pub type ParseResult<A> = anyhow::Result<A>;

/// Serialize a value into a fresh byte vector.
pub fn to_bytes<T: BorshSerialize + ?Sized>(x: &T) -> Vec<u8> {
    borsh::to_vec(x).expect("Writing to buffer should succeed.")
}

/// Parse a value from the given bytes, requiring that all of them are
/// consumed.
pub fn from_bytes<T: BorshDeserialize>(bytes: &[u8]) -> ParseResult<T> {
    Ok(borsh::from_slice(bytes)?)
}

/// Error for input that is well formed, but not meaningful to the platform,
/// e.g., an unknown tag.
pub(crate) fn invalid_data(msg: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

/// Write a one byte tag followed by the given value.
pub(crate) fn serialize_tagged<W: io::Write, T: BorshSerialize + ?Sized>(
    tag: u8,
    value: &T,
    writer: &mut W,
) -> io::Result<()> {
    BorshSerialize::serialize(&tag, writer)?;
    BorshSerialize::serialize(value, writer)
}
