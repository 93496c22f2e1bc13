//! Typed values as understood by contracts.
//!
//! A [`CLValue`] is the canonical serialization of a value together with its
//! [`CLType`]. Contract arguments, named values, and dictionary items are all
//! transmitted in this form. Decoding checks the type tag before parsing the
//! bytes, so that a value written with one type is never silently read as
//! another.
use super::{keys::PublicKey, Identity, Key, URef};
use crate::common::{self, invalid_data, io, serialize_tagged, BorshDeserialize, BorshSerialize};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};
use std::{fmt, str::FromStr};

/// The type of a [`CLValue`].
///
/// The JSON form matches the node's: unit variants are plain strings, e.g.,
/// `"Bool"`, and the others are single-field objects, e.g.,
/// `{"List": "Bool"}` or `{"ByteArray": 32}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerdeSerialize, SerdeDeserialize)]
pub enum CLType {
    Bool,
    U8,
    U32,
    U64,
    U256,
    U512,
    Unit,
    String,
    Key,
    URef,
    Option(Box<CLType>),
    List(Box<CLType>),
    ByteArray(u32),
    PublicKey,
    Any,
}

const CL_TYPE_TAG_BOOL: u8 = 0;
const CL_TYPE_TAG_U8: u8 = 3;
const CL_TYPE_TAG_U32: u8 = 4;
const CL_TYPE_TAG_U64: u8 = 5;
const CL_TYPE_TAG_U256: u8 = 7;
const CL_TYPE_TAG_U512: u8 = 8;
const CL_TYPE_TAG_UNIT: u8 = 9;
const CL_TYPE_TAG_STRING: u8 = 10;
const CL_TYPE_TAG_KEY: u8 = 11;
const CL_TYPE_TAG_UREF: u8 = 12;
const CL_TYPE_TAG_OPTION: u8 = 13;
const CL_TYPE_TAG_LIST: u8 = 14;
const CL_TYPE_TAG_BYTE_ARRAY: u8 = 15;
const CL_TYPE_TAG_ANY: u8 = 21;
const CL_TYPE_TAG_PUBLIC_KEY: u8 = 22;

impl fmt::Display for CLType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CLType::Option(inner) => write!(f, "Option<{}>", inner),
            CLType::List(inner) => write!(f, "List<{}>", inner),
            CLType::ByteArray(len) => write!(f, "ByteArray[{}]", len),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

impl BorshSerialize for CLType {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        let tag = match self {
            CLType::Bool => CL_TYPE_TAG_BOOL,
            CLType::U8 => CL_TYPE_TAG_U8,
            CLType::U32 => CL_TYPE_TAG_U32,
            CLType::U64 => CL_TYPE_TAG_U64,
            CLType::U256 => CL_TYPE_TAG_U256,
            CLType::U512 => CL_TYPE_TAG_U512,
            CLType::Unit => CL_TYPE_TAG_UNIT,
            CLType::String => CL_TYPE_TAG_STRING,
            CLType::Key => CL_TYPE_TAG_KEY,
            CLType::URef => CL_TYPE_TAG_UREF,
            CLType::Option(inner) => return serialize_tagged(CL_TYPE_TAG_OPTION, inner, writer),
            CLType::List(inner) => return serialize_tagged(CL_TYPE_TAG_LIST, inner, writer),
            CLType::ByteArray(len) => return serialize_tagged(CL_TYPE_TAG_BYTE_ARRAY, len, writer),
            CLType::PublicKey => CL_TYPE_TAG_PUBLIC_KEY,
            CLType::Any => CL_TYPE_TAG_ANY,
        };
        BorshSerialize::serialize(&tag, writer)
    }
}

impl BorshDeserialize for CLType {
    fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
        let tag = u8::deserialize_reader(reader)?;
        let ty = match tag {
            CL_TYPE_TAG_BOOL => CLType::Bool,
            CL_TYPE_TAG_U8 => CLType::U8,
            CL_TYPE_TAG_U32 => CLType::U32,
            CL_TYPE_TAG_U64 => CLType::U64,
            CL_TYPE_TAG_U256 => CLType::U256,
            CL_TYPE_TAG_U512 => CLType::U512,
            CL_TYPE_TAG_UNIT => CLType::Unit,
            CL_TYPE_TAG_STRING => CLType::String,
            CL_TYPE_TAG_KEY => CLType::Key,
            CL_TYPE_TAG_UREF => CLType::URef,
            CL_TYPE_TAG_OPTION => CLType::Option(Box::new(CLType::deserialize_reader(reader)?)),
            CL_TYPE_TAG_LIST => CLType::List(Box::new(CLType::deserialize_reader(reader)?)),
            CL_TYPE_TAG_BYTE_ARRAY => CLType::ByteArray(u32::deserialize_reader(reader)?),
            CL_TYPE_TAG_PUBLIC_KEY => CLType::PublicKey,
            CL_TYPE_TAG_ANY => CLType::Any,
            _ => return Err(invalid_data(format!("Unsupported type tag {}.", tag))),
        };
        Ok(ty)
    }
}

/// Types with a fixed [`CLType`].
pub trait CLTyped {
    fn cl_type() -> CLType;
}

macro_rules! cl_typed {
    ($ty:ty, $cl:expr) => {
        impl CLTyped for $ty {
            fn cl_type() -> CLType { $cl }
        }
    };
}

cl_typed!(bool, CLType::Bool);
cl_typed!(u8, CLType::U8);
cl_typed!(u32, CLType::U32);
cl_typed!(u64, CLType::U64);
cl_typed!(String, CLType::String);
cl_typed!(Key, CLType::Key);
cl_typed!(URef, CLType::URef);
cl_typed!(PublicKey, CLType::PublicKey);
cl_typed!(U256, CLType::U256);
cl_typed!(U512, CLType::U512);

impl<T: CLTyped> CLTyped for Vec<T> {
    fn cl_type() -> CLType { CLType::List(Box::new(T::cl_type())) }
}

impl<T: CLTyped> CLTyped for Option<T> {
    fn cl_type() -> CLType { CLType::Option(Box::new(T::cl_type())) }
}

impl<const N: usize> CLTyped for [u8; N] {
    fn cl_type() -> CLType { CLType::ByteArray(N as u32) }
}

#[derive(Debug, thiserror::Error)]
/// A stored or returned value could not be decoded as the requested type.
pub enum CLValueError {
    #[error("Expected a value of type {expected}, but the value has type {found}.")]
    DecodeMismatch { expected: CLType, found: CLType },
    #[error("Malformed value of type {cl_type}: {source}")]
    Malformed {
        cl_type: CLType,
        source:  anyhow::Error,
    },
    #[error("Key {0} refers to neither an account nor a contract.")]
    NotAnIdentity(Key),
}

/// A value in its canonical serialization, tagged with its type.
#[derive(Debug, Clone, PartialEq, Eq, SerdeSerialize, SerdeDeserialize)]
pub struct CLValue {
    cl_type: CLType,
    #[serde(with = "crate::internal::byte_array_hex")]
    bytes:   Vec<u8>,
    /// Human readable rendering provided by the node. It is ignored when
    /// decoding.
    #[serde(default, skip_deserializing)]
    parsed:  Option<serde_json::Value>,
}

impl CLValue {
    /// Serialize a typed value.
    pub fn from_t<T: CLTyped + BorshSerialize>(value: &T) -> Self {
        Self {
            cl_type: T::cl_type(),
            bytes:   common::to_bytes(value),
            parsed:  None,
        }
    }

    /// Construct from an already serialized value. No check is made that the
    /// bytes are a valid serialization of the type.
    pub fn from_parts(cl_type: CLType, bytes: Vec<u8>) -> Self {
        Self {
            cl_type,
            bytes,
            parsed: None,
        }
    }

    /// Decode as the given type, failing if the type tag does not match.
    pub fn to_t<T: FromCLValue>(&self) -> Result<T, CLValueError> { T::from_cl_value(self) }

    pub fn cl_type(&self) -> &CLType { &self.cl_type }

    pub fn bytes(&self) -> &[u8] { &self.bytes }
}

/// The layout is the serialized value as a length-prefixed byte blob,
/// followed by its type.
impl BorshSerialize for CLValue {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        BorshSerialize::serialize(&self.bytes, writer)?;
        BorshSerialize::serialize(&self.cl_type, writer)
    }
}

impl BorshDeserialize for CLValue {
    fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
        let bytes = Vec::<u8>::deserialize_reader(reader)?;
        let cl_type = CLType::deserialize_reader(reader)?;
        Ok(Self::from_parts(cl_type, bytes))
    }
}

/// Types that can be decoded from a [`CLValue`].
pub trait FromCLValue: Sized {
    fn from_cl_value(value: &CLValue) -> Result<Self, CLValueError>;
}

impl<T: CLTyped + BorshDeserialize> FromCLValue for T {
    fn from_cl_value(value: &CLValue) -> Result<Self, CLValueError> {
        let expected = T::cl_type();
        if value.cl_type != expected {
            return Err(CLValueError::DecodeMismatch {
                expected,
                found: value.cl_type.clone(),
            });
        }
        common::from_bytes(&value.bytes).map_err(|source| CLValueError::Malformed {
            cl_type: expected,
            source,
        })
    }
}

/// Contracts store identities as keys. Decoding fails for keys that are
/// neither account nor hash keys.
impl FromCLValue for Identity {
    fn from_cl_value(value: &CLValue) -> Result<Self, CLValueError> {
        let key = Key::from_cl_value(value)?;
        key.into_identity()
            .ok_or(CLValueError::NotAnIdentity(key))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BigUintError {
    #[error("Not a decimal number: {0}")]
    Invalid(#[from] num_bigint::ParseBigIntError),
    #[error("Value does not fit in {0} bits.")]
    Overflow(u64),
}

macro_rules! big_uint {
    ($name:ident, $bits:expr, $doc:literal) => {
        #[doc = $doc]
        ///
        /// The binary form is a single length byte followed by the little
        /// endian bytes of the value without trailing zeros. Zero is a single
        /// `0` byte.
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(BigUint);

        impl $name {
            pub const BITS: u64 = $bits;

            pub fn zero() -> Self { Self(BigUint::zero()) }

            pub fn is_zero(&self) -> bool { self.0.is_zero() }

            pub fn as_big_uint(&self) -> &BigUint { &self.0 }

            /// Multiply, returning `None` on overflow.
            pub fn checked_mul(&self, rhs: &Self) -> Option<Self> {
                Self::try_from(&self.0 * &rhs.0).ok()
            }

            /// Add, returning `None` on overflow.
            pub fn checked_add(&self, rhs: &Self) -> Option<Self> {
                Self::try_from(&self.0 + &rhs.0).ok()
            }
        }

        impl TryFrom<BigUint> for $name {
            type Error = BigUintError;

            fn try_from(value: BigUint) -> Result<Self, Self::Error> {
                if value.bits() > Self::BITS {
                    Err(BigUintError::Overflow(Self::BITS))
                } else {
                    Ok(Self(value))
                }
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self { Self(BigUint::from(value)) }
        }

        impl FromStr for $name {
            type Err = BigUintError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value: BigUint = s.parse()?;
                Self::try_from(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
        }

        impl BorshSerialize for $name {
            fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
                if self.0.is_zero() {
                    return BorshSerialize::serialize(&0u8, writer);
                }
                let bytes = self.0.to_bytes_le();
                BorshSerialize::serialize(&(bytes.len() as u8), writer)?;
                writer.write_all(&bytes)
            }
        }

        impl BorshDeserialize for $name {
            fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
                let len = u8::deserialize_reader(reader)?;
                if u64::from(len) * 8 > Self::BITS {
                    return Err(invalid_data(format!(
                        "{} bytes exceed the width of {}.",
                        len,
                        stringify!($name)
                    )));
                }
                let mut bytes = vec![0u8; len.into()];
                reader.read_exact(&mut bytes)?;
                Ok(Self(BigUint::from_bytes_le(&bytes)))
            }
        }

        /// Serialized as a decimal string, since the values exceed what JSON
        /// numbers can represent exactly.
        impl SerdeSerialize for $name {
            fn serialize<S: serde::Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
                ser.collect_str(self)
            }
        }

        impl<'de> SerdeDeserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(des: D) -> Result<Self, D::Error> {
                let s = <String as serde::Deserialize>::deserialize(des)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

big_uint!(U256, 256, "An unsigned 256 bit integer, used for token amounts and fees.");
big_uint!(U512, 512, "An unsigned 512 bit integer, used for amounts of motes.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_uint_layout() {
        assert_eq!(common::to_bytes(&U512::zero()), vec![0]);
        assert_eq!(common::to_bytes(&U512::from(256)), vec![2, 0, 1]);
        let fee: U256 = "80000000000".parse().expect("Valid number");
        let bytes = common::to_bytes(&fee);
        assert_eq!(bytes[0] as usize, bytes.len() - 1);
        assert_eq!(common::from_bytes::<U256>(&bytes).expect("Valid U256"), fee);
    }

    #[test]
    fn test_big_uint_bounds() {
        let too_big: BigUint = BigUint::from(1u8) << 256;
        assert!(matches!(
            U256::try_from(too_big.clone()),
            Err(BigUintError::Overflow(256))
        ));
        assert!(U512::try_from(too_big).is_ok());
        let max = U256::try_from((BigUint::from(1u8) << 256) - 1u8).expect("Fits");
        assert!(max.checked_mul(&U256::from(2)).is_none());
        assert!(max.checked_add(&U256::zero()).is_some());
        // 33 length bytes cannot be a U256.
        let mut bytes = vec![33u8];
        bytes.extend([1u8; 33]);
        assert!(common::from_bytes::<U256>(&bytes).is_err());
    }

    #[test]
    fn test_cl_value_type_checked() {
        let value = CLValue::from_t(&true);
        assert_eq!(value.cl_type(), &CLType::Bool);
        assert!(value.to_t::<bool>().expect("Bool"));
        match value.to_t::<u64>() {
            Err(CLValueError::DecodeMismatch { expected, found }) => {
                assert_eq!(expected, CLType::U64);
                assert_eq!(found, CLType::Bool);
            }
            other => panic!("Expected a mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_cl_value_malformed_bytes() {
        let value = CLValue::from_parts(CLType::Bool, vec![7]);
        assert!(matches!(
            value.to_t::<bool>(),
            Err(CLValueError::Malformed { .. })
        ));
    }

    #[test]
    fn test_nested_types() {
        let values = vec![Key::Account([1u8; 32]), Key::Hash([2u8; 32])];
        let value = CLValue::from_t(&values);
        assert_eq!(value.cl_type(), &CLType::List(Box::new(CLType::Key)));
        assert_eq!(value.to_t::<Vec<Key>>().expect("Keys"), values);
        let bytes = common::to_bytes(&value);
        // Blob length, list length, two tagged keys, then the type.
        assert_eq!(bytes.len(), 4 + 4 + 2 * 33 + 2);
        let parsed: CLValue = common::from_bytes(&bytes).expect("Valid value");
        assert_eq!(parsed, value);
    }

    #[test]
    fn test_identity_from_key_value() {
        let value = CLValue::from_t(&Key::Account([9u8; 32]));
        assert_eq!(
            value.to_t::<Identity>().expect("Account key"),
            Identity::account([9u8; 32])
        );
        let uref = CLValue::from_t(&Key::URef(URef::new([1u8; 32], 7)));
        assert!(matches!(
            uref.to_t::<Identity>(),
            Err(CLValueError::NotAnIdentity(_))
        ));
    }

    #[test]
    fn test_cl_type_json() {
        let ty = CLType::List(Box::new(CLType::ByteArray(32)));
        let json = serde_json::to_value(&ty).expect("Serializable");
        assert_eq!(json, serde_json::json!({"List": {"ByteArray": 32}}));
        assert_eq!(
            serde_json::to_value(CLType::U512).expect("Serializable"),
            serde_json::json!("U512")
        );
        let value = CLValue::from_t(&5u64);
        let json = serde_json::to_value(&value).expect("Serializable");
        assert_eq!(json["bytes"], "0500000000000000");
        let back: CLValue = serde_json::from_value(json).expect("Deserializable");
        assert_eq!(back, value);
    }
}
