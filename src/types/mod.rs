//! Type definitions used throughout the rest of the SDK.
//!
//! The most important types are [`Identity`], the decoded form of an
//! `account-hash-…` or `hash-…` string, and [`Key`], the typed form in which
//! identities are passed to contracts.

pub mod cl_value;
pub mod hashes;
pub mod keys;
pub mod network;
pub mod runtime_args;
pub mod transactions;

pub use cl_value::{CLType, CLTyped, CLValue, CLValueError, FromCLValue, U256, U512};
pub use hashes::{DeployHash, HASH_LENGTH};
pub use keys::{DeploySigner, PublicKey, SecretKey, Signature};
pub use runtime_args::{ArgumentError, RuntimeArgs};

use crate::{
    common::{invalid_data, io, serialize_tagged, BorshDeserialize, BorshSerialize},
    constants::{ACCOUNT_HASH_PREFIX, ALTERNATE_CONTRACT_PREFIXES, CONTRACT_HASH_PREFIX, UREF_PREFIX},
};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};
use std::fmt;

/// What an [`Identity`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HashKind {
    /// The hash of an account's main public key.
    Account,
    /// The hash of a stored contract or contract package.
    Contract,
}

impl HashKind {
    /// The prefix used when rendering an identity of this kind.
    pub const fn prefix(self) -> &'static str {
        match self {
            HashKind::Account => ACCOUNT_HASH_PREFIX,
            HashKind::Contract => CONTRACT_HASH_PREFIX,
        }
    }

    /// Every prefix accepted when decoding an identity of this kind, longest
    /// first.
    fn accepted_prefixes(self) -> &'static [&'static str] {
        match self {
            HashKind::Account => &[ACCOUNT_HASH_PREFIX],
            HashKind::Contract => ALTERNATE_CONTRACT_PREFIXES,
        }
    }
}

impl fmt::Display for HashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashKind::Account => f.write_str("account"),
            HashKind::Contract => f.write_str("contract"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
/// A formatted hash string could not be decoded into an [`Identity`].
pub enum MalformedIdentity {
    #[error("`{input}` does not start with a {kind} hash prefix (`{}`).", .kind.prefix())]
    WrongPrefix { kind: HashKind, input: String },
    #[error("Hash `{input}` is not valid hex: {source}")]
    InvalidHex {
        input:  String,
        source: hex::FromHexError,
    },
    #[error("Hash `{input}` decodes to {length} bytes instead of 32.")]
    WrongLength { input: String, length: usize },
}

/// A hashed reference to either an account or a contract.
///
/// The formatted form is a kind-specific prefix followed by 64 hex digits,
/// e.g., `account-hash-2c4a…` or `hash-1b34…`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity {
    kind:  HashKind,
    bytes: [u8; HASH_LENGTH],
}

impl Identity {
    pub const fn new(kind: HashKind, bytes: [u8; HASH_LENGTH]) -> Self { Self { kind, bytes } }

    pub const fn account(bytes: [u8; HASH_LENGTH]) -> Self { Self::new(HashKind::Account, bytes) }

    pub const fn contract(bytes: [u8; HASH_LENGTH]) -> Self {
        Self::new(HashKind::Contract, bytes)
    }

    /// Decode a formatted hash string of the given kind.
    ///
    /// The prefix is determined by `kind` and must be present. The remainder
    /// must be hex that decodes to exactly 32 bytes.
    pub fn decode(formatted: &str, kind: HashKind) -> Result<Self, MalformedIdentity> {
        let bytes = decode_hash(formatted, kind)?;
        Ok(Self { kind, bytes })
    }

    /// The account hash of the given public key.
    pub fn from_public_key(key: &PublicKey) -> Self { Self::account(key.to_account_hash()) }

    pub fn kind(&self) -> HashKind { self.kind }

    /// The decoded 32 bytes of the hash.
    pub fn raw_bytes(&self) -> &[u8; HASH_LENGTH] { &self.bytes }

    /// Render with the canonical prefix of the kind and lowercase hex.
    pub fn to_formatted_string(&self) -> String {
        format!("{}{}", self.kind.prefix(), hex::encode(self.bytes))
    }

    /// Wrap the identity in the key variant appropriate for its kind, for use
    /// as a contract argument.
    pub fn to_key(&self) -> Key {
        match self.kind {
            HashKind::Account => Key::Account(self.bytes),
            HashKind::Contract => Key::Hash(self.bytes),
        }
    }
}

/// Strip the prefix for `kind` and decode the remaining hex.
pub fn decode_hash(formatted: &str, kind: HashKind) -> Result<[u8; HASH_LENGTH], MalformedIdentity> {
    let hex_part = kind
        .accepted_prefixes()
        .iter()
        .find_map(|prefix| formatted.strip_prefix(prefix))
        .ok_or_else(|| MalformedIdentity::WrongPrefix {
            kind,
            input: formatted.into(),
        })?;
    let bytes = hex::decode(hex_part).map_err(|source| MalformedIdentity::InvalidHex {
        input: formatted.into(),
        source,
    })?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| MalformedIdentity::WrongLength {
            input:  formatted.into(),
            length: bytes.len(),
        })
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_formatted_string())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(self, f) }
}

/// Parses either kind, dispatching on the canonical prefixes.
impl std::str::FromStr for Identity {
    type Err = MalformedIdentity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with(ACCOUNT_HASH_PREFIX) {
            Self::decode(s, HashKind::Account)
        } else {
            Self::decode(s, HashKind::Contract)
        }
    }
}

impl SerdeSerialize for Identity {
    fn serialize<S: serde::Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.collect_str(self)
    }
}

impl<'de> SerdeDeserialize<'de> for Identity {
    fn deserialize<D: serde::Deserializer<'de>>(des: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(des)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Access rights of an unforgeable reference, as a bit set.
pub type AccessRights = u8;

/// An unforgeable reference to a value in global state. Contracts use these as
/// seeds for their dictionaries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize,
)]
pub struct URef {
    pub address:       [u8; HASH_LENGTH],
    pub access_rights: AccessRights,
}

/// Read, add and write access.
pub const ACCESS_READ_ADD_WRITE: AccessRights = 0b111;

impl URef {
    pub fn new(address: [u8; HASH_LENGTH], access_rights: AccessRights) -> Self {
        Self {
            address,
            access_rights,
        }
    }
}

/// Display in the `uref-<hex>-<access rights as three octal digits>` format.
impl fmt::Display for URef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}-{:03o}",
            UREF_PREFIX,
            hex::encode(self.address),
            self.access_rights
        )
    }
}

/// A key in global state, as passed to and stored by contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    /// An account, identified by its account hash.
    Account([u8; HASH_LENGTH]),
    /// A hash-addressed value, typically a contract or contract package.
    Hash([u8; HASH_LENGTH]),
    /// An unforgeable reference.
    URef(URef),
}

const KEY_ACCOUNT_TAG: u8 = 0;
const KEY_HASH_TAG: u8 = 1;
const KEY_UREF_TAG: u8 = 2;

impl Key {
    /// The identity the key refers to, if it is an account or hash key.
    pub fn into_identity(self) -> Option<Identity> {
        match self {
            Key::Account(bytes) => Some(Identity::account(bytes)),
            Key::Hash(bytes) => Some(Identity::contract(bytes)),
            Key::URef(_) => None,
        }
    }

    pub fn to_formatted_string(&self) -> String {
        match self {
            Key::Account(bytes) => format!("{}{}", ACCOUNT_HASH_PREFIX, hex::encode(bytes)),
            Key::Hash(bytes) => format!("{}{}", CONTRACT_HASH_PREFIX, hex::encode(bytes)),
            Key::URef(uref) => uref.to_string(),
        }
    }
}

impl From<Identity> for Key {
    fn from(identity: Identity) -> Self { identity.to_key() }
}

impl From<URef> for Key {
    fn from(uref: URef) -> Self { Key::URef(uref) }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_formatted_string())
    }
}

impl BorshSerialize for Key {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Key::Account(bytes) => serialize_tagged(KEY_ACCOUNT_TAG, bytes, writer),
            Key::Hash(bytes) => serialize_tagged(KEY_HASH_TAG, bytes, writer),
            Key::URef(uref) => serialize_tagged(KEY_UREF_TAG, uref, writer),
        }
    }
}

impl BorshDeserialize for Key {
    fn deserialize_reader<R: io::Read>(reader: &mut R) -> io::Result<Self> {
        match u8::deserialize_reader(reader)? {
            KEY_ACCOUNT_TAG => Ok(Key::Account(BorshDeserialize::deserialize_reader(reader)?)),
            KEY_HASH_TAG => Ok(Key::Hash(BorshDeserialize::deserialize_reader(reader)?)),
            KEY_UREF_TAG => Ok(Key::URef(URef::deserialize_reader(reader)?)),
            tag => Err(invalid_data(format!("Unsupported key tag {}.", tag))),
        }
    }
}

/// Address of a stored contract: the hash of the contract itself, and the
/// hash of the package that holds all of its versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SerdeSerialize, SerdeDeserialize)]
#[serde(try_from = "address_json::ContractAddressJson", into = "address_json::ContractAddressJson")]
pub struct ContractAddress {
    pub contract_hash: Identity,
    pub package_hash:  Identity,
}

impl ContractAddress {
    /// Decode a contract address from the formatted contract and package
    /// hashes.
    pub fn parse(contract_hash: &str, package_hash: &str) -> Result<Self, MalformedIdentity> {
        Ok(Self {
            contract_hash: Identity::decode(contract_hash, HashKind::Contract)?,
            package_hash:  Identity::decode(package_hash, HashKind::Contract)?,
        })
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (package {})", self.contract_hash, self.package_hash)
    }
}

mod address_json {
    use super::*;

    #[derive(SerdeSerialize, SerdeDeserialize)]
    #[serde(rename_all = "camelCase")]
    /// Helper to read contract addresses from configuration files.
    pub struct ContractAddressJson {
        contract_hash: String,
        package_hash:  String,
    }

    impl From<ContractAddress> for ContractAddressJson {
        fn from(address: ContractAddress) -> Self {
            Self {
                contract_hash: address.contract_hash.to_formatted_string(),
                package_hash:  address.package_hash.to_formatted_string(),
            }
        }
    }

    impl TryFrom<ContractAddressJson> for ContractAddress {
        type Error = MalformedIdentity;

        fn try_from(value: ContractAddressJson) -> Result<Self, Self::Error> {
            ContractAddress::parse(&value.contract_hash, &value.package_hash)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{from_bytes, to_bytes};
    use proptest::prelude::*;

    const ACCOUNT: &str =
        "account-hash-d6aacbe25dffddbde464bf53cd663a63821b1796e72e980bdbf5b1eae7935bfe";
    const CONTRACT: &str = "hash-1b349329cda30830cb64564c1ee534c6dfe58c8e149886f3541c6c6f547c25fd";

    #[test]
    fn test_decode_account_hash() {
        let identity = Identity::decode(ACCOUNT, HashKind::Account).expect("Valid account hash");
        assert_eq!(identity.kind(), HashKind::Account);
        assert_eq!(identity.raw_bytes()[0], 0xd6);
        assert_eq!(identity.raw_bytes()[31], 0xfe);
        assert_eq!(identity.to_formatted_string(), ACCOUNT);
    }

    #[test]
    fn test_decode_contract_hash() {
        let identity = Identity::decode(CONTRACT, HashKind::Contract).expect("Valid hash");
        assert_eq!(identity.to_key(), Key::Hash(*identity.raw_bytes()));
        let package = format!("contract-package-wasm{}", &CONTRACT[5..]);
        let from_package =
            Identity::decode(&package, HashKind::Contract).expect("Valid package hash");
        assert_eq!(from_package, identity);
    }

    #[test]
    fn test_prefix_comes_from_kind() {
        // A valid contract hash is not an account hash, and vice versa.
        assert!(matches!(
            Identity::decode(CONTRACT, HashKind::Account),
            Err(MalformedIdentity::WrongPrefix { .. })
        ));
        assert!(matches!(
            Identity::decode(ACCOUNT, HashKind::Contract),
            Err(MalformedIdentity::WrongPrefix { .. })
        ));
    }

    #[test]
    fn test_malformed_hashes() {
        let odd = &ACCOUNT[..ACCOUNT.len() - 1];
        assert!(matches!(
            Identity::decode(odd, HashKind::Account),
            Err(MalformedIdentity::InvalidHex { .. })
        ));
        let non_hex = ACCOUNT.replace('d', "z");
        assert!(matches!(
            Identity::decode(&non_hex, HashKind::Account),
            Err(MalformedIdentity::InvalidHex { .. })
        ));
        let short = &ACCOUNT[..ACCOUNT.len() - 2];
        assert!(matches!(
            Identity::decode(short, HashKind::Account),
            Err(MalformedIdentity::WrongLength { length: 31, .. })
        ));
        assert!(matches!(
            Identity::decode("hash-", HashKind::Contract),
            Err(MalformedIdentity::WrongLength { length: 0, .. })
        ));
    }

    #[test]
    fn test_key_serialization() {
        let identity = Identity::decode(ACCOUNT, HashKind::Account).expect("Valid account hash");
        let bytes = to_bytes(&identity.to_key());
        assert_eq!(bytes.len(), 33);
        assert_eq!(bytes[0], 0);
        let key: Key = from_bytes(&bytes).expect("Valid key");
        assert_eq!(key.into_identity(), Some(identity));

        let uref = URef::new([7u8; 32], ACCESS_READ_ADD_WRITE);
        assert_eq!(to_bytes(&Key::from(uref)).len(), 34);
        assert!(uref.to_string().ends_with("-007"));
    }

    #[test]
    fn test_contract_address_json() {
        let json = serde_json::json!({
            "contractHash": CONTRACT,
            "packageHash": "hash-fafd7ffb4edccaa4565192075ac81fdeeffe8690636e2ef211f4cc1a28a64725",
        });
        let address: ContractAddress = serde_json::from_value(json.clone()).expect("Valid JSON");
        assert_eq!(address.contract_hash.to_formatted_string(), CONTRACT);
        assert_eq!(serde_json::to_value(address).expect("Serializable"), json);
    }

    proptest! {
        #[test]
        fn prop_account_hash_round_trip(bytes in proptest::array::uniform32(any::<u8>()), upper in any::<bool>()) {
            let hex_part = if upper { hex::encode_upper(bytes) } else { hex::encode(bytes) };
            let formatted = format!("{}{}", ACCOUNT_HASH_PREFIX, hex_part);
            let identity = Identity::decode(&formatted, HashKind::Account).expect("Valid account hash");
            prop_assert_eq!(identity.raw_bytes(), &bytes);
            prop_assert_eq!(identity.to_formatted_string(), formatted.to_lowercase());
        }

        #[test]
        fn prop_wrong_length_rejected(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            prop_assume!(bytes.len() != HASH_LENGTH);
            let formatted = format!("{}{}", CONTRACT_HASH_PREFIX, hex::encode(&bytes));
            let is_wrong_length = matches!(
                Identity::decode(&formatted, HashKind::Contract),
                Err(MalformedIdentity::WrongLength { .. })
            );
            prop_assert!(is_wrong_length);
        }
    }
}
