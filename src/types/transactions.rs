//! Deploys: construction, hashing and signing.
//!
//! A deploy consists of a header, a payment item that pays for execution, and
//! a session item that is the actual work. The deploy hash is the hash of the
//! serialized header, and the header commits to the payment and session via
//! the body hash. Approvals sign the deploy hash and are not part of it.
use super::{
    hashes::{BodyHash, DeployHash},
    keys::{DeploySigner, KeyError, PublicKey, Signature},
    Identity, RuntimeArgs, HASH_LENGTH, U512,
};
use crate::{
    common::{self, io, serialize_tagged, BorshSerialize},
    constants::{DEFAULT_GAS_PRICE, DEFAULT_TTL_MILLIS, PAYMENT_AMOUNT_ARG},
};
use derive_more::{From, Into};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};
use std::{fmt, path::Path, str::FromStr};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into, SerdeSerialize,
    SerdeDeserialize, BorshSerialize,
)]
#[serde(transparent)]
/// Milliseconds since the Unix epoch. Rendered in JSON as an RFC 3339 string.
pub struct Timestamp {
    #[serde(with = "crate::internal::timestamp_rfc3339")]
    pub millis: u64,
}

impl Timestamp {
    /// The current time according to the system clock.
    pub fn now() -> Self {
        Self {
            millis: chrono::Utc::now().timestamp_millis().max(0) as u64,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into, BorshSerialize,
)]
/// A duration in milliseconds, used for the time to live of a deploy.
///
/// The text form is a space separated list of components with units `d`, `h`,
/// `m`, `s` and `ms`, e.g., `30m` or `1h 30m`.
pub struct TimeDiff {
    pub millis: u64,
}

const UNITS: [(&str, u64); 5] = [
    ("d", 86_400_000),
    ("h", 3_600_000),
    ("m", 60_000),
    ("s", 1_000),
    ("ms", 1),
];

impl TimeDiff {
    pub const fn from_minutes(minutes: u64) -> Self {
        Self {
            millis: minutes * 60_000,
        }
    }

    fn to_human(self) -> String {
        if self.millis == 0 {
            return "0ms".into();
        }
        let mut rest = self.millis;
        let mut parts = Vec::new();
        for (unit, size) in UNITS {
            if rest >= size {
                parts.push(format!("{}{}", rest / size, unit));
                rest %= size;
            }
        }
        parts.join(" ")
    }
}

impl fmt::Display for TimeDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.to_human()) }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid duration `{0}`.")]
pub struct TimeDiffParseError(String);

impl FromStr for TimeDiff {
    type Err = TimeDiffParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || TimeDiffParseError(s.into());
        let mut millis = 0u64;
        let mut any = false;
        for part in s.split_whitespace() {
            let split = part
                .find(|c: char| !c.is_ascii_digit())
                .ok_or_else(err)?;
            let (number, unit) = part.split_at(split);
            let number: u64 = number.parse().map_err(|_| err())?;
            let size = match unit {
                "day" | "days" => 86_400_000,
                unit => UNITS
                    .iter()
                    .find(|(name, _)| *name == unit)
                    .map(|(_, size)| *size)
                    .ok_or_else(err)?,
            };
            millis = number
                .checked_mul(size)
                .and_then(|x| x.checked_add(millis))
                .ok_or_else(err)?;
            any = true;
        }
        if !any {
            return Err(err());
        }
        Ok(Self { millis })
    }
}

impl SerdeSerialize for TimeDiff {
    fn serialize<S: serde::Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.collect_str(self)
    }
}

impl<'de> SerdeDeserialize<'de> for TimeDiff {
    fn deserialize<D: serde::Deserializer<'de>>(des: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(des)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, PartialEq, Eq, SerdeSerialize, SerdeDeserialize)]
#[serde(transparent)]
/// Compiled wasm, either a contract's install code or session code.
pub struct ModuleBytes {
    #[serde(with = "crate::internal::byte_array_hex")]
    bytes: Vec<u8>,
}

impl ModuleBytes {
    pub fn new(bytes: Vec<u8>) -> Self { Self { bytes } }

    /// Read a wasm file.
    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self::new(std::fs::read(path)?))
    }

    pub fn is_empty(&self) -> bool { self.bytes.is_empty() }

    pub fn len(&self) -> usize { self.bytes.len() }

    pub fn as_slice(&self) -> &[u8] { &self.bytes }
}

impl From<Vec<u8>> for ModuleBytes {
    fn from(bytes: Vec<u8>) -> Self { Self::new(bytes) }
}

impl fmt::Debug for ModuleBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleBytes({} bytes)", self.bytes.len())
    }
}

/// Code executed by a deploy, either as payment or as session.
#[derive(Debug, Clone, PartialEq, Eq, SerdeSerialize, SerdeDeserialize)]
pub enum ExecutableDeployItem {
    /// Run the supplied wasm. Empty wasm in the payment position selects the
    /// standard payment.
    ModuleBytes {
        module_bytes: ModuleBytes,
        args:         RuntimeArgs,
    },
    /// Call an entry point of a stored contract.
    StoredContractByHash {
        #[serde(with = "crate::internal::hash_hex")]
        hash:        [u8; HASH_LENGTH],
        entry_point: String,
        args:        RuntimeArgs,
    },
}

const MODULE_BYTES_TAG: u8 = 0;
const STORED_CONTRACT_BY_HASH_TAG: u8 = 1;

impl ExecutableDeployItem {
    /// Standard payment of the given number of motes.
    pub fn standard_payment(amount: U512) -> Self {
        let mut args = RuntimeArgs::new();
        args.insert(PAYMENT_AMOUNT_ARG, amount)
            .expect("A fresh argument set has no duplicates.");
        ExecutableDeployItem::ModuleBytes {
            module_bytes: ModuleBytes::new(Vec::new()),
            args,
        }
    }

    pub fn args(&self) -> &RuntimeArgs {
        match self {
            ExecutableDeployItem::ModuleBytes { args, .. } => args,
            ExecutableDeployItem::StoredContractByHash { args, .. } => args,
        }
    }

    /// Entry point called by the item, if it calls a stored contract.
    pub fn entry_point(&self) -> Option<&str> {
        match self {
            ExecutableDeployItem::ModuleBytes { .. } => None,
            ExecutableDeployItem::StoredContractByHash { entry_point, .. } => Some(entry_point),
        }
    }
}

impl BorshSerialize for ExecutableDeployItem {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            ExecutableDeployItem::ModuleBytes { module_bytes, args } => {
                serialize_tagged(MODULE_BYTES_TAG, module_bytes.as_slice(), writer)?;
                BorshSerialize::serialize(args, writer)
            }
            ExecutableDeployItem::StoredContractByHash {
                hash,
                entry_point,
                args,
            } => {
                serialize_tagged(STORED_CONTRACT_BY_HASH_TAG, hash, writer)?;
                BorshSerialize::serialize(entry_point, writer)?;
                BorshSerialize::serialize(args, writer)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, SerdeSerialize, SerdeDeserialize, BorshSerialize)]
/// Header of a deploy. Its hash is the deploy hash. Fields are serialized in
/// declaration order.
pub struct DeployHeader {
    /// Public key of the account that sends and pays for the deploy.
    pub account:      PublicKey,
    pub timestamp:    Timestamp,
    /// How long after `timestamp` the deploy may be included in a block.
    pub ttl:          TimeDiff,
    pub gas_price:    u64,
    /// Hash of the payment and session items.
    pub body_hash:    BodyHash,
    /// Deploys that must be executed before this one.
    pub dependencies: Vec<DeployHash>,
    pub chain_name:   String,
}

/// Compute the body hash from the payment and session items.
pub fn compute_body_hash(
    payment: &ExecutableDeployItem,
    session: &ExecutableDeployItem,
) -> BodyHash {
    let payment = common::to_bytes(payment);
    let session = common::to_bytes(session);
    BodyHash::digest([payment.as_slice(), session.as_slice()])
}

/// Compute the deploy hash from the header.
pub fn compute_deploy_hash(header: &DeployHeader) -> DeployHash {
    DeployHash::digest([common::to_bytes(header).as_slice()])
}

/// A deploy that is complete except for its approvals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedDeploy {
    hash:    DeployHash,
    header:  DeployHeader,
    payment: ExecutableDeployItem,
    session: ExecutableDeployItem,
}

impl UnsignedDeploy {
    /// Assemble a deploy, computing the body hash and the deploy hash.
    pub fn new(
        sender: PublicKey,
        chain_name: String,
        timestamp: Timestamp,
        ttl: TimeDiff,
        gas_price: u64,
        payment: ExecutableDeployItem,
        session: ExecutableDeployItem,
    ) -> Self {
        let header = DeployHeader {
            account: sender,
            timestamp,
            ttl,
            gas_price,
            body_hash: compute_body_hash(&payment, &session),
            dependencies: Vec::new(),
            chain_name,
        };
        Self {
            hash: compute_deploy_hash(&header),
            header,
            payment,
            session,
        }
    }

    pub fn hash(&self) -> &DeployHash { &self.hash }

    pub fn header(&self) -> &DeployHeader { &self.header }

    pub fn payment(&self) -> &ExecutableDeployItem { &self.payment }

    pub fn session(&self) -> &ExecutableDeployItem { &self.session }
}

#[derive(Debug, Clone, PartialEq, Eq, SerdeSerialize, SerdeDeserialize)]
/// A signature of the deploy hash together with the key that produced it.
pub struct Approval {
    pub signer:    PublicKey,
    pub signature: Signature,
}

/// A deploy with at least one approval, ready to be submitted.
#[derive(Debug, Clone, PartialEq, Eq, SerdeSerialize, SerdeDeserialize)]
#[serde(into = "deploy_json::DeployJson", try_from = "deploy_json::DeployJson")]
pub struct SignedDeploy {
    deploy:    UnsignedDeploy,
    approvals: Vec<Approval>,
}

#[derive(Debug, thiserror::Error)]
pub enum DeployVerificationError {
    #[error("The body hash does not match the payment and session.")]
    BodyHashMismatch,
    #[error("The deploy hash {claimed} does not match the header, which hashes to {actual}.")]
    DeployHashMismatch {
        claimed: DeployHash,
        actual:  DeployHash,
    },
    #[error("The deploy has no approvals.")]
    NoApprovals,
    #[error("The approval of {signer} is not valid: {source}")]
    InvalidApproval {
        signer: PublicKey,
        source: KeyError,
    },
}

impl SignedDeploy {
    pub fn hash(&self) -> &DeployHash { self.deploy.hash() }

    pub fn header(&self) -> &DeployHeader { self.deploy.header() }

    pub fn payment(&self) -> &ExecutableDeployItem { self.deploy.payment() }

    pub fn session(&self) -> &ExecutableDeployItem { self.deploy.session() }

    /// Approvals in the order the keys were supplied.
    pub fn approvals(&self) -> &[Approval] { &self.approvals }

    pub fn unsigned(&self) -> &UnsignedDeploy { &self.deploy }

    /// Recompute both hashes and check every approval.
    pub fn verify(&self) -> Result<(), DeployVerificationError> {
        let header = self.header();
        if compute_body_hash(self.payment(), self.session()) != header.body_hash {
            return Err(DeployVerificationError::BodyHashMismatch);
        }
        let actual = compute_deploy_hash(header);
        if &actual != self.hash() {
            return Err(DeployVerificationError::DeployHashMismatch {
                claimed: *self.hash(),
                actual,
            });
        }
        if self.approvals.is_empty() {
            return Err(DeployVerificationError::NoApprovals);
        }
        for approval in &self.approvals {
            approval
                .signer
                .verify(self.hash().as_ref(), &approval.signature)
                .map_err(|source| DeployVerificationError::InvalidApproval {
                    signer: approval.signer,
                    source,
                })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignError {
    #[error("At least one key is required to sign a deploy.")]
    MissingSignature,
}

/// Sign the deploy with each of the given keys, in order.
///
/// Every key signs the deploy hash, so the hash does not depend on which keys
/// sign or in which order. The approvals are kept in the order of `keys`.
pub fn sign_deploy<I>(deploy: UnsignedDeploy, keys: I) -> Result<SignedDeploy, SignError>
where
    I: IntoIterator,
    I::Item: DeploySigner, {
    let approvals = keys
        .into_iter()
        .map(|key| Approval {
            signer:    key.public_key(),
            signature: key.sign(deploy.hash().as_ref()),
        })
        .collect::<Vec<_>>();
    if approvals.is_empty() {
        return Err(SignError::MissingSignature);
    }
    Ok(SignedDeploy { deploy, approvals })
}

/// Builds deploys for a fixed chain.
#[derive(Debug, Clone)]
pub struct DeployAssembler {
    chain_name: String,
    ttl:        TimeDiff,
    gas_price:  u64,
    timestamp:  Option<Timestamp>,
}

impl DeployAssembler {
    /// An assembler with the default time to live and gas price, that stamps
    /// deploys with the current time.
    pub fn new(chain_name: impl Into<String>) -> Self {
        Self {
            chain_name: chain_name.into(),
            ttl:        TimeDiff {
                millis: DEFAULT_TTL_MILLIS,
            },
            gas_price:  DEFAULT_GAS_PRICE,
            timestamp:  None,
        }
    }

    pub fn with_ttl(mut self, ttl: TimeDiff) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_gas_price(mut self, gas_price: u64) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// Use a fixed timestamp instead of the current time.
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn chain_name(&self) -> &str { &self.chain_name }

    /// A deploy that runs `session` and pays `payment` motes with the
    /// standard payment.
    pub fn build(
        &self,
        session: ExecutableDeployItem,
        payment: U512,
        sender: PublicKey,
    ) -> UnsignedDeploy {
        UnsignedDeploy::new(
            sender,
            self.chain_name.clone(),
            self.timestamp.unwrap_or_else(Timestamp::now),
            self.ttl,
            self.gas_price,
            ExecutableDeployItem::standard_payment(payment),
            session,
        )
    }

    /// A deploy that runs the given wasm, e.g., to install or upgrade a
    /// contract.
    pub fn build_install(
        &self,
        wasm: ModuleBytes,
        args: RuntimeArgs,
        payment: U512,
        sender: PublicKey,
    ) -> UnsignedDeploy {
        let session = ExecutableDeployItem::ModuleBytes {
            module_bytes: wasm,
            args,
        };
        self.build(session, payment, sender)
    }

    /// A deploy that calls an entry point of the contract with the given
    /// hash.
    pub fn build_call(
        &self,
        contract_hash: &Identity,
        entry_point: &str,
        args: RuntimeArgs,
        payment: U512,
        sender: PublicKey,
    ) -> UnsignedDeploy {
        let session = ExecutableDeployItem::StoredContractByHash {
            hash: *contract_hash.raw_bytes(),
            entry_point: entry_point.into(),
            args,
        };
        self.build(session, payment, sender)
    }
}

mod deploy_json {
    use super::*;

    #[derive(SerdeSerialize, SerdeDeserialize)]
    /// The node's JSON representation of a deploy.
    pub struct DeployJson {
        hash:      DeployHash,
        header:    DeployHeader,
        payment:   ExecutableDeployItem,
        session:   ExecutableDeployItem,
        approvals: Vec<Approval>,
    }

    impl From<SignedDeploy> for DeployJson {
        fn from(signed: SignedDeploy) -> Self {
            let UnsignedDeploy {
                hash,
                header,
                payment,
                session,
            } = signed.deploy;
            Self {
                hash,
                header,
                payment,
                session,
                approvals: signed.approvals,
            }
        }
    }

    /// Only the hashes are checked. Signatures are checked by
    /// [`SignedDeploy::verify`].
    impl TryFrom<DeployJson> for SignedDeploy {
        type Error = DeployVerificationError;

        fn try_from(value: DeployJson) -> Result<Self, Self::Error> {
            if compute_body_hash(&value.payment, &value.session) != value.header.body_hash {
                return Err(DeployVerificationError::BodyHashMismatch);
            }
            let actual = compute_deploy_hash(&value.header);
            if actual != value.hash {
                return Err(DeployVerificationError::DeployHashMismatch {
                    claimed: value.hash,
                    actual,
                });
            }
            if value.approvals.is_empty() {
                return Err(DeployVerificationError::NoApprovals);
            }
            Ok(SignedDeploy {
                deploy:    UnsignedDeploy {
                    hash: value.hash,
                    header: value.header,
                    payment: value.payment,
                    session: value.session,
                },
                approvals: value.approvals,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HashKind, SecretKey};

    fn keys() -> Vec<SecretKey> {
        vec![
            SecretKey::ed25519_from_bytes(&[1u8; 32]).expect("Valid key"),
            SecretKey::secp256k1_from_bytes(&[2u8; 32]).expect("Valid key"),
        ]
    }

    fn call_deploy(sender: PublicKey) -> UnsignedDeploy {
        let contract = Identity::decode(
            "hash-1b349329cda30830cb64564c1ee534c6dfe58c8e149886f3541c6c6f547c25fd",
            HashKind::Contract,
        )
        .expect("Valid hash");
        let mut args = RuntimeArgs::new();
        args.insert("count", 2u64).expect("Insert");
        DeployAssembler::new("casper-test")
            .with_timestamp(Timestamp::from(1_700_000_000_000u64))
            .build_call(
                &contract,
                "free_mint",
                args,
                U512::from(10_000_000_000_000u64),
                sender,
            )
    }

    #[test]
    fn test_sign_order_does_not_change_hash() {
        let keys = keys();
        let deploy = call_deploy(keys[0].public_key());
        let forward = sign_deploy(deploy.clone(), keys.iter()).expect("Keys given");
        let backward = sign_deploy(deploy, keys.iter().rev()).expect("Keys given");
        assert_eq!(forward.hash(), backward.hash());
        assert_eq!(forward.header().body_hash, backward.header().body_hash);
        assert_eq!(forward.approvals().len(), 2);
        assert_eq!(forward.approvals()[0].signer, keys[0].public_key());
        assert_eq!(backward.approvals()[0].signer, keys[1].public_key());
        forward.verify().expect("Valid approvals");
        backward.verify().expect("Valid approvals");
    }

    #[test]
    fn test_no_keys_is_an_error() {
        let keys = keys();
        let deploy = call_deploy(keys[0].public_key());
        let no_keys: Vec<&SecretKey> = Vec::new();
        assert_eq!(
            sign_deploy(deploy, no_keys).expect_err("No keys"),
            SignError::MissingSignature
        );
    }

    #[test]
    fn test_tampered_approval_detected() {
        let keys = keys();
        let deploy = call_deploy(keys[0].public_key());
        let mut signed = sign_deploy(deploy, &keys).expect("Keys given");
        signed.approvals[1].signature = keys[1].sign(b"something else");
        assert!(matches!(
            signed.verify(),
            Err(DeployVerificationError::InvalidApproval { .. })
        ));
    }

    #[test]
    fn test_standard_payment() {
        let payment = ExecutableDeployItem::standard_payment(U512::from(1_000_000_000));
        assert_eq!(payment.args().len(), 1);
        assert_eq!(
            payment
                .args()
                .get(PAYMENT_AMOUNT_ARG)
                .map(|v| v.to_t::<U512>().expect("U512")),
            Some(U512::from(1_000_000_000))
        );
        let bytes = common::to_bytes(&payment);
        // Tag and empty module bytes.
        assert_eq!(&bytes[..5], &[0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_hash_known_answers() {
        let keys = keys();
        let deploy = call_deploy(keys[0].public_key());
        assert_eq!(
            hex::encode(common::to_bytes(deploy.payment())),
            "00000000000100000006000000616d6f756e74070000000600a0724e180908"
        );
        assert_eq!(
            deploy.header().body_hash.to_string(),
            "1998de20e0e604ea2eeb9bb006f256f345798b1e6161b2b31e32b8b3d25ec78a"
        );
        assert_eq!(
            deploy.hash().to_string(),
            "eac93071ad7f761b66ef7f96282c4d28032802fa0659f78bb4e7f4fc1c07e19b"
        );
    }

    #[test]
    fn test_header_fields() {
        let keys = keys();
        let deploy = call_deploy(keys[0].public_key());
        let header = deploy.header();
        assert_eq!(header.ttl.millis, 30 * 60 * 1000);
        assert_eq!(header.gas_price, 1);
        assert!(header.dependencies.is_empty());
        assert_eq!(header.chain_name, "casper-test");
        assert_eq!(deploy.session().entry_point(), Some("free_mint"));
        assert_eq!(*deploy.hash(), compute_deploy_hash(header));
    }

    #[test]
    fn test_json_shape() {
        let keys = keys();
        let signed = sign_deploy(call_deploy(keys[0].public_key()), &keys).expect("Keys given");
        let json = serde_json::to_value(&signed).expect("Serializable");
        assert_eq!(json["hash"], signed.hash().to_string());
        assert_eq!(json["header"]["timestamp"], "2023-11-14T22:13:20.000Z");
        assert_eq!(json["header"]["ttl"], "30m");
        assert_eq!(
            json["session"]["StoredContractByHash"]["entry_point"],
            "free_mint"
        );
        assert_eq!(json["payment"]["ModuleBytes"]["module_bytes"], "");
        assert_eq!(json["approvals"].as_array().map(Vec::len), Some(2));

        let parsed: SignedDeploy = serde_json::from_value(json.clone()).expect("Valid deploy");
        assert_eq!(parsed, signed);

        let mut tampered = json;
        tampered["header"]["gas_price"] = 2.into();
        assert!(serde_json::from_value::<SignedDeploy>(tampered).is_err());
    }

    #[test]
    fn test_time_diff_text() {
        assert_eq!(TimeDiff::from_minutes(30).to_string(), "30m");
        assert_eq!(TimeDiff::from(5_400_000u64).to_string(), "1h 30m");
        assert_eq!("1h 30m".parse::<TimeDiff>().expect("Valid").millis, 5_400_000);
        assert_eq!("2days".parse::<TimeDiff>().expect("Valid").millis, 172_800_000);
        assert_eq!("250ms".parse::<TimeDiff>().expect("Valid").millis, 250);
        assert!("".parse::<TimeDiff>().is_err());
        assert!("5 minutes".parse::<TimeDiff>().is_err());
    }
}
