//! Constants that apply to the chain and to the contracts this SDK targets.

/// Prefix of a formatted account hash.
pub const ACCOUNT_HASH_PREFIX: &str = "account-hash-";

/// Prefix of a formatted contract or contract package hash.
pub const CONTRACT_HASH_PREFIX: &str = "hash-";

/// Prefixes accepted for contract hashes, longest first, so that the most
/// specific one is stripped.
pub const ALTERNATE_CONTRACT_PREFIXES: &[&str] = &[
    "contract-package-wasm",
    "contract-package-",
    "contract-",
    CONTRACT_HASH_PREFIX,
];

/// Prefix of a formatted unforgeable reference.
pub const UREF_PREFIX: &str = "uref-";

/// Prefix of a formatted dictionary item address.
pub const DICTIONARY_PREFIX: &str = "dictionary-";

/// Time to live of a deploy unless configured otherwise, in milliseconds.
pub const DEFAULT_TTL_MILLIS: u64 = 30 * 60 * 1000;

/// Gas price of a deploy unless configured otherwise.
pub const DEFAULT_GAS_PRICE: u64 = 1;

/// Number of motes in one CSPR.
pub const MOTES_PER_CSPR: u64 = 1_000_000_000;

/// Name of the single argument of the standard payment code.
pub const PAYMENT_AMOUNT_ARG: &str = "amount";
