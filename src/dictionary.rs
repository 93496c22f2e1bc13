//! Lookups in contract dictionaries.
//!
//! Contracts keep per-account data, such as whitelists and balances, in named
//! dictionaries. A missing entry is an ordinary answer, e.g., "not
//! whitelisted", and is reported as [`DictionaryLookupResult::NotFound`].
//! All other failures, including decoding failures, are errors.
use crate::{
    constants::DICTIONARY_PREFIX,
    endpoints::{NodeGateway, QueryError, RPCError},
    types::{hashes::DictionaryAddress, CLValueError, FromCLValue, Identity, URef},
};
use thiserror::Error;

/// Outcome of a dictionary lookup that reached the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryLookupResult<T> {
    Found(T),
    NotFound,
}

impl<T> DictionaryLookupResult<T> {
    pub fn is_found(&self) -> bool { matches!(self, DictionaryLookupResult::Found(_)) }

    pub fn found(self) -> Option<T> {
        match self {
            DictionaryLookupResult::Found(x) => Some(x),
            DictionaryLookupResult::NotFound => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DictionaryLookupResult<U> {
        match self {
            DictionaryLookupResult::Found(x) => DictionaryLookupResult::Found(f(x)),
            DictionaryLookupResult::NotFound => DictionaryLookupResult::NotFound,
        }
    }

    /// The found value, or the given default if there is no entry.
    pub fn unwrap_or(self, default: T) -> T { self.found().unwrap_or(default) }
}

#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("Dictionary query failed: {0}")]
    Query(#[from] RPCError),
    #[error("Could not decode dictionary item: {0}")]
    DecodeMismatch(#[from] CLValueError),
}

/// The item key under which contracts store data about an identity: the
/// lowercase hex of its 32 raw bytes, without any prefix.
pub fn identity_item_key(identity: &Identity) -> String { hex::encode(identity.raw_bytes()) }

/// Address of a dictionary item in global state, derived from the
/// dictionary's seed reference and the item key.
pub fn dictionary_address(seed: &URef, item_key: &str) -> DictionaryAddress {
    DictionaryAddress::digest([seed.address.as_slice(), item_key.as_bytes()])
}

/// Render a dictionary address as `dictionary-<hex>`.
pub fn format_dictionary_address(address: &DictionaryAddress) -> String {
    format!("{}{}", DICTIONARY_PREFIX, address)
}

/// Resolves items of the dictionaries of a single contract.
pub struct DictionaryResolver<'a, G> {
    gateway:  &'a G,
    contract: &'a Identity,
}

impl<'a, G: NodeGateway> DictionaryResolver<'a, G> {
    pub fn new(gateway: &'a G, contract: &'a Identity) -> Self { Self { gateway, contract } }

    /// Look up the entry for `identity` in the named dictionary.
    pub async fn lookup<T: FromCLValue>(
        &self,
        dictionary_name: &str,
        identity: &Identity,
    ) -> Result<DictionaryLookupResult<T>, DictionaryError> {
        self.lookup_by_item_key(dictionary_name, &identity_item_key(identity))
            .await
    }

    /// Look up an entry by an explicit item key, e.g., a token identifier.
    pub async fn lookup_by_item_key<T: FromCLValue>(
        &self,
        dictionary_name: &str,
        item_key: &str,
    ) -> Result<DictionaryLookupResult<T>, DictionaryError> {
        match self
            .gateway
            .query_dictionary_item(self.contract, dictionary_name, item_key)
            .await
        {
            Ok(value) => Ok(DictionaryLookupResult::Found(value.to_t()?)),
            Err(QueryError::NotFound) => {
                tracing::debug!(
                    contract = %self.contract,
                    dictionary = dictionary_name,
                    item_key,
                    "No dictionary entry."
                );
                Ok(DictionaryLookupResult::NotFound)
            }
            Err(QueryError::RPCError(e)) => Err(e.into()),
        }
    }
}
