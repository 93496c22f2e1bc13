use super::{NodeGateway, QueryError, QueryResult, RPCError, RPCResult, INVALID_DEPLOY_CODE};
use crate::{
    dictionary::dictionary_address,
    types::{
        hashes::{blake2b256, DictionaryAddress},
        transactions::SignedDeploy,
        CLValue, DeployHash, Identity, URef, ACCESS_READ_ADD_WRITE,
    },
};
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

/// A [`NodeGateway`] that keeps the named values and dictionaries of
/// contracts in memory.
///
/// Submitted deploys are verified and recorded, but not executed. Tests set
/// up the state a contract would have and inspect the recorded deploys.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    named_values:     HashMap<(Identity, Vec<String>), CLValue>,
    dictionary_items: HashMap<DictionaryAddress, CLValue>,
    submitted:        Vec<SignedDeploy>,
    unavailable:      bool,
}

/// The seed reference of a contract's dictionary. On chain the seed is created
/// by the contract. Here it is derived from the contract and dictionary name
/// so that it is stable across runs.
pub fn dictionary_seed(contract: &Identity, dictionary_name: &str) -> URef {
    URef::new(
        blake2b256([contract.raw_bytes().as_slice(), dictionary_name.as_bytes()]),
        ACCESS_READ_ADD_WRITE,
    )
}

impl InMemoryGateway {
    pub fn new() -> Self { Self::default() }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a value under a path of the contract's named keys.
    pub fn set_named_value(&self, contract: &Identity, path: &[&str], value: CLValue) {
        let path = path.iter().map(|p| p.to_string()).collect();
        self.state().named_values.insert((*contract, path), value);
    }

    /// Store an item in a dictionary of the contract, replacing any previous
    /// value.
    pub fn put_dictionary_item(
        &self,
        contract: &Identity,
        dictionary_name: &str,
        item_key: &str,
        value: CLValue,
    ) {
        let address = dictionary_address(&dictionary_seed(contract, dictionary_name), item_key);
        self.state().dictionary_items.insert(address, value);
    }

    /// Remove an item from a dictionary of the contract. Returns whether it
    /// was present.
    pub fn remove_dictionary_item(
        &self,
        contract: &Identity,
        dictionary_name: &str,
        item_key: &str,
    ) -> bool {
        let address = dictionary_address(&dictionary_seed(contract, dictionary_name), item_key);
        self.state().dictionary_items.remove(&address).is_some()
    }

    /// Make every subsequent call fail as if the node could not be reached.
    pub fn set_unavailable(&self, unavailable: bool) { self.state().unavailable = unavailable; }

    /// Deploys accepted so far, in submission order.
    pub fn submitted(&self) -> Vec<SignedDeploy> { self.state().submitted.clone() }

    fn check_available(&self) -> RPCResult<()> {
        if self.state().unavailable {
            Err(RPCError::Unavailable("in-memory node switched off".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl NodeGateway for InMemoryGateway {
    async fn submit(&self, deploy: &SignedDeploy) -> RPCResult<DeployHash> {
        self.check_available()?;
        deploy.verify().map_err(|e| RPCError::NodeError {
            code:    INVALID_DEPLOY_CODE,
            message: format!("invalid deploy: {}", e),
            data:    None,
        })?;
        self.state().submitted.push(deploy.clone());
        Ok(*deploy.hash())
    }

    async fn query_named_value(&self, contract: &Identity, path: &[&str]) -> QueryResult<CLValue> {
        self.check_available()?;
        let path: Vec<String> = path.iter().map(|p| p.to_string()).collect();
        self.state()
            .named_values
            .get(&(*contract, path))
            .cloned()
            .ok_or(QueryError::NotFound)
    }

    async fn query_dictionary_item(
        &self,
        contract: &Identity,
        dictionary_name: &str,
        item_key: &str,
    ) -> QueryResult<CLValue> {
        self.check_available()?;
        let address = dictionary_address(&dictionary_seed(contract, dictionary_name), item_key);
        self.state()
            .dictionary_items
            .get(&address)
            .cloned()
            .ok_or(QueryError::NotFound)
    }
}
