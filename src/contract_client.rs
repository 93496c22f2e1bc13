//! This module contains a generic client that provides conveniences for
//! interacting with any installed contract, as well as for installing new
//! ones.
//!
//! Writes produce deploys signed by the keys the caller supplies. The first
//! key is the sender, which pays for the deploy. Signed deploys are handed
//! back to [`ContractClient::submit`].
use crate::{
    dictionary::{DictionaryError, DictionaryLookupResult, DictionaryResolver},
    endpoints::{NodeGateway, QueryError, RPCError},
    types::{
        network::NetworkConfigError,
        transactions::{sign_deploy, DeployAssembler, ModuleBytes, SignError, SignedDeploy, UnsignedDeploy},
        ArgumentError, CLValueError, ContractAddress, DeployHash, DeploySigner, FromCLValue,
        Identity, MalformedIdentity, PublicKey, RuntimeArgs, U512,
    },
};

/// A client for a single contract. The client starts out unbound, or bound
/// to an address given at construction. Once bound, the address never
/// changes.
#[derive(Debug, Clone)]
pub struct ContractClient<G> {
    /// The underlying node gateway.
    pub gateway: G,
    assembler:   DeployAssembler,
    address:     Option<ContractAddress>,
}

#[derive(Debug, thiserror::Error)]
/// An error that can occur when using a [`ContractClient`] or one of the
/// contract specific clients built on it.
pub enum ContractClientError {
    #[error("The client is not bound to a contract.")]
    Unbound,
    #[error("The client is bound to {bound} and cannot be bound to {requested}.")]
    AlreadyBound {
        bound:     ContractAddress,
        requested: ContractAddress,
    },
    #[error("Invalid arguments: {0}")]
    Argument(#[from] ArgumentError),
    #[error("Invalid identity: {0}")]
    MalformedIdentity(#[from] MalformedIdentity),
    #[error("Named value `{path}` not found.")]
    NotFound { path: String },
    #[error("Response was not as expected: {0}")]
    DecodeMismatch(#[from] CLValueError),
    #[error("Network error: {0}")]
    NetworkError(#[from] RPCError),
    #[error("Could not sign deploy: {0}")]
    Sign(#[from] SignError),
    #[error("Whitelist update has {accounts} accounts but {values} values.")]
    InvalidWhitelist { accounts: usize, values: usize },
    #[error("The cost of minting {count} tokens overflows.")]
    CostOverflow { count: u64 },
    #[error("Invalid network configuration: {0}")]
    Config(#[from] NetworkConfigError),
}

impl ContractClientError {
    /// Whether this error indicates that a queried value does not exist.
    pub fn is_not_found(&self) -> bool { matches!(self, ContractClientError::NotFound { .. }) }
}

impl From<DictionaryError> for ContractClientError {
    fn from(e: DictionaryError) -> Self {
        match e {
            DictionaryError::Query(e) => Self::NetworkError(e),
            DictionaryError::DecodeMismatch(e) => Self::DecodeMismatch(e),
        }
    }
}

impl<G> ContractClient<G> {
    /// A client that is not yet bound to a contract. It can install contracts,
    /// and must be [bound](Self::bind) before it can call or query one.
    pub fn new(gateway: G, assembler: DeployAssembler) -> Self {
        Self {
            gateway,
            assembler,
            address: None,
        }
    }

    /// A client bound to the contract at the given address.
    pub fn with_address(gateway: G, assembler: DeployAssembler, address: ContractAddress) -> Self {
        Self {
            gateway,
            assembler,
            address: Some(address),
        }
    }

    /// Bind the client to a contract. Binding again to the same address is a
    /// no-op, binding to a different one is an error.
    pub fn bind(&mut self, address: ContractAddress) -> Result<(), ContractClientError> {
        match self.address {
            None => {
                self.address = Some(address);
                Ok(())
            }
            Some(bound) if bound == address => Ok(()),
            Some(bound) => Err(ContractClientError::AlreadyBound {
                bound,
                requested: address,
            }),
        }
    }

    /// The address of the bound contract.
    pub fn address(&self) -> Result<&ContractAddress, ContractClientError> {
        self.address.as_ref().ok_or(ContractClientError::Unbound)
    }

    pub fn is_bound(&self) -> bool { self.address.is_some() }

    pub fn assembler(&self) -> &DeployAssembler { &self.assembler }

    /// Build and sign a deploy that installs the given wasm with the given
    /// arguments.
    pub fn install<S: DeploySigner>(
        &self,
        wasm: ModuleBytes,
        args: RuntimeArgs,
        payment: U512,
        keys: &[S],
    ) -> Result<SignedDeploy, ContractClientError> {
        signed_by(keys, |sender| {
            self.assembler.build_install(wasm, args, payment, sender)
        })
    }

    /// Build and sign a deploy that calls an entry point of the bound
    /// contract.
    pub fn call_entrypoint<S: DeploySigner>(
        &self,
        entry_point: &str,
        args: RuntimeArgs,
        payment: U512,
        keys: &[S],
    ) -> Result<SignedDeploy, ContractClientError> {
        let address = self.address()?;
        signed_by(keys, |sender| {
            self.assembler
                .build_call(&address.contract_hash, entry_point, args, payment, sender)
        })
    }
}

/// Build a deploy sent by the first of `keys` and sign it with all of them.
fn signed_by<S: DeploySigner>(
    keys: &[S],
    build: impl FnOnce(PublicKey) -> UnsignedDeploy,
) -> Result<SignedDeploy, ContractClientError> {
    let sender = keys.first().ok_or(SignError::MissingSignature)?.public_key();
    Ok(sign_deploy(build(sender), keys)?)
}

impl<G: NodeGateway> ContractClient<G> {
    /// Submit a signed deploy. Returns the deploy hash, which identifies the
    /// deploy on the chain.
    pub async fn submit(&self, deploy: &SignedDeploy) -> Result<DeployHash, ContractClientError> {
        let hash = self.gateway.submit(deploy).await?;
        if &hash != deploy.hash() {
            tracing::warn!(
                expected = %deploy.hash(),
                reported = %hash,
                "Node reported a different deploy hash than the one computed locally."
            );
        }
        tracing::info!(
            deploy_hash = %hash,
            chain = %deploy.header().chain_name,
            entry_point = deploy.session().entry_point().unwrap_or("<module bytes>"),
            "Deploy submitted."
        );
        Ok(hash)
    }

    /// Sign a deploy built directly with the [assembler](Self::assembler),
    /// e.g., one running custom session code, and submit it.
    pub async fn sign_and_submit<I>(
        &self,
        deploy: UnsignedDeploy,
        keys: I,
    ) -> Result<DeployHash, ContractClientError>
    where
        I: IntoIterator,
        I::Item: DeploySigner, {
        let signed = sign_deploy(deploy, keys)?;
        self.submit(&signed).await
    }

    /// Read and decode a value stored under the named keys of the bound
    /// contract.
    pub async fn query_named_value<T: FromCLValue>(
        &self,
        path: &[&str],
    ) -> Result<T, ContractClientError> {
        let address = self.address()?;
        match self
            .gateway
            .query_named_value(&address.contract_hash, path)
            .await
        {
            Ok(value) => Ok(value.to_t()?),
            Err(QueryError::NotFound) => Err(ContractClientError::NotFound {
                path: path.join("/"),
            }),
            Err(QueryError::RPCError(e)) => Err(e.into()),
        }
    }

    /// A resolver for the dictionaries of the bound contract.
    pub fn dictionaries(&self) -> Result<DictionaryResolver<'_, G>, ContractClientError> {
        let address = self.address()?;
        Ok(DictionaryResolver::new(&self.gateway, &address.contract_hash))
    }

    /// Look up the entry for `identity` in a dictionary of the bound contract.
    pub async fn query_dictionary<T: FromCLValue>(
        &self,
        dictionary_name: &str,
        identity: &Identity,
    ) -> Result<DictionaryLookupResult<T>, ContractClientError> {
        Ok(self
            .dictionaries()?
            .lookup(dictionary_name, identity)
            .await?)
    }

    /// Look up an entry by an explicit item key in a dictionary of the bound
    /// contract.
    pub async fn query_dictionary_by_item_key<T: FromCLValue>(
        &self,
        dictionary_name: &str,
        item_key: &str,
    ) -> Result<DictionaryLookupResult<T>, ContractClientError> {
        Ok(self
            .dictionaries()?
            .lookup_by_item_key(dictionary_name, item_key)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        endpoints::InMemoryGateway,
        types::{transactions::ExecutableDeployItem, CLValue, SecretKey},
    };
    use std::sync::Arc;

    const MINTER: &str = "hash-1b349329cda30830cb64564c1ee534c6dfe58c8e149886f3541c6c6f547c25fd";
    const MINTER_PACKAGE: &str =
        "hash-fafd7ffb4edccaa4565192075ac81fdeeffe8690636e2ef211f4cc1a28a64725";

    fn address() -> ContractAddress {
        ContractAddress::parse(MINTER, MINTER_PACKAGE).expect("Valid address")
    }

    fn key() -> SecretKey { SecretKey::ed25519_from_bytes(&[8u8; 32]).expect("Valid key") }

    #[test]
    fn test_binding() {
        let mut client = ContractClient::new(InMemoryGateway::new(), DeployAssembler::new("casper-test"));
        assert!(matches!(client.address(), Err(ContractClientError::Unbound)));
        assert!(matches!(
            client.call_entrypoint("free_mint", RuntimeArgs::new(), U512::from(1), &[key()]),
            Err(ContractClientError::Unbound)
        ));
        client.bind(address()).expect("First bind");
        client.bind(address()).expect("Same address");
        let other = ContractAddress {
            contract_hash: Identity::contract([1u8; 32]),
            package_hash:  Identity::contract([2u8; 32]),
        };
        assert!(matches!(
            client.bind(other),
            Err(ContractClientError::AlreadyBound { .. })
        ));
        assert_eq!(client.address().expect("Bound"), &address());
    }

    #[test]
    fn test_call_targets_bound_contract() {
        let client = ContractClient::with_address(
            InMemoryGateway::new(),
            DeployAssembler::new("casper-test"),
            address(),
        );
        let deploy = client
            .call_entrypoint("set_config", RuntimeArgs::new(), U512::from(5), &[key()])
            .expect("Bound client");
        deploy.verify().expect("Signed by the sender");
        match deploy.session() {
            ExecutableDeployItem::StoredContractByHash {
                hash, entry_point, ..
            } => {
                assert_eq!(hash, address().contract_hash.raw_bytes());
                assert_eq!(entry_point, "set_config");
            }
            other => panic!("Expected a stored contract call, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_named_value_queries() {
        let gateway = Arc::new(InMemoryGateway::new());
        let client = ContractClient::with_address(
            gateway.clone(),
            DeployAssembler::new("casper-test"),
            address(),
        );
        gateway.set_named_value(&address().contract_hash, &["max_mint"], CLValue::from_t(&10u64));
        let max_mint: u64 = client.query_named_value(&["max_mint"]).await.expect("Present");
        assert_eq!(max_mint, 10);
        assert!(matches!(
            client.query_named_value::<bool>(&["max_mint"]).await,
            Err(ContractClientError::DecodeMismatch(_))
        ));
        let missing = client
            .query_named_value::<u64>(&["mint_count"])
            .await
            .expect_err("Not set");
        assert!(missing.is_not_found());
    }

    #[tokio::test]
    async fn test_install_is_signed_by_all_keys() {
        let gateway = Arc::new(InMemoryGateway::new());
        let client = ContractClient::new(gateway.clone(), DeployAssembler::new("casper-test"));
        let keys = [
            key(),
            SecretKey::secp256k1_from_bytes(&[9u8; 32]).expect("Valid key"),
        ];
        let mut args = RuntimeArgs::new();
        args.insert("max_mint", 10u64).expect("Insert");
        let wasm = ModuleBytes::new(b"\0asm\x01\0\0\0".to_vec());
        let deploy = client
            .install(wasm.clone(), args.clone(), U512::from(140_000_000_000u64), &keys)
            .expect("Keys given");
        deploy.verify().expect("Valid approvals");
        assert_eq!(deploy.header().account, keys[0].public_key());
        assert_eq!(
            deploy
                .approvals()
                .iter()
                .map(|approval| approval.signer)
                .collect::<Vec<_>>(),
            vec![keys[0].public_key(), keys[1].public_key()]
        );
        assert_eq!(deploy.session(), &ExecutableDeployItem::ModuleBytes {
            module_bytes: wasm,
            args,
        });

        let hash = client.submit(&deploy).await.expect("Accepted");
        assert_eq!(&hash, deploy.hash());
        assert_eq!(gateway.submitted(), vec![deploy]);
    }

    #[tokio::test]
    async fn test_sign_and_submit_assembled_deploy() {
        let gateway = Arc::new(InMemoryGateway::new());
        let client = ContractClient::new(gateway.clone(), DeployAssembler::new("casper-test"));
        let key = key();
        let deploy = client.assembler().build_install(
            ModuleBytes::new(b"\0asm".to_vec()),
            RuntimeArgs::new(),
            U512::from(5),
            key.public_key(),
        );
        let expected = *deploy.hash();
        let hash = client.sign_and_submit(deploy.clone(), [&key]).await.expect("Accepted");
        assert_eq!(hash, expected);
        assert_eq!(gateway.submitted().len(), 1);

        let no_keys: [&SecretKey; 0] = [];
        assert!(matches!(
            client.sign_and_submit(deploy, no_keys).await,
            Err(ContractClientError::Sign(SignError::MissingSignature))
        ));
    }

    #[test]
    fn test_writes_need_a_key() {
        let client = ContractClient::with_address(
            InMemoryGateway::new(),
            DeployAssembler::new("casper-test"),
            address(),
        );
        let no_keys: [SecretKey; 0] = [];
        assert!(matches!(
            client.call_entrypoint("free_mint", RuntimeArgs::new(), U512::from(5), &no_keys),
            Err(ContractClientError::Sign(SignError::MissingSignature))
        ));
        assert!(matches!(
            client.install(ModuleBytes::new(Vec::new()), RuntimeArgs::new(), U512::from(5), &no_keys),
            Err(ContractClientError::Sign(SignError::MissingSignature))
        ));
    }
}
