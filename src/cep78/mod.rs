//! This module contains types and functions for interacting with NFT
//! collections following the [CEP-78](https://github.com/casper-ecosystem/cep-78-enhanced-nft)
//! standard.
//!
//! The type [`Cep78Contract`] wraps a [`ContractClient`] and provides
//! functions for installing a collection, updating its variables, and reading
//! its configuration, balances, owners and metadata.
mod types;

use crate::{
    contract_client::{ContractClient, ContractClientError},
    dictionary::DictionaryLookupResult,
    endpoints::NodeGateway,
    types::{
        network::{cspr_to_motes, NetworkConfig, PaymentTable},
        transactions::{ModuleBytes, SignedDeploy},
        DeploySigner, Identity, PublicKey,
    },
};
pub use types::*;

/// A wrapper around the client representing a CEP-78 collection.
#[derive(Debug, Clone)]
pub struct Cep78Contract<G> {
    client:   ContractClient<G>,
    payments: PaymentTable,
}

impl<G> Cep78Contract<G> {
    pub fn new(client: ContractClient<G>, payments: PaymentTable) -> Self {
        Self { client, payments }
    }

    /// A client for the network's collection, if the configuration knows one.
    pub fn from_config(gateway: G, config: &NetworkConfig) -> Self {
        let client = match config.contracts.cep78 {
            Some(address) => ContractClient::with_address(gateway, config.assembler(), address),
            None => ContractClient::new(gateway, config.assembler()),
        };
        Self::new(client, config.payments.clone())
    }

    pub fn client(&self) -> &ContractClient<G> { &self.client }

    pub fn client_mut(&mut self) -> &mut ContractClient<G> { &mut self.client }

    /// Build and sign a deploy that installs a collection.
    pub fn install<S: DeploySigner>(
        &self,
        wasm: ModuleBytes,
        args: &Cep78InstallArgs,
        keys: &[S],
    ) -> Result<SignedDeploy, ContractClientError> {
        let payment = cspr_to_motes(self.payments.cep78_install)?;
        self.client
            .install(wasm, args.to_runtime_args()?, payment, keys)
    }

    /// Build and sign a deploy that updates the collection's variables. Only
    /// the installer may do this.
    pub fn set_variables<S: DeploySigner>(
        &self,
        update: impl Into<VariablesUpdate>,
        keys: &[S],
    ) -> Result<SignedDeploy, ContractClientError> {
        let payment = cspr_to_motes(self.payments.cep78_set_variables)?;
        let args = update.into().to_runtime_args()?;
        self.client
            .call_entrypoint(SET_VARIABLES_ENTRY_POINT, args, payment, keys)
    }
}

impl<G: NodeGateway> Cep78Contract<G> {
    pub async fn collection_name(&self) -> Result<String, ContractClientError> {
        self.client
            .query_named_value(&[named_keys::COLLECTION_NAME])
            .await
    }

    pub async fn collection_symbol(&self) -> Result<String, ContractClientError> {
        self.client
            .query_named_value(&[named_keys::COLLECTION_SYMBOL])
            .await
    }

    pub async fn total_token_supply(&self) -> Result<u64, ContractClientError> {
        self.client
            .query_named_value(&[named_keys::TOTAL_TOKEN_SUPPLY])
            .await
    }

    pub async fn number_of_minted_tokens(&self) -> Result<u64, ContractClientError> {
        self.client
            .query_named_value(&[named_keys::NUMBER_OF_MINTED_TOKENS])
            .await
    }

    pub async fn nft_metadata_kind(&self) -> Result<NftMetadataKind, ContractClientError> {
        self.client
            .query_named_value(&[named_keys::NFT_METADATA_KIND])
            .await
    }

    /// Read the collection's name, supply and configuration. The queries are
    /// made concurrently.
    pub async fn collection_info(&self) -> Result<CollectionInfo, ContractClientError> {
        let client = &self.client;
        let (
            collection_name,
            collection_symbol,
            total_token_supply,
            number_of_minted_tokens,
            allow_minting,
            ownership_mode,
            nft_kind,
            holder_mode,
            whitelist_mode,
            minting_mode,
            nft_metadata_kind,
            identifier_mode,
            metadata_mutability,
            burn_mode,
            reporting_mode,
        ) = futures::try_join!(
            self.collection_name(),
            self.collection_symbol(),
            self.total_token_supply(),
            self.number_of_minted_tokens(),
            client.query_named_value::<bool>(&[named_keys::ALLOW_MINTING]),
            client.query_named_value::<OwnershipMode>(&[named_keys::OWNERSHIP_MODE]),
            client.query_named_value::<NftKind>(&[named_keys::NFT_KIND]),
            client.query_named_value::<HolderMode>(&[named_keys::HOLDER_MODE]),
            client.query_named_value::<WhitelistMode>(&[named_keys::WHITELIST_MODE]),
            client.query_named_value::<MintingMode>(&[named_keys::MINTING_MODE]),
            self.nft_metadata_kind(),
            client.query_named_value::<IdentifierMode>(&[named_keys::IDENTIFIER_MODE]),
            client.query_named_value::<MetadataMutability>(&[named_keys::METADATA_MUTABILITY]),
            client.query_named_value::<BurnMode>(&[named_keys::BURN_MODE]),
            client.query_named_value::<OwnerReverseLookupMode>(&[named_keys::REPORTING_MODE])
        )?;
        Ok(CollectionInfo {
            collection_name,
            collection_symbol,
            total_token_supply,
            number_of_minted_tokens,
            allow_minting,
            ownership_mode,
            nft_kind,
            holder_mode,
            whitelist_mode,
            minting_mode,
            nft_metadata_kind,
            identifier_mode,
            metadata_mutability,
            burn_mode,
            reporting_mode,
        })
    }

    async fn is_acl_whitelisted(&self, identity: &Identity) -> Result<bool, ContractClientError> {
        Ok(self
            .client
            .query_dictionary::<bool>(dictionaries::ACL_WHITELIST, identity)
            .await?
            .unwrap_or(false))
    }

    /// Whether the account of the given key may mint in ACL mode.
    pub async fn is_account_whitelisted(
        &self,
        account: &PublicKey,
    ) -> Result<bool, ContractClientError> {
        self.is_acl_whitelisted(&Identity::from_public_key(account))
            .await
    }

    /// Whether the contract or contract package may mint in ACL mode.
    pub async fn is_contract_whitelisted(
        &self,
        contract: &Identity,
    ) -> Result<bool, ContractClientError> {
        self.is_acl_whitelisted(contract).await
    }

    /// Number of tokens held by the owner. Owners that never held a token have
    /// no entry and a balance of zero.
    pub async fn balance_of(&self, owner: &Identity) -> Result<u64, ContractClientError> {
        Ok(self
            .client
            .query_dictionary::<u64>(dictionaries::BALANCES, owner)
            .await?
            .unwrap_or(0))
    }

    /// The owner of a token, if the token exists.
    pub async fn owner_of(
        &self,
        token: &TokenIdentifier,
    ) -> Result<DictionaryLookupResult<Identity>, ContractClientError> {
        self.client
            .query_dictionary_by_item_key(dictionaries::TOKEN_OWNERS, &token.item_key())
            .await
    }

    /// The metadata of a token, in the format the collection was installed
    /// with.
    pub async fn metadata_of(
        &self,
        token: &TokenIdentifier,
    ) -> Result<DictionaryLookupResult<String>, ContractClientError> {
        let kind = self.nft_metadata_kind().await?;
        self.metadata_of_kind(token, kind).await
    }

    /// The metadata of a token in the given format.
    pub async fn metadata_of_kind(
        &self,
        token: &TokenIdentifier,
        kind: NftMetadataKind,
    ) -> Result<DictionaryLookupResult<String>, ContractClientError> {
        self.client
            .query_dictionary_by_item_key(kind.dictionary_name(), &token.item_key())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dictionary::identity_item_key,
        endpoints::InMemoryGateway,
        types::{
            network::Network, transactions::ExecutableDeployItem, CLValue, Key, SecretKey, U512,
        },
    };
    use std::sync::Arc;

    fn config() -> NetworkConfig {
        NetworkConfig::for_network(Network::Local, None).expect("Built-in configuration")
    }

    fn collection() -> Identity { config().contracts.cep78.expect("Known").contract_hash }

    fn key() -> SecretKey { SecretKey::ed25519_from_bytes(&[31u8; 32]).expect("Valid key") }

    #[test]
    fn test_set_variables_deploy() {
        let cep78 = Cep78Contract::from_config(InMemoryGateway::new(), &config());
        let minter = config().contracts.minter.expect("Known");
        let deploy = cep78
            .set_variables(
                Cep78Variables {
                    acl_whitelist: Some(vec![minter.package_hash, minter.contract_hash]),
                    ..Cep78Variables::default()
                },
                &[key()],
            )
            .expect("Bound client");
        deploy.verify().expect("Signed by the installer");
        match deploy.session() {
            ExecutableDeployItem::StoredContractByHash {
                hash,
                entry_point,
                args,
            } => {
                assert_eq!(hash, collection().raw_bytes());
                assert_eq!(entry_point, "set_variables");
                assert_eq!(args.names().collect::<Vec<_>>(), vec!["acl_whitelist"]);
            }
            other => panic!("Expected a contract call, got {:?}", other),
        }
        assert_eq!(
            deploy.payment(),
            &ExecutableDeployItem::standard_payment(U512::from(6_000_000_000))
        );
    }

    #[tokio::test]
    async fn test_acl_whitelist_checks() {
        let gateway = Arc::new(InMemoryGateway::new());
        let cep78 = Cep78Contract::from_config(gateway.clone(), &config());
        let admin = key().public_key();
        let minter_package = config().contracts.minter.expect("Known").package_hash;
        for identity in [Identity::from_public_key(&admin), minter_package] {
            gateway.put_dictionary_item(
                &collection(),
                dictionaries::ACL_WHITELIST,
                &identity_item_key(&identity),
                CLValue::from_t(&true),
            );
        }
        assert!(cep78.is_account_whitelisted(&admin).await.expect("Query succeeds"));
        assert!(cep78
            .is_contract_whitelisted(&minter_package)
            .await
            .expect("Query succeeds"));
        let other = SecretKey::ed25519_from_bytes(&[32u8; 32]).expect("Valid key");
        assert!(!cep78
            .is_account_whitelisted(&other.public_key())
            .await
            .expect("Query succeeds"));
    }

    #[tokio::test]
    async fn test_token_lookups() {
        let gateway = Arc::new(InMemoryGateway::new());
        let cep78 = Cep78Contract::from_config(gateway.clone(), &config());
        let owner = Identity::account([6u8; 32]);
        gateway.put_dictionary_item(
            &collection(),
            dictionaries::BALANCES,
            &identity_item_key(&owner),
            CLValue::from_t(&2u64),
        );
        gateway.put_dictionary_item(
            &collection(),
            dictionaries::TOKEN_OWNERS,
            "0",
            CLValue::from_t(&Key::Account([6u8; 32])),
        );
        gateway.set_named_value(
            &collection(),
            &[named_keys::NFT_METADATA_KIND],
            CLValue::from_t(&NftMetadataKind::Nft721),
        );
        gateway.put_dictionary_item(
            &collection(),
            "metadata_nft721",
            "9",
            CLValue::from_t(&r#"{"name":"Ape 9"}"#.to_string()),
        );

        assert_eq!(cep78.balance_of(&owner).await.expect("Query succeeds"), 2);
        assert_eq!(
            cep78
                .balance_of(&Identity::account([7u8; 32]))
                .await
                .expect("Query succeeds"),
            0
        );
        assert_eq!(
            cep78.owner_of(&0.into()).await.expect("Query succeeds"),
            DictionaryLookupResult::Found(owner)
        );
        assert_eq!(
            cep78.owner_of(&1.into()).await.expect("Query succeeds"),
            DictionaryLookupResult::NotFound
        );
        let metadata = cep78
            .metadata_of(&9.into())
            .await
            .expect("Query succeeds")
            .found()
            .expect("Token 9 has metadata");
        assert!(metadata.contains("Ape 9"));
    }

    #[tokio::test]
    async fn test_collection_info() {
        let gateway = Arc::new(InMemoryGateway::new());
        let cep78 = Cep78Contract::from_config(gateway.clone(), &config());
        let contract = collection();
        let set = |name: &str, value: CLValue| gateway.set_named_value(&contract, &[name], value);
        set(named_keys::COLLECTION_NAME, CLValue::from_t(&"BoredApeYachtClub".to_string()));
        set(named_keys::COLLECTION_SYMBOL, CLValue::from_t(&"BAYC".to_string()));
        set(named_keys::TOTAL_TOKEN_SUPPLY, CLValue::from_t(&10_000u64));
        set(named_keys::NUMBER_OF_MINTED_TOKENS, CLValue::from_t(&12u64));
        set(named_keys::ALLOW_MINTING, CLValue::from_t(&true));
        set(named_keys::OWNERSHIP_MODE, CLValue::from_t(&OwnershipMode::Transferable));
        set(named_keys::NFT_KIND, CLValue::from_t(&NftKind::Digital));
        set(named_keys::HOLDER_MODE, CLValue::from_t(&HolderMode::Mixed));
        set(named_keys::WHITELIST_MODE, CLValue::from_t(&WhitelistMode::Unlocked));
        set(named_keys::MINTING_MODE, CLValue::from_t(&MintingMode::Acl));
        set(named_keys::NFT_METADATA_KIND, CLValue::from_t(&NftMetadataKind::Nft721));
        set(named_keys::IDENTIFIER_MODE, CLValue::from_t(&IdentifierMode::Ordinal));
        set(named_keys::METADATA_MUTABILITY, CLValue::from_t(&MetadataMutability::Immutable));
        set(named_keys::BURN_MODE, CLValue::from_t(&BurnMode::NonBurnable));
        set(named_keys::REPORTING_MODE, CLValue::from_t(&OwnerReverseLookupMode::Complete));

        let info = cep78.collection_info().await.expect("All keys set");
        assert_eq!(info.collection_symbol, "BAYC");
        assert_eq!(info.number_of_minted_tokens, 12);
        assert_eq!(info.minting_mode, MintingMode::Acl);
        assert_eq!(info.reporting_mode, OwnerReverseLookupMode::Complete);
    }
}
