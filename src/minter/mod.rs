//! This module contains types and functions for interacting with the NFT
//! minter contract.
//!
//! The minter sells tokens of a CEP-78 collection for a fixed fee in CSPR,
//! optionally restricted to whitelisted accounts. The type
//! [`MinterContract`] wraps a [`ContractClient`] bound to a minter and
//! provides typed functions for its entry points and named keys. Write
//! operations return deploys signed by the given keys, which are submitted
//! through the [client](MinterContract::client).
mod types;

use crate::{
    contract_client::{ContractClient, ContractClientError},
    dictionary::DictionaryLookupResult,
    endpoints::NodeGateway,
    types::{
        network::{cspr_to_motes, NetworkConfig, PaymentTable},
        transactions::{ModuleBytes, SignedDeploy},
        DeploySigner, Identity, RuntimeArgs, U256, U512,
    },
};
pub use types::*;

/// A minter contract and the payments to attach to its deploys.
///
/// Cloning is as cheap as cloning the gateway, so wrapping the gateway in an
/// [`Arc`](std::sync::Arc) makes this type cheap to share between tasks.
#[derive(Debug, Clone)]
pub struct MinterContract<G> {
    client:   ContractClient<G>,
    payments: PaymentTable,
}

impl<G> MinterContract<G> {
    pub fn new(client: ContractClient<G>, payments: PaymentTable) -> Self {
        Self { client, payments }
    }

    /// A minter client for the given network. It is bound to the network's
    /// minter if the configuration knows one, and unbound otherwise.
    pub fn from_config(gateway: G, config: &NetworkConfig) -> Self {
        let client = match config.contracts.minter {
            Some(address) => ContractClient::with_address(gateway, config.assembler(), address),
            None => ContractClient::new(gateway, config.assembler()),
        };
        Self::new(client, config.payments.clone())
    }

    pub fn client(&self) -> &ContractClient<G> { &self.client }

    /// Mutable access to the client, e.g., to bind it after installation.
    pub fn client_mut(&mut self) -> &mut ContractClient<G> { &mut self.client }

    pub fn payments(&self) -> &PaymentTable { &self.payments }

    /// Build and sign a deploy that installs the minter.
    pub fn install<S: DeploySigner>(
        &self,
        wasm: ModuleBytes,
        args: &InstallArgs,
        keys: &[S],
    ) -> Result<SignedDeploy, ContractClientError> {
        let payment = cspr_to_motes(self.payments.minter_install)?;
        self.client
            .install(wasm, args.to_runtime_args()?, payment, keys)
    }

    /// Build and sign a deploy that installs a new version of the minter.
    /// The wasm adds the new version to the package named by `args.name`.
    pub fn upgrade<S: DeploySigner>(
        &self,
        wasm: ModuleBytes,
        args: &UpgradeArgs,
        keys: &[S],
    ) -> Result<SignedDeploy, ContractClientError> {
        let payment = cspr_to_motes(self.payments.minter_install)?;
        self.client
            .install(wasm, args.to_runtime_args()?, payment, keys)
    }

    /// Build and sign a deploy that changes the fields set in `update`.
    pub fn set_config<S: DeploySigner>(
        &self,
        update: &ConfigUpdate,
        keys: &[S],
    ) -> Result<SignedDeploy, ContractClientError> {
        if update.is_empty() {
            tracing::debug!("Configuration update changes no fields.");
        }
        self.call(
            entry_points::SET_CONFIG,
            update.to_runtime_args()?,
            self.payments.minter_set_config,
            keys,
        )
    }

    /// Build and sign a deploy that mints without charging the fee.
    pub fn free_mint<S: DeploySigner>(
        &self,
        args: &FreeMintArgs,
        keys: &[S],
    ) -> Result<SignedDeploy, ContractClientError> {
        self.call(
            entry_points::FREE_MINT,
            args.to_runtime_args()?,
            self.payments.minter_free_mint,
            keys,
        )
    }

    /// Build and sign a deploy that runs the native mint session code, which
    /// pays `args.amount` to the minter and mints. The client does not need
    /// to be bound, since the minter is named by `args.minter_package_hash`.
    pub fn native_mint<S: DeploySigner>(
        &self,
        session_wasm: ModuleBytes,
        args: &NativeMintArgs,
        keys: &[S],
    ) -> Result<SignedDeploy, ContractClientError> {
        let payment = cspr_to_motes(self.payments.minter_native_mint)?;
        self.client
            .install(session_wasm, args.to_runtime_args()?, payment, keys)
    }

    /// Build and sign a deploy that sets the whitelist status of the given
    /// accounts. Accounts not mentioned keep their status.
    pub fn set_whitelist<S: DeploySigner>(
        &self,
        entries: &[WhitelistEntry],
        keys: &[S],
    ) -> Result<SignedDeploy, ContractClientError> {
        self.call(
            entry_points::SET_WHITELIST,
            whitelist_args(entries)?,
            self.payments.minter_set_whitelist,
            keys,
        )
    }

    /// Build and sign a deploy that replaces the whole whitelist with the
    /// given entries.
    pub fn reset_whitelist<S: DeploySigner>(
        &self,
        entries: &[WhitelistEntry],
        keys: &[S],
    ) -> Result<SignedDeploy, ContractClientError> {
        self.call(
            entry_points::RESET_WHITELIST,
            whitelist_args(entries)?,
            self.payments.minter_set_whitelist,
            keys,
        )
    }

    fn call<S: DeploySigner>(
        &self,
        entry_point: &str,
        args: RuntimeArgs,
        payment_cspr: rust_decimal::Decimal,
        keys: &[S],
    ) -> Result<SignedDeploy, ContractClientError> {
        let payment = cspr_to_motes(payment_cspr)?;
        self.client
            .call_entrypoint(entry_point, args, payment, keys)
    }
}

impl<G: NodeGateway> MinterContract<G> {
    pub async fn admin(&self) -> Result<Identity, ContractClientError> {
        self.client.query_named_value(&[named_keys::ADMIN]).await
    }

    pub async fn fund_manager(&self) -> Result<Identity, ContractClientError> {
        self.client
            .query_named_value(&[named_keys::FUND_MANAGER])
            .await
    }

    pub async fn cep78_package_hash(&self) -> Result<Identity, ContractClientError> {
        self.client
            .query_named_value(&[named_keys::CEP78_PACKAGE_HASH])
            .await
    }

    /// Fee per token, in motes.
    pub async fn mint_fee(&self) -> Result<U256, ContractClientError> {
        self.client.query_named_value(&[named_keys::MINT_FEE]).await
    }

    /// Number of tokens minted so far.
    pub async fn mint_count(&self) -> Result<u64, ContractClientError> {
        self.client.query_named_value(&[named_keys::MINT_COUNT]).await
    }

    pub async fn max_mint(&self) -> Result<u64, ContractClientError> {
        self.client.query_named_value(&[named_keys::MAX_MINT]).await
    }

    pub async fn only_whitelist(&self) -> Result<bool, ContractClientError> {
        self.client
            .query_named_value(&[named_keys::ONLY_WHITELIST])
            .await
    }

    pub async fn allow_mint(&self) -> Result<bool, ContractClientError> {
        self.client.query_named_value(&[named_keys::ALLOW_MINT]).await
    }

    /// Read all named keys of the minter. The queries are made concurrently,
    /// and the first failure is returned.
    pub async fn state(&self) -> Result<MinterState, ContractClientError> {
        let (
            admin,
            fund_manager,
            cep78_package_hash,
            mint_fee,
            mint_count,
            max_mint,
            only_whitelist,
            allow_mint,
        ) = futures::try_join!(
            self.admin(),
            self.fund_manager(),
            self.cep78_package_hash(),
            self.mint_fee(),
            self.mint_count(),
            self.max_mint(),
            self.only_whitelist(),
            self.allow_mint()
        )?;
        Ok(MinterState {
            admin,
            fund_manager,
            cep78_package_hash,
            mint_fee,
            mint_count,
            max_mint,
            only_whitelist,
            allow_mint,
        })
    }

    /// The price of minting `count` tokens, in motes.
    pub async fn mint_cost(&self, count: u64) -> Result<U256, ContractClientError> {
        let fee = self.mint_fee().await?;
        fee.checked_mul(&U256::from(count))
            .ok_or(ContractClientError::CostOverflow { count })
    }

    /// Arguments for a native mint of `count` tokens from the bound minter,
    /// paying the current mint cost.
    pub async fn native_mint_args(
        &self,
        nft_owner: Identity,
        count: u64,
    ) -> Result<NativeMintArgs, ContractClientError> {
        let minter_package_hash = self.client.address()?.package_hash;
        let cost = self.mint_cost(count).await?;
        let amount = U512::try_from(cost.as_big_uint().clone())
            .map_err(|_| ContractClientError::CostOverflow { count })?;
        Ok(NativeMintArgs {
            nft_owner,
            count,
            minter_package_hash,
            amount,
        })
    }

    /// The whitelist entry of the account, if it has one.
    pub async fn whitelist_entry(
        &self,
        account: &Identity,
    ) -> Result<DictionaryLookupResult<bool>, ContractClientError> {
        self.client
            .query_dictionary(named_keys::WHITELIST_DICT, account)
            .await
    }

    /// Whether the account is whitelisted. Accounts without an entry are not.
    pub async fn is_whitelisted(&self, account: &Identity) -> Result<bool, ContractClientError> {
        Ok(self.whitelist_entry(account).await?.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dictionary::identity_item_key,
        endpoints::InMemoryGateway,
        types::{
            network::Network,
            transactions::{DeployAssembler, ExecutableDeployItem},
            CLValue, Key, SecretKey,
        },
    };
    use std::sync::Arc;

    fn config() -> NetworkConfig {
        NetworkConfig::for_network(Network::Local, None).expect("Built-in configuration")
    }

    fn key() -> SecretKey { SecretKey::ed25519_from_bytes(&[21u8; 32]).expect("Valid key") }

    fn minter(gateway: Arc<InMemoryGateway>) -> MinterContract<Arc<InMemoryGateway>> {
        MinterContract::from_config(gateway, &config())
    }

    fn contract_hash() -> Identity {
        config()
            .contracts
            .minter
            .expect("Local minter is known")
            .contract_hash
    }

    /// Apply a submitted whitelist update to the in-memory state, as the
    /// contract would.
    fn apply_whitelist(gateway: &InMemoryGateway, deploy: &SignedDeploy) {
        let args = deploy.session().args();
        let accounts: Vec<Key> = args
            .get("whitelist_accounts")
            .expect("Accounts")
            .to_t()
            .expect("List of keys");
        let values: Vec<bool> = args
            .get("whitelist_values")
            .expect("Values")
            .to_t()
            .expect("List of bools");
        for (account, value) in accounts.into_iter().zip(values) {
            let identity = account.into_identity().expect("Account key");
            gateway.put_dictionary_item(
                &contract_hash(),
                named_keys::WHITELIST_DICT,
                &identity_item_key(&identity),
                CLValue::from_t(&value),
            );
        }
    }

    #[test]
    fn test_install_deploy() {
        let gateway = Arc::new(InMemoryGateway::new());
        let minter = MinterContract::new(
            ContractClient::new(gateway, DeployAssembler::new("casper-test")),
            PaymentTable::default(),
        );
        let key = key();
        let wasm = ModuleBytes::new(vec![0, 97, 115, 109, 1, 0, 0, 0]);
        let args = InstallArgs {
            admin:              Identity::from_public_key(&key.public_key()),
            fund_manager:       Identity::account([4u8; 32]),
            cep78_package_hash: Identity::contract([5u8; 32]),
            mint_fee:           U256::from(1_000_000_000),
            only_whitelist:     false,
            allow_mint:         true,
            max_mint:           10_000,
            name:               "apes".into(),
            disable_old:        false,
        };
        let signed = minter
            .install(wasm.clone(), &args, &[&key])
            .expect("Valid install");
        match signed.session() {
            ExecutableDeployItem::ModuleBytes {
                module_bytes,
                args: session_args,
            } => {
                assert_eq!(module_bytes, &wasm);
                assert_eq!(session_args.len(), 9);
            }
            other => panic!("Expected module bytes, got {:?}", other),
        }
        assert_eq!(
            signed.payment(),
            &ExecutableDeployItem::standard_payment(U512::from(140_000_000_000))
        );
        assert_eq!(signed.approvals().len(), 1);
        assert_eq!(signed.approvals()[0].signer, key.public_key());
        signed.verify().expect("Valid signature");
    }

    #[test]
    fn test_writes_require_binding() {
        let minter = MinterContract::new(
            ContractClient::new(InMemoryGateway::new(), DeployAssembler::new("casper-test")),
            PaymentTable::default(),
        );
        let free_mint = FreeMintArgs {
            nft_owner: Identity::account([1u8; 32]),
            count:     1,
        };
        assert!(matches!(
            minter.free_mint(&free_mint, &[key()]),
            Err(ContractClientError::Unbound)
        ));
    }

    #[tokio::test]
    async fn test_whitelist_status() {
        let gateway = Arc::new(InMemoryGateway::new());
        let minter = minter(gateway.clone());
        let key = key();
        let listed = Identity::account([7u8; 32]);
        let unlisted = Identity::account([8u8; 32]);
        let deploy = minter
            .set_whitelist(&[WhitelistEntry::from((listed, true))], &[&key])
            .expect("Bound client");
        minter.client().submit(&deploy).await.expect("Accepted");
        apply_whitelist(&gateway, &gateway.submitted()[0]);

        assert_eq!(
            minter.whitelist_entry(&listed).await.expect("Query succeeds"),
            DictionaryLookupResult::Found(true)
        );
        assert_eq!(
            minter.whitelist_entry(&unlisted).await.expect("Query succeeds"),
            DictionaryLookupResult::NotFound
        );
        assert!(minter.is_whitelisted(&listed).await.expect("Query succeeds"));
        assert!(!minter.is_whitelisted(&unlisted).await.expect("Query succeeds"));

        gateway.set_unavailable(true);
        assert!(matches!(
            minter.is_whitelisted(&unlisted).await,
            Err(ContractClientError::NetworkError(_))
        ));
    }

    #[tokio::test]
    async fn test_state_and_mint_cost() {
        let gateway = Arc::new(InMemoryGateway::new());
        let minter = minter(gateway.clone());
        let contract = contract_hash();
        let set = |name: &str, value: CLValue| gateway.set_named_value(&contract, &[name], value);
        set(named_keys::ADMIN, CLValue::from_t(&Key::Account([1u8; 32])));
        set(named_keys::FUND_MANAGER, CLValue::from_t(&Key::Account([2u8; 32])));
        set(named_keys::CEP78_PACKAGE_HASH, CLValue::from_t(&Key::Hash([3u8; 32])));
        set(named_keys::MINT_FEE, CLValue::from_t(&U256::from(2_500_000_000)));
        set(named_keys::MINT_COUNT, CLValue::from_t(&7u64));
        set(named_keys::MAX_MINT, CLValue::from_t(&10u64));
        set(named_keys::ONLY_WHITELIST, CLValue::from_t(&true));

        let missing = minter.state().await.expect_err("allow_mint is not set");
        assert!(missing.is_not_found());

        set(named_keys::ALLOW_MINT, CLValue::from_t(&false));
        let state = minter.state().await.expect("All keys set");
        assert_eq!(state.admin, Identity::account([1u8; 32]));
        assert_eq!(state.cep78_package_hash, Identity::contract([3u8; 32]));
        assert_eq!(state.remaining(), 3);
        assert!(!state.allow_mint);

        assert_eq!(
            minter.mint_cost(3).await.expect("No overflow"),
            U256::from(7_500_000_000)
        );
        let native = minter
            .native_mint_args(Identity::account([9u8; 32]), 2)
            .await
            .expect("Bound minter");
        assert_eq!(native.amount, U512::from(5_000_000_000));
        assert_eq!(
            native.minter_package_hash,
            config().contracts.minter.expect("Known").package_hash
        );
    }

    #[tokio::test]
    async fn test_mint_cost_overflow() {
        let gateway = Arc::new(InMemoryGateway::new());
        let minter = minter(gateway.clone());
        let max: U256 = "115792089237316195423570985008687907853269984665640564039457584007913129639935"
            .parse()
            .expect("Largest U256");
        gateway.set_named_value(&contract_hash(), &[named_keys::MINT_FEE], CLValue::from_t(&max));
        assert!(matches!(
            minter.mint_cost(2).await,
            Err(ContractClientError::CostOverflow { count: 2 })
        ));
        assert_eq!(minter.mint_cost(1).await.expect("No overflow"), max);
    }
}
