//! This module contains types and functions for interacting with fungible
//! tokens following the [CEP-18](https://github.com/casper-ecosystem/cep18)
//! standard.
use crate::{
    common::to_bytes,
    contract_client::{ContractClient, ContractClientError},
    endpoints::NodeGateway,
    types::{
        network::{cspr_to_motes, NetworkConfig, PaymentTable},
        transactions::{ModuleBytes, SignedDeploy},
        ArgumentError, DeploySigner, Identity, RuntimeArgs, U256,
    },
};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

pub const BALANCES_DICTIONARY: &str = "balances";

mod named_keys {
    pub const NAME: &str = "name";
    pub const SYMBOL: &str = "symbol";
    pub const DECIMALS: &str = "decimals";
    pub const TOTAL_SUPPLY: &str = "total_supply";
}

/// Arguments of a token's installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cep18InstallArgs {
    pub name:                 String,
    pub symbol:               String,
    pub decimals:             u8,
    /// Initial supply, credited to the installing account.
    pub total_supply:         U256,
    /// Whether the installer may mint and burn after installation.
    pub enable_mint_and_burn: bool,
}

impl Cep18InstallArgs {
    pub fn to_runtime_args(&self) -> Result<RuntimeArgs, ArgumentError> {
        let mut args = RuntimeArgs::new();
        args.insert(named_keys::NAME, self.name.clone())?;
        args.insert(named_keys::SYMBOL, self.symbol.clone())?;
        args.insert(named_keys::DECIMALS, self.decimals)?;
        args.insert(named_keys::TOTAL_SUPPLY, self.total_supply.clone())?;
        args.insert("enable_mint_burn", u8::from(self.enable_mint_and_burn))?;
        Ok(args)
    }
}

/// The item key of an owner in the `balances` dictionary: the standard
/// base64 encoding of the owner's serialized key.
pub fn balance_item_key(owner: &Identity) -> String {
    BASE64_STANDARD.encode(to_bytes(&owner.to_key()))
}

/// A wrapper around the client representing a CEP-18 token.
#[derive(Debug, Clone)]
pub struct Cep18Contract<G> {
    client:   ContractClient<G>,
    payments: PaymentTable,
}

impl<G> Cep18Contract<G> {
    pub fn new(client: ContractClient<G>, payments: PaymentTable) -> Self {
        Self { client, payments }
    }

    /// A client for the network's token, if the configuration knows one.
    pub fn from_config(gateway: G, config: &NetworkConfig) -> Self {
        let client = match config.contracts.cep18 {
            Some(address) => ContractClient::with_address(gateway, config.assembler(), address),
            None => ContractClient::new(gateway, config.assembler()),
        };
        Self::new(client, config.payments.clone())
    }

    pub fn client(&self) -> &ContractClient<G> { &self.client }

    pub fn client_mut(&mut self) -> &mut ContractClient<G> { &mut self.client }

    pub fn install<S: DeploySigner>(
        &self,
        wasm: ModuleBytes,
        args: &Cep18InstallArgs,
        keys: &[S],
    ) -> Result<SignedDeploy, ContractClientError> {
        let payment = cspr_to_motes(self.payments.cep18_install)?;
        self.client
            .install(wasm, args.to_runtime_args()?, payment, keys)
    }

    /// Build and sign a deploy that mints `amount` tokens to `owner`. Only
    /// the installer may mint, and only if minting was enabled at
    /// installation.
    pub fn mint<S: DeploySigner>(
        &self,
        owner: &Identity,
        amount: U256,
        keys: &[S],
    ) -> Result<SignedDeploy, ContractClientError> {
        self.call_with_amount("mint", "owner", owner, amount, keys)
    }

    /// Build and sign a deploy that allows `spender` to transfer up to
    /// `amount` of the sender's tokens.
    pub fn approve<S: DeploySigner>(
        &self,
        spender: &Identity,
        amount: U256,
        keys: &[S],
    ) -> Result<SignedDeploy, ContractClientError> {
        self.call_with_amount("approve", "spender", spender, amount, keys)
    }

    fn call_with_amount<S: DeploySigner>(
        &self,
        entry_point: &str,
        target_arg: &str,
        target: &Identity,
        amount: U256,
        keys: &[S],
    ) -> Result<SignedDeploy, ContractClientError> {
        let mut args = RuntimeArgs::new();
        args.insert(target_arg, target.to_key())?;
        args.insert("amount", amount)?;
        let payment = cspr_to_motes(self.payments.cep18_call)?;
        self.client
            .call_entrypoint(entry_point, args, payment, keys)
    }
}

impl<G: NodeGateway> Cep18Contract<G> {
    pub async fn name(&self) -> Result<String, ContractClientError> {
        self.client.query_named_value(&[named_keys::NAME]).await
    }

    pub async fn symbol(&self) -> Result<String, ContractClientError> {
        self.client.query_named_value(&[named_keys::SYMBOL]).await
    }

    pub async fn decimals(&self) -> Result<u8, ContractClientError> {
        self.client.query_named_value(&[named_keys::DECIMALS]).await
    }

    pub async fn total_supply(&self) -> Result<U256, ContractClientError> {
        self.client
            .query_named_value(&[named_keys::TOTAL_SUPPLY])
            .await
    }

    /// Token balance of the owner. Owners that never held tokens have a
    /// balance of zero.
    pub async fn balance_of(&self, owner: &Identity) -> Result<U256, ContractClientError> {
        Ok(self
            .client
            .query_dictionary_by_item_key::<U256>(BALANCES_DICTIONARY, &balance_item_key(owner))
            .await?
            .unwrap_or(U256::zero()))
    }
}
