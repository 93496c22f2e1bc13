//! Argument and state types of the minter contract.

use crate::{
    contract_client::ContractClientError,
    types::{ArgumentError, Identity, Key, RuntimeArgs, U256, U512},
};
use serde::{Deserialize, Serialize};

/// Named keys under which the minter stores its state.
pub mod named_keys {
    pub const ADMIN: &str = "admin";
    pub const FUND_MANAGER: &str = "fund_manager";
    pub const CEP78_PACKAGE_HASH: &str = "cep78_package_hash";
    pub const MINT_FEE: &str = "mint_fee";
    pub const MINT_COUNT: &str = "mint_count";
    pub const MAX_MINT: &str = "max_mint";
    pub const ONLY_WHITELIST: &str = "only_whitelist";
    pub const ALLOW_MINT: &str = "allow_mint";
    pub const WHITELIST_DICT: &str = "whitelist_dict";
}

/// Entry points of the minter contract.
pub mod entry_points {
    pub const SET_CONFIG: &str = "set_config";
    pub const FREE_MINT: &str = "free_mint";
    pub const SET_WHITELIST: &str = "set_whitelist";
    pub const RESET_WHITELIST: &str = "reset_whitelist";
}

const ARG_NAME: &str = "name";
const ARG_DISABLE_OLD: &str = "disable_old";
const ARG_NFT_OWNER: &str = "nft_owner";
const ARG_COUNT: &str = "count";
const ARG_MINTER_PACKAGE_HASH: &str = "minter_package_hash";
const ARG_AMOUNT: &str = "amount";
const ARG_WHITELIST_ACCOUNTS: &str = "whitelist_accounts";
const ARG_WHITELIST_VALUES: &str = "whitelist_values";

/// Arguments of the minter's installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallArgs {
    pub admin:              Identity,
    /// The account that receives mint fees.
    pub fund_manager:       Identity,
    /// The package of the CEP-78 collection the minter mints into.
    pub cep78_package_hash: Identity,
    pub mint_fee:           U256,
    pub only_whitelist:     bool,
    pub allow_mint:         bool,
    pub max_mint:           u64,
    /// Suffix of the named keys under which the installing account stores the
    /// contract and package hashes.
    pub name:               String,
    /// Disable the previously installed version of the contract, if any.
    pub disable_old:        bool,
}

impl InstallArgs {
    pub fn to_runtime_args(&self) -> Result<RuntimeArgs, ArgumentError> {
        let mut args = RuntimeArgs::new();
        args.insert(named_keys::ADMIN, self.admin.to_key())?;
        args.insert(named_keys::FUND_MANAGER, self.fund_manager.to_key())?;
        args.insert(
            named_keys::CEP78_PACKAGE_HASH,
            self.cep78_package_hash.to_key(),
        )?;
        args.insert(named_keys::MINT_FEE, self.mint_fee.clone())?;
        args.insert(named_keys::ONLY_WHITELIST, self.only_whitelist)?;
        args.insert(named_keys::ALLOW_MINT, self.allow_mint)?;
        args.insert(named_keys::MAX_MINT, self.max_mint)?;
        args.insert(ARG_NAME, self.name.clone())?;
        args.insert(ARG_DISABLE_OLD, self.disable_old)?;
        Ok(args)
    }
}

/// Arguments of an upgrade, i.e., installing a new version of the minter into
/// its existing package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeArgs {
    pub name:        String,
    pub disable_old: bool,
}

impl UpgradeArgs {
    pub fn to_runtime_args(&self) -> Result<RuntimeArgs, ArgumentError> {
        let mut args = RuntimeArgs::new();
        args.insert(ARG_NAME, self.name.clone())?;
        args.insert(ARG_DISABLE_OLD, self.disable_old)?;
        Ok(args)
    }
}

/// A partial update of the minter's configuration. Only the fields that are
/// set are sent, and the contract leaves the others unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin:          Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fund_manager:   Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mint_fee:       Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_whitelist: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_mint:     Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_mint:       Option<u64>,
}

impl ConfigUpdate {
    /// Whether no field is set.
    pub fn is_empty(&self) -> bool { *self == Self::default() }

    /// One argument per field that is set, including fields set to `false` or
    /// zero.
    pub fn to_runtime_args(&self) -> Result<RuntimeArgs, ArgumentError> {
        let mut args = RuntimeArgs::new();
        args.insert_if_some(named_keys::ADMIN, self.admin.map(|a| a.to_key()))?;
        args.insert_if_some(
            named_keys::FUND_MANAGER,
            self.fund_manager.map(|f| f.to_key()),
        )?;
        args.insert_if_some(named_keys::MINT_FEE, self.mint_fee.clone())?;
        args.insert_if_some(named_keys::ONLY_WHITELIST, self.only_whitelist)?;
        args.insert_if_some(named_keys::ALLOW_MINT, self.allow_mint)?;
        args.insert_if_some(named_keys::MAX_MINT, self.max_mint)?;
        Ok(args)
    }
}

/// Mint `count` tokens to `nft_owner` without paying the fee. Only the admin
/// may do this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeMintArgs {
    pub nft_owner: Identity,
    pub count:     u64,
}

impl FreeMintArgs {
    pub fn to_runtime_args(&self) -> Result<RuntimeArgs, ArgumentError> {
        let mut args = RuntimeArgs::new();
        args.insert(ARG_NFT_OWNER, self.nft_owner.to_key())?;
        args.insert(ARG_COUNT, self.count)?;
        Ok(args)
    }
}

/// Mint `count` tokens to `nft_owner`, paying `amount` motes from the
/// sender's purse. The session code transfers the amount and calls the minter
/// package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeMintArgs {
    pub nft_owner:           Identity,
    pub count:               u64,
    pub minter_package_hash: Identity,
    pub amount:              U512,
}

impl NativeMintArgs {
    pub fn to_runtime_args(&self) -> Result<RuntimeArgs, ArgumentError> {
        let mut args = RuntimeArgs::new();
        args.insert(ARG_NFT_OWNER, self.nft_owner.to_key())?;
        args.insert(ARG_COUNT, self.count)?;
        args.insert(
            ARG_MINTER_PACKAGE_HASH,
            self.minter_package_hash.to_key(),
        )?;
        args.insert(ARG_AMOUNT, self.amount.clone())?;
        Ok(args)
    }
}

/// Whitelist status to set for a single account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub account: Identity,
    pub value:   bool,
}

impl From<(Identity, bool)> for WhitelistEntry {
    fn from((account, value): (Identity, bool)) -> Self { Self { account, value } }
}

/// Split whitelist entries into the parallel `whitelist_accounts` and
/// `whitelist_values` lists the contract expects. The i-th account and value
/// come from the i-th entry.
pub fn whitelist_args(entries: &[WhitelistEntry]) -> Result<RuntimeArgs, ContractClientError> {
    let (accounts, values): (Vec<Key>, Vec<bool>) = entries
        .iter()
        .map(|entry| (entry.account.to_key(), entry.value))
        .unzip();
    if accounts.len() != values.len() {
        return Err(ContractClientError::InvalidWhitelist {
            accounts: accounts.len(),
            values:   values.len(),
        });
    }
    let mut args = RuntimeArgs::new();
    args.insert(ARG_WHITELIST_ACCOUNTS, accounts)?;
    args.insert(ARG_WHITELIST_VALUES, values)?;
    Ok(args)
}

/// The full configuration and progress of a minter, as read from its named
/// keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinterState {
    pub admin:              Identity,
    pub fund_manager:       Identity,
    pub cep78_package_hash: Identity,
    pub mint_fee:           U256,
    pub mint_count:         u64,
    pub max_mint:           u64,
    pub only_whitelist:     bool,
    pub allow_mint:         bool,
}

impl MinterState {
    /// Number of tokens that can still be minted.
    pub fn remaining(&self) -> u64 { self.max_mint.saturating_sub(self.mint_count) }
}
