//! Network selection and per-network configuration.
//!
//! A [`NetworkConfig`] is selected once, either from the built-in defaults
//! for a [`Network`] or from a JSON file, and then passed by value to the
//! contract clients.
use super::{transactions::DeployAssembler, ContractAddress, MalformedIdentity, U512};
use crate::constants::MOTES_PER_CSPR;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, str::FromStr};

/// The networks with built-in defaults. The text form is the chain name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    #[serde(rename = "casper-net-1")]
    Local,
    #[serde(rename = "casper-test")]
    Test,
    #[serde(rename = "casper")]
    Main,
}

impl Network {
    pub fn chain_name(self) -> &'static str {
        match self {
            Network::Local => "casper-net-1",
            Network::Test => "casper-test",
            Network::Main => "casper",
        }
    }

    /// Name of the environment variable holding the node provider's API key.
    pub fn api_key_variable(self) -> Option<&'static str> {
        match self {
            Network::Local => None,
            Network::Test => Some("VALIDATION_CLOUD_KEY"),
            Network::Main => Some("VALIDATION_CLOUD_KEY_MAIN"),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.chain_name()) }
}

impl FromStr for Network {
    type Err = NetworkConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "casper-net-1" | "local" => Ok(Network::Local),
            "casper-test" | "test" | "testnet" => Ok(Network::Test),
            "casper" | "main" | "mainnet" => Ok(Network::Main),
            other => Err(NetworkConfigError::UnknownNetwork(other.into())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkConfigError {
    #[error("Unknown network `{0}`.")]
    UnknownNetwork(String),
    #[error("The node of {0} requires an API key.")]
    MissingApiKey(Network),
    #[error("Invalid contract address: {0}")]
    MalformedAddress(#[from] MalformedIdentity),
    #[error("Payment of {0} CSPR is not a whole number of motes.")]
    InvalidPayment(Decimal),
    #[error("Could not read the configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Payment amounts, in CSPR, for each kind of deploy.
pub struct PaymentTable {
    pub minter_install:       Decimal,
    pub minter_free_mint:     Decimal,
    pub minter_native_mint:   Decimal,
    pub minter_set_whitelist: Decimal,
    pub minter_set_config:    Decimal,
    pub cep78_install:        Decimal,
    pub cep78_set_variables:  Decimal,
    pub cep18_install:        Decimal,
    pub cep18_call:           Decimal,
}

impl Default for PaymentTable {
    fn default() -> Self {
        Self {
            minter_install:       Decimal::from(140),
            minter_free_mint:     Decimal::from(10_000),
            minter_native_mint:   Decimal::from(85),
            minter_set_whitelist: Decimal::from(2),
            minter_set_config:    Decimal::from(20),
            cep78_install:        Decimal::from(600),
            cep78_set_variables:  Decimal::from(6),
            cep18_install:        Decimal::from(600),
            cep18_call:           Decimal::from(6),
        }
    }
}

/// Convert an amount of CSPR to motes. Fails for negative amounts and for
/// amounts with more precision than one mote.
pub fn cspr_to_motes(cspr: Decimal) -> Result<U512, NetworkConfigError> {
    let motes = cspr
        .checked_mul(Decimal::from(MOTES_PER_CSPR))
        .filter(|m| m.fract().is_zero() && !m.is_sign_negative())
        .and_then(|m| m.to_u64())
        .ok_or(NetworkConfigError::InvalidPayment(cspr))?;
    Ok(U512::from(motes))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Addresses of the deployed contracts, where known.
pub struct DeployedContracts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minter: Option<ContractAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cep78:  Option<ContractAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cep18:  Option<ContractAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Everything that differs between networks.
pub struct NetworkConfig {
    pub network:      Network,
    /// JSON-RPC endpoint of the node.
    pub node_address: String,
    #[serde(default)]
    pub contracts:    DeployedContracts,
    #[serde(default)]
    pub payments:     PaymentTable,
}

impl NetworkConfig {
    /// The built-in configuration of a network. The hosted test and main net
    /// nodes require an API key, which is part of the node address.
    pub fn for_network(network: Network, api_key: Option<&str>) -> Result<Self, NetworkConfigError> {
        let (node_address, contracts) = match network {
            Network::Local => ("http://localhost:11101".to_string(), DeployedContracts {
                minter: Some(ContractAddress::parse(
                    "hash-1b349329cda30830cb64564c1ee534c6dfe58c8e149886f3541c6c6f547c25fd",
                    "hash-fafd7ffb4edccaa4565192075ac81fdeeffe8690636e2ef211f4cc1a28a64725",
                )?),
                cep78:  Some(ContractAddress::parse(
                    "hash-100f84e65b6918d896c5fc45870551e5373663107dc361e3356ac6997a3e7700",
                    "hash-8f86deb1ac694d81270becf7301f4f073704b133acbf0561f2fe6278aa813a3c",
                )?),
                cep18:  Some(ContractAddress::parse(
                    "hash-80167344b3d4e90259ecd9335cbd229ee4949cc98e46a1ca4b7f4286c0a17704",
                    "hash-9e27c61a5f0fe5cbcf4a487610fbc03b3fb8b33c671604d3dbe172a4d500bc26",
                )?),
            }),
            Network::Test => {
                let key = api_key.ok_or(NetworkConfigError::MissingApiKey(network))?;
                (
                    format!("https://testnet.casper.validationcloud.io/v1/{}", key),
                    DeployedContracts {
                        minter: Some(ContractAddress::parse(
                            "hash-cdd3e3c7f4d54795d25abbf77c217e36b8550ff941a316df0898724b98e644ef",
                            "hash-ecf3bf7a4766c0c9e639b47fef132e482377227904e3882ed4b03b588420ed8d",
                        )?),
                        cep78:  Some(ContractAddress::parse(
                            "hash-54feec16c4dfeaffd3dcbda008e9c820db69c22d4717c91f5937fd25bcc3d4ad",
                            "hash-a12aee42d59ce868fd2d6d49c77f281fc7f7281151edd569b4511f0af4db8f42",
                        )?),
                        cep18:  None,
                    },
                )
            }
            Network::Main => {
                let key = api_key.ok_or(NetworkConfigError::MissingApiKey(network))?;
                (
                    format!("https://mainnet.casper.validationcloud.io/v1/{}", key),
                    DeployedContracts::default(),
                )
            }
        };
        Ok(Self {
            network,
            node_address,
            contracts,
            payments: PaymentTable::default(),
        })
    }

    /// Read a configuration from a JSON file. Missing contract addresses and
    /// payments fall back to none and the default table, respectively.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, NetworkConfigError> {
        let data = std::fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub fn chain_name(&self) -> &'static str { self.network.chain_name() }

    /// A deploy assembler for this network's chain.
    pub fn assembler(&self) -> DeployAssembler { DeployAssembler::new(self.chain_name()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_defaults() {
        let config = NetworkConfig::for_network(Network::Local, None).expect("Local needs no key");
        assert_eq!(config.chain_name(), "casper-net-1");
        assert_eq!(config.node_address, "http://localhost:11101");
        assert!(config.contracts.minter.is_some());
        assert!(config.contracts.cep18.is_some());
        assert_eq!(config.assembler().chain_name(), "casper-net-1");
    }

    #[test]
    fn test_hosted_nodes_need_a_key() {
        assert!(matches!(
            NetworkConfig::for_network(Network::Test, None),
            Err(NetworkConfigError::MissingApiKey(Network::Test))
        ));
        let config = NetworkConfig::for_network(Network::Main, Some("abc")).expect("Key given");
        assert!(config.node_address.ends_with("/v1/abc"));
        assert_eq!(config.contracts, DeployedContracts::default());
    }

    #[test]
    fn test_network_names() {
        for network in [Network::Local, Network::Test, Network::Main] {
            assert_eq!(network.to_string().parse::<Network>().expect("Known"), network);
        }
        assert_eq!("testnet".parse::<Network>().expect("Alias"), Network::Test);
        assert!("devnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_cspr_to_motes() {
        assert_eq!(
            cspr_to_motes(Decimal::from(140)).expect("Whole"),
            U512::from(140_000_000_000u64)
        );
        assert_eq!(
            cspr_to_motes(Decimal::new(25, 1)).expect("2.5 CSPR"),
            U512::from(2_500_000_000u64)
        );
        assert!(cspr_to_motes(Decimal::new(1, 10)).is_err());
        assert!(cspr_to_motes(Decimal::from(-1)).is_err());
    }

    #[test]
    fn test_config_file() {
        let json = serde_json::json!({
            "network": "casper-test",
            "nodeAddress": "http://127.0.0.1:7777",
            "contracts": {
                "minter": {
                    "contractHash": "hash-cdd3e3c7f4d54795d25abbf77c217e36b8550ff941a316df0898724b98e644ef",
                    "packageHash": "hash-ecf3bf7a4766c0c9e639b47fef132e482377227904e3882ed4b03b588420ed8d",
                }
            }
        });
        let path = std::env::temp_dir().join(format!("nft-minter-config-{}.json", std::process::id()));
        std::fs::write(&path, json.to_string()).expect("Writable temp dir");
        let config = NetworkConfig::from_file(&path).expect("Valid file");
        std::fs::remove_file(&path).expect("Created above");
        assert_eq!(config.network, Network::Test);
        assert!(config.contracts.cep78.is_none());
        assert_eq!(config.payments, PaymentTable::default());
    }
}
