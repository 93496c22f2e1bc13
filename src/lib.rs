//! A library for building deploys for, and reading the state of, the NFT
//! minter contract and the token contracts it works with. The library is
//! structured around multiple modules.
//!
//! - [`contract_client`] contains the main entrypoint to the library, the
//!   [`ContractClient`](contract_client::ContractClient) struct. It binds to a
//!   contract, builds and signs deploys that install or call it, submits them,
//!   and reads named values and dictionary items.
//! - [`endpoints`] contains the [`NodeGateway`](endpoints::NodeGateway) trait
//!   the client talks to, with a JSON-RPC and an in-memory implementation.
//! - [`types`] contains most type definitions, in particular identities and
//!   keys, contract arguments, and deploys. The latter are in a submodule
//!   [`types::transactions`].
//! - [`dictionary`] resolves items of contract dictionaries, distinguishing
//!   missing entries from failures.
//!
//! On top of the generic client, [`minter`], [`cep78`] and [`cep18`] provide
//! typed functions for the individual contracts.

/// Binary serialization used for contract arguments and deploy hashing.
pub mod common;
/// Various constants that apply to the chain and the contracts.
pub mod constants;
/// The node interface and its implementations.
pub mod endpoints;
mod internal;
/// Type definitions used throughout the rest of the SDK.
pub mod types;

/// A generic client for interacting with contracts.
pub mod contract_client;
pub mod dictionary;

/// Types and functions for working with the NFT minter contract.
pub mod minter;
/// Types and functions for working with CEP-78 NFT collections.
pub mod cep78;
/// Types and functions for working with CEP-18 fungible tokens.
pub mod cep18;
