//! The node interface the SDK depends on, and its implementations.
//!
//! Everything the SDK needs from a node is captured by [`NodeGateway`]:
//! sending a signed deploy, reading a named value under a contract, and
//! reading an item of a contract dictionary. [`JsonRpcGateway`] talks to a
//! real node, and [`InMemoryGateway`] models the relevant parts of global
//! state for tests and dry runs.
use crate::types::{transactions::SignedDeploy, CLValue, DeployHash, Identity};
use std::sync::Arc;
use thiserror::Error;

mod in_memory;
mod json_rpc;

pub use in_memory::InMemoryGateway;
pub use json_rpc::JsonRpcGateway;

/// Error code used by the node when a global state query fails.
pub const QUERY_FAILED_CODE: i64 = -32003;
/// Error code used by the node when it rejects a deploy.
pub const INVALID_DEPLOY_CODE: i64 = -32008;

#[derive(Error, Debug)]
/// Connection, node, or response parsing error.
pub enum RPCError {
    #[error("Call failed: {0}")]
    CallError(#[from] reqwest::Error),
    #[error("Invalid node address `{0}`.")]
    InvalidEndpoint(String),
    #[error("Node returned error {code}: {message}")]
    NodeError {
        code:    i64,
        message: String,
        data:    Option<serde_json::Value>,
    },
    #[error("Node is unavailable: {0}")]
    Unavailable(String),
    #[error("Error parsing JSON result: {0}")]
    ParseError(#[from] anyhow::Error),
}

impl From<serde_json::Error> for RPCError {
    fn from(x: serde_json::Error) -> Self { Self::ParseError(x.into()) }
}

impl RPCError {
    /// Return whether the node reported that the queried value does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            RPCError::NodeError {
                code,
                message,
                data,
            } => {
                let mentions_not_found = |text: &str| {
                    let text = text.to_lowercase();
                    text.contains("valuenotfound") || text.contains("not found")
                };
                *code == QUERY_FAILED_CODE
                    && (mentions_not_found(message)
                        || data
                            .as_ref()
                            .is_some_and(|d| mentions_not_found(&d.to_string())))
            }
            _ => false,
        }
    }

    /// Return whether the node rejected the deploy as invalid.
    /// Retrying a request in this case will not succeed.
    pub fn is_invalid_deploy(&self) -> bool {
        matches!(self, RPCError::NodeError { code, .. } if *code == INVALID_DEPLOY_CODE)
    }
}

#[derive(Error, Debug)]
/// Errors that can occur when making queries. This can either be a general
/// connection or node error, or the requested item is not found.
pub enum QueryError {
    #[error("RPC error: {0}")]
    /// A general RPC error occurred.
    RPCError(#[from] RPCError),
    #[error("Requested object not found.")]
    /// The requested item was not found.
    NotFound,
}

impl QueryError {
    /// Whether this error indicates an object was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            QueryError::RPCError(c) => c.is_not_found(),
            QueryError::NotFound => true,
        }
    }
}

/// Result of a call to the node. This is a simple alias for
/// [std::Result](https://doc.rust-lang.org/std/result/enum.Result.html)
/// that fixes the error type to be [RPCError].
pub type RPCResult<A> = Result<A, RPCError>;

/// Result of a query where the item lookup might fail.
/// This is a simple alias for [std::Result](https://doc.rust-lang.org/std/result/enum.Result.html) that fixes the error type to be [`QueryError`].
pub type QueryResult<A> = Result<A, QueryError>;

/// The operations the SDK needs from a node.
#[async_trait::async_trait]
pub trait NodeGateway: Send + Sync {
    /// Send a signed deploy. Returns the deploy hash reported by the node.
    async fn submit(&self, deploy: &SignedDeploy) -> RPCResult<DeployHash>;

    /// Read the value at `path` under the named keys of the given contract.
    async fn query_named_value(&self, contract: &Identity, path: &[&str]) -> QueryResult<CLValue>;

    /// Read an item of the named dictionary of the given contract.
    async fn query_dictionary_item(
        &self,
        contract: &Identity,
        dictionary_name: &str,
        item_key: &str,
    ) -> QueryResult<CLValue>;
}

#[async_trait::async_trait]
impl<G: NodeGateway + ?Sized> NodeGateway for Arc<G> {
    async fn submit(&self, deploy: &SignedDeploy) -> RPCResult<DeployHash> {
        self.as_ref().submit(deploy).await
    }

    async fn query_named_value(&self, contract: &Identity, path: &[&str]) -> QueryResult<CLValue> {
        self.as_ref().query_named_value(contract, path).await
    }

    async fn query_dictionary_item(
        &self,
        contract: &Identity,
        dictionary_name: &str,
        item_key: &str,
    ) -> QueryResult<CLValue> {
        self.as_ref()
            .query_dictionary_item(contract, dictionary_name, item_key)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_error(code: i64, message: &str, data: Option<serde_json::Value>) -> RPCError {
        RPCError::NodeError {
            code,
            message: message.into(),
            data,
        }
    }

    #[test]
    fn test_not_found_classification() {
        assert!(node_error(
            QUERY_FAILED_CODE,
            "state query failed: ValueNotFound(\"Failed to find base key\")",
            None
        )
        .is_not_found());
        assert!(node_error(
            QUERY_FAILED_CODE,
            "Failed to get dictionary item",
            Some(serde_json::json!("Value not found"))
        )
        .is_not_found());
        assert!(!node_error(QUERY_FAILED_CODE, "state root hash unknown", None).is_not_found());
        assert!(!node_error(-32601, "Method not found", None).is_not_found());
        assert!(!RPCError::Unavailable("down".into()).is_not_found());
        assert!(QueryError::NotFound.is_not_found());
        assert!(node_error(INVALID_DEPLOY_CODE, "invalid deploy", None).is_invalid_deploy());
    }
}
