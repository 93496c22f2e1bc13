use super::{NodeGateway, QueryError, QueryResult, RPCError, RPCResult};
use crate::types::{transactions::SignedDeploy, CLValue, DeployHash, Identity};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};

/// A [`NodeGateway`] backed by the node's JSON-RPC interface.
///
/// Only the methods needed to submit deploys and read contract state are
/// supported.
#[derive(Debug)]
pub struct JsonRpcGateway {
    client:   reqwest::Client,
    endpoint: reqwest::Url,
    next_id:  AtomicU64,
}

#[derive(Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error:  Option<RpcResponseError>,
}

#[derive(Deserialize)]
struct RpcResponseError {
    code:    i64,
    message: String,
    data:    Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct PutDeployResult {
    deploy_hash: DeployHash,
}

#[derive(Deserialize)]
struct StateRootHashResult {
    state_root_hash: Option<String>,
}

#[derive(Deserialize)]
struct StoredValueResult {
    /// A single-key object naming the kind of the stored value.
    stored_value: serde_json::Value,
}

impl JsonRpcGateway {
    /// Use the node's RPC endpoint at the given address. Requests are posted
    /// to the address as given.
    pub fn new(node_address: &str) -> RPCResult<Self> {
        let endpoint = reqwest::Url::parse(node_address)
            .map_err(|e| RPCError::InvalidEndpoint(format!("{}: {}", node_address, e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> RPCResult<R> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::trace!(method, id, "Sending RPC request.");
        let response: RpcResponse<R> = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if let Some(error) = response.error {
            return Err(RPCError::NodeError {
                code:    error.code,
                message: error.message,
                data:    error.data,
            });
        }
        response
            .result
            .ok_or_else(|| anyhow::anyhow!("Response to {} has neither result nor error.", method).into())
    }

    /// Hash of the latest global state.
    pub async fn state_root_hash(&self) -> RPCResult<String> {
        let result: StateRootHashResult = self.call("chain_get_state_root_hash", json!({})).await?;
        result
            .state_root_hash
            .ok_or_else(|| anyhow::anyhow!("Node has no state root hash yet.").into())
    }
}

fn into_cl_value(result: StoredValueResult) -> QueryResult<CLValue> {
    match result.stored_value.get("CLValue") {
        Some(value) => Ok(<CLValue as Deserialize>::deserialize(value).map_err(RPCError::from)?),
        None => Err(RPCError::ParseError(anyhow::anyhow!(
            "The stored value is not a CLValue."
        ))
        .into()),
    }
}

fn map_query_error(e: RPCError) -> QueryError {
    if e.is_not_found() {
        QueryError::NotFound
    } else {
        QueryError::RPCError(e)
    }
}

#[async_trait::async_trait]
impl NodeGateway for JsonRpcGateway {
    async fn submit(&self, deploy: &SignedDeploy) -> RPCResult<DeployHash> {
        let result: PutDeployResult = self
            .call("account_put_deploy", json!({ "deploy": deploy }))
            .await?;
        Ok(result.deploy_hash)
    }

    async fn query_named_value(&self, contract: &Identity, path: &[&str]) -> QueryResult<CLValue> {
        let result: StoredValueResult = self
            .call(
                "query_global_state",
                json!({
                    "state_identifier": null,
                    "key": contract.to_formatted_string(),
                    "path": path,
                }),
            )
            .await
            .map_err(map_query_error)?;
        into_cl_value(result)
    }

    async fn query_dictionary_item(
        &self,
        contract: &Identity,
        dictionary_name: &str,
        item_key: &str,
    ) -> QueryResult<CLValue> {
        let state_root_hash = self.state_root_hash().await?;
        let result: StoredValueResult = self
            .call(
                "state_get_dictionary_item",
                json!({
                    "state_root_hash": state_root_hash,
                    "dictionary_identifier": {
                        "ContractNamedKey": {
                            "key": contract.to_formatted_string(),
                            "dictionary_name": dictionary_name,
                            "dictionary_item_key": item_key,
                        }
                    }
                }),
            )
            .await
            .map_err(map_query_error)?;
        into_cl_value(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parsing() {
        let gateway = JsonRpcGateway::new("http://localhost:11101/rpc").expect("Valid address");
        assert_eq!(gateway.endpoint.as_str(), "http://localhost:11101/rpc");
        assert!(matches!(
            JsonRpcGateway::new("not a url"),
            Err(RPCError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_stored_value_parsing() {
        let result: StoredValueResult = serde_json::from_value(json!({
            "api_version": "1.5.6",
            "stored_value": {
                "CLValue": {"cl_type": "Bool", "bytes": "01", "parsed": true}
            },
            "merkle_proof": "01"
        }))
        .expect("Valid result");
        let value = into_cl_value(result).expect("A CLValue");
        assert!(value.to_t::<bool>().expect("Bool"));

        let result: StoredValueResult = serde_json::from_value(json!({
            "stored_value": {"Account": {}}
        }))
        .expect("Valid result");
        assert!(matches!(
            into_cl_value(result),
            Err(QueryError::RPCError(RPCError::ParseError(_)))
        ));
    }
}
