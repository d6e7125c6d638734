//! The single outbound RPC surface: `callGateway({method, params})`.
//!
//! The chat-channel gateway is an external collaborator (spec §1); the core
//! only ever calls it through this one generic method, passing an inner
//! method name (`"agent"`, `"agent.wait"`, `"sessions.patch"`,
//! `"sessions.delete"`) and a JSON params object.

use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;
use serde_json::Value;

/// The gateway RPC surface consumed by the core.
#[rpc(client, namespace = "gateway")]
pub trait GatewayRpc {
    /// Dispatch an inner `{method, params}` call to the chat-channel
    /// gateway and return its raw JSON result.
    #[method(name = "callGateway")]
    async fn call_gateway(&self, method: String, params: Value) -> RpcResult<Value>;
}
