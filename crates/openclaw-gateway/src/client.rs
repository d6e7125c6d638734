//! Typed convenience wrappers over the raw `callGateway` RPC.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};
use crate::rpc::GatewayRpcClient;
use crate::types::{AgentParams, AgentWaitParams, AgentWaitResult, SessionsDeleteParams, SessionsPatchParams};

/// The outbound gateway surface the core's announce flow and run dispatcher
/// use. Implemented generically over anything that speaks the
/// [`GatewayRpcClient`] trait, so callers can swap in an HTTP, websocket, or
/// in-memory transport without touching call sites.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Start or continue a run (spec §6 `agent`).
    async fn agent(&self, params: AgentParams) -> GatewayResult<Value>;

    /// Wait for a run to reach a terminal state (spec §6 `agent.wait`).
    async fn agent_wait(&self, params: AgentWaitParams) -> GatewayResult<AgentWaitResult>;

    /// Relabel a session (spec §6 `sessions.patch`).
    async fn sessions_patch(&self, params: SessionsPatchParams) -> GatewayResult<()>;

    /// Delete a session, and optionally its transcript (spec §6
    /// `sessions.delete`).
    async fn sessions_delete(&self, params: SessionsDeleteParams) -> GatewayResult<()>;
}

/// A [`GatewayClient`] backed by a concrete `callGateway` RPC connection.
pub struct JsonRpcGatewayClient<C> {
    inner: C,
}

impl<C> JsonRpcGatewayClient<C> {
    /// Wrap an RPC connection (any `jsonrpsee` client transport implementing
    /// [`GatewayRpcClient`], e.g. an HTTP or websocket client).
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C> GatewayClient for JsonRpcGatewayClient<C>
where
    C: GatewayRpcClient + Send + Sync,
{
    async fn agent(&self, params: AgentParams) -> GatewayResult<Value> {
        self.call("agent", params).await
    }

    async fn agent_wait(&self, params: AgentWaitParams) -> GatewayResult<AgentWaitResult> {
        self.call("agent.wait", params).await
    }

    async fn sessions_patch(&self, params: SessionsPatchParams) -> GatewayResult<()> {
        self.call::<_, Value>("sessions.patch", params).await?;
        Ok(())
    }

    async fn sessions_delete(&self, params: SessionsDeleteParams) -> GatewayResult<()> {
        self.call::<_, Value>("sessions.delete", params).await?;
        Ok(())
    }
}

impl<C> JsonRpcGatewayClient<C>
where
    C: GatewayRpcClient + Send + Sync,
{
    async fn call<P, R>(&self, method: &str, params: P) -> GatewayResult<R>
    where
        P: serde::Serialize + Send,
        R: serde::de::DeserializeOwned,
    {
        let params_value = serde_json::to_value(params).map_err(|e| GatewayError::UnexpectedResponse {
            method: method.to_owned(),
            source: e,
        })?;
        debug!(method, "calling gateway");
        let raw = self.inner.call_gateway(method.to_owned(), params_value).await?;
        serde_json::from_value(raw).map_err(|e| GatewayError::UnexpectedResponse {
            method: method.to_owned(),
            source: e,
        })
    }
}
