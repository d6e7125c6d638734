//! In-memory [`GatewayClient`] test double.
//!
//! Gated behind the `test-util` feature so other crates (notably
//! `openclaw-runtime`'s announce-flow tests) can exercise the client
//! interface without a real RPC transport.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::client::GatewayClient;
use crate::error::GatewayResult;
use crate::types::{AgentParams, AgentWaitParams, AgentWaitResult, RunStatus, SessionsDeleteParams, SessionsPatchParams};

/// One recorded call against [`MockGatewayClient`].
#[derive(Debug, Clone)]
pub enum RecordedCall {
    /// An `agent` call.
    Agent(AgentParams),
    /// An `agent.wait` call.
    AgentWait(AgentWaitParams),
    /// A `sessions.patch` call.
    SessionsPatch(SessionsPatchParams),
    /// A `sessions.delete` call.
    SessionsDelete(SessionsDeleteParams),
}

/// A [`GatewayClient`] that records every call and returns canned results,
/// for exercising the announce flow's best-effort error handling without a
/// live gateway.
#[derive(Default)]
pub struct MockGatewayClient {
    calls: Mutex<Vec<RecordedCall>>,
    /// Result returned by `agent_wait`. Defaults to `Ok` with no
    /// start/end times if never set.
    pub agent_wait_result: Mutex<Option<AgentWaitResult>>,
    /// If set, every call fails with this message instead of succeeding
    /// (used to exercise the announce flow's "swallow and log" paths).
    pub fail_with: Mutex<Option<String>>,
}

impl MockGatewayClient {
    /// Create an empty recorder with no canned failures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Make every subsequent call fail with `message`.
    pub fn set_failing(&self, message: impl Into<String>) {
        *self.fail_with.lock().unwrap_or_else(|e| e.into_inner()) = Some(message.into());
    }

    fn check_failure(&self) -> GatewayResult<()> {
        match self.fail_with.lock().unwrap_or_else(|e| e.into_inner()).clone() {
            Some(msg) => Err(crate::error::GatewayError::Mock(msg)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl GatewayClient for MockGatewayClient {
    async fn agent(&self, params: AgentParams) -> GatewayResult<Value> {
        self.check_failure()?;
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall::Agent(params));
        Ok(Value::Null)
    }

    async fn agent_wait(&self, params: AgentWaitParams) -> GatewayResult<AgentWaitResult> {
        self.check_failure()?;
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall::AgentWait(params));
        Ok(self
            .agent_wait_result
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap_or(AgentWaitResult {
                status: RunStatus::Ok,
                started_at: None,
                ended_at: None,
                error: None,
            }))
    }

    async fn sessions_patch(&self, params: SessionsPatchParams) -> GatewayResult<()> {
        self.check_failure()?;
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall::SessionsPatch(params));
        Ok(())
    }

    async fn sessions_delete(&self, params: SessionsDeleteParams) -> GatewayResult<()> {
        self.check_failure()?;
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall::SessionsDelete(params));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_agent_params() -> AgentParams {
        AgentParams {
            session_key: "s1".to_owned(),
            message: "hello".to_owned(),
            channel: None,
            account_id: None,
            to: None,
            thread_id: None,
            deliver: true,
            idempotency_key: "k1".to_owned(),
        }
    }

    #[tokio::test]
    async fn records_calls_in_order() {
        let mock = MockGatewayClient::new();
        mock.agent(sample_agent_params()).await.unwrap();
        mock.sessions_patch(SessionsPatchParams {
            key: "s1".to_owned(),
            label: "done".to_owned(),
        })
        .await
        .unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], RecordedCall::Agent(_)));
        assert!(matches!(calls[1], RecordedCall::SessionsPatch(_)));
    }

    #[tokio::test]
    async fn set_failing_makes_subsequent_calls_err() {
        let mock = MockGatewayClient::new();
        mock.set_failing("channel unreachable");

        let result = mock.agent(sample_agent_params()).await;
        assert!(result.is_err());
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn agent_wait_returns_canned_result_when_set() {
        let mock = MockGatewayClient::new();
        *mock.agent_wait_result.lock().unwrap() = Some(AgentWaitResult {
            status: RunStatus::Timeout,
            started_at: None,
            ended_at: None,
            error: None,
        });

        let result = mock
            .agent_wait(AgentWaitParams {
                run_id: "r1".to_owned(),
                timeout_ms: 1000,
            })
            .await
            .unwrap();
        assert_eq!(result.status, RunStatus::Timeout);
    }
}
