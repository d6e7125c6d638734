//! Outbound `callGateway` RPC client.
//!
//! The chat-channel gateway is an external collaborator (spec §1); this
//! crate only models the client side of the single RPC surface the core
//! uses to reach it.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod error;
mod rpc;
#[cfg(feature = "test-util")]
pub mod test_support;
mod types;

pub use client::{GatewayClient, JsonRpcGatewayClient};
pub use error::{GatewayError, GatewayResult};
pub use rpc::GatewayRpcClient;
pub use types::{
    AgentParams, AgentWaitParams, AgentWaitResult, RunStatus, SessionsDeleteParams,
    SessionsPatchParams,
};
