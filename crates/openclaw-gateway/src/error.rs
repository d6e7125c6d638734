//! Gateway client error types.

/// Errors from an outbound `callGateway` call.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The underlying RPC transport or server returned an error.
    #[error("gateway RPC call failed: {0}")]
    Rpc(#[from] jsonrpsee::core::ClientError),

    /// The server's result payload didn't match the expected shape for this
    /// method.
    #[error("unexpected response shape for {method}: {source}")]
    UnexpectedResponse {
        /// The `callGateway` method name.
        method: String,
        /// The JSON decoding error.
        #[source]
        source: serde_json::Error,
    },

    /// A [`crate::test_support::MockGatewayClient`] call configured to fail.
    #[cfg(feature = "test-util")]
    #[error("mock gateway call failed: {0}")]
    Mock(String),
}

/// Result type for gateway client operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
