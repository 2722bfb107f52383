//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means a frame could not be turned into bytes
//! or back. It never means a networking or room problem.

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A server frame could not be serialized.
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),

    /// An inbound frame is not valid JSON, has an unknown `type` tag, or
    /// is missing required fields.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),
}
