use std::io;

/// Errors raised by a transport or one of its connections.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// The peer connected but the protocol upgrade failed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// A frame, probe, or close frame could not be written.
    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Receive(String),
}
