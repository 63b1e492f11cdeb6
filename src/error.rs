//! Error types for the chat server
//!
//! Defines connection-level errors and message send errors.
//! Uses thiserror for ergonomic error definitions.
//!
//! Registry operations deliberately have no error type of their own:
//! lookup misses come back as `None` and duplicate joins/connects are
//! silent no-ops, so only the I/O layer can actually fail.

use thiserror::Error;

/// Connection-level errors
///
/// These are fatal for the connection they occur on: the worker logs
/// them and tears the session down.
#[derive(Debug, Error)]
pub enum ChatError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Line framing error (oversized or undecodable input)
    #[error("Line decode error: {0}")]
    LineCodec(#[from] tokio_util::codec::LinesCodecError),

    /// Outbound channel closed (writer task gone - connection is dead)
    #[error("Connection send error")]
    Send(#[from] SendError),
}

/// Message send errors
///
/// Occurs when attempting to send messages through closed channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}
