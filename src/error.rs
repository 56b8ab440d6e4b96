//! Error types for the property-tree client.
//!
//! Two layers of errors exist:
//!
//! - [`ProtocolError`]: a received line could not be decoded. These never
//!   reach the caller directly; the read loop logs and drops the offending
//!   line so one garbled response cannot take the connection down.
//! - [`ClientError`]: returned from client operations that fail locally,
//!   before anything is sent (bad arguments, not connected) or while
//!   writing to the transport.

use crate::value::ValueKind;
use thiserror::Error;

/// Failure to decode a response line from the server.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The line does not have the `<path> = '<value>' (<type>)` shape.
    ///
    /// Prompt echoes and other server chatter land here and are dropped.
    #[error("unrecognized response line: {0:?}")]
    UnrecognizedLine(String),

    /// The quoted literal does not parse as the kind expected for its key.
    #[error("cannot parse {literal:?} as {kind}")]
    BadLiteral {
        /// Kind recorded when the request was issued.
        kind: ValueKind,
        /// Literal as it appeared on the wire.
        literal: String,
    },
}

/// Errors surfaced to callers of [`PropertyTreeClient`].
///
/// [`PropertyTreeClient`]: crate::PropertyTreeClient
#[derive(Error, Debug)]
pub enum ClientError {
    /// A request or write was attempted while not bound to a server.
    #[error("not connected to a property-tree server")]
    NotConnected,

    /// `bind` was called with an empty host.
    #[error("host must not be empty")]
    EmptyHost,

    /// A request or write was issued for an empty key path.
    #[error("property key must not be empty")]
    EmptyKey,

    /// Writing a command to the transport failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}
