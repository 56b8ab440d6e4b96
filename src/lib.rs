//! Async client for the FlightGear property-tree telnet protocol.
//!
//! The simulator exposes its hierarchical property tree over a plain-text
//! TCP protocol: line-based `get`/`set` commands against slash-delimited
//! key paths, with typed values (string, double, long, int, bool). This
//! crate manages one such connection and delivers results through a
//! delegate:
//!
//! ```rust,ignore
//! use fgprops::{ClientConfig, PropertyTreeClient, PropertyTreeDelegate, PropertyValue};
//! use std::sync::Arc;
//!
//! struct Panel;
//!
//! impl PropertyTreeDelegate for Panel {
//!     fn did_bind(&self, host: &str, port: u16) {
//!         println!("bound to {host}:{port}");
//!     }
//!     fn did_timeout(&self) {}
//!     fn did_disconnect(&self) {}
//!     fn did_receive_value(&self, key: &str, value: PropertyValue) {
//!         println!("{key} = {value}");
//!     }
//! }
//!
//! let panel = Arc::new(Panel);
//! let client = PropertyTreeClient::new(ClientConfig::default());
//! client.set_delegate(&panel);
//! client.bind("localhost", fgprops::DEFAULT_PORT).await?;
//! // ... after did_bind fires:
//! client.request_double("/position/altitude-ft").await?;
//! client.write_bool("/controls/gear/gear-down", true).await?;
//! ```
//!
//! The delegate is held weakly, all callbacks for a connection arrive from
//! a single task in wire order, and `unbind` discards anything still in
//! flight. See [`PropertyTreeClient`] for the lifecycle contract.

mod client;
mod config;
mod error;
pub mod protocol;
mod transport;
mod value;

pub use client::{ConnectionState, PropertyTreeClient, PropertyTreeDelegate};
pub use config::{ClientConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT};
pub use error::{ClientError, ProtocolError};
pub use transport::{Connector, DynTransport, TcpConnector, TransportIO};
pub use value::{PropertyValue, ValueKind};
