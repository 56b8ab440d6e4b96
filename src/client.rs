//! The property-tree client: one managed connection, typed get/set, and
//! delegate callbacks.
//!
//! # Lifecycle
//!
//! ```text
//! Unbound --bind--> Binding --connected--> Bound --unbind/disconnect--> Unbound
//!                      \--timeout/connect error--> Unbound (did_timeout)
//! ```
//!
//! `bind` spawns a connection task and returns immediately; the outcome
//! arrives through the delegate. The same task then owns the read loop, so
//! every callback for a given connection is delivered from one execution
//! context, in wire order. `unbind` is the only cancellation primitive: it
//! invalidates the connection's epoch, so anything the old task had left in
//! flight is discarded instead of dispatched.
//!
//! # Request correlation
//!
//! Responses carry the key but not which request they answer. The client
//! keeps a FIFO of expected kinds per key: concurrent requests for the same
//! key are answered in request order, and a response for a key with nothing
//! outstanding is dropped. A request that never gets a response never fires
//! its callback; there is no per-request timeout.

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::protocol;
use crate::transport::{Connector, DynTransport, TcpConnector};
use crate::value::{PropertyValue, ValueKind};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Observer for connection lifecycle and value arrivals.
///
/// The client holds the delegate weakly; drop your `Arc` and the callbacks
/// stop. Lifecycle methods are required. `did_receive_value` has a no-op
/// default, so a delegate that only cares about lifecycle can ignore it and
/// received values are silently dropped.
pub trait PropertyTreeDelegate: Send + Sync {
    /// The connection to `host:port` is established; requests may be issued.
    fn did_bind(&self, host: &str, port: u16);

    /// The bind attempt did not produce a connection in time.
    fn did_timeout(&self);

    /// The connection went from bound to unbound, locally or remotely.
    fn did_disconnect(&self);

    /// A requested value arrived and decoded as its expected kind.
    fn did_receive_value(&self, _key: &str, _value: PropertyValue) {}
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and none in progress.
    Unbound,
    /// A bind attempt is connecting.
    Binding,
    /// Connected; requests and writes are valid.
    Bound,
    /// Tearing down an unbind.
    Disconnecting,
}

/// Client for a simulator's property-tree server.
///
/// Owns at most one connection at a time. Not designed for concurrent
/// lifecycle calls from multiple owners; requests and writes may be issued
/// freely while bound.
pub struct PropertyTreeClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    delegate: StdMutex<Option<Weak<dyn PropertyTreeDelegate>>>,
    state: StdMutex<ConnectionState>,
    endpoint: StdMutex<Option<(String, u16)>>,
    /// Expected response kinds per key, in request order.
    pending: StdMutex<HashMap<String, VecDeque<ValueKind>>>,
    writer: Mutex<Option<WriteHalf<DynTransport>>>,
    task: StdMutex<Option<JoinHandle<()>>>,
    /// Bumped on every bind and unbind; events from a stale epoch are dropped.
    epoch: AtomicU64,
}

/// Lock a std mutex, recovering the data if a holder panicked.
fn lock<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl PropertyTreeClient {
    /// Create a client that connects over TCP.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(config, Arc::new(TcpConnector))
    }

    /// Create a client with a custom [`Connector`] (tests use in-memory
    /// transports through this seam).
    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                delegate: StdMutex::new(None),
                state: StdMutex::new(ConnectionState::Unbound),
                endpoint: StdMutex::new(None),
                pending: StdMutex::new(HashMap::new()),
                writer: Mutex::new(None),
                task: StdMutex::new(None),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Register the delegate. The client keeps only a weak reference.
    pub fn set_delegate<D: PropertyTreeDelegate + 'static>(&self, delegate: &Arc<D>) {
        let weak: Weak<D> = Arc::downgrade(delegate);
        let weak: Weak<dyn PropertyTreeDelegate> = weak;
        *lock(&self.inner.delegate) = Some(weak);
    }

    /// Remove the delegate; further events go nowhere.
    pub fn clear_delegate(&self) {
        *lock(&self.inner.delegate) = None;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *lock(&self.inner.state)
    }

    /// Whether requests and writes are currently valid.
    pub fn is_bound(&self) -> bool {
        self.state() == ConnectionState::Bound
    }

    /// Host and port of the current bind attempt or connection.
    pub fn endpoint(&self) -> Option<(String, u16)> {
        lock(&self.inner.endpoint).clone()
    }

    /// Start connecting to `host:port`.
    ///
    /// Returns as soon as the attempt is underway; the outcome arrives as
    /// `did_bind` or `did_timeout`. Binding while already bound or binding
    /// unbinds first, so the last bind wins.
    pub async fn bind(&self, host: &str, port: u16) -> Result<(), ClientError> {
        if host.is_empty() {
            return Err(ClientError::EmptyHost);
        }
        self.unbind().await;

        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        *lock(&self.inner.state) = ConnectionState::Binding;
        *lock(&self.inner.endpoint) = Some((host.to_string(), port));
        info!(host, port, "binding to property server");

        let task = tokio::spawn(run_connection(
            Arc::clone(&self.inner),
            host.to_string(),
            port,
            epoch,
        ));
        *lock(&self.inner.task) = Some(task);
        Ok(())
    }

    /// Tear down the connection, if any. Idempotent.
    ///
    /// Fires `did_disconnect` exactly when a bound connection was open;
    /// cancelling an in-progress bind is silent. Pending response
    /// bookkeeping is discarded, so late bytes from the old connection are
    /// ignored.
    pub async fn unbind(&self) {
        let was_bound = {
            let mut state = lock(&self.inner.state);
            let prior = *state;
            if prior == ConnectionState::Unbound {
                return;
            }
            *state = ConnectionState::Disconnecting;
            prior == ConnectionState::Bound
        };
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = lock(&self.inner.task).take() {
            task.abort();
        }
        self.inner.settle(None);
        self.inner.writer.lock().await.take();
        if was_bound {
            info!("unbound from property server");
            self.inner.notify(|d| d.did_disconnect());
        }
    }

    /// Request the value of `key`, expecting it to decode as `kind`.
    ///
    /// The result arrives via `did_receive_value`; nothing fires if the
    /// server never answers.
    pub async fn request_value(&self, key: &str, kind: ValueKind) -> Result<(), ClientError> {
        if key.is_empty() {
            return Err(ClientError::EmptyKey);
        }
        self.ensure_bound()?;

        // Record the expectation before sending so a fast response cannot
        // beat the bookkeeping.
        lock(&self.inner.pending)
            .entry(key.to_string())
            .or_default()
            .push_back(kind);

        if let Err(err) = self.send(&protocol::encode_get(key)).await {
            let mut pending = lock(&self.inner.pending);
            if let Some(queue) = pending.get_mut(key) {
                queue.pop_back();
                if queue.is_empty() {
                    pending.remove(key);
                }
            }
            return Err(err);
        }
        Ok(())
    }

    /// Request a string value for `key`.
    pub async fn request_string(&self, key: &str) -> Result<(), ClientError> {
        self.request_value(key, ValueKind::String).await
    }

    /// Request a double value for `key`.
    pub async fn request_double(&self, key: &str) -> Result<(), ClientError> {
        self.request_value(key, ValueKind::Double).await
    }

    /// Request a long value for `key`.
    pub async fn request_long(&self, key: &str) -> Result<(), ClientError> {
        self.request_value(key, ValueKind::Long).await
    }

    /// Request an int value for `key`.
    pub async fn request_int(&self, key: &str) -> Result<(), ClientError> {
        self.request_value(key, ValueKind::Int).await
    }

    /// Request a bool value for `key`.
    pub async fn request_bool(&self, key: &str) -> Result<(), ClientError> {
        self.request_value(key, ValueKind::Bool).await
    }

    /// Write `value` to `key`. Fire-and-forget: no acknowledgement and no
    /// delegate callback.
    pub async fn write_value(&self, key: &str, value: &PropertyValue) -> Result<(), ClientError> {
        if key.is_empty() {
            return Err(ClientError::EmptyKey);
        }
        self.ensure_bound()?;
        self.send(&protocol::encode_set(key, value)).await
    }

    /// Write a string value to `key`.
    pub async fn write_string(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.write_value(key, &PropertyValue::String(value.to_string()))
            .await
    }

    /// Write a double value to `key`.
    pub async fn write_double(&self, key: &str, value: f64) -> Result<(), ClientError> {
        self.write_value(key, &PropertyValue::Double(value)).await
    }

    /// Write a long value to `key`.
    pub async fn write_long(&self, key: &str, value: i64) -> Result<(), ClientError> {
        self.write_value(key, &PropertyValue::Long(value)).await
    }

    /// Write an int value to `key`.
    pub async fn write_int(&self, key: &str, value: i32) -> Result<(), ClientError> {
        self.write_value(key, &PropertyValue::Int(value)).await
    }

    /// Write a bool value to `key`.
    pub async fn write_bool(&self, key: &str, value: bool) -> Result<(), ClientError> {
        self.write_value(key, &PropertyValue::Bool(value)).await
    }

    fn ensure_bound(&self) -> Result<(), ClientError> {
        if self.is_bound() {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    async fn send(&self, line: &str) -> Result<(), ClientError> {
        let mut writer = self.inner.writer.lock().await;
        let Some(writer) = writer.as_mut() else {
            return Err(ClientError::NotConnected);
        };
        debug!(command = line.trim_end(), "sending");
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }
}

impl Drop for PropertyTreeClient {
    fn drop(&mut self) {
        // Best-effort teardown; no callbacks once the owner is gone.
        if let Some(task) = lock(&self.inner.task).take() {
            task.abort();
        }
    }
}

impl Inner {
    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    /// Move to `Unbound`, clearing per-connection bookkeeping, and report
    /// the prior state. With an epoch given, does nothing if that epoch is
    /// stale: the state then belongs to a newer bind and is left alone.
    fn settle(&self, epoch: Option<u64>) -> Option<ConnectionState> {
        let mut state = lock(&self.state);
        if let Some(epoch) = epoch {
            if !self.is_current(epoch) {
                return None;
            }
        }
        let prior = *state;
        *state = ConnectionState::Unbound;
        lock(&self.pending).clear();
        lock(&self.endpoint).take();
        Some(prior)
    }

    /// Move `Binding` to `Bound` unless the epoch went stale meanwhile.
    fn promote(&self, epoch: u64) -> bool {
        let mut state = lock(&self.state);
        if !self.is_current(epoch) {
            return false;
        }
        *state = ConnectionState::Bound;
        true
    }

    fn delegate(&self) -> Option<Arc<dyn PropertyTreeDelegate>> {
        lock(&self.delegate).as_ref().and_then(Weak::upgrade)
    }

    fn notify(&self, f: impl FnOnce(&dyn PropertyTreeDelegate)) {
        if let Some(delegate) = self.delegate() {
            f(delegate.as_ref());
        }
    }

    /// Decode one response line and dispatch it to the delegate.
    ///
    /// Per the error policy, nothing here can fail the read loop: prompt
    /// noise and unexpected keys are dropped at debug level, literals that
    /// do not decode as their expected kind at warn.
    fn dispatch_line(&self, line: &str) {
        let parsed = match protocol::parse_response(line) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(%err, "ignoring line");
                return;
            }
        };

        let expected = {
            let mut pending = lock(&self.pending);
            match pending.get_mut(parsed.key) {
                Some(queue) => {
                    let kind = queue.pop_front();
                    if queue.is_empty() {
                        pending.remove(parsed.key);
                    }
                    kind
                }
                None => None,
            }
        };
        let Some(kind) = expected else {
            debug!(key = parsed.key, "response for key with no outstanding request");
            return;
        };

        match kind.decode(parsed.literal) {
            Ok(value) => {
                debug!(key = parsed.key, %value, "received value");
                self.notify(|d| d.did_receive_value(parsed.key, value));
            }
            Err(err) => warn!(key = parsed.key, %err, "dropping malformed response"),
        }
    }
}

/// One connection's whole life: connect, announce, read until it ends.
async fn run_connection(inner: Arc<Inner>, host: String, port: u16, epoch: u64) {
    let attempt = inner.connector.connect(&host, port);
    let stream = match timeout(inner.config.connect_timeout, attempt).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(err)) => {
            debug!(%host, port, %err, "connect failed");
            if inner.settle(Some(epoch)) == Some(ConnectionState::Binding) {
                info!(%host, port, "bind attempt failed");
                inner.notify(|d| d.did_timeout());
            }
            return;
        }
        Err(_) => {
            debug!(%host, port, "connect timed out");
            if inner.settle(Some(epoch)) == Some(ConnectionState::Binding) {
                info!(%host, port, "bind attempt timed out");
                inner.notify(|d| d.did_timeout());
            }
            return;
        }
    };

    let (read_half, write_half) = tokio::io::split(stream);
    {
        let mut writer = inner.writer.lock().await;
        *writer = Some(write_half);
    }
    if !inner.promote(epoch) {
        // Unbound while connecting; hand the transport back for closing.
        inner.writer.lock().await.take();
        return;
    }
    info!(%host, port, "bound to property server");
    inner.notify(|d| d.did_bind(&host, port));

    read_loop(&inner, read_half, epoch).await;

    if inner.settle(Some(epoch)) == Some(ConnectionState::Bound) {
        inner.writer.lock().await.take();
        info!(%host, port, "disconnected from property server");
        inner.notify(|d| d.did_disconnect());
    }
}

/// Pull lines off the transport until EOF, error, or a stale epoch.
///
/// `read_line` buffers partial chunks and re-arms the transport after every
/// delivery, so a line split across chunks surfaces once and several lines
/// in one chunk surface separately, in order.
async fn read_loop(inner: &Inner, read_half: ReadHalf<DynTransport>, epoch: u64) {
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("server closed the connection");
                return;
            }
            Ok(_) => {
                if !inner.is_current(epoch) {
                    return;
                }
                inner.dispatch_line(&line);
            }
            Err(err) => {
                debug!(%err, "transport read failed");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_unbound() {
        let client = PropertyTreeClient::new(ClientConfig::default());
        assert_eq!(client.state(), ConnectionState::Unbound);
        assert!(!client.is_bound());
        assert!(client.endpoint().is_none());
    }

    #[tokio::test]
    async fn request_while_unbound_is_rejected() {
        let client = PropertyTreeClient::new(ClientConfig::default());
        let err = client.request_double("/a/b").await.unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
    }

    #[tokio::test]
    async fn write_while_unbound_is_rejected() {
        let client = PropertyTreeClient::new(ClientConfig::default());
        let err = client.write_bool("/gear/down", true).await.unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
    }

    #[tokio::test]
    async fn bind_rejects_empty_host() {
        let client = PropertyTreeClient::new(ClientConfig::default());
        let err = client.bind("", 5401).await.unwrap_err();
        assert!(matches!(err, ClientError::EmptyHost));
        assert_eq!(client.state(), ConnectionState::Unbound);
    }

    #[tokio::test]
    async fn request_rejects_empty_key() {
        let client = PropertyTreeClient::new(ClientConfig::default());
        let err = client.request_value("", ValueKind::Int).await.unwrap_err();
        assert!(matches!(err, ClientError::EmptyKey));
    }

    #[tokio::test]
    async fn unbind_while_unbound_is_a_no_op() {
        let client = PropertyTreeClient::new(ClientConfig::default());
        client.unbind().await;
        client.unbind().await;
        assert_eq!(client.state(), ConnectionState::Unbound);
    }
}
