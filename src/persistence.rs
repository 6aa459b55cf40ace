use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::errors::QueryError;
use crate::state::backend::{Connector, TextBackend};

/// Fixed pause between failed handshakes. No growth, no jitter, no limit.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal; entered once the supervisor has been shut down.
    Closed,
}

#[derive(Clone)]
enum Link {
    Disconnected,
    Connecting,
    Connected(Arc<dyn TextBackend>),
    Closed,
}

impl Link {
    fn state(&self) -> ConnectionState {
        match self {
            Link::Disconnected => ConnectionState::Disconnected,
            Link::Connecting => ConnectionState::Connecting,
            Link::Connected(_) => ConnectionState::Connected,
            Link::Closed => ConnectionState::Closed,
        }
    }
}

/// Owns the single logical connection to the document store.
///
/// Only the supervised loop started by [`Gateway::start`] changes the
/// connection; request handlers just borrow the current backend through
/// [`Gateway::execute`].
pub struct Gateway {
    connector: Box<dyn Connector>,
    retry_delay: Duration,
    link: watch::Sender<Link>,
}

impl Gateway {
    pub fn new(connector: impl Connector) -> Self {
        let (link, _) = watch::channel(Link::Disconnected);
        Self {
            connector: Box::new(connector),
            retry_delay: RETRY_DELAY,
            link,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.link.borrow().state()
    }

    /// Resolve once the gateway reaches `target`.
    pub async fn wait_for(&self, target: ConnectionState) {
        let mut rx = self.link.subscribe();
        let _ = rx.wait_for(|link| link.state() == target).await;
    }

    /// Run `query` against the current connection.
    ///
    /// Fails with `NotConnected` unless the gateway is `Connected`. There is
    /// no waiting and no retry here; reconnecting is the supervisor's job.
    pub async fn execute<T, F, Fut>(&self, query: F) -> Result<T, QueryError>
    where
        F: FnOnce(Arc<dyn TextBackend>) -> Fut,
        Fut: Future<Output = Result<T, QueryError>>,
    {
        let current = self.link.borrow().clone();
        let backend = match current {
            Link::Connected(backend) => backend,
            _ => return Err(QueryError::NotConnected),
        };
        query(backend).await
    }

    /// Spawn the connect/reconnect loop.
    pub fn start(gateway: Arc<Gateway>) -> Supervisor {
        let token = CancellationToken::new();
        let handle = tokio::spawn(connect_loop(gateway, token.clone()));
        Supervisor { token, handle }
    }

    fn set(&self, link: Link) {
        self.link.send_replace(link);
    }
}

/// Handle to the running connection loop.
pub struct Supervisor {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Supervisor {
    /// Stop the loop, drop the connection and wait for the task to finish.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Connection supervisor did not stop cleanly");
        }
    }
}

/// Disconnected → Connecting → Connected → Disconnected → ... until cancelled.
async fn connect_loop(gateway: Arc<Gateway>, token: CancellationToken) {
    let target = gateway.connector.describe();

    loop {
        gateway.set(Link::Connecting);
        tracing::info!(target_store = %target, "Attempting to connect to document store…");

        let attempt = tokio::select! {
            _ = token.cancelled() => break,
            attempt = gateway.connector.connect() => attempt,
        };

        match attempt {
            Ok(mut session) => {
                gateway.set(Link::Connected(session.backend));
                tracing::info!(target_store = %target, "Successfully connected to document store");

                let reason = tokio::select! {
                    _ = token.cancelled() => break,
                    reason = session.disconnected.recv() => reason,
                };

                gateway.set(Link::Disconnected);
                tracing::warn!(
                    reason = reason.as_deref().unwrap_or("session closed"),
                    "Document store disconnected. Attempting to reconnect…"
                );
            }
            Err(e) => {
                gateway.set(Link::Disconnected);
                tracing::error!(target_store = %target, error = %e, "Document store connection error");
                tracing::info!(
                    retry_in_secs = gateway.retry_delay.as_secs(),
                    "Retrying connection in {} seconds…",
                    gateway.retry_delay.as_secs()
                );

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = sleep(gateway.retry_delay) => {}
                }
            }
        }
    }

    gateway.set(Link::Closed);
    tracing::info!("Document store connection closed");
}
