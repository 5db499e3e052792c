//! Wallet notifications over a local TCP socket
//!
//! The node runs with `-walletnotify` piping each wallet txid to this
//! listener, e.g. `walletnotify=echo %s | nc 127.0.0.1 5160`. Every line
//! received becomes a `WalletEvent` in the agent's queue.
//!
//! Connections are read one at a time, in accept order, and nothing else
//! happens before an event is queued. Events therefore reach the worker in
//! the order the node delivered them.

use crate::errors::AgentResult;
use crate::node::types::WalletEvent;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const TXID_HEX_LEN: usize = 64;

/// How long one notifier connection may take to deliver its lines.
const CONNECTION_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound, not yet delivering
pub struct WalletNotifyListener {
    listener: TcpListener,
}

impl WalletNotifyListener {
    pub async fn bind(addr: &str) -> AgentResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> AgentResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Start delivering events into `queue`.
    pub fn subscribe(self, queue: mpsc::Sender<WalletEvent>) -> Subscription {
        let listener = self.listener;
        let task = tokio::spawn(async move {
            loop {
                let (stream, peer) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!("walletnotify accept failed: {}", e);
                        continue;
                    }
                };
                tracing::trace!("walletnotify connection from {}", peer);

                match tokio::time::timeout(CONNECTION_READ_TIMEOUT, read_notifications(stream, &queue)).await {
                    Ok(Delivery::Open) => {}
                    Ok(Delivery::QueueClosed) => break,
                    Err(_) => tracing::warn!("walletnotify connection from {} timed out", peer),
                }
            }
            tracing::debug!("walletnotify listener stopped");
        });

        Subscription { task }
    }
}

/// Handle to a running listener. Dropping it stops the listener.
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    /// Stop accepting notifications.
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

enum Delivery {
    Open,
    QueueClosed,
}

async fn read_notifications(stream: TcpStream, queue: &mpsc::Sender<WalletEvent>) -> Delivery {
    let mut lines = BufReader::new(stream).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return Delivery::Open,
            Err(e) => {
                tracing::warn!("walletnotify read failed: {}", e);
                return Delivery::Open;
            }
        };

        let txid = line.trim();
        if txid.is_empty() {
            continue;
        }
        if !is_txid(txid) {
            tracing::warn!("walletnotify: ignoring malformed txid '{}'", txid);
            continue;
        }

        if queue.send(WalletEvent::new(txid)).await.is_err() {
            tracing::debug!("event queue closed; dropping notification for {}", txid);
            return Delivery::QueueClosed;
        }
    }
}

fn is_txid(candidate: &str) -> bool {
    candidate.len() == TXID_HEX_LEN && candidate.bytes().all(|b| b.is_ascii_hexdigit())
}
