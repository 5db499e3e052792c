//! Agent lifecycle
//!
//! Wallet notifications feed a bounded queue drained by one serial worker, so
//! at most one settlement is in flight at any time and events settle in the
//! order the node delivered them. The agent lives for a fixed duration (or
//! until Ctrl-C), then stops the listener and signals the worker. Events still
//! queued at that point are dropped; a settlement already started always runs
//! to its end.

use crate::config::AgentConfig;
use crate::errors::AgentResult;
use crate::metrics::{SettlementStats, StatsSnapshot};
use crate::node::{Subscription, TxId, WalletEvent, WalletNode, WalletNotifyListener};
use crate::settlement::SettlementEngine;
use std::collections::HashSet;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Serial consumer of wallet events
struct SettlementWorker<N> {
    engine: Arc<SettlementEngine<N>>,
    stats: Arc<SettlementStats>,
    /// The node notifies once on mempool entry and again on confirmation.
    handled: HashSet<TxId>,
}

impl<N: WalletNode + 'static> SettlementWorker<N> {
    async fn run(mut self, mut events: mpsc::Receiver<WalletEvent>, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                event = events.recv() => {
                    match event {
                        Some(event) => self.handle(event).await,
                        None => break,
                    }
                }
            }
        }

        events.close();
        let mut dropped = 0usize;
        while events.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::warn!("Shutting down with {} unprocessed wallet events", dropped);
        }
        tracing::debug!("Settlement worker stopped");
    }

    async fn handle(&mut self, event: WalletEvent) {
        if !self.handled.insert(event.txid.clone()) {
            tracing::debug!("Tx {} already handled; skipping repeat notification", event.txid);
            self.stats.record_duplicate();
            return;
        }

        match self.engine.wallet_summary(&event.txid).await {
            Some(summary) => tracing::info!(
                "Wallet event {} (amount {}, confirmations {}, received {})",
                event.txid,
                summary.amount,
                summary.confirmations,
                event.received_at.to_rfc3339()
            ),
            None => tracing::info!("Wallet event {} (received {})", event.txid, event.received_at.to_rfc3339()),
        }

        let outcome = self.engine.settle(&event.txid).await;
        tracing::info!("Tx {} -> {}", event.txid, outcome);
        self.stats.record(&outcome);
    }
}

/// Handle to the running worker
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    worker: JoinHandle<()>,
}

impl WorkerHandle {
    /// Start the worker draining `events`.
    pub fn spawn<N: WalletNode + 'static>(
        engine: Arc<SettlementEngine<N>>,
        events: mpsc::Receiver<WalletEvent>,
        stats: Arc<SettlementStats>,
    ) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let worker = SettlementWorker {
            engine,
            stats,
            handled: HashSet::new(),
        };
        let worker = tokio::spawn(worker.run(events, shutdown_rx));
        Self { shutdown, worker }
    }

    /// Signal the worker and wait for it to finish.
    ///
    /// The worker takes no new events once signalled. A settlement in flight
    /// is never cancelled: past `grace` a warning is logged and the wait goes
    /// on, bounded by the node client's request timeout.
    pub async fn shutdown(mut self, grace: Duration) {
        let _ = self.shutdown.send(true);
        let joined = match tokio::time::timeout(grace, &mut self.worker).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!("Settlement still running after {:?} grace; waiting for it to finish", grace);
                self.worker.await
            }
        };
        if let Err(e) = joined {
            tracing::error!("Settlement worker ended abnormally: {}", e);
        }
    }
}

/// Listener plus worker, started and not yet stopped
pub struct RunningAgent {
    local_addr: SocketAddr,
    subscription: Subscription,
    worker: WorkerHandle,
    stats: Arc<SettlementStats>,
}

impl RunningAgent {
    /// Bind the walletnotify listener and start the worker.
    pub async fn start<N: WalletNode + 'static>(config: &AgentConfig, engine: SettlementEngine<N>) -> AgentResult<Self> {
        let listener = WalletNotifyListener::bind(&config.notify_addr()).await?;
        let local_addr = listener.local_addr()?;

        let (queue, events) = mpsc::channel(config.agent.queue_capacity);
        let stats = Arc::new(SettlementStats::new());
        let worker = WorkerHandle::spawn(Arc::new(engine), events, stats.clone());
        let subscription = listener.subscribe(queue);

        tracing::info!("Listening for wallet notifications on {}", local_addr);
        Ok(Self {
            local_addr,
            subscription,
            worker,
            stats,
        })
    }

    /// Address the walletnotify hook should connect to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop accepting notifications, then drain the worker.
    pub async fn stop(self, grace: Duration) -> StatsSnapshot {
        self.subscription.stop();
        self.worker.shutdown(grace).await;
        self.stats.snapshot()
    }

    /// Run until `lifetime` elapses or `interrupt` resolves, then stop.
    pub async fn run_until<F>(self, lifetime: Duration, interrupt: F, grace: Duration) -> StatsSnapshot
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = tokio::time::sleep(lifetime) => {
                tracing::info!("Run time of {:?} reached; shutting down", lifetime);
            }
            _ = interrupt => {
                tracing::info!("Interrupted; shutting down");
            }
        }
        self.stop(grace).await
    }
}

/// Start the agent and run it for the configured lifetime or until Ctrl-C.
pub async fn run<N: WalletNode + 'static>(config: &AgentConfig, engine: SettlementEngine<N>) -> AgentResult<StatsSnapshot> {
    let agent = RunningAgent::start(config, engine).await?;
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Ctrl-C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };
    Ok(agent.run_until(config.run_duration(), interrupt, config.shutdown_grace()).await)
}
