//! Settlement counters for the current run

use crate::amount::Amount;
use crate::settlement::SettlementOutcome;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub struct SettlementStats {
    start_time: Instant,
    events: AtomicU64,
    duplicates: AtomicU64,
    ignored: AtomicU64,
    losses: AtomicU64,
    settled: AtomicU64,
    failed: AtomicU64,
    paid_out_sats: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub runtime: Duration,
    pub events: u64,
    pub duplicates: u64,
    pub ignored: u64,
    pub losses: u64,
    pub settled: u64,
    pub failed: u64,
    pub paid_out: Amount,
}

impl SettlementStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            events: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            ignored: AtomicU64::new(0),
            losses: AtomicU64::new(0),
            settled: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            paid_out_sats: AtomicU64::new(0),
        }
    }

    pub fn record_duplicate(&self) {
        self.events.fetch_add(1, Ordering::SeqCst);
        self.duplicates.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record(&self, outcome: &SettlementOutcome) {
        self.events.fetch_add(1, Ordering::SeqCst);
        match outcome {
            SettlementOutcome::Ignored(_) => {
                self.ignored.fetch_add(1, Ordering::SeqCst);
            }
            SettlementOutcome::Loss { .. } => {
                self.losses.fetch_add(1, Ordering::SeqCst);
            }
            SettlementOutcome::Settled { plan, .. } => {
                self.settled.fetch_add(1, Ordering::SeqCst);
                self.paid_out_sats.fetch_add(plan.payout.to_sat(), Ordering::SeqCst);
            }
            SettlementOutcome::Failed(_) => {
                self.failed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            runtime: self.start_time.elapsed(),
            events: self.events.load(Ordering::SeqCst),
            duplicates: self.duplicates.load(Ordering::SeqCst),
            ignored: self.ignored.load(Ordering::SeqCst),
            losses: self.losses.load(Ordering::SeqCst),
            settled: self.settled.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            paid_out: Amount::from_sat(self.paid_out_sats.load(Ordering::SeqCst)),
        }
    }
}

impl Default for SettlementStats {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} events in {:.1}s: {} settled ({} paid), {} losses, {} ignored, {} failed, {} duplicates",
            self.events,
            self.runtime.as_secs_f64(),
            self.settled,
            self.paid_out,
            self.losses,
            self.ignored,
            self.failed,
            self.duplicates
        )
    }
}
