//! Dicebot - provably fair dice betting agent for a bitcoind-style wallet node
//!
//! Incoming payments to the house address are bets. Each bet is rolled with
//! HMAC-SHA-512 over its txid and output index; winning bets are paid 1.98x
//! back to the funding address in a transaction built, signed and broadcast
//! through the node's wallet RPCs.

pub mod agent;
pub mod amount;
pub mod bet;
pub mod coin_select;
pub mod config;
pub mod constants;
pub mod dice;
pub mod errors;
pub mod metrics;
pub mod node;
pub mod settlement;

pub use agent::{RunningAgent, WorkerHandle};
pub use amount::Amount;
pub use config::{AgentConfig, ConfigLoader, NodeConfig, RuntimeConfig};
pub use dice::DiceRoller;
pub use errors::{AgentError, AgentResult, ConfigurationError, SettlementError, SettlementResult};
pub use metrics::{SettlementStats, StatsSnapshot};
pub use node::{JsonRpcClient, WalletNode};
pub use settlement::{PayoutPlan, SettlementEngine, SettlementOutcome, SettlementPolicy};
