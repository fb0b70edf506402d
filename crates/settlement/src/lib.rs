//! RelayCraft Settlement
//!
//! Per-block claim settlement and tokenomics.
//!
//! ## Settlement Flow
//!
//! 1. **Validate proofs**: every stored proof is checked by the
//!    `ProofVerifier`; its claim is marked validated or invalid and the
//!    proof is removed.
//! 2. **Collect claims**: claims whose proof window closes at this height
//!    form the batch, in store iteration order.
//! 3. **Classify**: zero-sum claims are discarded. The rest are settled
//!    unless a proof was required (threshold or probabilistic) and is
//!    missing or invalid, in which case they expire.
//! 4. **Settle**: every registered token logic module runs against the
//!    claim; the baseline module mints to the supplier module, pays out
//!    shareholders and burns the same amount of application stake.
//! 5. **Expire**: the supplier is slashed and starts unbonding when its
//!    stake drops below the minimum.
//! 6. **Flush**: operations are aggregated into batched ledger calls and
//!    every touched actor is written back once.
//! 7. **Difficulty**: relays settled per service feed the EMA control loop
//!    that sets each service's relay mining target hash.

pub mod context;
pub mod difficulty;
pub mod end_blocker;
pub mod events;
pub mod memory;
pub mod pipeline;
pub mod requirement;
pub mod stores;
pub mod tlm;

pub use context::{BlockContext, SettlementContext};
pub use difficulty::RelayMiningDifficultyController;
pub use end_blocker::{EndBlockSummary, EndBlocker};
pub use events::{ClaimExpirationReason, EventLog, EventRecord, EventSink, SettlementEvent};
pub use pipeline::{ClaimSettlementPipeline, ClaimTotals, ProofValidationSummary, SettlementOutcome};
pub use requirement::{ClaimAmounts, ProofRequirementDecider, ProofRequirementReason};
pub use stores::{
    ApplicationStore, BankLedger, ClaimStore, Keepers, LedgerError, ProofStore, ServiceStore,
    StoreError, SupplierStore,
};
pub use tlm::{TokenLogicModule, TokenLogicModuleId, TokenLogicModuleProcessor};

use relaycraft_aggregator::AggregationError;
use relaycraft_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl From<CoreError> for SettlementError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MissingParam(_) | CoreError::InvalidParams(_) => {
                SettlementError::Config(err.to_string())
            }
            other => SettlementError::DataIntegrity(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SettlementError>;
