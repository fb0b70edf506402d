//! Settlement events and the append-only event log.
//!
//! Every state transition emits exactly one event. The log is the audit
//! trail of a block: it records claims settled or expired, proofs checked,
//! suppliers slashed and difficulty changes.

use std::io::Write;

use relaycraft_core::{Coin, ProofValidationStatus};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::requirement::{ClaimAmounts, ProofRequirementReason};

/// Why a claim expired instead of settling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimExpirationReason {
    ProofMissing,
    ProofInvalid,
}

/// Events emitted during settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SettlementEvent {
    /// A stored proof was run through the verifier
    ProofValidityChecked {
        session_id: String,
        supplier_operator_address: String,
        block_height: u64,
        status: ProofValidationStatus,
        failure_reason: Option<String>,
    },
    /// A claim was paid out
    ClaimSettled {
        session_id: String,
        supplier_operator_address: String,
        application_address: String,
        service_id: String,
        amounts: ClaimAmounts,
        proof_requirement: ProofRequirementReason,
    },
    /// A claim required a proof that was missing or invalid
    ClaimExpired {
        session_id: String,
        supplier_operator_address: String,
        application_address: String,
        service_id: String,
        amounts: ClaimAmounts,
        reason: ClaimExpirationReason,
    },
    /// A claim with zero compute units was dropped
    ClaimDiscarded {
        session_id: String,
        supplier_operator_address: String,
        reason: String,
    },
    /// An application could not cover a claim in full
    ApplicationOverserviced {
        application_address: String,
        supplier_operator_address: String,
        expected_burn: Coin,
        effective_burn: Coin,
    },
    SupplierSlashed {
        supplier_operator_address: String,
        session_id: String,
        penalty: Coin,
        slashed: Coin,
        remaining_stake: Coin,
    },
    SupplierUnbondingBegin {
        supplier_operator_address: String,
        unstake_session_end_height: u64,
        stake: Coin,
    },
    RelayMiningDifficultyUpdated {
        service_id: String,
        prev_target_hash_hex: String,
        new_target_hash_hex: String,
        prev_num_relays_ema: u64,
        new_num_relays_ema: u64,
    },
}

impl SettlementEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProofValidityChecked { .. } => "proof_validity_checked",
            Self::ClaimSettled { .. } => "claim_settled",
            Self::ClaimExpired { .. } => "claim_expired",
            Self::ClaimDiscarded { .. } => "claim_discarded",
            Self::ApplicationOverserviced { .. } => "application_overserviced",
            Self::SupplierSlashed { .. } => "supplier_slashed",
            Self::SupplierUnbondingBegin { .. } => "supplier_unbonding_begin",
            Self::RelayMiningDifficultyUpdated { .. } => "relay_mining_difficulty_updated",
        }
    }
}

/// Append-only event capability.
pub trait EventSink {
    /// Called once before any event of a new block.
    fn begin_block(&mut self, _height: u64) {}

    fn emit(&mut self, event: SettlementEvent);
}

/// One recorded event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Global monotonic sequence number
    pub seq: u64,
    pub block_height: u64,
    pub event: SettlementEvent,
}

/// In-memory event log, exportable as JSON lines.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Vec<EventRecord>,
    next_seq: u64,
    block_height: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[EventRecord] {
        &self.entries
    }

    pub fn events(&self) -> impl Iterator<Item = &SettlementEvent> {
        self.entries.iter().map(|e| &e.event)
    }

    /// Events recorded at `height`.
    pub fn events_at(&self, height: u64) -> impl Iterator<Item = &SettlementEvent> {
        self.entries
            .iter()
            .filter(move |e| e.block_height == height)
            .map(|e| &e.event)
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events().filter(|e| e.kind() == kind).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write every entry as one JSON object per line.
    pub fn write_jsonl<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for entry in &self.entries {
            let line = serde_json::to_string(entry)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            writeln!(writer, "{}", line)?;
        }
        Ok(())
    }
}

impl EventSink for EventLog {
    fn begin_block(&mut self, height: u64) {
        self.block_height = height;
    }

    fn emit(&mut self, event: SettlementEvent) {
        debug!("Event seq={} {}", self.next_seq, event.kind());
        self.entries.push(EventRecord {
            seq: self.next_seq,
            block_height: self.block_height,
            event,
        });
        self.next_seq += 1;
    }
}
