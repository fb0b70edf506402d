//! RelayCraft Aggregator
//!
//! Folds the operations of every claim settled in a block into the
//! smallest set of ledger calls. Operations are grouped by their
//! endpoints and reason (and denom), never by amount, so each ledger call
//! stays attributable to a single cause.
//!
//! `aggregate` is pure: output depends only on the multiset of input
//! operations and is sorted by key, so every node issues the same ledger
//! calls in the same order.

pub mod ops;

pub use ops::{
    ClaimSettlementResult, MintBurnOp, ModToAcctTransfer, ModToModTransfer, SettlementOpReason,
};

use std::collections::BTreeMap;

use relaycraft_core::Coin;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum AggregationError {
    #[error("Unspecified reason on {kind} operation for supplier {supplier} (session {session_id})")]
    UnspecifiedReason {
        kind: &'static str,
        supplier: String,
        session_id: String,
    },

    #[error("Amount overflow aggregating {0}")]
    Overflow(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, AggregationError>;

// =========================================================================
// Aggregated output
// =========================================================================

/// Aggregated mint or burn on one module for one reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedMintBurn {
    pub reason: SettlementOpReason,
    pub module: String,
    pub coin: Coin,
    /// Number of operations folded into this entry
    pub num_claims: u64,
}

/// Aggregated module to module transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedModToMod {
    pub reason: SettlementOpReason,
    pub sender_module: String,
    pub recipient_module: String,
    pub coin: Coin,
    pub num_claims: u64,
}

/// Aggregated module to account transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedModToAcct {
    pub reason: SettlementOpReason,
    pub sender_module: String,
    pub recipient_address: String,
    pub coin: Coin,
    pub num_claims: u64,
}

/// Ledger calls for a whole batch, each list sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOps {
    pub mints: Vec<AggregatedMintBurn>,
    pub burns: Vec<AggregatedMintBurn>,
    pub mod_to_mod: Vec<AggregatedModToMod>,
    pub mod_to_acct: Vec<AggregatedModToAcct>,
}

impl SettlementOps {
    pub fn is_empty(&self) -> bool {
        self.mints.is_empty()
            && self.burns.is_empty()
            && self.mod_to_mod.is_empty()
            && self.mod_to_acct.is_empty()
    }

    pub fn total_minted(&self, denom: &str) -> u128 {
        sum_denom(self.mints.iter().map(|m| &m.coin), denom)
    }

    pub fn total_burned(&self, denom: &str) -> u128 {
        sum_denom(self.burns.iter().map(|b| &b.coin), denom)
    }

    /// Total burned for one reason, across modules.
    pub fn burned_for(&self, reason: SettlementOpReason, denom: &str) -> u128 {
        sum_denom(
            self.burns.iter().filter(|b| b.reason == reason).map(|b| &b.coin),
            denom,
        )
    }

    /// SHA-256 over the bincode encoding, for audit logs.
    pub fn digest(&self) -> Result<[u8; 32]> {
        let bytes =
            bincode::serialize(self).map_err(|e| AggregationError::Serialization(e.to_string()))?;
        Ok(Sha256::digest(&bytes).into())
    }
}

fn sum_denom<'a>(coins: impl Iterator<Item = &'a Coin>, denom: &str) -> u128 {
    coins
        .filter(|c| c.denom == denom)
        .map(|c| c.amount as u128)
        .sum()
}

// =========================================================================
// Aggregation
// =========================================================================

type MintBurnKey = (String, SettlementOpReason, String);
type TransferKey = (String, String, SettlementOpReason, String);

#[derive(Default)]
struct Tally {
    amount: u64,
    num_claims: u64,
}

impl Tally {
    fn add(&mut self, amount: u64, what: impl FnOnce() -> String) -> Result<()> {
        self.amount = self
            .amount
            .checked_add(amount)
            .ok_or_else(|| AggregationError::Overflow(what()))?;
        self.num_claims += 1;
        Ok(())
    }
}

fn ensure_reason(
    reason: SettlementOpReason,
    kind: &'static str,
    result: &ClaimSettlementResult,
) -> Result<()> {
    if reason == SettlementOpReason::Unspecified {
        let session_id = result
            .claim
            .session_header
            .as_ref()
            .map(|h| h.session_id.clone())
            .unwrap_or_default();
        return Err(AggregationError::UnspecifiedReason {
            kind,
            supplier: result.claim.supplier_operator_address.clone(),
            session_id,
        });
    }
    Ok(())
}

fn fold_mint_burn<'a>(
    kind: &'static str,
    ops: impl Iterator<Item = (&'a ClaimSettlementResult, &'a MintBurnOp)>,
) -> Result<Vec<AggregatedMintBurn>> {
    let mut groups: BTreeMap<MintBurnKey, Tally> = BTreeMap::new();
    for (result, op) in ops {
        ensure_reason(op.reason, kind, result)?;
        let key = (op.module.clone(), op.reason, op.coin.denom.clone());
        groups
            .entry(key)
            .or_default()
            .add(op.coin.amount, || format!("{} {} {}", kind, op.module, op.reason))?;
    }

    Ok(groups
        .into_iter()
        .map(|((module, reason, denom), tally)| AggregatedMintBurn {
            reason,
            module,
            coin: Coin::new(denom, tally.amount),
            num_claims: tally.num_claims,
        })
        .collect())
}

/// Fold per-claim operations into batched ledger calls.
///
/// Fails on the first operation with an unspecified reason or on amount
/// overflow. Zero-amount operations are kept and counted.
pub fn aggregate(results: &[ClaimSettlementResult]) -> Result<SettlementOps> {
    let mints = fold_mint_burn(
        "mint",
        results.iter().flat_map(|r| r.mints.iter().map(move |op| (r, op))),
    )?;
    let burns = fold_mint_burn(
        "burn",
        results.iter().flat_map(|r| r.burns.iter().map(move |op| (r, op))),
    )?;

    let mut mod_to_mod: BTreeMap<TransferKey, Tally> = BTreeMap::new();
    let mut mod_to_acct: BTreeMap<TransferKey, Tally> = BTreeMap::new();
    for result in results {
        for op in &result.mod_to_mod {
            ensure_reason(op.reason, "module to module", result)?;
            let key = (
                op.sender_module.clone(),
                op.recipient_module.clone(),
                op.reason,
                op.coin.denom.clone(),
            );
            mod_to_mod.entry(key).or_default().add(op.coin.amount, || {
                format!("{} -> {} {}", op.sender_module, op.recipient_module, op.reason)
            })?;
        }
        for op in &result.mod_to_acct {
            ensure_reason(op.reason, "module to account", result)?;
            let key = (
                op.sender_module.clone(),
                op.recipient_address.clone(),
                op.reason,
                op.coin.denom.clone(),
            );
            mod_to_acct.entry(key).or_default().add(op.coin.amount, || {
                format!("{} -> {} {}", op.sender_module, op.recipient_address, op.reason)
            })?;
        }
    }

    let ops = SettlementOps {
        mints,
        burns,
        mod_to_mod: mod_to_mod
            .into_iter()
            .map(|((sender_module, recipient_module, reason, denom), tally)| AggregatedModToMod {
                reason,
                sender_module,
                recipient_module,
                coin: Coin::new(denom, tally.amount),
                num_claims: tally.num_claims,
            })
            .collect(),
        mod_to_acct: mod_to_acct
            .into_iter()
            .map(|((sender_module, recipient_address, reason, denom), tally)| AggregatedModToAcct {
                reason,
                sender_module,
                recipient_address,
                coin: Coin::new(denom, tally.amount),
                num_claims: tally.num_claims,
            })
            .collect(),
    };

    debug!(
        "Aggregated {} claim results into {} mints, {} burns, {} module transfers, {} account transfers",
        results.len(),
        ops.mints.len(),
        ops.burns.len(),
        ops.mod_to_mod.len(),
        ops.mod_to_acct.len()
    );
    Ok(ops)
}
