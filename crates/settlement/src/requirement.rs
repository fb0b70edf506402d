//! Proof requirement decisions.
//!
//! A claim must be proven when its estimated value reaches the threshold,
//! or when a deterministic coin flip seeded from the claim lands below the
//! request probability. The flip uses only claim data, so every node
//! replaying the block reaches the same decision.

use relaycraft_core::{
    estimated_compute_units, Claim, Coin, ProofParams, RelayMiningDifficulty, SharedParams,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Result;

const SAMPLE_DOMAIN: &[u8] = b"relaycraft/proof_requirement";

/// Why a proof is (or is not) required for a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProofRequirementReason {
    NotRequired,
    Threshold,
    Probabilistic,
}

impl ProofRequirementReason {
    pub fn is_required(&self) -> bool {
        !matches!(self, Self::NotRequired)
    }
}

/// Work and value figures derived from a claim's root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimAmounts {
    pub num_relays: u64,
    pub num_claimed_compute_units: u64,
    /// Claimed units scaled by the service's relay mining difficulty
    pub num_estimated_compute_units: u64,
    /// Estimated units converted to tokens
    pub claimed: Coin,
}

impl ClaimAmounts {
    pub fn compute(
        claim: &Claim,
        shared: &SharedParams,
        difficulty: &RelayMiningDifficulty,
        denom: &str,
    ) -> Result<Self> {
        let root = claim.root()?;
        let num_estimated_compute_units = estimated_compute_units(root.sum, &difficulty.target_hash)?;
        let amount = num_estimated_compute_units
            .checked_mul(shared.compute_units_to_tokens_multiplier)
            .ok_or_else(|| {
                crate::SettlementError::DataIntegrity(format!(
                    "claimed amount overflows: {} estimated compute units x {}",
                    num_estimated_compute_units, shared.compute_units_to_tokens_multiplier
                ))
            })?;

        Ok(Self {
            num_relays: root.count,
            num_claimed_compute_units: root.sum,
            num_estimated_compute_units,
            claimed: Coin::new(denom, amount),
        })
    }
}

/// Uniform 64-bit sample derived from the claim's identity and root.
pub fn proof_requirement_sample(claim: &Claim) -> Result<u64> {
    let header = claim.session_header()?;
    let mut hasher = Sha256::new();
    hasher.update(SAMPLE_DOMAIN);
    hasher.update(header.session_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(claim.supplier_operator_address.as_bytes());
    hasher.update([0u8]);
    hasher.update(&claim.root_hash);
    let digest = hasher.finalize();

    let mut first = [0u8; 8];
    first.copy_from_slice(&digest[..8]);
    Ok(u64::from_be_bytes(first))
}

/// True when `sample / 2^64 < probability`.
fn sample_below(sample: u64, probability: f64) -> bool {
    if probability <= 0.0 {
        return false;
    }
    if probability >= 1.0 {
        return true;
    }
    // 2^64 as f64 is exact; the product is below 2^64 so the cast floors.
    let cutoff = (probability * 18_446_744_073_709_551_616.0) as u64;
    sample < cutoff
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProofRequirementDecider;

impl ProofRequirementDecider {
    pub fn new() -> Self {
        Self
    }

    /// Classify a claim whose amounts are already known.
    pub fn decide(
        &self,
        claim: &Claim,
        amounts: &ClaimAmounts,
        proof_params: &ProofParams,
    ) -> Result<ProofRequirementReason> {
        let threshold = proof_params.requirement_threshold()?;
        if amounts.claimed.amount >= threshold.amount {
            return Ok(ProofRequirementReason::Threshold);
        }

        let sample = proof_requirement_sample(claim)?;
        if sample_below(sample, proof_params.proof_request_probability) {
            return Ok(ProofRequirementReason::Probabilistic);
        }

        Ok(ProofRequirementReason::NotRequired)
    }

    /// Whether `claim` needs a proof, and why.
    pub fn requirement_for(
        &self,
        claim: &Claim,
        shared: &SharedParams,
        proof_params: &ProofParams,
        difficulty: &RelayMiningDifficulty,
    ) -> Result<(bool, ProofRequirementReason)> {
        let denom = proof_params.requirement_threshold()?.denom.clone();
        let amounts = ClaimAmounts::compute(claim, shared, difficulty, &denom)?;
        let reason = self.decide(claim, &amounts, proof_params)?;
        Ok((reason.is_required(), reason))
    }
}
