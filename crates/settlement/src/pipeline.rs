//! Per-block claim settlement.
//!
//! Claims reach this pipeline exactly once, at the height their proof
//! window closes. Each is discarded, settled or expired; the resulting
//! operations are aggregated and executed against the bank in one flush,
//! then every touched actor is written back once.

use std::collections::{BTreeMap, HashMap};

use relaycraft_aggregator::{aggregate, ClaimSettlementResult, SettlementOpReason, SettlementOps};
use relaycraft_core::{
    Claim, Coin, ProofValidationStatus, ServiceId, SessionHeader, SUPPLIER_MODULE,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::context::{BlockContext, SettlementContext};
use crate::events::{ClaimExpirationReason, SettlementEvent};
use crate::requirement::{ClaimAmounts, ProofRequirementDecider, ProofRequirementReason};
use crate::stores::{BankLedger, Keepers};
use crate::tlm::TokenLogicModuleProcessor;
use crate::Result;

// =========================================================================
// Outcome
// =========================================================================

/// Running totals for one branch of the state machine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimTotals {
    pub num_claims: u64,
    pub num_relays: u64,
    pub num_claimed_compute_units: u128,
    pub num_estimated_compute_units: u128,
    pub claimed_amount: u128,
}

impl ClaimTotals {
    pub fn record(&mut self, amounts: &ClaimAmounts) {
        self.num_claims += 1;
        self.num_relays = self.num_relays.saturating_add(amounts.num_relays);
        self.num_claimed_compute_units += amounts.num_claimed_compute_units as u128;
        self.num_estimated_compute_units += amounts.num_estimated_compute_units as u128;
        self.claimed_amount += amounts.claimed.amount as u128;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofValidationSummary {
    pub num_valid: u64,
    pub num_invalid: u64,
    /// Proofs with no matching claim, removed without a verdict
    pub num_orphaned: u64,
}

/// What one block of settlement did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    pub settled: ClaimTotals,
    pub expired: ClaimTotals,
    pub num_discarded: u64,
    pub proofs: ProofValidationSummary,
    /// Relays of settled claims only, keyed by service
    pub relays_per_service: BTreeMap<ServiceId, u64>,
    pub ops: SettlementOps,
    /// SHA-256 of the bincode-encoded ops
    pub ops_digest: [u8; 32],
}

impl SettlementOutcome {
    pub fn num_settled(&self) -> u64 {
        self.settled.num_claims
    }

    pub fn num_expired(&self) -> u64 {
        self.expired.num_claims
    }
}

// =========================================================================
// Pipeline
// =========================================================================

#[derive(Default)]
pub struct ClaimSettlementPipeline {
    decider: ProofRequirementDecider,
    tlms: TokenLogicModuleProcessor,
}

impl ClaimSettlementPipeline {
    pub fn new(tlms: TokenLogicModuleProcessor) -> Self {
        Self {
            decider: ProofRequirementDecider::new(),
            tlms,
        }
    }

    pub fn tlms(&self) -> &TokenLogicModuleProcessor {
        &self.tlms
    }

    /// Run every stored proof through the verifier.
    ///
    /// The matching claim is marked validated or invalid and written back.
    /// Every processed proof is removed, including orphans.
    pub fn validate_submitted_proofs(
        &self,
        block: &BlockContext,
        keepers: &mut Keepers<'_>,
    ) -> Result<ProofValidationSummary> {
        let mut summary = ProofValidationSummary::default();
        let proofs = keepers.proofs.get_all_proofs()?;
        if proofs.is_empty() {
            return Ok(summary);
        }

        let mut claims: HashMap<(String, String), Claim> = HashMap::new();
        for claim in keepers.claims.get_all_claims()? {
            let session_id = claim.session_header()?.session_id.clone();
            claims.insert((session_id, claim.supplier_operator_address.clone()), claim);
        }

        for proof in proofs {
            let session_id = proof.session_header()?.session_id.clone();
            let supplier = proof.supplier_operator_address.clone();

            let Some(mut claim) = claims.remove(&(session_id.clone(), supplier.clone())) else {
                warn!("Proof for session {} by {} has no claim, dropping", session_id, supplier);
                keepers.proofs.remove_proof(&session_id, &supplier)?;
                summary.num_orphaned += 1;
                continue;
            };

            let (status, failure_reason) = match keepers.verifier.verify(&proof, &claim) {
                Ok(true) => (ProofValidationStatus::Validated, None),
                Ok(false) => (
                    ProofValidationStatus::Invalid,
                    Some("proof did not verify against the claim root".to_string()),
                ),
                Err(e) => (ProofValidationStatus::Invalid, Some(e.to_string())),
            };

            match status {
                ProofValidationStatus::Validated => summary.num_valid += 1,
                _ => summary.num_invalid += 1,
            }
            debug!(
                "Proof for session {} by {}: {:?} {}",
                session_id,
                supplier,
                status,
                failure_reason.as_deref().unwrap_or("")
            );

            claim.proof_validation_status = status;
            keepers.claims.upsert_claim(claim)?;
            keepers.events.emit(SettlementEvent::ProofValidityChecked {
                session_id: session_id.clone(),
                supplier_operator_address: supplier.clone(),
                block_height: block.height,
                status,
                failure_reason,
            });
            keepers.proofs.remove_proof(&session_id, &supplier)?;
        }

        Ok(summary)
    }

    /// Settle or expire every claim whose proof window closes at `block.height`.
    pub fn settle_pending_claims(
        &self,
        block: &BlockContext,
        keepers: &mut Keepers<'_>,
    ) -> Result<SettlementOutcome> {
        let mut ctx = SettlementContext::new(keepers.params)?;
        let mut outcome = SettlementOutcome {
            proofs: self.validate_submitted_proofs(block, keepers)?,
            ..Default::default()
        };

        let batch = self.expiring_claims(block, &ctx, keepers)?;
        let mut results: Vec<ClaimSettlementResult> = Vec::with_capacity(batch.len());

        for claim in batch {
            ctx.cache_claim_actors(
                &claim,
                &*keepers.suppliers,
                &*keepers.applications,
                &*keepers.services,
            )?;
            let session = claim.session_header()?.clone();

            let root = claim.root()?;
            if root.is_faulty() {
                debug!(
                    "Discarding zero-sum claim for session {} by {}",
                    session.session_id, claim.supplier_operator_address
                );
                keepers.events.emit(SettlementEvent::ClaimDiscarded {
                    session_id: session.session_id.clone(),
                    supplier_operator_address: claim.supplier_operator_address.clone(),
                    reason: "claim root has zero compute units".to_string(),
                });
                keepers
                    .claims
                    .remove_claim(&session.session_id, &claim.supplier_operator_address)?;
                outcome.num_discarded += 1;
                continue;
            }

            let difficulty = ctx.relay_mining_difficulty(&session.service_id)?;
            let amounts =
                ClaimAmounts::compute(&claim, ctx.shared(), difficulty, &ctx.tokenomics().denom)?;
            let requirement = self.decider.decide(&claim, &amounts, ctx.proof())?;

            let expiration = match (requirement.is_required(), claim.proof_validation_status) {
                (false, _) | (true, ProofValidationStatus::Validated) => None,
                (true, ProofValidationStatus::Invalid) => Some(ClaimExpirationReason::ProofInvalid),
                (true, ProofValidationStatus::Pending) => Some(ClaimExpirationReason::ProofMissing),
            };
            debug!(
                "Claim for session {} by {}: {} estimated compute units, {}, proof requirement {:?}, expiration {:?}",
                session.session_id,
                claim.supplier_operator_address,
                amounts.num_estimated_compute_units,
                amounts.claimed,
                requirement,
                expiration
            );

            let result = match expiration {
                None => {
                    let result = self.settle_claim(block, &mut ctx, &claim, &session, &amounts, requirement, keepers)?;
                    outcome.settled.record(&amounts);
                    let relays = outcome
                        .relays_per_service
                        .entry(session.service_id.clone())
                        .or_default();
                    *relays = relays.saturating_add(amounts.num_relays);
                    result
                }
                Some(reason) => {
                    let result = self.expire_claim(block, &mut ctx, &claim, &session, &amounts, reason, keepers)?;
                    outcome.expired.record(&amounts);
                    result
                }
            };
            results.push(result);

            keepers
                .claims
                .remove_claim(&session.session_id, &claim.supplier_operator_address)?;
        }

        outcome.ops = aggregate(&results)?;
        execute_ops(&outcome.ops, &mut *keepers.bank)?;
        ctx.flush_all_actors_to_store(&mut *keepers.applications, &mut *keepers.suppliers)?;
        outcome.ops_digest = outcome.ops.digest()?;

        info!(
            "Settlement at height {}: {} settled, {} expired, {} discarded, {} proofs checked (ops {})",
            block.height,
            outcome.settled.num_claims,
            outcome.expired.num_claims,
            outcome.num_discarded,
            outcome.proofs.num_valid + outcome.proofs.num_invalid,
            hex::encode(&outcome.ops_digest[..8])
        );
        Ok(outcome)
    }

    /// Claims whose session ended exactly one proof window before `block`, in store order.
    fn expiring_claims(
        &self,
        block: &BlockContext,
        ctx: &SettlementContext,
        keepers: &Keepers<'_>,
    ) -> Result<Vec<Claim>> {
        let Some(session_end) = ctx.shared().expiring_session_end_height(block.height)? else {
            return Ok(Vec::new());
        };

        let mut batch = Vec::new();
        for claim in keepers.claims.get_all_claims()? {
            if claim.session_header()?.session_end_block_height == session_end {
                batch.push(claim);
            }
        }
        debug!(
            "{} claims for sessions ending at {} reach proof window close at {}",
            batch.len(),
            session_end,
            block.height
        );
        Ok(batch)
    }

    #[allow(clippy::too_many_arguments)]
    fn settle_claim(
        &self,
        block: &BlockContext,
        ctx: &mut SettlementContext,
        claim: &Claim,
        session: &SessionHeader,
        amounts: &ClaimAmounts,
        requirement: ProofRequirementReason,
        keepers: &mut Keepers<'_>,
    ) -> Result<ClaimSettlementResult> {
        let result = self
            .tlms
            .process(block, ctx, claim, &amounts.claimed, &mut *keepers.events)?;

        keepers.events.emit(SettlementEvent::ClaimSettled {
            session_id: session.session_id.clone(),
            supplier_operator_address: claim.supplier_operator_address.clone(),
            application_address: session.application_address.clone(),
            service_id: session.service_id.clone(),
            amounts: amounts.clone(),
            proof_requirement: requirement,
        });
        Ok(result)
    }

    /// Slash the supplier for a missing or invalid proof.
    ///
    /// The slash is capped at the remaining stake. A supplier that drops
    /// below the minimum stake starts unbonding at the end of the current
    /// session, once.
    #[allow(clippy::too_many_arguments)]
    fn expire_claim(
        &self,
        block: &BlockContext,
        ctx: &mut SettlementContext,
        claim: &Claim,
        session: &SessionHeader,
        amounts: &ClaimAmounts,
        reason: ClaimExpirationReason,
        keepers: &mut Keepers<'_>,
    ) -> Result<ClaimSettlementResult> {
        keepers.events.emit(SettlementEvent::ClaimExpired {
            session_id: session.session_id.clone(),
            supplier_operator_address: claim.supplier_operator_address.clone(),
            application_address: session.application_address.clone(),
            service_id: session.service_id.clone(),
            amounts: amounts.clone(),
            reason,
        });

        let penalty = ctx.proof().missing_penalty()?.clone();
        let min_stake = ctx.supplier_params().min_stake.clone();
        let unstake_session_end_height = ctx.shared().session_end_height(block.height);

        let supplier = ctx.supplier_mut(&claim.supplier_operator_address)?;
        let slashed = Coin::min(&penalty, &supplier.stake)?;
        supplier.stake = supplier.stake.checked_sub(&slashed)?;

        warn!(
            "Slashed supplier {} by {} for session {} ({:?}), stake now {}",
            supplier.operator_address, slashed, session.session_id, reason, supplier.stake
        );
        keepers.events.emit(SettlementEvent::SupplierSlashed {
            supplier_operator_address: supplier.operator_address.clone(),
            session_id: session.session_id.clone(),
            penalty: penalty.clone(),
            slashed: slashed.clone(),
            remaining_stake: supplier.stake.clone(),
        });

        if supplier.stake.amount < min_stake.amount && !supplier.is_unbonding() {
            supplier.unstake_session_end_height = unstake_session_end_height;
            info!(
                "Supplier {} below minimum stake {}, unbonding at session end {}",
                supplier.operator_address, min_stake, unstake_session_end_height
            );
            keepers.events.emit(SettlementEvent::SupplierUnbondingBegin {
                supplier_operator_address: supplier.operator_address.clone(),
                unstake_session_end_height,
                stake: supplier.stake.clone(),
            });
        }

        let mut result = ClaimSettlementResult::new(claim.clone());
        result.append_burn(SettlementOpReason::SupplierSlashStakeBurn, SUPPLIER_MODULE, slashed);
        Ok(result)
    }
}

/// Execute aggregated operations: mints, module transfers, account
/// transfers, then burns. Zero amounts are skipped.
pub fn execute_ops(ops: &SettlementOps, bank: &mut dyn BankLedger) -> Result<()> {
    for mint in &ops.mints {
        if mint.coin.is_zero() {
            debug!("Skipping zero mint into {} ({})", mint.module, mint.reason);
            continue;
        }
        bank.mint(&mint.module, &mint.coin)?;
    }
    for transfer in &ops.mod_to_mod {
        if transfer.coin.is_zero() {
            debug!(
                "Skipping zero transfer {} -> {} ({})",
                transfer.sender_module, transfer.recipient_module, transfer.reason
            );
            continue;
        }
        bank.transfer_module_to_module(&transfer.sender_module, &transfer.recipient_module, &transfer.coin)?;
    }
    for transfer in &ops.mod_to_acct {
        if transfer.coin.is_zero() {
            debug!(
                "Skipping zero transfer {} -> {} ({})",
                transfer.sender_module, transfer.recipient_address, transfer.reason
            );
            continue;
        }
        bank.transfer_module_to_account(&transfer.sender_module, &transfer.recipient_address, &transfer.coin)?;
    }
    for burn in &ops.burns {
        if burn.coin.is_zero() {
            debug!("Skipping zero burn from {} ({})", burn.module, burn.reason);
            continue;
        }
        bank.burn(&burn.module, &burn.coin)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryChain;
    use crate::SettlementError;
    use relaycraft_core::{
        Application, MerkleSumRoot, Params, Proof, RevShare, Service, Supplier,
        SupplierServiceConfig, APPLICATION_MODULE, DEFAULT_DENOM,
    };

    // Default params: sessions of 10 blocks, proof window closes 10 blocks
    // after session end, 42 tokens per compute unit.
    const SESSION_END: u64 = 10;
    const SETTLE_HEIGHT: u64 = 20;

    fn coin(amount: u64) -> Coin {
        Coin::new(DEFAULT_DENOM, amount)
    }

    fn params() -> Params {
        let mut params = Params::default();
        params.proof.proof_request_probability = 0.0;
        params
    }

    fn chain(params: Params) -> InMemoryChain {
        let mut chain = InMemoryChain::new(params);
        chain.services.insert_service(Service {
            id: "svc1".to_string(),
            name: "Service One".to_string(),
            compute_units_per_relay: 1,
            owner_address: "source_owner".to_string(),
        });
        chain.applications.insert(Application {
            address: "app1".to_string(),
            stake: coin(100_000),
            service_ids: vec!["svc1".to_string()],
            unstake_session_end_height: 0,
        });
        chain.bank.fund_module(APPLICATION_MODULE, &coin(100_000));
        for supplier in ["supplier1", "supplier2"] {
            chain.suppliers.insert(Supplier {
                operator_address: supplier.to_string(),
                owner_address: format!("{}_owner", supplier),
                stake: coin(1_000),
                services: vec![SupplierServiceConfig {
                    service_id: "svc1".to_string(),
                    rev_share: vec![RevShare {
                        address: format!("{}_owner", supplier),
                        rev_share_percentage: 100,
                    }],
                }],
                unstake_session_end_height: 0,
            });
            chain.bank.fund_module(SUPPLIER_MODULE, &coin(1_000));
        }
        chain
    }

    fn header(session: &str, end: u64) -> SessionHeader {
        SessionHeader {
            application_address: "app1".to_string(),
            service_id: "svc1".to_string(),
            session_id: session.to_string(),
            session_start_block_height: end - 9,
            session_end_block_height: end,
        }
    }

    fn claim(session: &str, supplier: &str, compute_units: u64) -> Claim {
        Claim {
            supplier_operator_address: supplier.to_string(),
            session_header: Some(header(session, SESSION_END)),
            root_hash: MerkleSumRoot::new([7u8; 32], compute_units, compute_units).encode(),
            proof_validation_status: ProofValidationStatus::Pending,
        }
    }

    fn proof(session: &str, supplier: &str, path: Vec<u8>) -> Proof {
        Proof {
            supplier_operator_address: supplier.to_string(),
            session_header: Some(header(session, SESSION_END)),
            closest_merkle_proof: path,
        }
    }

    fn settle(chain: &mut InMemoryChain, height: u64) -> Result<SettlementOutcome> {
        let block = BlockContext::new(height);
        let mut keepers = chain.keepers();
        keepers.events.begin_block(height);
        ClaimSettlementPipeline::default().settle_pending_claims(&block, &mut keepers)
    }

    #[test]
    fn test_claim_below_threshold_settles() {
        let mut chain = chain(params());
        chain.claims.insert(claim("s1", "supplier1", 100));

        let outcome = settle(&mut chain, SETTLE_HEIGHT).unwrap();
        assert_eq!(outcome.num_settled(), 1);
        assert_eq!(outcome.num_expired(), 0);
        assert_eq!(outcome.settled.claimed_amount, 4_200);
        assert_eq!(outcome.relays_per_service.get("svc1"), Some(&100));

        assert!(chain.claims.is_empty());
        assert_eq!(chain.applications.get("app1").unwrap().stake, coin(95_800));
        assert_eq!(chain.bank.account_balance("supplier1_owner", DEFAULT_DENOM), 4_200);
        assert_eq!(chain.bank.total_minted(DEFAULT_DENOM), chain.bank.total_burned(DEFAULT_DENOM));
        assert_eq!(chain.events.count("claim_settled"), 1);
    }

    #[test]
    fn test_claims_outside_window_are_untouched() {
        let mut chain = chain(params());
        chain.claims.insert(claim("s1", "supplier1", 100));

        let outcome = settle(&mut chain, SETTLE_HEIGHT - 1).unwrap();
        assert_eq!(outcome.num_settled(), 0);
        assert_eq!(chain.claims.len(), 1);
        assert!(outcome.ops.is_empty());
    }

    #[test]
    fn test_zero_sum_claim_is_discarded() {
        let mut chain = chain(params());
        chain.claims.insert(claim("s1", "supplier1", 0));

        let outcome = settle(&mut chain, SETTLE_HEIGHT).unwrap();
        assert_eq!(outcome.num_discarded, 1);
        assert_eq!(outcome.num_settled() + outcome.num_expired(), 0);
        assert!(outcome.ops.is_empty());
        assert!(chain.claims.is_empty());
        assert_eq!(chain.events.count("claim_discarded"), 1);
    }

    #[test]
    fn test_threshold_claim_without_proof_expires_and_slashes() {
        let mut params = params();
        params.proof.proof_requirement_threshold = Some(coin(4_200));
        params.proof.proof_missing_penalty = Some(coin(300));
        let mut chain = chain(params);
        chain.claims.insert(claim("s1", "supplier1", 100));

        let outcome = settle(&mut chain, SETTLE_HEIGHT).unwrap();
        assert_eq!(outcome.num_expired(), 1);
        assert!(outcome.relays_per_service.is_empty());
        assert_eq!(outcome.ops.burned_for(SettlementOpReason::SupplierSlashStakeBurn, DEFAULT_DENOM), 300);

        let supplier = chain.suppliers.get("supplier1").unwrap();
        assert_eq!(supplier.stake, coin(700));
        assert!(!supplier.is_unbonding());
        assert_eq!(chain.applications.get("app1").unwrap().stake, coin(100_000));

        let kinds: Vec<&str> = chain.events.events().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["claim_expired", "supplier_slashed"]);
    }

    #[test]
    fn test_threshold_claim_with_valid_proof_settles() {
        let mut params = params();
        params.proof.proof_requirement_threshold = Some(coin(1));
        let mut chain = chain(params);
        chain.claims.insert(claim("s1", "supplier1", 100));
        chain.proofs.insert(proof("s1", "supplier1", vec![1, 2, 3]));

        let outcome = settle(&mut chain, SETTLE_HEIGHT).unwrap();
        assert_eq!(outcome.proofs.num_valid, 1);
        assert_eq!(outcome.num_settled(), 1);
        assert!(chain.proofs.is_empty());

        match chain.events.events().find(|e| e.kind() == "claim_settled").unwrap() {
            SettlementEvent::ClaimSettled { proof_requirement, .. } => {
                assert_eq!(*proof_requirement, ProofRequirementReason::Threshold)
            }
            other => panic!("unexpected event {:?}", other),
        };
    }

    #[test]
    fn test_invalid_proof_is_treated_as_expired() {
        let mut params = params();
        params.proof.proof_requirement_threshold = Some(coin(1));
        let mut chain = chain(params);
        chain.claims.insert(claim("s1", "supplier1", 100));
        chain.proofs.insert(proof("s1", "supplier1", vec![]));

        let outcome = settle(&mut chain, SETTLE_HEIGHT).unwrap();
        assert_eq!(outcome.proofs.num_invalid, 1);
        assert_eq!(outcome.num_expired(), 1);
        assert!(chain.proofs.is_empty());

        let reason = chain.events.events().find_map(|e| match e {
            SettlementEvent::ClaimExpired { reason, .. } => Some(*reason),
            _ => None,
        });
        assert_eq!(reason, Some(ClaimExpirationReason::ProofInvalid));
    }

    #[test]
    fn test_orphaned_proof_is_removed() {
        let mut chain = chain(params());
        chain.proofs.insert(proof("ghost", "supplier1", vec![1]));

        let outcome = settle(&mut chain, SETTLE_HEIGHT).unwrap();
        assert_eq!(outcome.proofs.num_orphaned, 1);
        assert!(chain.proofs.is_empty());
        assert_eq!(chain.events.count("proof_validity_checked"), 0);
    }

    #[test]
    fn test_supplier_slashed_to_zero_unbonds_once() {
        let mut params = params();
        params.proof.proof_requirement_threshold = Some(coin(1));
        params.proof.proof_missing_penalty = Some(coin(1_000));
        let mut chain = chain(params);
        for session in ["s1", "s2", "s3"] {
            chain.claims.insert(claim(session, "supplier1", 10));
        }

        let outcome = settle(&mut chain, SETTLE_HEIGHT).unwrap();
        assert_eq!(outcome.num_expired(), 3);
        assert_eq!(outcome.ops.burned_for(SettlementOpReason::SupplierSlashStakeBurn, DEFAULT_DENOM), 1_000);
        assert_eq!(chain.events.count("supplier_slashed"), 3);
        assert_eq!(chain.events.count("supplier_unbonding_begin"), 1);

        let supplier = chain.suppliers.get("supplier1").unwrap();
        assert_eq!(supplier.stake, coin(0));
        assert_eq!(supplier.unstake_session_end_height, 20);
        assert_eq!(chain.suppliers.writes("supplier1"), 1);
    }

    #[test]
    fn test_slash_in_foreign_denom_aborts_block() {
        let mut params = params();
        params.proof.proof_requirement_threshold = Some(coin(1));
        let mut chain = chain(params);
        let mut supplier = chain.suppliers.get("supplier1").unwrap().clone();
        supplier.stake = Coin::new("uother", 1_000);
        chain.suppliers.insert(supplier);
        chain.claims.insert(claim("s1", "supplier1", 10));

        let err = settle(&mut chain, SETTLE_HEIGHT).unwrap_err();
        assert!(matches!(err, SettlementError::DataIntegrity(_)));
        assert_eq!(chain.suppliers.writes("supplier1"), 0);
    }

    #[test]
    fn test_actors_written_once_per_batch() {
        let mut chain = chain(params());
        chain.claims.insert(claim("s1", "supplier1", 10));
        chain.claims.insert(claim("s2", "supplier1", 10));
        chain.claims.insert(claim("s1", "supplier2", 10));

        let outcome = settle(&mut chain, SETTLE_HEIGHT).unwrap();
        assert_eq!(outcome.num_settled(), 3);
        assert_eq!(chain.applications.writes("app1"), 1);
        assert_eq!(chain.suppliers.writes("supplier1"), 1);
        assert_eq!(chain.suppliers.writes("supplier2"), 1);
        assert_eq!(chain.applications.get("app1").unwrap().stake, coin(100_000 - 3 * 420));
    }

    #[test]
    fn test_missing_header_aborts_block() {
        let mut chain = chain(params());
        let mut bad = claim("s1", "supplier1", 10);
        bad.session_header = None;
        chain.claims.insert(bad);

        let err = settle(&mut chain, SETTLE_HEIGHT).unwrap_err();
        assert!(matches!(err, SettlementError::DataIntegrity(_)));
    }

    #[test]
    fn test_ledger_failure_aborts_block() {
        let mut chain = chain(params());
        chain.claims.insert(claim("s1", "supplier1", 10));
        chain.bank.fail_with("ledger offline");

        let err = settle(&mut chain, SETTLE_HEIGHT).unwrap_err();
        assert!(matches!(err, SettlementError::Ledger(_)));
    }

    #[test]
    fn test_execute_ops_skips_zero_amounts() {
        let mut result = ClaimSettlementResult::new(claim("s1", "supplier1", 1));
        result.append_burn(SettlementOpReason::SupplierSlashStakeBurn, SUPPLIER_MODULE, coin(0));
        let ops = aggregate(&[result]).unwrap();

        let mut chain = chain(params());
        chain.bank.fail_with("must not be called");
        execute_ops(&ops, &mut chain.bank).unwrap();
    }
}
