//! Token logic modules (TLMs).
//!
//! A TLM turns one settled claim into mint, burn and transfer operations.
//! The processor runs every registered module in order and concatenates
//! their output, after bounding the settlement amount by what the
//! application can still pay.

pub mod distribution;
pub mod global_mint;
pub mod relay_burn_equals_mint;

pub use global_mint::GlobalMint;
pub use relay_burn_equals_mint::RelayBurnEqualsMint;

use std::fmt;

use relaycraft_aggregator::ClaimSettlementResult;
use relaycraft_core::{
    Application, Claim, Coin, Service, SessionHeader, Supplier, TokenomicsParams,
};
use tracing::{debug, warn};

use crate::context::{BlockContext, SettlementContext};
use crate::events::{EventSink, SettlementEvent};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenLogicModuleId {
    RelayBurnEqualsMint,
    GlobalMint,
}

impl fmt::Display for TokenLogicModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RelayBurnEqualsMint => f.write_str("relay_burn_equals_mint"),
            Self::GlobalMint => f.write_str("global_mint"),
        }
    }
}

/// Read-only inputs shared by every module for one claim
pub struct TlmContext<'a> {
    pub block: &'a BlockContext,
    pub claim: &'a Claim,
    pub session: &'a SessionHeader,
    pub service: &'a Service,
    pub tokenomics: &'a TokenomicsParams,
    /// Amount to settle after the over-servicing bound
    pub settlement_coin: &'a Coin,
}

pub trait TokenLogicModule: Send + Sync {
    fn id(&self) -> TokenLogicModuleId;

    fn apply(
        &self,
        tlm_ctx: &TlmContext<'_>,
        application: &mut Application,
        supplier: &mut Supplier,
    ) -> Result<ClaimSettlementResult>;
}

/// Ordered registry of token logic modules.
pub struct TokenLogicModuleProcessor {
    modules: Vec<Box<dyn TokenLogicModule>>,
}

impl Default for TokenLogicModuleProcessor {
    fn default() -> Self {
        Self::new(vec![Box::new(RelayBurnEqualsMint), Box::new(GlobalMint)])
    }
}

impl TokenLogicModuleProcessor {
    pub fn new(modules: Vec<Box<dyn TokenLogicModule>>) -> Self {
        Self { modules }
    }

    pub fn register(&mut self, module: Box<dyn TokenLogicModule>) {
        self.modules.push(module);
    }

    pub fn module_ids(&self) -> Vec<TokenLogicModuleId> {
        self.modules.iter().map(|m| m.id()).collect()
    }

    /// Run every module against one settled claim.
    pub fn process(
        &self,
        block: &BlockContext,
        ctx: &mut SettlementContext,
        claim: &Claim,
        claimed: &Coin,
        events: &mut dyn EventSink,
    ) -> Result<ClaimSettlementResult> {
        let session = claim.session_header()?.clone();
        let settlement_coin = ensure_claim_amount_limits(ctx, claim, &session, claimed, events)?;
        let service = ctx.service(&session.service_id)?.clone();
        let tokenomics = ctx.tokenomics().clone();

        let tlm_ctx = TlmContext {
            block,
            claim,
            session: &session,
            service: &service,
            tokenomics: &tokenomics,
            settlement_coin: &settlement_coin,
        };
        let (application, supplier) =
            ctx.actors_mut(&session.application_address, &claim.supplier_operator_address)?;

        let mut result = ClaimSettlementResult::new(claim.clone());
        for module in &self.modules {
            let module_result = module.apply(&tlm_ctx, application, supplier)?;
            debug!(
                "TLM {} produced {} operations for session {}",
                module.id(),
                module_result.num_ops(),
                session.session_id
            );
            result.merge(module_result);
        }
        Ok(result)
    }
}

/// Bound a claim by the application's stake.
///
/// The limit is the stake the application had when first touched in this
/// block, less whatever earlier claims in the batch already burned. When
/// the claim exceeds it the application is over-serviced and only the
/// remaining stake is settled.
pub fn ensure_claim_amount_limits(
    ctx: &SettlementContext,
    claim: &Claim,
    session: &SessionHeader,
    claimed: &Coin,
    events: &mut dyn EventSink,
) -> Result<Coin> {
    let app_address = &session.application_address;
    let initial_stake = ctx.initial_application_stake(app_address)?;
    let current_stake = &ctx.application(app_address)?.stake;
    let limit = initial_stake.min(current_stake)?;

    if claimed.amount <= limit.amount {
        return Ok(claimed.clone());
    }

    warn!(
        "Application {} over-serviced by supplier {}: claimed {}, settling {} (initial stake {})",
        app_address, claim.supplier_operator_address, claimed, limit, initial_stake
    );
    events.emit(SettlementEvent::ApplicationOverserviced {
        application_address: app_address.clone(),
        supplier_operator_address: claim.supplier_operator_address.clone(),
        expected_burn: claimed.clone(),
        effective_burn: limit.clone(),
    });
    Ok(limit)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use relaycraft_core::{
        MerkleSumRoot, ProofValidationStatus, RevShare, SupplierServiceConfig, DEFAULT_DENOM,
    };

    pub struct Fixture {
        pub block: BlockContext,
        pub claim: Claim,
        pub session: SessionHeader,
        pub service: Service,
        pub tokenomics: TokenomicsParams,
        pub supplier: Supplier,
    }

    impl Fixture {
        pub fn new(percentages: &[u64]) -> Self {
            let session = SessionHeader {
                application_address: "app1".to_string(),
                service_id: "svc1".to_string(),
                session_id: "session1".to_string(),
                session_start_block_height: 1,
                session_end_block_height: 10,
            };
            let rev_share = percentages
                .iter()
                .enumerate()
                .map(|(i, p)| RevShare {
                    address: format!("holder{}", i),
                    rev_share_percentage: *p,
                })
                .collect();
            Self {
                block: BlockContext::new(20),
                claim: Claim {
                    supplier_operator_address: "supplier1".to_string(),
                    session_header: Some(session.clone()),
                    root_hash: MerkleSumRoot::new([0u8; 32], 100, 10).encode(),
                    proof_validation_status: ProofValidationStatus::Pending,
                },
                session,
                service: Service {
                    id: "svc1".to_string(),
                    name: "Service One".to_string(),
                    compute_units_per_relay: 10,
                    owner_address: "source_owner".to_string(),
                },
                tokenomics: TokenomicsParams::default(),
                supplier: Supplier {
                    operator_address: "supplier1".to_string(),
                    owner_address: "holder0".to_string(),
                    stake: Coin::new(DEFAULT_DENOM, 1_000),
                    services: vec![SupplierServiceConfig {
                        service_id: "svc1".to_string(),
                        rev_share,
                    }],
                    unstake_session_end_height: 0,
                },
            }
        }

        pub fn application(&self, stake: u64) -> Application {
            Application {
                address: "app1".to_string(),
                stake: Coin::new(DEFAULT_DENOM, stake),
                service_ids: vec!["svc1".to_string()],
                unstake_session_end_height: 0,
            }
        }

        pub fn ctx<'a>(&'a self, coin: &'a Coin) -> TlmContext<'a> {
            TlmContext {
                block: &self.block,
                claim: &self.claim,
                session: &self.session,
                service: &self.service,
                tokenomics: &self.tokenomics,
                settlement_coin: coin,
            }
        }
    }
}
