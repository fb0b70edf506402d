//! Baseline token logic module.
//!
//! Mints the settlement amount into the supplier module, pays it out to
//! the supplier's shareholders and burns the same amount from the
//! application module. Net supply change is zero.

use relaycraft_aggregator::{ClaimSettlementResult, SettlementOpReason};
use relaycraft_core::{Application, Supplier, APPLICATION_MODULE, SUPPLIER_MODULE};
use tracing::debug;

use super::distribution::distribute_supplier_rewards;
use super::{TlmContext, TokenLogicModule, TokenLogicModuleId};
use crate::Result;

#[derive(Debug, Default, Clone, Copy)]
pub struct RelayBurnEqualsMint;

impl TokenLogicModule for RelayBurnEqualsMint {
    fn id(&self) -> TokenLogicModuleId {
        TokenLogicModuleId::RelayBurnEqualsMint
    }

    fn apply(
        &self,
        tlm_ctx: &TlmContext<'_>,
        application: &mut Application,
        supplier: &mut Supplier,
    ) -> Result<ClaimSettlementResult> {
        let coin = tlm_ctx.settlement_coin;
        let mut result = ClaimSettlementResult::new(tlm_ctx.claim.clone());

        result.append_mint(
            SettlementOpReason::RelayBurnEqualsMintSupplierStakeMint,
            SUPPLIER_MODULE,
            coin.clone(),
        );
        distribute_supplier_rewards(
            &mut result,
            supplier,
            &tlm_ctx.session.service_id,
            SUPPLIER_MODULE,
            SettlementOpReason::RelayBurnEqualsMintSupplierShareholderRewardDistribution,
            coin,
        )?;

        result.append_burn(
            SettlementOpReason::RelayBurnEqualsMintApplicationStakeBurn,
            APPLICATION_MODULE,
            coin.clone(),
        );
        application.stake = application.stake.checked_sub(coin)?;

        debug!(
            "Relay burn equals mint: {} from application {} to supplier {} (stake now {})",
            coin, application.address, supplier.operator_address, application.stake
        );
        Ok(result)
    }
}
