//! Global inflation token logic module.
//!
//! Mints `global_inflation_bps` of the settlement amount into the
//! tokenomics module and distributes it by the mint allocation
//! percentages. The DAO absorbs every rounding remainder and the proposer
//! share when the block has no proposer.

use relaycraft_aggregator::{ClaimSettlementResult, SettlementOpReason};
use relaycraft_core::{
    Application, Coin, Supplier, BPS_DENOMINATOR, SUPPLIER_MODULE, TOKENOMICS_MODULE,
};
use tracing::debug;

use super::distribution::distribute_supplier_rewards;
use super::{TlmContext, TokenLogicModule, TokenLogicModuleId};
use crate::{Result, SettlementError};

#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalMint;

fn bps_of(amount: u64, bps: u64) -> Result<u64> {
    let value = amount as u128 * bps as u128 / BPS_DENOMINATOR as u128;
    u64::try_from(value).map_err(|_| {
        SettlementError::DataIntegrity(format!("{} bps of {} overflows", bps, amount))
    })
}

impl TokenLogicModule for GlobalMint {
    fn id(&self) -> TokenLogicModuleId {
        TokenLogicModuleId::GlobalMint
    }

    fn apply(
        &self,
        tlm_ctx: &TlmContext<'_>,
        application: &mut Application,
        supplier: &mut Supplier,
    ) -> Result<ClaimSettlementResult> {
        let mut result = ClaimSettlementResult::new(tlm_ctx.claim.clone());
        let tokenomics = tlm_ctx.tokenomics;
        let denom = &tlm_ctx.settlement_coin.denom;

        let new_mint = bps_of(tlm_ctx.settlement_coin.amount, tokenomics.global_inflation_bps)?;
        if new_mint == 0 {
            return Ok(result);
        }

        result.append_mint(
            SettlementOpReason::GlobalMintInflation,
            TOKENOMICS_MODULE,
            Coin::new(denom.clone(), new_mint),
        );

        let alloc = &tokenomics.mint_allocation_percentages;
        let application_amount = bps_of(new_mint, alloc.application)?;
        let supplier_amount = bps_of(new_mint, alloc.supplier)?;
        let source_owner_amount = bps_of(new_mint, alloc.source_owner)?;
        let proposer_amount = bps_of(new_mint, alloc.proposer)?;

        if application_amount > 0 {
            result.append_mod_to_acct(
                SettlementOpReason::GlobalMintApplicationRewardDistribution,
                TOKENOMICS_MODULE,
                &application.address,
                Coin::new(denom.clone(), application_amount),
            );
        }

        if supplier_amount > 0 {
            let coin = Coin::new(denom.clone(), supplier_amount);
            result.append_mod_to_mod(
                SettlementOpReason::GlobalMintSupplierShareholderRewardModuleTransfer,
                TOKENOMICS_MODULE,
                SUPPLIER_MODULE,
                coin.clone(),
            );
            distribute_supplier_rewards(
                &mut result,
                supplier,
                &tlm_ctx.session.service_id,
                SUPPLIER_MODULE,
                SettlementOpReason::GlobalMintSupplierShareholderRewardDistribution,
                &coin,
            )?;
        }

        if source_owner_amount > 0 {
            result.append_mod_to_acct(
                SettlementOpReason::GlobalMintSourceOwnerRewardDistribution,
                TOKENOMICS_MODULE,
                &tlm_ctx.service.owner_address,
                Coin::new(denom.clone(), source_owner_amount),
            );
        }

        let mut paid_proposer = 0;
        if let Some(proposer) = &tlm_ctx.block.proposer_address {
            if proposer_amount > 0 {
                result.append_mod_to_acct(
                    SettlementOpReason::GlobalMintProposerRewardDistribution,
                    TOKENOMICS_MODULE,
                    proposer,
                    Coin::new(denom.clone(), proposer_amount),
                );
            }
            paid_proposer = proposer_amount;
        }

        let dao_amount = new_mint - application_amount - supplier_amount - source_owner_amount - paid_proposer;
        if dao_amount > 0 {
            result.append_mod_to_acct(
                SettlementOpReason::GlobalMintDaoRewardDistribution,
                TOKENOMICS_MODULE,
                &tokenomics.dao_reward_address,
                Coin::new(denom.clone(), dao_amount),
            );
        }

        debug!(
            "Global mint of {}{} for claim by {} (dao {}, supplier {}, source owner {})",
            new_mint, denom, supplier.operator_address, dao_amount, supplier_amount, source_owner_amount
        );
        Ok(result)
    }
}
