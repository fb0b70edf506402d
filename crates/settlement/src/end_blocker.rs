//! Per-block entry point.

use std::collections::BTreeMap;

use relaycraft_core::{RelayMiningDifficulty, ServiceId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::BlockContext;
use crate::difficulty::RelayMiningDifficultyController;
use crate::pipeline::{ClaimSettlementPipeline, SettlementOutcome};
use crate::stores::Keepers;
use crate::Result;

/// What happened at the end of one block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndBlockSummary {
    pub block_height: u64,
    pub settlement: SettlementOutcome,
    pub difficulty_updates: BTreeMap<ServiceId, RelayMiningDifficulty>,
}

/// Runs settlement then the difficulty update, once per block.
///
/// Any error aborts the whole block; the host discards its state changes.
pub struct EndBlocker<'a> {
    keepers: Keepers<'a>,
    pipeline: ClaimSettlementPipeline,
    controller: RelayMiningDifficultyController,
}

impl<'a> EndBlocker<'a> {
    pub fn new(keepers: Keepers<'a>) -> Self {
        Self::with_pipeline(keepers, ClaimSettlementPipeline::default())
    }

    pub fn with_pipeline(keepers: Keepers<'a>, pipeline: ClaimSettlementPipeline) -> Self {
        Self {
            keepers,
            pipeline,
            controller: RelayMiningDifficultyController::new(),
        }
    }

    pub fn end_block(&mut self, block: &BlockContext) -> Result<EndBlockSummary> {
        self.keepers.events.begin_block(block.height);

        let settlement = self.pipeline.settle_pending_claims(block, &mut self.keepers)?;

        let difficulty_updates = if settlement.relays_per_service.is_empty() {
            debug!("No settled relays at height {}, difficulty unchanged", block.height);
            BTreeMap::new()
        } else {
            let service_params = self.keepers.params.service_params();
            self.controller.update_all(
                block.height,
                &service_params,
                &mut *self.keepers.services,
                &mut *self.keepers.events,
                &settlement.relays_per_service,
            )?
        };

        Ok(EndBlockSummary {
            block_height: block.height,
            settlement,
            difficulty_updates,
        })
    }
}
