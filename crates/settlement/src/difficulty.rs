//! Relay mining difficulty control loop.
//!
//! Each service keeps an EMA of settled relays. The target hash follows
//! the EMA: at or below `target_num_relays` it is the base hash, above it
//! the base hash shrinks by `target / ema`.

use std::collections::BTreeMap;

use relaycraft_core::{
    compute_ema, compute_new_target_hash, difficulty::difficulty_bits, RelayMiningDifficulty,
    ServiceId, ServiceParams, BASE_RELAY_DIFFICULTY_HASH,
};
use tracing::{debug, info};

use crate::events::{EventSink, SettlementEvent};
use crate::stores::ServiceStore;
use crate::Result;

#[derive(Debug, Default, Clone, Copy)]
pub struct RelayMiningDifficultyController;

impl RelayMiningDifficultyController {
    pub fn new() -> Self {
        Self
    }

    /// Fold observed relays into every listed service's difficulty.
    ///
    /// A service without a stored difficulty is seeded with its observed
    /// relays as the EMA. Services absent from `relays_per_service` are not
    /// touched. Returns the new difficulties keyed by service.
    pub fn update_all(
        &self,
        block_height: u64,
        params: &ServiceParams,
        services: &mut dyn ServiceStore,
        events: &mut dyn EventSink,
        relays_per_service: &BTreeMap<ServiceId, u64>,
    ) -> Result<BTreeMap<ServiceId, RelayMiningDifficulty>> {
        params.validate()?;

        let mut updated = BTreeMap::new();
        for (service_id, &num_relays) in relays_per_service {
            let prev = services.get_relay_mining_difficulty(service_id)?;
            let (prev_target_hash, prev_ema, new_ema) = match &prev {
                Some(d) => (
                    d.target_hash,
                    d.num_relays_ema,
                    compute_ema(&params.ema_smoothing, d.num_relays_ema, num_relays),
                ),
                None => (BASE_RELAY_DIFFICULTY_HASH, 0, num_relays),
            };
            let new_target_hash = compute_new_target_hash(params.target_num_relays, new_ema);

            match &prev {
                None => info!(
                    "Initialized relay mining difficulty for {}: ema {}, {} bits",
                    service_id,
                    new_ema,
                    difficulty_bits(&new_target_hash)
                ),
                Some(_) if prev_target_hash != new_target_hash || prev_ema != new_ema => info!(
                    "Updated relay mining difficulty for {}: ema {} -> {}, {} -> {} bits",
                    service_id,
                    prev_ema,
                    new_ema,
                    difficulty_bits(&prev_target_hash),
                    difficulty_bits(&new_target_hash)
                ),
                Some(_) => debug!("No change in relay mining difficulty for {}", service_id),
            }

            let difficulty = RelayMiningDifficulty {
                service_id: service_id.clone(),
                block_height,
                num_relays_ema: new_ema,
                target_hash: new_target_hash,
            };
            services.set_relay_mining_difficulty(difficulty.clone())?;
            events.emit(SettlementEvent::RelayMiningDifficultyUpdated {
                service_id: service_id.clone(),
                prev_target_hash_hex: hex::encode(prev_target_hash),
                new_target_hash_hex: hex::encode(new_target_hash),
                prev_num_relays_ema: prev_ema,
                new_num_relays_ema: new_ema,
            });
            updated.insert(service_id.clone(), difficulty);
        }

        Ok(updated)
    }
}
