//! Settlement-scoped cache of actors, services and difficulties.
//!
//! One context lives for one block. Every read of an application or
//! supplier during the batch goes through it, so stake changes made by
//! earlier claims are visible to later ones. `flush_all_actors_to_store`
//! is the single place mutated actors are written back, each exactly once.

use std::collections::HashMap;

use relaycraft_core::{
    Address, Application, Claim, Coin, ParamsProvider, ProofParams, RelayMiningDifficulty,
    Service, ServiceId, SharedParams, Supplier, SupplierParams, TokenomicsParams,
    BASE_RELAY_DIFFICULTY_HASH,
};
use tracing::debug;

use crate::stores::{ApplicationStore, ServiceStore, StoreError, SupplierStore};
use crate::{Result, SettlementError};

/// Host block information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockContext {
    pub height: u64,
    /// Receives the proposer share of global inflation
    pub proposer_address: Option<Address>,
}

impl BlockContext {
    pub fn new(height: u64) -> Self {
        Self {
            height,
            proposer_address: None,
        }
    }

    pub fn with_proposer(mut self, proposer: impl Into<Address>) -> Self {
        self.proposer_address = Some(proposer.into());
        self
    }
}

pub struct SettlementContext {
    shared: SharedParams,
    proof: ProofParams,
    tokenomics: TokenomicsParams,
    supplier_params: SupplierParams,

    suppliers: HashMap<Address, Supplier>,
    supplier_order: Vec<Address>,
    applications: HashMap<Address, Application>,
    application_order: Vec<Address>,
    initial_application_stakes: HashMap<Address, Coin>,
    services: HashMap<ServiceId, Service>,
    difficulties: HashMap<ServiceId, RelayMiningDifficulty>,
}

impl SettlementContext {
    /// Snapshot and validate params. Invalid or missing params abort the block.
    pub fn new(params: &dyn ParamsProvider) -> Result<Self> {
        let shared = params.shared_params();
        let proof = params.proof_params();
        let tokenomics = params.tokenomics_params();
        let supplier_params = params.supplier_params();

        shared.validate()?;
        proof.validate()?;
        tokenomics.validate()?;
        for coin in [
            proof.requirement_threshold()?,
            proof.missing_penalty()?,
            &supplier_params.min_stake,
        ] {
            if coin.denom != tokenomics.denom {
                return Err(SettlementError::Config(format!(
                    "{} does not use the reward denom {}",
                    coin, tokenomics.denom
                )));
            }
        }

        Ok(Self {
            shared,
            proof,
            tokenomics,
            supplier_params,
            suppliers: HashMap::new(),
            supplier_order: Vec::new(),
            applications: HashMap::new(),
            application_order: Vec::new(),
            initial_application_stakes: HashMap::new(),
            services: HashMap::new(),
            difficulties: HashMap::new(),
        })
    }

    pub fn shared(&self) -> &SharedParams {
        &self.shared
    }

    pub fn proof(&self) -> &ProofParams {
        &self.proof
    }

    pub fn tokenomics(&self) -> &TokenomicsParams {
        &self.tokenomics
    }

    pub fn supplier_params(&self) -> &SupplierParams {
        &self.supplier_params
    }

    /// Load everything `claim` touches that is not cached yet.
    pub fn cache_claim_actors(
        &mut self,
        claim: &Claim,
        suppliers: &dyn SupplierStore,
        applications: &dyn ApplicationStore,
        services: &dyn ServiceStore,
    ) -> Result<()> {
        let header = claim.session_header()?;

        let supplier_address = &claim.supplier_operator_address;
        if !self.suppliers.contains_key(supplier_address) {
            let supplier = suppliers.get_supplier(supplier_address)?.ok_or_else(|| {
                SettlementError::DataIntegrity(format!("supplier {} not found", supplier_address))
            })?;
            debug!("Cached supplier {} with stake {}", supplier_address, supplier.stake);
            self.supplier_order.push(supplier_address.clone());
            self.suppliers.insert(supplier_address.clone(), supplier);
        }

        let app_address = &header.application_address;
        if !self.applications.contains_key(app_address) {
            let application = applications.get_application(app_address)?.ok_or_else(|| {
                SettlementError::DataIntegrity(format!("application {} not found", app_address))
            })?;
            debug!("Cached application {} with stake {}", app_address, application.stake);
            self.initial_application_stakes
                .insert(app_address.clone(), application.stake.clone());
            self.application_order.push(app_address.clone());
            self.applications.insert(app_address.clone(), application);
        }

        let service_id = &header.service_id;
        if !self.services.contains_key(service_id) {
            let service = services.get_service(service_id)?.ok_or_else(|| {
                SettlementError::DataIntegrity(format!("service {} not found", service_id))
            })?;
            self.services.insert(service_id.clone(), service);
        }

        if !self.difficulties.contains_key(service_id) {
            let difficulty = match services.get_relay_mining_difficulty(service_id)? {
                Some(d) => d,
                None => {
                    debug!("No relay mining difficulty for {}, using base", service_id);
                    RelayMiningDifficulty {
                        service_id: service_id.clone(),
                        block_height: 0,
                        num_relays_ema: 0,
                        target_hash: BASE_RELAY_DIFFICULTY_HASH,
                    }
                }
            };
            self.difficulties.insert(service_id.clone(), difficulty);
        }

        Ok(())
    }

    pub fn application(&self, address: &str) -> Result<&Application> {
        self.applications
            .get(address)
            .ok_or_else(|| not_cached("application", address))
    }

    /// Stake the application had when it was first touched in this block.
    pub fn initial_application_stake(&self, address: &str) -> Result<&Coin> {
        self.initial_application_stakes
            .get(address)
            .ok_or_else(|| not_cached("application", address))
    }

    pub fn supplier(&self, operator_address: &str) -> Result<&Supplier> {
        self.suppliers
            .get(operator_address)
            .ok_or_else(|| not_cached("supplier", operator_address))
    }

    pub fn supplier_mut(&mut self, operator_address: &str) -> Result<&mut Supplier> {
        self.suppliers
            .get_mut(operator_address)
            .ok_or_else(|| not_cached("supplier", operator_address))
    }

    pub fn service(&self, service_id: &str) -> Result<&Service> {
        self.services
            .get(service_id)
            .ok_or_else(|| not_cached("service", service_id))
    }

    pub fn relay_mining_difficulty(&self, service_id: &str) -> Result<&RelayMiningDifficulty> {
        self.difficulties
            .get(service_id)
            .ok_or_else(|| not_cached("relay mining difficulty", service_id))
    }

    /// Mutable application and supplier of one claim.
    pub fn actors_mut(
        &mut self,
        application_address: &str,
        supplier_operator_address: &str,
    ) -> Result<(&mut Application, &mut Supplier)> {
        let application = self
            .applications
            .get_mut(application_address)
            .ok_or_else(|| not_cached("application", application_address))?;
        let supplier = self
            .suppliers
            .get_mut(supplier_operator_address)
            .ok_or_else(|| not_cached("supplier", supplier_operator_address))?;
        Ok((application, supplier))
    }

    pub fn num_cached_applications(&self) -> usize {
        self.applications.len()
    }

    pub fn num_cached_suppliers(&self) -> usize {
        self.suppliers.len()
    }

    /// Write every cached application and supplier back, in first-touch order.
    pub fn flush_all_actors_to_store(
        &self,
        applications: &mut dyn ApplicationStore,
        suppliers: &mut dyn SupplierStore,
    ) -> Result<()> {
        for address in &self.application_order {
            let application = self.application(address)?;
            applications.set_application(application.clone())?;
        }
        for address in &self.supplier_order {
            let supplier = self.supplier(address)?;
            suppliers.set_supplier(supplier.clone())?;
        }
        debug!(
            "Flushed {} applications and {} suppliers",
            self.application_order.len(),
            self.supplier_order.len()
        );
        Ok(())
    }
}

fn not_cached(kind: &str, key: &str) -> SettlementError {
    SettlementError::Store(StoreError::Corrupt {
        key: key.to_string(),
        reason: format!("{} was not loaded into the settlement context", kind),
    })
}
