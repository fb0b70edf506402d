//! In-memory collaborators.
//!
//! BTreeMap-backed stores with deterministic iteration, a bank that tracks
//! module and account balances, and `InMemoryChain` bundling them with
//! params, a verifier and an event log. Used by tests and local
//! simulations.

use std::collections::{BTreeMap, HashMap};

use relaycraft_core::{
    Application, Claim, Coin, Params, Proof, RelayMiningDifficulty, Service, SessionId, Supplier,
};
use relaycraft_prover::StubVerifier;
use tracing::debug;

use crate::events::EventLog;
use crate::stores::{
    ApplicationStore, BankLedger, ClaimStore, Keepers, LedgerError, ProofStore, ServiceStore,
    StoreError, SupplierStore,
};

type ClaimKey = (SessionId, String);

fn claim_key(session_id: &str, supplier: &str) -> ClaimKey {
    (session_id.to_string(), supplier.to_string())
}

fn header_key(
    header: Option<&relaycraft_core::SessionHeader>,
    supplier: &str,
) -> Result<ClaimKey, StoreError> {
    let header = header.ok_or_else(|| StoreError::Corrupt {
        key: supplier.to_string(),
        reason: "missing session header".to_string(),
    })?;
    Ok(claim_key(&header.session_id, supplier))
}

// =========================================================================
// Claims and proofs
// =========================================================================

#[derive(Debug, Default)]
pub struct MemoryClaimStore {
    claims: BTreeMap<ClaimKey, Claim>,
    fail_reads: Option<String>,
}

impl MemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a claim; claims without a header are kept under an empty session id.
    pub fn insert(&mut self, claim: Claim) {
        let session_id = claim
            .session_header
            .as_ref()
            .map(|h| h.session_id.clone())
            .unwrap_or_default();
        self.claims
            .insert(claim_key(&session_id, &claim.supplier_operator_address), claim);
    }

    pub fn get(&self, session_id: &str, supplier: &str) -> Option<&Claim> {
        self.claims.get(&claim_key(session_id, supplier))
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Make every subsequent read fail with `reason`.
    pub fn fail_reads(&mut self, reason: impl Into<String>) {
        self.fail_reads = Some(reason.into());
    }
}

impl ClaimStore for MemoryClaimStore {
    fn get_all_claims(&self) -> Result<Vec<Claim>, StoreError> {
        if let Some(reason) = &self.fail_reads {
            return Err(StoreError::Backend(reason.clone()));
        }
        Ok(self.claims.values().cloned().collect())
    }

    fn upsert_claim(&mut self, claim: Claim) -> Result<(), StoreError> {
        let key = header_key(claim.session_header.as_ref(), &claim.supplier_operator_address)?;
        self.claims.insert(key, claim);
        Ok(())
    }

    fn remove_claim(&mut self, session_id: &str, supplier_operator_address: &str) -> Result<(), StoreError> {
        self.claims.remove(&claim_key(session_id, supplier_operator_address));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryProofStore {
    proofs: BTreeMap<ClaimKey, Proof>,
}

impl MemoryProofStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, proof: Proof) {
        let session_id = proof
            .session_header
            .as_ref()
            .map(|h| h.session_id.clone())
            .unwrap_or_default();
        self.proofs
            .insert(claim_key(&session_id, &proof.supplier_operator_address), proof);
    }

    pub fn contains(&self, session_id: &str, supplier: &str) -> bool {
        self.proofs.contains_key(&claim_key(session_id, supplier))
    }

    pub fn len(&self) -> usize {
        self.proofs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proofs.is_empty()
    }
}

impl ProofStore for MemoryProofStore {
    fn get_all_proofs(&self) -> Result<Vec<Proof>, StoreError> {
        Ok(self.proofs.values().cloned().collect())
    }

    fn upsert_proof(&mut self, proof: Proof) -> Result<(), StoreError> {
        let key = header_key(proof.session_header.as_ref(), &proof.supplier_operator_address)?;
        self.proofs.insert(key, proof);
        Ok(())
    }

    fn remove_proof(&mut self, session_id: &str, supplier_operator_address: &str) -> Result<(), StoreError> {
        self.proofs.remove(&claim_key(session_id, supplier_operator_address));
        Ok(())
    }
}

// =========================================================================
// Actors and services
// =========================================================================

#[derive(Debug, Default)]
pub struct MemorySupplierStore {
    suppliers: BTreeMap<String, Supplier>,
    writes: HashMap<String, usize>,
}

impl MemorySupplierStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a supplier without counting it as a write.
    pub fn insert(&mut self, supplier: Supplier) {
        self.suppliers.insert(supplier.operator_address.clone(), supplier);
    }

    pub fn get(&self, operator_address: &str) -> Option<&Supplier> {
        self.suppliers.get(operator_address)
    }

    /// Number of `set_supplier` calls for this supplier.
    pub fn writes(&self, operator_address: &str) -> usize {
        self.writes.get(operator_address).copied().unwrap_or(0)
    }
}

impl SupplierStore for MemorySupplierStore {
    fn get_supplier(&self, operator_address: &str) -> Result<Option<Supplier>, StoreError> {
        Ok(self.suppliers.get(operator_address).cloned())
    }

    fn set_supplier(&mut self, supplier: Supplier) -> Result<(), StoreError> {
        *self.writes.entry(supplier.operator_address.clone()).or_default() += 1;
        self.suppliers.insert(supplier.operator_address.clone(), supplier);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryApplicationStore {
    applications: BTreeMap<String, Application>,
    writes: HashMap<String, usize>,
}

impl MemoryApplicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, application: Application) {
        self.applications.insert(application.address.clone(), application);
    }

    pub fn get(&self, address: &str) -> Option<&Application> {
        self.applications.get(address)
    }

    pub fn writes(&self, address: &str) -> usize {
        self.writes.get(address).copied().unwrap_or(0)
    }
}

impl ApplicationStore for MemoryApplicationStore {
    fn get_application(&self, address: &str) -> Result<Option<Application>, StoreError> {
        Ok(self.applications.get(address).cloned())
    }

    fn set_application(&mut self, application: Application) -> Result<(), StoreError> {
        *self.writes.entry(application.address.clone()).or_default() += 1;
        self.applications.insert(application.address.clone(), application);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryServiceStore {
    services: BTreeMap<String, Service>,
    difficulties: BTreeMap<String, RelayMiningDifficulty>,
}

impl MemoryServiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_service(&mut self, service: Service) {
        self.services.insert(service.id.clone(), service);
    }

    pub fn insert_difficulty(&mut self, difficulty: RelayMiningDifficulty) {
        self.difficulties.insert(difficulty.service_id.clone(), difficulty);
    }

    pub fn difficulty(&self, service_id: &str) -> Option<&RelayMiningDifficulty> {
        self.difficulties.get(service_id)
    }
}

impl ServiceStore for MemoryServiceStore {
    fn get_service(&self, service_id: &str) -> Result<Option<Service>, StoreError> {
        Ok(self.services.get(service_id).cloned())
    }

    fn get_relay_mining_difficulty(
        &self,
        service_id: &str,
    ) -> Result<Option<RelayMiningDifficulty>, StoreError> {
        Ok(self.difficulties.get(service_id).cloned())
    }

    fn set_relay_mining_difficulty(&mut self, difficulty: RelayMiningDifficulty) -> Result<(), StoreError> {
        self.difficulties.insert(difficulty.service_id.clone(), difficulty);
        Ok(())
    }
}

// =========================================================================
// Bank
// =========================================================================

/// Module and account balances keyed by (holder, denom).
#[derive(Debug, Default)]
pub struct MemoryBank {
    modules: BTreeMap<(String, String), u64>,
    accounts: BTreeMap<(String, String), u64>,
    minted: BTreeMap<String, u128>,
    burned: BTreeMap<String, u128>,
    fail_with: Option<String>,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit a module directly, e.g. escrowed application stake.
    pub fn fund_module(&mut self, module: &str, coin: &Coin) {
        *self
            .modules
            .entry((module.to_string(), coin.denom.clone()))
            .or_default() += coin.amount;
    }

    pub fn module_balance(&self, module: &str, denom: &str) -> u64 {
        self.modules
            .get(&(module.to_string(), denom.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn account_balance(&self, address: &str, denom: &str) -> u64 {
        self.accounts
            .get(&(address.to_string(), denom.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_minted(&self, denom: &str) -> u128 {
        self.minted.get(denom).copied().unwrap_or(0)
    }

    pub fn total_burned(&self, denom: &str) -> u128 {
        self.burned.get(denom).copied().unwrap_or(0)
    }

    /// Make every subsequent call fail with `reason`.
    pub fn fail_with(&mut self, reason: impl Into<String>) {
        self.fail_with = Some(reason.into());
    }

    fn check_available(&self) -> Result<(), LedgerError> {
        match &self.fail_with {
            Some(reason) => Err(LedgerError::Backend(reason.clone())),
            None => Ok(()),
        }
    }

    fn debit_module(&mut self, module: &str, coin: &Coin) -> Result<(), LedgerError> {
        let key = (module.to_string(), coin.denom.clone());
        let available = self.modules.get(&key).copied().unwrap_or(0);
        if available < coin.amount {
            return Err(LedgerError::InsufficientFunds {
                account: module.to_string(),
                needed: coin.clone(),
                available: Coin::new(coin.denom.clone(), available),
            });
        }
        self.modules.insert(key, available - coin.amount);
        Ok(())
    }
}

impl BankLedger for MemoryBank {
    fn mint(&mut self, module: &str, coin: &Coin) -> Result<(), LedgerError> {
        self.check_available()?;
        self.fund_module(module, coin);
        *self.minted.entry(coin.denom.clone()).or_default() += coin.amount as u128;
        debug!("Minted {} into {}", coin, module);
        Ok(())
    }

    fn burn(&mut self, module: &str, coin: &Coin) -> Result<(), LedgerError> {
        self.check_available()?;
        self.debit_module(module, coin)?;
        *self.burned.entry(coin.denom.clone()).or_default() += coin.amount as u128;
        debug!("Burned {} from {}", coin, module);
        Ok(())
    }

    fn transfer_module_to_module(
        &mut self,
        sender_module: &str,
        recipient_module: &str,
        coin: &Coin,
    ) -> Result<(), LedgerError> {
        self.check_available()?;
        self.debit_module(sender_module, coin)?;
        self.fund_module(recipient_module, coin);
        Ok(())
    }

    fn transfer_module_to_account(
        &mut self,
        sender_module: &str,
        recipient_address: &str,
        coin: &Coin,
    ) -> Result<(), LedgerError> {
        self.check_available()?;
        self.debit_module(sender_module, coin)?;
        *self
            .accounts
            .entry((recipient_address.to_string(), coin.denom.clone()))
            .or_default() += coin.amount;
        Ok(())
    }

    fn balance(&self, address: &str, denom: &str) -> Result<Coin, LedgerError> {
        self.check_available()?;
        Ok(Coin::new(denom, self.account_balance(address, denom)))
    }
}

// =========================================================================
// Whole chain
// =========================================================================

/// Every collaborator in memory, borrowable as `Keepers`.
#[derive(Debug, Default)]
pub struct InMemoryChain {
    pub claims: MemoryClaimStore,
    pub proofs: MemoryProofStore,
    pub suppliers: MemorySupplierStore,
    pub applications: MemoryApplicationStore,
    pub services: MemoryServiceStore,
    pub bank: MemoryBank,
    pub verifier: StubVerifier,
    pub params: Params,
    pub events: EventLog,
}

impl InMemoryChain {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    pub fn keepers(&mut self) -> Keepers<'_> {
        Keepers {
            claims: &mut self.claims,
            proofs: &mut self.proofs,
            suppliers: &mut self.suppliers,
            applications: &mut self.applications,
            services: &mut self.services,
            bank: &mut self.bank,
            verifier: &self.verifier,
            params: &self.params,
            events: &mut self.events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaycraft_core::{DEFAULT_DENOM, SUPPLIER_MODULE};

    fn coin(amount: u64) -> Coin {
        Coin::new(DEFAULT_DENOM, amount)
    }

    #[test]
    fn test_bank_mint_transfer_burn() {
        let mut bank = MemoryBank::new();
        bank.mint(SUPPLIER_MODULE, &coin(100)).unwrap();
        bank.transfer_module_to_account(SUPPLIER_MODULE, "alice", &coin(60)).unwrap();
        bank.transfer_module_to_module(SUPPLIER_MODULE, "other", &coin(30)).unwrap();
        bank.burn("other", &coin(30)).unwrap();

        assert_eq!(bank.module_balance(SUPPLIER_MODULE, DEFAULT_DENOM), 10);
        assert_eq!(bank.balance("alice", DEFAULT_DENOM).unwrap(), coin(60));
        assert_eq!(bank.total_minted(DEFAULT_DENOM), 100);
        assert_eq!(bank.total_burned(DEFAULT_DENOM), 30);
    }

    #[test]
    fn test_bank_rejects_overdraft() {
        let mut bank = MemoryBank::new();
        let err = bank.burn("application", &coin(1)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    }

    #[test]
    fn test_bank_failure_injection() {
        let mut bank = MemoryBank::new();
        bank.fail_with("offline");
        assert!(matches!(bank.mint("m", &coin(1)), Err(LedgerError::Backend(_))));
    }

    #[test]
    fn test_supplier_store_counts_writes_not_seeds() {
        let mut store = MemorySupplierStore::new();
        let supplier = Supplier {
            operator_address: "s1".to_string(),
            owner_address: "o1".to_string(),
            stake: coin(1),
            services: vec![],
            unstake_session_end_height: 0,
        };
        store.insert(supplier.clone());
        assert_eq!(store.writes("s1"), 0);
        store.set_supplier(supplier).unwrap();
        assert_eq!(store.writes("s1"), 1);
    }
}
