//! Collaborator capabilities consumed by the settlement pipeline.
//!
//! Each trait is a narrow view of one external keeper. The pipeline only
//! sees these traits, so tests substitute the in-memory versions from
//! `memory`.

use relaycraft_core::{
    Application, Claim, Coin, ParamsProvider, Proof, RelayMiningDifficulty, Service, Supplier,
};
use relaycraft_prover::ProofVerifier;
use thiserror::Error;

use crate::events::EventSink;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store backend failure: {0}")]
    Backend(String),

    #[error("Corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Insufficient funds in {account}: need {needed}, have {available}")]
    InsufficientFunds {
        account: String,
        needed: Coin,
        available: Coin,
    },

    #[error("Ledger backend failure: {0}")]
    Backend(String),
}

pub trait ClaimStore {
    /// All claims in stable iteration order.
    fn get_all_claims(&self) -> Result<Vec<Claim>, StoreError>;
    fn upsert_claim(&mut self, claim: Claim) -> Result<(), StoreError>;
    fn remove_claim(&mut self, session_id: &str, supplier_operator_address: &str) -> Result<(), StoreError>;
}

pub trait ProofStore {
    /// All proofs in stable iteration order.
    fn get_all_proofs(&self) -> Result<Vec<Proof>, StoreError>;
    fn upsert_proof(&mut self, proof: Proof) -> Result<(), StoreError>;
    fn remove_proof(&mut self, session_id: &str, supplier_operator_address: &str) -> Result<(), StoreError>;
}

pub trait SupplierStore {
    fn get_supplier(&self, operator_address: &str) -> Result<Option<Supplier>, StoreError>;
    fn set_supplier(&mut self, supplier: Supplier) -> Result<(), StoreError>;
}

pub trait ApplicationStore {
    fn get_application(&self, address: &str) -> Result<Option<Application>, StoreError>;
    fn set_application(&mut self, application: Application) -> Result<(), StoreError>;
}

pub trait ServiceStore {
    fn get_service(&self, service_id: &str) -> Result<Option<Service>, StoreError>;
    fn get_relay_mining_difficulty(
        &self,
        service_id: &str,
    ) -> Result<Option<RelayMiningDifficulty>, StoreError>;
    fn set_relay_mining_difficulty(&mut self, difficulty: RelayMiningDifficulty) -> Result<(), StoreError>;
}

/// Token ledger with module and user accounts.
pub trait BankLedger {
    fn mint(&mut self, module: &str, coin: &Coin) -> Result<(), LedgerError>;
    fn burn(&mut self, module: &str, coin: &Coin) -> Result<(), LedgerError>;
    fn transfer_module_to_module(
        &mut self,
        sender_module: &str,
        recipient_module: &str,
        coin: &Coin,
    ) -> Result<(), LedgerError>;
    fn transfer_module_to_account(
        &mut self,
        sender_module: &str,
        recipient_address: &str,
        coin: &Coin,
    ) -> Result<(), LedgerError>;
    fn balance(&self, address: &str, denom: &str) -> Result<Coin, LedgerError>;
}

/// Every collaborator the pipeline needs for one block.
pub struct Keepers<'a> {
    pub claims: &'a mut dyn ClaimStore,
    pub proofs: &'a mut dyn ProofStore,
    pub suppliers: &'a mut dyn SupplierStore,
    pub applications: &'a mut dyn ApplicationStore,
    pub services: &'a mut dyn ServiceStore,
    pub bank: &'a mut dyn BankLedger,
    pub verifier: &'a dyn ProofVerifier,
    pub params: &'a dyn ParamsProvider,
    pub events: &'a mut dyn EventSink,
}
