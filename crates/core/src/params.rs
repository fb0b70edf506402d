//! Module parameters
//!
//! Every tunable the settlement pipeline reads lives in one of these
//! structs. They are snapshotted once per block through `ParamsProvider`
//! and passed down explicitly.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{Coin, DEFAULT_DENOM};

/// Basis points making up 100%
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Read-only parameter snapshots for one block
pub trait ParamsProvider {
    fn shared_params(&self) -> SharedParams;
    fn proof_params(&self) -> ProofParams;
    fn tokenomics_params(&self) -> TokenomicsParams;
    fn service_params(&self) -> ServiceParams;
    fn supplier_params(&self) -> SupplierParams;
}

/// Session timing and reward conversion shared by all modules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedParams {
    #[serde(default = "default_num_blocks_per_session")]
    pub num_blocks_per_session: u64,

    #[serde(default = "default_grace_period_end_offset_blocks")]
    pub grace_period_end_offset_blocks: u64,

    #[serde(default = "default_claim_window_open_offset_blocks")]
    pub claim_window_open_offset_blocks: u64,

    #[serde(default = "default_claim_window_close_offset_blocks")]
    pub claim_window_close_offset_blocks: u64,

    #[serde(default)]
    pub proof_window_open_offset_blocks: u64,

    #[serde(default = "default_proof_window_close_offset_blocks")]
    pub proof_window_close_offset_blocks: u64,

    /// Tokens minted per estimated compute unit
    #[serde(default = "default_compute_units_to_tokens_multiplier")]
    pub compute_units_to_tokens_multiplier: u64,
}

fn default_num_blocks_per_session() -> u64 {
    10
}

fn default_grace_period_end_offset_blocks() -> u64 {
    1
}

fn default_claim_window_open_offset_blocks() -> u64 {
    1
}

fn default_claim_window_close_offset_blocks() -> u64 {
    4
}

fn default_proof_window_close_offset_blocks() -> u64 {
    4
}

fn default_compute_units_to_tokens_multiplier() -> u64 {
    42
}

impl Default for SharedParams {
    fn default() -> Self {
        Self {
            num_blocks_per_session: default_num_blocks_per_session(),
            grace_period_end_offset_blocks: default_grace_period_end_offset_blocks(),
            claim_window_open_offset_blocks: default_claim_window_open_offset_blocks(),
            claim_window_close_offset_blocks: default_claim_window_close_offset_blocks(),
            proof_window_open_offset_blocks: 0,
            proof_window_close_offset_blocks: default_proof_window_close_offset_blocks(),
            compute_units_to_tokens_multiplier: default_compute_units_to_tokens_multiplier(),
        }
    }
}

impl SharedParams {
    /// First height of the session containing `height`. Sessions start at 1.
    pub fn session_start_height(&self, height: u64) -> u64 {
        let n = self.num_blocks_per_session.max(1);
        let height = height.max(1);
        height - ((height - 1) % n)
    }

    /// Last height of the session containing `height`.
    pub fn session_end_height(&self, height: u64) -> u64 {
        self.session_start_height(height)
            .saturating_add(self.num_blocks_per_session.max(1) - 1)
    }

    /// Blocks between a session's end and the close of its proof window.
    ///
    /// The claim window opens one block after `claim_window_open_offset_blocks`
    /// regardless of the grace period.
    pub fn session_end_to_proof_window_close_blocks(&self) -> Result<u64> {
        [
            self.claim_window_open_offset_blocks,
            1,
            self.claim_window_close_offset_blocks,
            self.proof_window_open_offset_blocks,
            self.proof_window_close_offset_blocks,
        ]
        .iter()
        .try_fold(0u64, |acc, offset| acc.checked_add(*offset))
        .ok_or_else(|| CoreError::InvalidParams("session window offsets overflow".to_string()))
    }

    pub fn proof_window_close_height(&self, session_end_height: u64) -> Result<u64> {
        session_end_height
            .checked_add(self.session_end_to_proof_window_close_blocks()?)
            .ok_or_else(|| {
                CoreError::ArithmeticOverflow(format!(
                    "proof window close after session end {}",
                    session_end_height
                ))
            })
    }

    /// Session end height whose proof window closes at `height`, if any.
    pub fn expiring_session_end_height(&self, height: u64) -> Result<Option<u64>> {
        Ok(height.checked_sub(self.session_end_to_proof_window_close_blocks()?))
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_blocks_per_session == 0 {
            return Err(CoreError::InvalidParams(
                "num_blocks_per_session must be greater than 0".to_string(),
            ));
        }
        if self.compute_units_to_tokens_multiplier == 0 {
            return Err(CoreError::InvalidParams(
                "compute_units_to_tokens_multiplier must be greater than 0".to_string(),
            ));
        }
        self.session_end_to_proof_window_close_blocks()?;
        Ok(())
    }
}

/// Proof requirement and penalty settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofParams {
    /// Chance in [0, 1] that a below-threshold claim must be proven
    #[serde(default = "default_proof_request_probability")]
    pub proof_request_probability: f64,

    /// Claims worth at least this much always require a proof
    #[serde(default = "default_proof_requirement_threshold")]
    pub proof_requirement_threshold: Option<Coin>,

    /// Slashed from a supplier for each expired claim
    #[serde(default = "default_proof_missing_penalty")]
    pub proof_missing_penalty: Option<Coin>,
}

fn default_proof_request_probability() -> f64 {
    0.25
}

fn default_proof_requirement_threshold() -> Option<Coin> {
    Some(Coin::new(DEFAULT_DENOM, 20_000_000))
}

fn default_proof_missing_penalty() -> Option<Coin> {
    Some(Coin::new(DEFAULT_DENOM, 320_000_000))
}

impl Default for ProofParams {
    fn default() -> Self {
        Self {
            proof_request_probability: default_proof_request_probability(),
            proof_requirement_threshold: default_proof_requirement_threshold(),
            proof_missing_penalty: default_proof_missing_penalty(),
        }
    }
}

impl ProofParams {
    pub fn requirement_threshold(&self) -> Result<&Coin> {
        self.proof_requirement_threshold
            .as_ref()
            .ok_or(CoreError::MissingParam("proof_requirement_threshold"))
    }

    pub fn missing_penalty(&self) -> Result<&Coin> {
        self.proof_missing_penalty
            .as_ref()
            .ok_or(CoreError::MissingParam("proof_missing_penalty"))
    }

    pub fn validate(&self) -> Result<()> {
        let p = self.proof_request_probability;
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(CoreError::InvalidParams(format!(
                "proof_request_probability must be within [0, 1], got {}",
                p
            )));
        }
        self.requirement_threshold()?;
        self.missing_penalty()?;
        Ok(())
    }
}

/// Split of globally minted tokens, in basis points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintAllocationPercentages {
    pub dao: u64,
    pub proposer: u64,
    pub supplier: u64,
    pub source_owner: u64,
    pub application: u64,
}

impl Default for MintAllocationPercentages {
    fn default() -> Self {
        Self {
            dao: 1_000,
            proposer: 500,
            supplier: 7_000,
            source_owner: 1_500,
            application: 0,
        }
    }
}

impl MintAllocationPercentages {
    /// Sum of all allocations, `None` on overflow.
    pub fn total(&self) -> Option<u64> {
        [self.dao, self.proposer, self.supplier, self.source_owner, self.application]
            .iter()
            .try_fold(0u64, |acc, bps| acc.checked_add(*bps))
    }
}

/// Settlement economics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenomicsParams {
    #[serde(default = "default_denom")]
    pub denom: String,

    /// Extra mint per settled claim, in basis points of the settlement amount
    #[serde(default)]
    pub global_inflation_bps: u64,

    #[serde(default)]
    pub mint_allocation_percentages: MintAllocationPercentages,

    #[serde(default = "default_dao_reward_address")]
    pub dao_reward_address: String,
}

fn default_denom() -> String {
    DEFAULT_DENOM.to_string()
}

fn default_dao_reward_address() -> String {
    "craft1dao".to_string()
}

impl Default for TokenomicsParams {
    fn default() -> Self {
        Self {
            denom: default_denom(),
            global_inflation_bps: 0,
            mint_allocation_percentages: MintAllocationPercentages::default(),
            dao_reward_address: default_dao_reward_address(),
        }
    }
}

impl TokenomicsParams {
    pub fn validate(&self) -> Result<()> {
        if self.denom.is_empty() {
            return Err(CoreError::InvalidParams("denom must not be empty".to_string()));
        }
        match self.mint_allocation_percentages.total() {
            Some(BPS_DENOMINATOR) => {}
            Some(total) => {
                return Err(CoreError::InvalidParams(format!(
                    "mint allocation percentages must sum to {} bps, got {}",
                    BPS_DENOMINATOR, total
                )))
            }
            None => {
                return Err(CoreError::InvalidParams(
                    "mint allocation percentages overflow".to_string(),
                ))
            }
        }
        if self.dao_reward_address.is_empty() {
            return Err(CoreError::InvalidParams(
                "dao_reward_address must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// EMA smoothing factor as an exact ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmaSmoothing {
    pub numerator: u64,
    pub denominator: u64,
}

impl Default for EmaSmoothing {
    fn default() -> Self {
        Self {
            numerator: 1,
            denominator: 10,
        }
    }
}

/// Relay mining difficulty settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceParams {
    #[serde(default = "default_target_num_relays")]
    pub target_num_relays: u64,

    #[serde(default)]
    pub ema_smoothing: EmaSmoothing,
}

fn default_target_num_relays() -> u64 {
    10_000
}

impl Default for ServiceParams {
    fn default() -> Self {
        Self {
            target_num_relays: default_target_num_relays(),
            ema_smoothing: EmaSmoothing::default(),
        }
    }
}

impl ServiceParams {
    pub fn validate(&self) -> Result<()> {
        if self.target_num_relays == 0 {
            return Err(CoreError::InvalidParams(
                "target_num_relays must be greater than 0".to_string(),
            ));
        }
        let s = &self.ema_smoothing;
        if s.denominator == 0 || s.numerator == 0 || s.numerator > s.denominator {
            return Err(CoreError::InvalidParams(format!(
                "ema smoothing must be within (0, 1], got {}/{}",
                s.numerator, s.denominator
            )));
        }
        Ok(())
    }
}

/// Supplier staking settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierParams {
    /// Below this stake a supplier starts unbonding
    #[serde(default = "default_min_stake")]
    pub min_stake: Coin,
}

fn default_min_stake() -> Coin {
    Coin::new(DEFAULT_DENOM, 1)
}

impl Default for SupplierParams {
    fn default() -> Self {
        Self {
            min_stake: default_min_stake(),
        }
    }
}

/// All parameters in one bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params {
    #[serde(default)]
    pub shared: SharedParams,
    #[serde(default)]
    pub proof: ProofParams,
    #[serde(default)]
    pub tokenomics: TokenomicsParams,
    #[serde(default)]
    pub service: ServiceParams,
    #[serde(default)]
    pub supplier: SupplierParams,
}

impl Params {
    /// Validate every section and check that all coins use the reward denom.
    pub fn validate(&self) -> Result<()> {
        self.shared.validate()?;
        self.proof.validate()?;
        self.tokenomics.validate()?;
        self.service.validate()?;

        let denom = &self.tokenomics.denom;
        let coins = [
            self.proof.requirement_threshold()?,
            self.proof.missing_penalty()?,
            &self.supplier.min_stake,
        ];
        for coin in coins {
            if &coin.denom != denom {
                return Err(CoreError::DenomMismatch {
                    expected: denom.clone(),
                    actual: coin.denom.clone(),
                });
            }
        }
        Ok(())
    }
}

impl ParamsProvider for Params {
    fn shared_params(&self) -> SharedParams {
        self.shared.clone()
    }

    fn proof_params(&self) -> ProofParams {
        self.proof.clone()
    }

    fn tokenomics_params(&self) -> TokenomicsParams {
        self.tokenomics.clone()
    }

    fn service_params(&self) -> ServiceParams {
        self.service.clone()
    }

    fn supplier_params(&self) -> SupplierParams {
        self.supplier.clone()
    }
}
