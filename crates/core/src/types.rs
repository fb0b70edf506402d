//! Core domain types for claim settlement

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::root::MerkleSumRoot;

/// Bech32-style account address
pub type Address = String;

/// Service identifier
pub type ServiceId = String;

/// Session identifier
pub type SessionId = String;

/// 32-byte relay mining target hash
pub type TargetHash = [u8; 32];

/// Default staking and reward denomination
pub const DEFAULT_DENOM: &str = "ucraft";

/// Module account holding escrowed application stake
pub const APPLICATION_MODULE: &str = "application";

/// Module account holding supplier stake and freshly minted rewards
pub const SUPPLIER_MODULE: &str = "supplier";

/// Module account used for global inflation
pub const TOKENOMICS_MODULE: &str = "tokenomics";

/// A denominated token amount
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u64,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u64) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn zero(denom: impl Into<String>) -> Self {
        Self::new(denom, 0)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    fn ensure_same_denom(&self, other: &Coin) -> Result<()> {
        if self.denom != other.denom {
            return Err(CoreError::DenomMismatch {
                expected: self.denom.clone(),
                actual: other.denom.clone(),
            });
        }
        Ok(())
    }

    pub fn checked_add(&self, other: &Coin) -> Result<Coin> {
        self.ensure_same_denom(other)?;
        let amount = self.amount.checked_add(other.amount).ok_or_else(|| {
            CoreError::ArithmeticOverflow(format!("{} + {}", self, other))
        })?;
        Ok(Coin::new(self.denom.clone(), amount))
    }

    /// Subtract, failing instead of going negative.
    pub fn checked_sub(&self, other: &Coin) -> Result<Coin> {
        self.ensure_same_denom(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or(CoreError::InsufficientAmount {
                needed: other.amount,
                available: self.amount,
            })?;
        Ok(Coin::new(self.denom.clone(), amount))
    }

    /// The smaller of two coins of the same denom.
    pub fn min(&self, other: &Coin) -> Result<Coin> {
        self.ensure_same_denom(other)?;
        Ok(Coin::new(self.denom.clone(), self.amount.min(other.amount)))
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// The application/service/height window a claim was produced for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHeader {
    pub application_address: Address,
    pub service_id: ServiceId,
    pub session_id: SessionId,
    pub session_start_block_height: u64,
    pub session_end_block_height: u64,
}

/// Result of checking a submitted proof against its claim.
///
/// A missing proof has no status of its own: it is the absence of a proof
/// record for the claim's session and supplier when the proof window closes,
/// and the claim expires with `ClaimExpirationReason::ProofMissing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofValidationStatus {
    /// No proof has been checked for this claim
    #[default]
    Pending,
    Validated,
    Invalid,
}

/// A supplier's assertion of work done for one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub supplier_operator_address: Address,
    pub session_header: Option<SessionHeader>,
    /// Merkle-sum root: digest || sum (BE u64) || count (BE u64)
    pub root_hash: Vec<u8>,
    #[serde(default)]
    pub proof_validation_status: ProofValidationStatus,
}

impl Claim {
    /// Session header, or a data-integrity error when absent.
    pub fn session_header(&self) -> Result<&SessionHeader> {
        self.session_header
            .as_ref()
            .ok_or_else(|| CoreError::MissingSessionHeader(self.supplier_operator_address.clone()))
    }

    pub fn root(&self) -> Result<MerkleSumRoot> {
        MerkleSumRoot::decode(&self.root_hash)
    }

    /// Total compute units claimed (the root's sum).
    pub fn num_claimed_compute_units(&self) -> Result<u64> {
        Ok(self.root()?.sum)
    }

    /// Total relays claimed (the root's count).
    pub fn num_relays(&self) -> Result<u64> {
        Ok(self.root()?.count)
    }
}

/// Inclusion proof for a single leaf of a claim's tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub supplier_operator_address: Address,
    pub session_header: Option<SessionHeader>,
    /// Serialized closest Merkle path
    pub closest_merkle_proof: Vec<u8>,
}

impl Proof {
    pub fn session_header(&self) -> Result<&SessionHeader> {
        self.session_header
            .as_ref()
            .ok_or_else(|| CoreError::MissingSessionHeader(self.supplier_operator_address.clone()))
    }
}

/// A staked application paying for relays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub address: Address,
    pub stake: Coin,
    #[serde(default)]
    pub service_ids: Vec<ServiceId>,
    /// Zero when the application is not unbonding
    #[serde(default)]
    pub unstake_session_end_height: u64,
}

/// One revenue share entry of a supplier's service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevShare {
    pub address: Address,
    /// Whole percent, all entries of a service sum to 100
    pub rev_share_percentage: u64,
}

/// Per-service configuration of a supplier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierServiceConfig {
    pub service_id: ServiceId,
    pub rev_share: Vec<RevShare>,
}

/// A staked supplier serving relays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub operator_address: Address,
    pub owner_address: Address,
    pub stake: Coin,
    #[serde(default)]
    pub services: Vec<SupplierServiceConfig>,
    /// Zero when the supplier is not unbonding
    #[serde(default)]
    pub unstake_session_end_height: u64,
}

impl Supplier {
    pub fn is_unbonding(&self) -> bool {
        self.unstake_session_end_height != 0
    }

    /// Revenue shares configured for `service_id`.
    pub fn rev_share_for(&self, service_id: &str) -> Option<&[RevShare]> {
        self.services
            .iter()
            .find(|s| s.service_id == service_id)
            .map(|s| s.rev_share.as_slice())
    }
}

/// Static service catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub compute_units_per_relay: u64,
    /// Source owner receiving a share of global inflation
    pub owner_address: Address,
}

/// Per-service relay mining control-loop state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayMiningDifficulty {
    pub service_id: ServiceId,
    pub block_height: u64,
    pub num_relays_ema: u64,
    pub target_hash: TargetHash,
}
