//! Per-claim settlement operations emitted by token logic modules.

use std::fmt;

use relaycraft_core::{Claim, Coin};
use serde::{Deserialize, Serialize};

/// Why a token movement happened.
///
/// Every operation must carry a specific reason. `Unspecified` exists only
/// as the zero value and makes aggregation fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementOpReason {
    #[default]
    Unspecified,

    // Relay burn equals mint
    RelayBurnEqualsMintSupplierStakeMint,
    RelayBurnEqualsMintApplicationStakeBurn,
    RelayBurnEqualsMintSupplierShareholderRewardDistribution,

    // Global mint
    GlobalMintInflation,
    GlobalMintSupplierShareholderRewardModuleTransfer,
    GlobalMintSupplierShareholderRewardDistribution,
    GlobalMintDaoRewardDistribution,
    GlobalMintProposerRewardDistribution,
    GlobalMintSourceOwnerRewardDistribution,
    GlobalMintApplicationRewardDistribution,

    // Expiry
    SupplierSlashStakeBurn,
}

impl SettlementOpReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "UNSPECIFIED",
            Self::RelayBurnEqualsMintSupplierStakeMint => "RELAY_BURN_EQUALS_MINT_SUPPLIER_STAKE_MINT",
            Self::RelayBurnEqualsMintApplicationStakeBurn => {
                "RELAY_BURN_EQUALS_MINT_APPLICATION_STAKE_BURN"
            }
            Self::RelayBurnEqualsMintSupplierShareholderRewardDistribution => {
                "RELAY_BURN_EQUALS_MINT_SUPPLIER_SHAREHOLDER_REWARD_DISTRIBUTION"
            }
            Self::GlobalMintInflation => "GLOBAL_MINT_INFLATION",
            Self::GlobalMintSupplierShareholderRewardModuleTransfer => {
                "GLOBAL_MINT_SUPPLIER_SHAREHOLDER_REWARD_MODULE_TRANSFER"
            }
            Self::GlobalMintSupplierShareholderRewardDistribution => {
                "GLOBAL_MINT_SUPPLIER_SHAREHOLDER_REWARD_DISTRIBUTION"
            }
            Self::GlobalMintDaoRewardDistribution => "GLOBAL_MINT_DAO_REWARD_DISTRIBUTION",
            Self::GlobalMintProposerRewardDistribution => "GLOBAL_MINT_PROPOSER_REWARD_DISTRIBUTION",
            Self::GlobalMintSourceOwnerRewardDistribution => {
                "GLOBAL_MINT_SOURCE_OWNER_REWARD_DISTRIBUTION"
            }
            Self::GlobalMintApplicationRewardDistribution => {
                "GLOBAL_MINT_APPLICATION_REWARD_DISTRIBUTION"
            }
            Self::SupplierSlashStakeBurn => "SUPPLIER_SLASH_STAKE_BURN",
        }
    }
}

impl fmt::Display for SettlementOpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mint into or burn from a module account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintBurnOp {
    pub reason: SettlementOpReason,
    pub module: String,
    pub coin: Coin,
}

/// Transfer between two module accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModToModTransfer {
    pub reason: SettlementOpReason,
    pub sender_module: String,
    pub recipient_module: String,
    pub coin: Coin,
}

/// Transfer from a module account to a user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModToAcctTransfer {
    pub reason: SettlementOpReason,
    pub sender_module: String,
    pub recipient_address: String,
    pub coin: Coin,
}

/// All operations a single claim produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSettlementResult {
    pub claim: Claim,
    pub mints: Vec<MintBurnOp>,
    pub burns: Vec<MintBurnOp>,
    pub mod_to_mod: Vec<ModToModTransfer>,
    pub mod_to_acct: Vec<ModToAcctTransfer>,
}

impl ClaimSettlementResult {
    pub fn new(claim: Claim) -> Self {
        Self {
            claim,
            mints: Vec::new(),
            burns: Vec::new(),
            mod_to_mod: Vec::new(),
            mod_to_acct: Vec::new(),
        }
    }

    pub fn append_mint(&mut self, reason: SettlementOpReason, module: &str, coin: Coin) {
        self.mints.push(MintBurnOp {
            reason,
            module: module.to_string(),
            coin,
        });
    }

    pub fn append_burn(&mut self, reason: SettlementOpReason, module: &str, coin: Coin) {
        self.burns.push(MintBurnOp {
            reason,
            module: module.to_string(),
            coin,
        });
    }

    pub fn append_mod_to_mod(
        &mut self,
        reason: SettlementOpReason,
        sender_module: &str,
        recipient_module: &str,
        coin: Coin,
    ) {
        self.mod_to_mod.push(ModToModTransfer {
            reason,
            sender_module: sender_module.to_string(),
            recipient_module: recipient_module.to_string(),
            coin,
        });
    }

    pub fn append_mod_to_acct(
        &mut self,
        reason: SettlementOpReason,
        sender_module: &str,
        recipient_address: &str,
        coin: Coin,
    ) {
        self.mod_to_acct.push(ModToAcctTransfer {
            reason,
            sender_module: sender_module.to_string(),
            recipient_address: recipient_address.to_string(),
            coin,
        });
    }

    /// Append another module's operations after this one's.
    pub fn merge(&mut self, other: ClaimSettlementResult) {
        self.mints.extend(other.mints);
        self.burns.extend(other.burns);
        self.mod_to_mod.extend(other.mod_to_mod);
        self.mod_to_acct.extend(other.mod_to_acct);
    }

    pub fn num_ops(&self) -> usize {
        self.mints.len() + self.burns.len() + self.mod_to_mod.len() + self.mod_to_acct.len()
    }
}
