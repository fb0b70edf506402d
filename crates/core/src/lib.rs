//! RelayCraft Core
//!
//! Domain types shared by the settlement crates: coins, claims, proofs,
//! staked actors, services and their relay mining difficulty, plus the
//! strongly-typed module params and the 256-bit difficulty arithmetic.

pub mod difficulty;
pub mod error;
pub mod params;
pub mod root;
pub mod types;

pub use difficulty::{
    compute_ema, compute_new_target_hash, estimated_compute_units, BASE_RELAY_DIFFICULTY_HASH,
};
pub use error::{CoreError, Result};
pub use params::{
    EmaSmoothing, MintAllocationPercentages, Params, ParamsProvider, ProofParams, ServiceParams,
    SharedParams, SupplierParams, TokenomicsParams, BPS_DENOMINATOR,
};
pub use root::MerkleSumRoot;
pub use types::*;
