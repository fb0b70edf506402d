//! RelayCraft Prover
//!
//! Proof verification capability consumed by the settlement pipeline.
//! `ValidateSubmittedProofs` calls a `ProofVerifier` once per stored
//! proof; the concrete backend is swappable.

pub mod stub;
pub mod traits;

pub use stub::StubVerifier;
pub use traits::{ProofVerifier, VerifierError};
