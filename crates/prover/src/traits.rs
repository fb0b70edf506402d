//! Proof verifier trait for pluggable verification backends.
//!
//! The stub verifier only checks that a proof belongs to its claim and
//! carries a path. A real backend would walk the closest Merkle path
//! against the claim's sum root.

use relaycraft_core::{Claim, Proof};

/// Errors from proof verification.
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("Malformed proof: {0}")]
    MalformedProof(String),

    #[error("Proof does not match claim: {0}")]
    ClaimMismatch(String),

    #[error("Verification failed: {0}")]
    VerificationFailed(String),
}

/// Pluggable proof verifier.
///
/// `Ok(false)` and `Err(_)` both mean the proof is invalid; the error
/// carries a reason that ends up on the validity event.
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, proof: &Proof, claim: &Claim) -> Result<bool, VerifierError>;
}
