//! Structural verifier used until a Merkle-sum backend is wired in.

use relaycraft_core::{Claim, Proof};
use tracing::debug;

use crate::traits::{ProofVerifier, VerifierError};

/// Accepts any proof that targets its claim's session and supplier and
/// carries a non-empty closest path.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubVerifier;

impl StubVerifier {
    pub fn new() -> Self {
        Self
    }
}

impl ProofVerifier for StubVerifier {
    fn verify(&self, proof: &Proof, claim: &Claim) -> Result<bool, VerifierError> {
        let proof_header = proof
            .session_header()
            .map_err(|e| VerifierError::MalformedProof(e.to_string()))?;
        let claim_header = claim
            .session_header()
            .map_err(|e| VerifierError::MalformedProof(e.to_string()))?;

        if proof.supplier_operator_address != claim.supplier_operator_address {
            return Err(VerifierError::ClaimMismatch(format!(
                "supplier {} != {}",
                proof.supplier_operator_address, claim.supplier_operator_address
            )));
        }
        if proof_header != claim_header {
            return Err(VerifierError::ClaimMismatch(format!(
                "session {} != {}",
                proof_header.session_id, claim_header.session_id
            )));
        }

        let valid = !proof.closest_merkle_proof.is_empty();
        debug!(
            "Stub verification for session {} supplier {}: {}",
            proof_header.session_id, proof.supplier_operator_address, valid
        );
        Ok(valid)
    }
}
