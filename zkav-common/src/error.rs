//! Error taxonomy shared across the workspace.
//!
//! All recoverable failures surface to the submitter unchanged; the ledger
//! never partially applies a transaction. Only [`Error::Internal`] is fatal.

use thiserror::Error;

/// Errors produced anywhere in the shielded ledger pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Deserialization failure, wrong sizes, wrong address prefix.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Point not on curve, KDF counter overflow, AEAD tag mismatch.
    #[error("crypto failure: {0}")]
    CryptoFailure(&'static str),

    /// The SNARK verifier returned false.
    #[error("proof rejected by verifier")]
    ProofRejected,

    /// The nullifier is already recorded; the note was spent before.
    #[error("double spend: nullifier already recorded")]
    DoubleSpend,

    /// The ledger root advanced between verification and commit.
    #[error("stale root: proof is not current against the ledger")]
    StaleRoot,

    /// Prover-side only: the witness does not satisfy the circuit.
    #[error("circuit unsatisfied: {0}")]
    CircuitUnsatisfied(String),

    /// Missing SRS, hash setup failure. Fatal; callers may panic.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Workspace-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
