//! Error types for the consult_core library.

use crate::ids::{HealthCardId, ProductId};
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for consultation operations
///
/// Every failure is reported by kind; nothing is collapsed into a catch-all,
/// so callers can match on the exact reason an operation was refused.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ------------------------------------------------------------------
    // Caller input
    // ------------------------------------------------------------------
    /// Malformed or missing input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Operation invoked outside its required session phase
    #[error("Procedural error: {0}")]
    Procedural(String),

    // ------------------------------------------------------------------
    // Prescription domain
    // ------------------------------------------------------------------
    /// Product already has a line in the prescription
    #[error("Product {0} is already in the prescription")]
    DuplicateProduct(ProductId),

    /// Product has no line in the prescription
    #[error("Product {0} is not in the prescription")]
    ProductNotFound(ProductId),

    /// Raw taking guideline could not be turned into a guideline
    #[error("Incorrect taking guidelines: {0}")]
    Guideline(String),

    /// Ending date too close to, or before, the current instant
    #[error("Incorrect ending date: {0}")]
    EndingDate(String),

    // ------------------------------------------------------------------
    // Collaborators
    // ------------------------------------------------------------------
    /// Registry could not be reached
    #[error("Connection error: {0}")]
    Connectivity(String),

    /// Patient not registered in the registry
    #[error("Patient {0} is not registered")]
    UnknownPatient(HealthCardId),

    /// No active prescription for the patient and illness
    #[error("No active prescription for patient {patient} and illness '{illness}'")]
    NoActivePrescription {
        patient: HealthCardId,
        illness: String,
    },

    /// Registry refused an incomplete prescription
    #[error("Prescription not completed: {0}")]
    IncompletePrescription(String),

    /// AI system failed to start
    #[error("AI system error: {0}")]
    AiSystem(String),

    /// AI could not make sense of the prompt
    #[error("Bad prompt: {0}")]
    BadPrompt(String),

    /// Signature could not be stamped
    #[error("Signature error: {0}")]
    Signature(Box<Error>),

    // ------------------------------------------------------------------
    // Ambient
    // ------------------------------------------------------------------
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for failures caused by calling an operation in the wrong phase
    pub fn is_procedural(&self) -> bool {
        match self {
            Error::Procedural(_) => true,
            Error::Signature(inner) => inner.is_procedural(),
            _ => false,
        }
    }
}
