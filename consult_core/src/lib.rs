#![forbid(unsafe_code)]

//! Core domain model and workflow for supervising a patient's treatment.
//!
//! This crate provides:
//! - Validated identifiers (patient card, product, prescription code, signature)
//! - Dosage model and the raw guideline parser
//! - Medical history and prescription aggregates
//! - Typed AI suggestions
//! - The consultation terminal that sequences a doctor's session
//! - File-backed registry and scripted advisor collaborators

pub mod error;
pub mod ids;
pub mod dosage;
pub mod history;
pub mod prescription;
pub mod suggestion;
pub mod services;
pub mod terminal;
pub mod registry;
pub mod advisor;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{Error, Result};
pub use ids::{DigitalSignature, HealthCardId, PrescriptionCode, ProductId};
pub use dosage::{DayMoment, FrequencyUnit, Posology, TakingGuideline};
pub use history::MedicalHistory;
pub use prescription::{MedicalPrescription, PrescriptionLine};
pub use suggestion::{parse_suggestions, GuidelinePatch, Suggestion, SuggestionAction};
pub use services::{DecisionSupport, HealthRegistry};
pub use terminal::{ConsultationTerminal, SessionPhase, SessionState};
pub use registry::{read_transmissions, FileRegistry, TransmissionRecord};
pub use advisor::ScriptedAdvisor;
pub use config::Config;
