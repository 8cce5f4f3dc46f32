//! External collaborators the consultation terminal depends on.
//!
//! The terminal owns one implementation of each, injected at construction.
//! Both traits report failures with the crate `Error`, using the collaborator
//! variants (`Connectivity`, `UnknownPatient`, `NoActivePrescription`,
//! `IncompletePrescription`, `AiSystem`, `BadPrompt`).

use crate::{HealthCardId, MedicalHistory, MedicalPrescription, Result, Suggestion};

/// National health registry storing histories and prescriptions
pub trait HealthRegistry {
    /// Download a patient's medical history
    ///
    /// Fails with `Connectivity` or `UnknownPatient`.
    fn fetch_history(&mut self, patient: &HealthCardId) -> Result<MedicalHistory>;

    /// Download the active prescription for an illness
    ///
    /// Fails with `Connectivity`, `UnknownPatient` or `NoActivePrescription`.
    fn fetch_prescription(
        &mut self,
        patient: &HealthCardId,
        illness: &str,
    ) -> Result<MedicalPrescription>;

    /// Store the updated history and prescription
    ///
    /// Returns the finalized prescription carrying its issued code. Fails with
    /// `Connectivity`, `UnknownPatient`, `NoActivePrescription` or
    /// `IncompletePrescription`.
    fn submit(
        &mut self,
        patient: &HealthCardId,
        history: &MedicalHistory,
        illness: &str,
        prescription: &MedicalPrescription,
    ) -> Result<MedicalPrescription>;
}

/// Decision-support AI that proposes treatment changes
pub trait DecisionSupport {
    /// Start the AI; fails with `AiSystem`
    fn initialize(&mut self) -> Result<()>;

    /// Send a prompt and get a free-text answer; fails with `BadPrompt`
    fn ask(&mut self, prompt: &str) -> Result<String>;

    /// Turn an answer into typed suggestions (possibly none)
    fn parse(&self, answer: &str) -> Vec<Suggestion>;
}
