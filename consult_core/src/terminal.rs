//! Consultation terminal: the "supervise treatment" session workflow.
//!
//! A session moves through these phases, each operation checking the flags
//! it depends on before touching anything:
//!
//! ```text
//! start_revision ─► record_assessment*
//!        │
//!        └► begin_edition ─► consult_ai ─► ask_ai ─► extract_suggestions
//!                 │
//!                 ├► add_line / modify_dose / remove_line
//!                 ├► set_ending_date ─► stamp_signature ─► transmit
//!                 └► finish_edition
//! ```
//!
//! Validation and precondition checks all run before any mutation, so a
//! failed call leaves the session exactly as it was.
//!
//! One terminal serves one consultation. It holds plain mutable state and
//! must not be shared between threads without external serialization.

use crate::services::{DecisionSupport, HealthRegistry};
use crate::{
    DigitalSignature, Error, HealthCardId, MedicalHistory, MedicalPrescription, ProductId,
    Result, Suggestion,
};
use chrono::{DateTime, Duration, Utc};

/// Source of the current instant
pub type Clock = Box<dyn Fn() -> DateTime<Utc>>;

/// Minimum gap between "now" and a prescription's ending date
pub fn minimum_treatment_span() -> Duration {
    Duration::days(1)
}

/// Patient data loaded for the current revision
#[derive(Clone, Debug)]
pub struct Revision {
    pub patient: HealthCardId,
    pub illness: String,
    pub history: MedicalHistory,
    pub prescription: MedicalPrescription,
}

/// Coarse view of where the session stands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Revision,
    Edition,
    EditionFinished,
}

/// Flags and data of the ongoing consultation
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    revision: Option<Revision>,
    edition_active: bool,
    edition_finished: bool,
    ai_ready: bool,
    dates_set: bool,
    signature_stamped: bool,
    last_ai_response: Option<String>,
}

impl SessionState {
    pub fn revision(&self) -> Option<&Revision> {
        self.revision.as_ref()
    }

    pub fn is_revision_active(&self) -> bool {
        self.revision.is_some()
    }

    pub fn is_edition_active(&self) -> bool {
        self.edition_active
    }

    pub fn is_ai_ready(&self) -> bool {
        self.ai_ready
    }

    pub fn are_dates_set(&self) -> bool {
        self.dates_set
    }

    pub fn is_signature_stamped(&self) -> bool {
        self.signature_stamped
    }

    pub fn last_ai_response(&self) -> Option<&str> {
        self.last_ai_response.as_deref()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.revision.is_none() {
            SessionPhase::Idle
        } else if self.edition_active {
            SessionPhase::Edition
        } else if self.edition_finished {
            SessionPhase::EditionFinished
        } else {
            SessionPhase::Revision
        }
    }

    /// Edition was begun in this revision, open or finished
    fn edition_begun(&self) -> bool {
        self.edition_active || self.edition_finished
    }
}

/// Controller for one doctor's consultation session
pub struct ConsultationTerminal<R, A> {
    registry: R,
    advisor: A,
    clock: Clock,
    state: SessionState,
}

impl<R: HealthRegistry, A: DecisionSupport> ConsultationTerminal<R, A> {
    /// Create an idle terminal wired to its collaborators
    pub fn new(registry: R, advisor: A) -> Self {
        Self {
            registry,
            advisor,
            clock: Box::new(Utc::now),
            state: SessionState::default(),
        }
    }

    /// Replace the wall clock
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn advisor(&self) -> &A {
        &self.advisor
    }

    pub fn history(&self) -> Option<&MedicalHistory> {
        self.state.revision.as_ref().map(|r| &r.history)
    }

    pub fn prescription(&self) -> Option<&MedicalPrescription> {
        self.state.revision.as_ref().map(|r| &r.prescription)
    }

    pub fn illness(&self) -> Option<&str> {
        self.state.revision.as_ref().map(|r| r.illness.as_str())
    }

    // ========================================================================
    // Revision
    // ========================================================================

    /// Load a patient's history and prescription and open a fresh revision
    ///
    /// Any previous session is discarded only once both downloads succeed.
    pub fn start_revision(&mut self, patient: &HealthCardId, illness: &str) -> Result<()> {
        if illness.trim().is_empty() {
            return Err(Error::Validation("Illness cannot be empty".into()));
        }

        let history = self.registry.fetch_history(patient)?;
        let prescription = self.registry.fetch_prescription(patient, illness)?;

        self.state = SessionState {
            revision: Some(Revision {
                patient: patient.clone(),
                illness: illness.to_string(),
                history,
                prescription,
            }),
            ..SessionState::default()
        };

        tracing::info!("Revision started for patient {} ({})", patient, illness);
        Ok(())
    }

    /// Append the doctor's assessment to the medical history
    pub fn record_assessment(&mut self, assessment: &str) -> Result<()> {
        let revision = self.revision_mut("enter assessment")?;
        if assessment.trim().is_empty() {
            return Err(Error::Validation("Assessment cannot be empty".into()));
        }

        revision.history.add_annotation(assessment);
        Ok(())
    }

    pub fn begin_edition(&mut self) -> Result<()> {
        self.revision_mut("begin prescription edition")?;

        self.state.edition_active = true;
        self.state.edition_finished = false;
        tracing::info!("Prescription edition started");
        Ok(())
    }

    // ========================================================================
    // Decision-support AI
    // ========================================================================

    pub fn consult_ai(&mut self) -> Result<()> {
        self.require_edition("call the AI")?;

        self.advisor.initialize()?;
        self.state.ai_ready = true;
        tracing::info!("Decision-support AI ready");
        Ok(())
    }

    /// Forward a prompt to the AI; the answer is kept for `extract_suggestions`
    pub fn ask_ai(&mut self, prompt: &str) -> Result<String> {
        self.require_ai("ask the AI")?;
        if prompt.trim().is_empty() {
            return Err(Error::Validation("Prompt cannot be empty".into()));
        }

        let answer = self.advisor.ask(prompt)?;
        self.state.last_ai_response = Some(answer.clone());
        tracing::debug!("AI answered with {} chars", answer.len());
        Ok(answer)
    }

    /// Parse the last AI answer into suggestions for the doctor to review
    ///
    /// Never changes the prescription.
    pub fn extract_suggestions(&self) -> Result<Vec<Suggestion>> {
        self.require_ai("extract suggestions")?;
        let answer = self.state.last_ai_response.as_deref().ok_or_else(|| {
            Error::Procedural("Cannot extract suggestions: the AI has not answered yet".into())
        })?;

        Ok(self.advisor.parse(answer))
    }

    // ========================================================================
    // Prescription lines
    // ========================================================================

    pub fn add_line<S: AsRef<str>>(&mut self, product: &ProductId, raw: &[S]) -> Result<()> {
        self.require_edition("add a line")?;
        self.revision_mut("add a line")?
            .prescription
            .add_line(product, raw)?;
        self.invalidate_signature();
        Ok(())
    }

    pub fn modify_dose(&mut self, product: &ProductId, new_dose: f64) -> Result<()> {
        self.require_edition("modify a dose")?;
        if !(new_dose.is_finite() && new_dose > 0.0) {
            return Err(Error::Validation(format!(
                "Dose must be positive, got {}",
                new_dose
            )));
        }

        self.revision_mut("modify a dose")?
            .prescription
            .modify_dose(product, new_dose)?;
        self.invalidate_signature();
        Ok(())
    }

    pub fn remove_line(&mut self, product: &ProductId) -> Result<()> {
        self.require_edition("remove a line")?;
        self.revision_mut("remove a line")?
            .prescription
            .remove_line(product)?;
        self.invalidate_signature();
        Ok(())
    }

    // ========================================================================
    // Closing the prescription
    // ========================================================================

    /// Set the treatment ending date; the prescription date becomes "now"
    pub fn set_ending_date(&mut self, date: DateTime<Utc>) -> Result<()> {
        self.require_edition("set the ending date")?;

        let now = (self.clock)();
        self.apply_dates(now, date)
    }

    /// Set the ending date `span` after the same "now" used as prescription date
    pub fn set_ending_date_in(&mut self, span: Duration) -> Result<DateTime<Utc>> {
        self.require_edition("set the ending date")?;

        let now = (self.clock)();
        let date = now.checked_add_signed(span).ok_or_else(|| {
            Error::Validation(format!("Treatment span of {} is out of range", span))
        })?;
        self.apply_dates(now, date)?;
        Ok(date)
    }

    fn apply_dates(&mut self, now: DateTime<Utc>, date: DateTime<Utc>) -> Result<()> {
        validate_ending_date(date, now)?;

        self.revision_mut("set the ending date")?
            .prescription
            .set_dates(now, date);
        self.state.dates_set = true;
        self.invalidate_signature();
        tracing::info!("Treatment dates set: {} to {}", now, date);
        Ok(())
    }

    pub fn finish_edition(&mut self) -> Result<()> {
        self.require_edition("finish the edition")?;

        self.state.edition_active = false;
        self.state.edition_finished = true;
        tracing::info!("Prescription edition finished");
        Ok(())
    }

    /// Attach the doctor's signature to the prescription
    pub fn stamp_signature(&mut self) -> Result<()> {
        self.check_signable().map_err(|e| Error::Signature(Box::new(e)))?;

        let revision = self.revision_mut("stamp the signature")?;
        let signature = sign(&revision.prescription).map_err(|e| Error::Signature(Box::new(e)))?;
        revision.prescription.set_signature(signature);

        self.state.signature_stamped = true;
        tracing::info!("Signature stamped");
        Ok(())
    }

    /// Send history and prescription to the registry
    ///
    /// On success the working prescription is replaced by the registry's
    /// finalized copy and the revision stays open with every later phase
    /// cleared.
    pub fn transmit(&mut self) -> Result<&MedicalPrescription> {
        if !self.state.edition_begun() {
            return Err(Error::Procedural(
                "Cannot transmit: prescription edition not initialized".into(),
            ));
        }
        if !self.state.dates_set {
            return Err(Error::Procedural(
                "Cannot transmit: treatment dates not set".into(),
            ));
        }
        if !self.state.signature_stamped {
            return Err(Error::Procedural(
                "Cannot transmit: signature not stamped".into(),
            ));
        }

        let revision = self
            .state
            .revision
            .as_mut()
            .ok_or_else(|| Error::Procedural("Cannot transmit: revision not initialized".into()))?;

        let finalized = self.registry.submit(
            &revision.patient,
            &revision.history,
            &revision.illness,
            &revision.prescription,
        )?;

        tracing::info!(
            "Prescription transmitted for {} with code {}",
            revision.patient,
            finalized
                .issued_code()
                .map(|c| c.as_str())
                .unwrap_or("<none>")
        );
        revision.prescription = finalized;

        self.state.edition_active = false;
        self.state.edition_finished = false;
        self.state.ai_ready = false;
        self.state.dates_set = false;
        self.state.signature_stamped = false;
        self.state.last_ai_response = None;

        Ok(&revision.prescription)
    }

    // ========================================================================
    // Precondition helpers
    // ========================================================================

    fn revision_mut(&mut self, operation: &str) -> Result<&mut Revision> {
        self.state.revision.as_mut().ok_or_else(|| {
            tracing::debug!("Rejected '{}': no revision", operation);
            Error::Procedural(format!("Cannot {}: revision not initialized", operation))
        })
    }

    fn require_edition(&self, operation: &str) -> Result<()> {
        if !self.state.edition_active {
            tracing::debug!("Rejected '{}': edition not active", operation);
            return Err(Error::Procedural(format!(
                "Cannot {}: prescription edition not initialized",
                operation
            )));
        }
        Ok(())
    }

    fn require_ai(&self, operation: &str) -> Result<()> {
        self.require_edition(operation)?;
        if !self.state.ai_ready {
            return Err(Error::Procedural(format!(
                "Cannot {}: AI not initialized, call the AI first",
                operation
            )));
        }
        Ok(())
    }

    /// A signature only covers the prescription it was computed over
    fn invalidate_signature(&mut self) {
        if !self.state.signature_stamped {
            return;
        }
        if let Some(revision) = self.state.revision.as_mut() {
            revision.prescription.clear_signature();
        }
        self.state.signature_stamped = false;
        tracing::info!("Prescription changed after signing, signature dropped");
    }

    fn check_signable(&self) -> Result<()> {
        if !self.state.edition_begun() {
            return Err(Error::Procedural(
                "prescription edition not initialized".into(),
            ));
        }
        if !self.state.dates_set {
            return Err(Error::Procedural("treatment dates not set".into()));
        }
        Ok(())
    }
}

/// Reject ending dates less than one full day after `now`
pub fn validate_ending_date(date: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
    if date <= now {
        return Err(Error::EndingDate(format!(
            "{} is not after the current date {}",
            date, now
        )));
    }
    if date - now < minimum_treatment_span() {
        return Err(Error::EndingDate(format!(
            "{} is less than one day after {}",
            date, now
        )));
    }
    Ok(())
}

// Placeholder signature: no cryptography, just a stable digest of who signed what
fn sign(prescription: &MedicalPrescription) -> Result<DigitalSignature> {
    let dated = prescription
        .prescription_date()
        .ok_or_else(|| Error::Procedural("prescription date missing".into()))?;

    let payload = format!(
        "{}|{}|{}|{}",
        prescription.membership_number(),
        prescription.patient(),
        prescription.illness(),
        dated.to_rfc3339()
    );
    DigitalSignature::new(payload.as_bytes())
}
