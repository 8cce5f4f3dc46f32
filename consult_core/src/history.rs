//! Patient medical history.

use crate::HealthCardId;
use serde::{Deserialize, Serialize};

/// Append-only clinical log of a patient
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MedicalHistory {
    patient: HealthCardId,
    membership_number: u32,
    history: String,
}

impl MedicalHistory {
    pub fn new(patient: HealthCardId, membership_number: u32) -> Self {
        Self {
            patient,
            membership_number,
            history: String::new(),
        }
    }

    /// Append an annotation as a new line; earlier text is never touched
    pub fn add_annotation(&mut self, annotation: &str) {
        self.history.push_str(annotation);
        self.history.push('\n');
        tracing::debug!(
            "Appended {} chars to history of {}",
            annotation.len(),
            self.patient
        );
    }

    /// Reassign the patient to another doctor
    pub fn set_new_doctor(&mut self, membership_number: u32) {
        self.membership_number = membership_number;
    }

    pub fn patient(&self) -> &HealthCardId {
        &self.patient
    }

    pub fn membership_number(&self) -> u32 {
        self.membership_number
    }

    pub fn history(&self) -> &str {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient() -> HealthCardId {
        HealthCardId::new("1234567890ABCDEF").unwrap()
    }

    #[test]
    fn test_new_history_is_empty() {
        let history = MedicalHistory::new(patient(), 12345);
        assert_eq!(history.history(), "");
        assert_eq!(history.membership_number(), 12345);
    }

    #[test]
    fn test_annotations_are_appended_in_order() {
        let mut history = MedicalHistory::new(patient(), 12345);
        history.add_annotation("Blood pressure stable");
        history.add_annotation("Mild headache reported");

        assert_eq!(
            history.history(),
            "Blood pressure stable\nMild headache reported\n"
        );
    }

    #[test]
    fn test_reassign_doctor() {
        let mut history = MedicalHistory::new(patient(), 12345);
        history.set_new_doctor(999);
        assert_eq!(history.membership_number(), 999);
        assert_eq!(history.patient(), &patient());
    }
}
