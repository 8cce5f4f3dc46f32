//! Medical prescription aggregate and its lines.
//!
//! A prescription holds at most one line per product. Lines are built from
//! the raw guideline form through `add_line`, which either inserts a fully
//! validated line or leaves the prescription untouched.

use crate::{
    DigitalSignature, Error, HealthCardId, PrescriptionCode, ProductId, Result, TakingGuideline,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One medicine entry: a product and how to take it
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionLine {
    pub product: ProductId,
    pub guideline: TakingGuideline,
}

/// Prescription for one patient and illness
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MedicalPrescription {
    patient: HealthCardId,
    membership_number: u32,
    illness: String,
    issued_code: Option<PrescriptionCode>,
    prescription_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    signature: Option<DigitalSignature>,
    lines: BTreeMap<ProductId, PrescriptionLine>,
}

impl MedicalPrescription {
    /// Create an empty prescription for an illness
    pub fn new(patient: HealthCardId, membership_number: u32, illness: &str) -> Result<Self> {
        if illness.trim().is_empty() {
            return Err(Error::Validation("Illness cannot be empty".into()));
        }

        Ok(Self {
            patient,
            membership_number,
            illness: illness.to_string(),
            issued_code: None,
            prescription_date: None,
            end_date: None,
            signature: None,
            lines: BTreeMap::new(),
        })
    }

    /// Validate a raw guideline and add it as a new line
    ///
    /// Fails with `DuplicateProduct` rather than overwriting an existing line.
    pub fn add_line<S: AsRef<str>>(&mut self, product: &ProductId, raw: &[S]) -> Result<()> {
        if self.lines.contains_key(product) {
            return Err(Error::DuplicateProduct(product.clone()));
        }

        let guideline = TakingGuideline::from_raw(raw)?;
        self.insert_line(product.clone(), guideline)
    }

    /// Add an already-built guideline as a new line
    pub fn insert_line(&mut self, product: ProductId, guideline: TakingGuideline) -> Result<()> {
        if self.lines.contains_key(&product) {
            return Err(Error::DuplicateProduct(product));
        }

        tracing::debug!("Adding line for product {} to '{}'", product, self.illness);
        self.lines
            .insert(product.clone(), PrescriptionLine { product, guideline });
        Ok(())
    }

    pub fn modify_dose(&mut self, product: &ProductId, new_dose: f64) -> Result<()> {
        let line = self
            .lines
            .get_mut(product)
            .ok_or_else(|| Error::ProductNotFound(product.clone()))?;

        line.guideline.posology_mut().set_dose(new_dose)
    }

    pub fn remove_line(&mut self, product: &ProductId) -> Result<PrescriptionLine> {
        self.lines
            .remove(product)
            .ok_or_else(|| Error::ProductNotFound(product.clone()))
    }

    pub fn line(&self, product: &ProductId) -> Option<&PrescriptionLine> {
        self.lines.get(product)
    }

    pub fn lines(&self) -> impl Iterator<Item = &PrescriptionLine> {
        self.lines.values()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn set_dates(&mut self, prescription_date: DateTime<Utc>, end_date: DateTime<Utc>) {
        self.prescription_date = Some(prescription_date);
        self.end_date = Some(end_date);
    }

    pub fn set_signature(&mut self, signature: DigitalSignature) {
        self.signature = Some(signature);
    }

    /// Drop the signature, returning it if one was attached
    pub fn clear_signature(&mut self) -> Option<DigitalSignature> {
        self.signature.take()
    }

    pub fn set_issued_code(&mut self, code: PrescriptionCode) {
        self.issued_code = Some(code);
    }

    /// Signature and both dates are present
    pub fn is_complete(&self) -> bool {
        self.signature.is_some() && self.prescription_date.is_some() && self.end_date.is_some()
    }

    pub fn patient(&self) -> &HealthCardId {
        &self.patient
    }

    pub fn membership_number(&self) -> u32 {
        self.membership_number
    }

    pub fn illness(&self) -> &str {
        &self.illness
    }

    pub fn issued_code(&self) -> Option<&PrescriptionCode> {
        self.issued_code.as_ref()
    }

    pub fn prescription_date(&self) -> Option<DateTime<Utc>> {
        self.prescription_date
    }

    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }

    pub fn signature(&self) -> Option<&DigitalSignature> {
        self.signature.as_ref()
    }
}
