//! Dosage model: when, how much and how often a medicine is taken.
//!
//! This module also owns the boundary parser that turns the flat raw form
//! `[dayMoment, duration, dose, frequency, frequencyUnit, instructions]`
//! (as typed by a doctor or proposed by the AI) into a `TakingGuideline`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of leading raw fields a guideline needs
pub const RAW_GUIDELINE_FIELDS: usize = 6;

// ============================================================================
// Enumerations
// ============================================================================

/// Meal-relative moment of the day for taking a medicine
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum DayMoment {
    BeforeBreakfast,
    DuringBreakfast,
    AfterBreakfast,
    BeforeLunch,
    DuringLunch,
    AfterLunch,
    BeforeDinner,
    DuringDinner,
    AfterDinner,
    BeforeMeals,
    DuringMeals,
    AfterMeals,
}

impl DayMoment {
    pub const ALL: [DayMoment; 12] = [
        DayMoment::BeforeBreakfast,
        DayMoment::DuringBreakfast,
        DayMoment::AfterBreakfast,
        DayMoment::BeforeLunch,
        DayMoment::DuringLunch,
        DayMoment::AfterLunch,
        DayMoment::BeforeDinner,
        DayMoment::DuringDinner,
        DayMoment::AfterDinner,
        DayMoment::BeforeMeals,
        DayMoment::DuringMeals,
        DayMoment::AfterMeals,
    ];

    /// Wire token, e.g. `BEFORELUNCH`
    pub fn as_token(self) -> &'static str {
        match self {
            DayMoment::BeforeBreakfast => "BEFOREBREAKFAST",
            DayMoment::DuringBreakfast => "DURINGBREAKFAST",
            DayMoment::AfterBreakfast => "AFTERBREAKFAST",
            DayMoment::BeforeLunch => "BEFORELUNCH",
            DayMoment::DuringLunch => "DURINGLUNCH",
            DayMoment::AfterLunch => "AFTERLUNCH",
            DayMoment::BeforeDinner => "BEFOREDINNER",
            DayMoment::DuringDinner => "DURINGDINNER",
            DayMoment::AfterDinner => "AFTERDINNER",
            DayMoment::BeforeMeals => "BEFOREMEALS",
            DayMoment::DuringMeals => "DURINGMEALS",
            DayMoment::AfterMeals => "AFTERMEALS",
        }
    }

    /// Exact, case-sensitive lookup of a wire token
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_token() == token)
    }
}

impl fmt::Display for DayMoment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Unit the posology frequency is expressed in
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum FrequencyUnit {
    Hour,
    Day,
    Week,
    Month,
}

impl FrequencyUnit {
    pub fn as_token(self) -> &'static str {
        match self {
            FrequencyUnit::Hour => "HOUR",
            FrequencyUnit::Day => "DAY",
            FrequencyUnit::Week => "WEEK",
            FrequencyUnit::Month => "MONTH",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "HOUR" => Some(FrequencyUnit::Hour),
            "DAY" => Some(FrequencyUnit::Day),
            "WEEK" => Some(FrequencyUnit::Week),
            "MONTH" => Some(FrequencyUnit::Month),
            _ => None,
        }
    }
}

impl fmt::Display for FrequencyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

// ============================================================================
// Posology
// ============================================================================

/// Dose, frequency and frequency unit
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Posology {
    dose: f64,
    frequency: f64,
    frequency_unit: FrequencyUnit,
}

impl Posology {
    pub fn new(dose: f64, frequency: f64, frequency_unit: FrequencyUnit) -> Result<Self> {
        if !is_positive(dose) {
            return Err(Error::Validation(format!("Dose must be positive, got {}", dose)));
        }
        if !is_positive(frequency) {
            return Err(Error::Validation(format!(
                "Frequency must be positive, got {}",
                frequency
            )));
        }

        Ok(Self {
            dose,
            frequency,
            frequency_unit,
        })
    }

    pub fn dose(&self) -> f64 {
        self.dose
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn frequency_unit(&self) -> FrequencyUnit {
        self.frequency_unit
    }

    /// Revise the dose; the old dose is kept when the new one is rejected
    pub fn set_dose(&mut self, dose: f64) -> Result<()> {
        if !is_positive(dose) {
            return Err(Error::Validation(format!("Dose must be positive, got {}", dose)));
        }
        self.dose = dose;
        Ok(())
    }
}

// ============================================================================
// Taking guideline
// ============================================================================

/// Complete instructions for taking one medicine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TakingGuideline {
    day_moment: DayMoment,
    /// Treatment length in days
    duration: f64,
    posology: Posology,
    instructions: String,
}

impl TakingGuideline {
    pub fn new(
        day_moment: DayMoment,
        duration: f64,
        posology: Posology,
        instructions: impl Into<String>,
    ) -> Result<Self> {
        let instructions = instructions.into();
        if !is_positive(duration) {
            return Err(Error::Validation(format!(
                "Duration must be positive, got {}",
                duration
            )));
        }
        if instructions.trim().is_empty() {
            return Err(Error::Validation("Instructions cannot be empty".into()));
        }

        Ok(Self {
            day_moment,
            duration,
            posology,
            instructions,
        })
    }

    /// Parse the raw six-field form
    ///
    /// Fields: `[dayMoment, duration, dose, frequency, frequencyUnit, instructions]`.
    /// Anything past the sixth field is ignored. Every failure is reported as
    /// `Error::Guideline`.
    pub fn from_raw<S: AsRef<str>>(raw: &[S]) -> Result<Self> {
        if raw.len() < RAW_GUIDELINE_FIELDS {
            return Err(Error::Guideline(format!(
                "Expected at least {} fields [dayMoment, duration, dose, freq, freqUnit, instructions], got {}",
                RAW_GUIDELINE_FIELDS,
                raw.len()
            )));
        }

        let day_moment = parse_day_moment(raw[0].as_ref())?;
        let duration = parse_positive("duration", raw[1].as_ref())?;
        let dose = parse_positive("dose", raw[2].as_ref())?;
        let frequency = parse_positive("frequency", raw[3].as_ref())?;
        let frequency_unit = parse_frequency_unit(raw[4].as_ref())?;
        let instructions = raw[5].as_ref();
        if instructions.trim().is_empty() {
            return Err(Error::Guideline("Instructions cannot be empty".into()));
        }

        let posology = Posology::new(dose, frequency, frequency_unit)
            .map_err(|e| Error::Guideline(e.to_string()))?;
        TakingGuideline::new(day_moment, duration, posology, instructions)
            .map_err(|e| Error::Guideline(e.to_string()))
    }

    pub fn day_moment(&self) -> DayMoment {
        self.day_moment
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn posology(&self) -> &Posology {
        &self.posology
    }

    pub fn posology_mut(&mut self) -> &mut Posology {
        &mut self.posology
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Back to the raw six-field form
    pub fn to_raw(&self) -> [String; RAW_GUIDELINE_FIELDS] {
        [
            self.day_moment.as_token().to_string(),
            self.duration.to_string(),
            self.posology.dose.to_string(),
            self.posology.frequency.to_string(),
            self.posology.frequency_unit.as_token().to_string(),
            self.instructions.clone(),
        ]
    }
}

pub(crate) fn parse_day_moment(token: &str) -> Result<DayMoment> {
    DayMoment::from_token(token)
        .ok_or_else(|| Error::Guideline(format!("Unknown day moment '{}'", token)))
}

pub(crate) fn parse_frequency_unit(token: &str) -> Result<FrequencyUnit> {
    FrequencyUnit::from_token(token)
        .ok_or_else(|| Error::Guideline(format!("Unknown frequency unit '{}'", token)))
}

pub(crate) fn parse_positive(field: &str, token: &str) -> Result<f64> {
    let value: f64 = token
        .trim()
        .parse()
        .map_err(|_| Error::Guideline(format!("{} '{}' is not a number", field, token)))?;

    if !is_positive(value) {
        return Err(Error::Guideline(format!(
            "{} must be positive, got '{}'",
            field, token
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_raw_builds_guideline() {
        let guideline =
            TakingGuideline::from_raw(&["BEFORELUNCH", "15", "1", "1", "DAY", "Take with water"])
                .unwrap();

        assert_eq!(guideline.day_moment(), DayMoment::BeforeLunch);
        assert_eq!(guideline.duration(), 15.0);
        assert_eq!(guideline.posology().dose(), 1.0);
        assert_eq!(guideline.posology().frequency(), 1.0);
        assert_eq!(guideline.posology().frequency_unit(), FrequencyUnit::Day);
        assert_eq!(guideline.instructions(), "Take with water");
    }

    #[test]
    fn test_from_raw_ignores_trailing_fields() {
        let fields = raw(&["AFTERDINNER", "7", "0.5", "8", "HOUR", "With food", "", "extra"]);
        let guideline = TakingGuideline::from_raw(&fields).unwrap();
        assert_eq!(guideline.posology().dose(), 0.5);
        assert_eq!(guideline.posology().frequency_unit(), FrequencyUnit::Hour);
    }

    #[test]
    fn test_from_raw_rejects_short_input() {
        let result = TakingGuideline::from_raw(&["BEFORELUNCH", "15", "1", "1", "DAY"]);
        assert!(matches!(result, Err(Error::Guideline(_))));
    }

    #[test]
    fn test_day_moment_is_case_sensitive() {
        let result =
            TakingGuideline::from_raw(&["beforelunch", "15", "1", "1", "DAY", "Take with water"]);
        assert!(matches!(result, Err(Error::Guideline(_))));
    }

    #[test]
    fn test_unknown_frequency_unit() {
        let result =
            TakingGuideline::from_raw(&["BEFORELUNCH", "15", "1", "1", "YEAR", "Take with water"]);
        assert!(matches!(result, Err(Error::Guideline(_))));
    }

    #[test]
    fn test_non_positive_and_non_numeric_fields() {
        let cases = [
            ["BEFORELUNCH", "0", "1", "1", "DAY", "x"],
            ["BEFORELUNCH", "15", "-1", "1", "DAY", "x"],
            ["BEFORELUNCH", "15", "1", "0", "DAY", "x"],
            ["BEFORELUNCH", "abc", "1", "1", "DAY", "x"],
            ["BEFORELUNCH", "15", "NaN", "1", "DAY", "x"],
            ["BEFORELUNCH", "15", "1", "inf", "DAY", "x"],
        ];
        for case in cases {
            let result = TakingGuideline::from_raw(&case);
            assert!(
                matches!(result, Err(Error::Guideline(_))),
                "expected guideline error for {:?}",
                case
            );
        }
    }

    #[test]
    fn test_blank_instructions_rejected() {
        let result = TakingGuideline::from_raw(&["BEFORELUNCH", "15", "1", "1", "DAY", "   "]);
        assert!(matches!(result, Err(Error::Guideline(_))));
    }

    #[test]
    fn test_set_dose_keeps_old_value_on_error() {
        let mut posology = Posology::new(2.0, 1.0, FrequencyUnit::Day).unwrap();
        assert!(posology.set_dose(0.0).is_err());
        assert_eq!(posology.dose(), 2.0);

        posology.set_dose(3.0).unwrap();
        assert_eq!(posology.dose(), 3.0);
    }

    #[test]
    fn test_every_day_moment_token_resolves() {
        for moment in DayMoment::ALL {
            assert_eq!(DayMoment::from_token(moment.as_token()), Some(moment));
        }
    }

    #[test]
    fn test_to_raw_parses_back() {
        let guideline =
            TakingGuideline::from_raw(&["DURINGMEALS", "30", "2", "1", "WEEK", "Chew"]).unwrap();
        let again = TakingGuideline::from_raw(&guideline.to_raw()).unwrap();
        assert_eq!(guideline, again);
    }
}
