//! Typed AI suggestions.
//!
//! The AI answers in free text. Suggestions inside that text follow the
//! pattern `<ACTION, productId, fields...>`:
//!
//! - `<I, 243516578917, BEFORELUNCH, 15, 1, 1, DAY, Take with water>` inserts a line
//! - `<M, 640557143200, , , 3, , , >` changes only the non-empty positions
//! - `<E, 789012345678>` eliminates a line
//!
//! Suggestions are only modelled here. Applying one is a decision the doctor
//! takes through the normal editing operations.

use crate::dosage::{
    parse_day_moment, parse_frequency_unit, parse_positive, RAW_GUIDELINE_FIELDS,
};
use crate::{DayMoment, Error, FrequencyUnit, Posology, ProductId, Result, TakingGuideline};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of change the AI proposes
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionAction {
    Insert,
    Eliminate,
    Modify,
}

impl SuggestionAction {
    /// Accepts the one-letter pattern form (`I`, `E`, `M`) or the full name
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "I" | "INSERT" => Some(SuggestionAction::Insert),
            "E" | "ELIMINATE" => Some(SuggestionAction::Eliminate),
            "M" | "MODIFY" => Some(SuggestionAction::Modify),
            _ => None,
        }
    }
}

impl fmt::Display for SuggestionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestionAction::Insert => f.write_str("INSERT"),
            SuggestionAction::Eliminate => f.write_str("ELIMINATE"),
            SuggestionAction::Modify => f.write_str("MODIFY"),
        }
    }
}

// ============================================================================
// Guideline patch
// ============================================================================

/// Sparse set of guideline fields a MODIFY suggestion wants changed
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct GuidelinePatch {
    pub day_moment: Option<DayMoment>,
    pub duration: Option<f64>,
    pub dose: Option<f64>,
    pub frequency: Option<f64>,
    pub frequency_unit: Option<FrequencyUnit>,
    pub instructions: Option<String>,
}

impl GuidelinePatch {
    /// Parse the sparse six-position form; empty positions stay unchanged
    pub fn from_raw<S: AsRef<str>>(raw: &[S]) -> Result<Self> {
        if raw.len() < RAW_GUIDELINE_FIELDS {
            return Err(Error::Guideline(format!(
                "Expected {} positions in a modification, got {}",
                RAW_GUIDELINE_FIELDS,
                raw.len()
            )));
        }

        Ok(Self {
            day_moment: non_empty(&raw[0]).map(parse_day_moment).transpose()?,
            duration: non_empty(&raw[1])
                .map(|v| parse_positive("duration", v))
                .transpose()?,
            dose: non_empty(&raw[2])
                .map(|v| parse_positive("dose", v))
                .transpose()?,
            frequency: non_empty(&raw[3])
                .map(|v| parse_positive("frequency", v))
                .transpose()?,
            frequency_unit: non_empty(&raw[4]).map(parse_frequency_unit).transpose()?,
            instructions: non_empty(&raw[5]).map(str::to_string),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.day_moment.is_none()
            && self.duration.is_none()
            && self.dose.is_none()
            && self.frequency.is_none()
            && self.frequency_unit.is_none()
            && self.instructions.is_none()
    }

    /// Merge into an existing guideline and validate the result
    pub fn apply_to(&self, current: &TakingGuideline) -> Result<TakingGuideline> {
        let posology = current.posology();
        let posology = Posology::new(
            self.dose.unwrap_or(posology.dose()),
            self.frequency.unwrap_or(posology.frequency()),
            self.frequency_unit.unwrap_or(posology.frequency_unit()),
        )?;

        TakingGuideline::new(
            self.day_moment.unwrap_or(current.day_moment()),
            self.duration.unwrap_or(current.duration()),
            posology,
            self.instructions
                .clone()
                .unwrap_or_else(|| current.instructions().to_string()),
        )
    }
}

fn non_empty<S: AsRef<str>>(value: &S) -> Option<&str> {
    let value = value.as_ref().trim();
    (!value.is_empty()).then_some(value)
}

// ============================================================================
// Suggestion
// ============================================================================

/// One change proposed by the AI
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Suggestion {
    Insert {
        product: ProductId,
        guideline: TakingGuideline,
    },
    Modify {
        product: ProductId,
        patch: GuidelinePatch,
    },
    Eliminate {
        product: ProductId,
    },
}

impl Suggestion {
    /// Build a suggestion from its raw parts
    ///
    /// INSERT needs the full six fields, MODIFY the sparse six positions,
    /// ELIMINATE ignores any fields.
    pub fn from_raw<S: AsRef<str>>(
        action: SuggestionAction,
        product: ProductId,
        fields: Option<&[S]>,
    ) -> Result<Self> {
        match action {
            SuggestionAction::Insert => {
                let fields = fields.ok_or_else(|| {
                    Error::Guideline("INSERT suggestion without guidelines".into())
                })?;
                Ok(Suggestion::Insert {
                    product,
                    guideline: TakingGuideline::from_raw(fields)?,
                })
            }
            SuggestionAction::Modify => {
                let fields = fields.ok_or_else(|| {
                    Error::Guideline("MODIFY suggestion without guidelines".into())
                })?;
                Ok(Suggestion::Modify {
                    product,
                    patch: GuidelinePatch::from_raw(fields)?,
                })
            }
            SuggestionAction::Eliminate => Ok(Suggestion::Eliminate { product }),
        }
    }

    pub fn action(&self) -> SuggestionAction {
        match self {
            Suggestion::Insert { .. } => SuggestionAction::Insert,
            Suggestion::Modify { .. } => SuggestionAction::Modify,
            Suggestion::Eliminate { .. } => SuggestionAction::Eliminate,
        }
    }

    pub fn product(&self) -> &ProductId {
        match self {
            Suggestion::Insert { product, .. }
            | Suggestion::Modify { product, .. }
            | Suggestion::Eliminate { product } => product,
        }
    }
}

/// Extract every `<ACTION, productId, ...>` suggestion from an AI answer
///
/// Best effort: malformed patterns are logged and skipped, never fatal.
pub fn parse_suggestions(text: &str) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else {
            tracing::warn!("Unterminated suggestion pattern in AI answer");
            break;
        };

        let body = &after[..end];
        match parse_pattern(body) {
            Ok(suggestion) => suggestions.push(suggestion),
            Err(e) => tracing::warn!("Skipping suggestion <{}>: {}", body, e),
        }
        rest = &after[end + 1..];
    }

    tracing::debug!("Parsed {} suggestions from AI answer", suggestions.len());
    suggestions
}

fn parse_pattern(body: &str) -> Result<Suggestion> {
    let tokens: Vec<&str> = body.split(',').map(str::trim).collect();
    if tokens.len() < 2 {
        return Err(Error::Validation("pattern needs an action and a product".into()));
    }

    let action = SuggestionAction::from_token(tokens[0])
        .ok_or_else(|| Error::Validation(format!("unknown action '{}'", tokens[0])))?;
    let product = ProductId::new(tokens[1])?;

    let fields = &tokens[2..];
    if action == SuggestionAction::Eliminate {
        return Suggestion::from_raw::<&str>(action, product, None);
    }

    // Instructions are free text and may themselves contain commas
    let mut raw: Vec<String> = fields.iter().take(5).map(|s| s.to_string()).collect();
    if fields.len() > 5 {
        raw.push(fields[5..].join(", "));
    }
    Suggestion::from_raw(action, product, Some(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(code: &str) -> ProductId {
        ProductId::new(code).unwrap()
    }

    #[test]
    fn test_insert_requires_complete_guideline() {
        let ok = Suggestion::from_raw(
            SuggestionAction::Insert,
            product("243516578917"),
            Some(&["BEFORELUNCH", "15", "1", "1", "DAY", "Take with water"][..]),
        )
        .unwrap();
        assert_eq!(ok.action(), SuggestionAction::Insert);

        let missing =
            Suggestion::from_raw::<&str>(SuggestionAction::Insert, product("243516578917"), None);
        assert!(matches!(missing, Err(Error::Guideline(_))));
    }

    #[test]
    fn test_modify_keeps_only_changed_fields() {
        let s = Suggestion::from_raw(
            SuggestionAction::Modify,
            product("640557143200"),
            Some(&["", "", "3", "", "", ""][..]),
        )
        .unwrap();

        let Suggestion::Modify { patch, .. } = s else {
            panic!("expected a modify suggestion");
        };
        assert_eq!(patch.dose, Some(3.0));
        assert!(patch.day_moment.is_none());
        assert!(patch.instructions.is_none());
    }

    #[test]
    fn test_patch_apply_merges_and_revalidates() {
        let current =
            TakingGuideline::from_raw(&["BEFORELUNCH", "15", "1", "1", "DAY", "Take with water"])
                .unwrap();

        let patch = GuidelinePatch::from_raw(&["", "", "3", "", "WEEK", ""]).unwrap();
        let merged = patch.apply_to(&current).unwrap();
        assert_eq!(merged.posology().dose(), 3.0);
        assert_eq!(merged.posology().frequency_unit(), FrequencyUnit::Week);
        assert_eq!(merged.day_moment(), DayMoment::BeforeLunch);
        assert_eq!(merged.instructions(), "Take with water");

        assert!(GuidelinePatch::from_raw(&["", "", "0", "", "", ""]).is_err());
        assert!(GuidelinePatch::from_raw(&["", "", "", "", "", ""]).unwrap().is_empty());
    }

    #[test]
    fn test_parse_suggestions_from_text() {
        let answer = "Based on your query I recommend:\n\
            <I, 243516578917, BEFORELUNCH, 15, 1, 1, DAY, Take with water, not juice>\n\
            <M, 640557143200, , , 3, , , >\n\
            <E, 789012345678>\n";

        let suggestions = parse_suggestions(answer);
        assert_eq!(suggestions.len(), 3);

        assert_eq!(suggestions[0].action(), SuggestionAction::Insert);
        let Suggestion::Insert { guideline, .. } = &suggestions[0] else {
            panic!("expected insert");
        };
        assert_eq!(guideline.instructions(), "Take with water, not juice");

        assert_eq!(suggestions[1].action(), SuggestionAction::Modify);
        assert_eq!(suggestions[2].action(), SuggestionAction::Eliminate);
        assert_eq!(suggestions[2].product(), &product("789012345678"));
    }

    #[test]
    fn test_parse_skips_malformed_patterns() {
        let answer = "<X, 243516578917> <I, short, BEFORELUNCH> <E, 789012345678> <I, 243516578917";
        let suggestions = parse_suggestions(answer);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].action(), SuggestionAction::Eliminate);
    }

    #[test]
    fn test_plain_text_yields_nothing() {
        assert!(parse_suggestions("Keep the current treatment.").is_empty());
    }
}
