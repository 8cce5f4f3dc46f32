//! Scripted decision-support advisor.
//!
//! Answers every acceptable prompt with a canned text, either read from the
//! configured response file or the built-in default below. Useful for
//! workstations without a live AI and for exercising the suggestion flow.

use crate::config::AdvisorConfig;
use crate::services::DecisionSupport;
use crate::{parse_suggestions, Error, Result, Suggestion};
use std::path::PathBuf;

/// Answer used when no response file is configured
pub const DEFAULT_ANSWER: &str = "Based on your query, I recommend the following adjustments:\n\
1. Add paracetamol before lunch, one tablet a day for 15 days\n\
   <I, 243516578917, BEFORELUNCH, 15, 1, 1, DAY, Take with plenty of water>\n\
2. Raise the ibuprofen dose to 3 tablets\n\
   <M, 640557143200, , , 3, , , >\n\
3. Remove aspirin from the treatment\n\
   <E, 789012345678>\n";

/// Advisor replying from a fixed script
pub struct ScriptedAdvisor {
    response_file: Option<PathBuf>,
    min_prompt_words: usize,
    answer: Option<String>,
}

impl ScriptedAdvisor {
    pub fn new(config: &AdvisorConfig) -> Self {
        Self {
            response_file: config.response_file.clone(),
            min_prompt_words: config.min_prompt_words,
            answer: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.answer.is_some()
    }
}

impl DecisionSupport for ScriptedAdvisor {
    fn initialize(&mut self) -> Result<()> {
        let answer = match &self.response_file {
            Some(path) => std::fs::read_to_string(path).map_err(|e| {
                Error::AiSystem(format!("cannot load script {:?}: {}", path, e))
            })?,
            None => DEFAULT_ANSWER.to_string(),
        };

        tracing::info!("Scripted advisor loaded ({} chars)", answer.len());
        self.answer = Some(answer);
        Ok(())
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        let answer = self
            .answer
            .as_ref()
            .ok_or_else(|| Error::AiSystem("advisor not initialized".into()))?;

        let words = prompt.split_whitespace().count();
        if words < self.min_prompt_words {
            return Err(Error::BadPrompt(format!(
                "prompt too vague ({} words, need at least {})",
                words, self.min_prompt_words
            )));
        }

        Ok(answer.clone())
    }

    fn parse(&self, answer: &str) -> Vec<Suggestion> {
        parse_suggestions(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SuggestionAction;

    fn config() -> AdvisorConfig {
        AdvisorConfig::default()
    }

    #[test]
    fn test_default_script_yields_three_suggestions() {
        let mut advisor = ScriptedAdvisor::new(&config());
        advisor.initialize().unwrap();

        let answer = advisor.ask("adjust the treatment please").unwrap();
        let actions: Vec<_> = advisor.parse(&answer).iter().map(|s| s.action()).collect();
        assert_eq!(
            actions,
            vec![
                SuggestionAction::Insert,
                SuggestionAction::Modify,
                SuggestionAction::Eliminate
            ]
        );
    }

    #[test]
    fn test_short_prompt_is_bad_prompt() {
        let mut advisor = ScriptedAdvisor::new(&config());
        advisor.initialize().unwrap();

        assert!(matches!(advisor.ask("help"), Err(Error::BadPrompt(_))));
    }

    #[test]
    fn test_missing_script_fails_initialization() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = AdvisorConfig {
            response_file: Some(temp_dir.path().join("missing.txt")),
            ..AdvisorConfig::default()
        };

        let mut advisor = ScriptedAdvisor::new(&config);
        assert!(matches!(advisor.initialize(), Err(Error::AiSystem(_))));
        assert!(!advisor.is_initialized());
    }

    #[test]
    fn test_script_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("answer.txt");
        std::fs::write(&path, "Stop it: <E, 789012345678>").unwrap();

        let config = AdvisorConfig {
            response_file: Some(path),
            ..AdvisorConfig::default()
        };
        let mut advisor = ScriptedAdvisor::new(&config);
        advisor.initialize().unwrap();

        let answer = advisor.ask("what should be removed").unwrap();
        let suggestions = advisor.parse(&answer);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].action(), SuggestionAction::Eliminate);
    }
}
