use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("a question needs at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("option {0} is blank")]
    BlankOption(usize),

    #[error("correct option {index} is out of range for {len} options")]
    CorrectIndexOutOfRange { index: usize, len: usize },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct_index: usize,
    citation: Option<String>,
}

impl Question {
    /// Builds a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt is blank, fewer than two options are given,
    /// any option is blank, or `correct_index` does not point at an option.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
        citation: Option<String>,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions(options.len()));
        }
        if let Some(blank) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::BlankOption(blank));
        }
        if correct_index >= options.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index: correct_index,
                len: options.len(),
            });
        }

        let citation = citation.filter(|c| !c.trim().is_empty());

        Ok(Self {
            id,
            prompt,
            options,
            correct_index,
            citation,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_index]
    }

    #[must_use]
    pub fn citation(&self) -> Option<&str> {
        self.citation.as_deref()
    }

    #[must_use]
    pub fn is_correct(&self, selected: usize) -> bool {
        selected == self.correct_index
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn rejects_blank_prompt() {
        let err = Question::new(QuestionId::new(1), "  ", opts(&["a", "b"]), 0, None).unwrap_err();
        assert_eq!(err, QuestionError::EmptyPrompt);
    }

    #[test]
    fn rejects_single_option() {
        let err = Question::new(QuestionId::new(1), "Q", opts(&["a"]), 0, None).unwrap_err();
        assert_eq!(err, QuestionError::TooFewOptions(1));
    }

    #[test]
    fn rejects_blank_option() {
        let err =
            Question::new(QuestionId::new(1), "Q", opts(&["a", " ", "c"]), 0, None).unwrap_err();
        assert_eq!(err, QuestionError::BlankOption(1));
    }

    #[test]
    fn rejects_out_of_range_answer() {
        let err = Question::new(QuestionId::new(1), "Q", opts(&["a", "b"]), 2, None).unwrap_err();
        assert_eq!(
            err,
            QuestionError::CorrectIndexOutOfRange { index: 2, len: 2 }
        );
    }

    #[test]
    fn checks_correctness_and_drops_blank_citation() {
        let q = Question::new(
            QuestionId::new(9),
            "Capital of France?",
            opts(&["Berlin", "Paris"]),
            1,
            Some("   ".into()),
        )
        .unwrap();

        assert!(q.is_correct(1));
        assert!(!q.is_correct(0));
        assert_eq!(q.correct_option(), "Paris");
        assert_eq!(q.citation(), None);
    }
}
