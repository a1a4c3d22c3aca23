use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{Difficulty, Question, QuestionId, StudyPlan};
use crate::scheduler::{Bucket, Buckets, SchedulerState};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QueueError {
    #[error("no questions available for this study plan")]
    NoQuestions,
}

//
// ─── SUPPLY SHAPE ──────────────────────────────────────────────────────────────
//

/// A question as delivered by the supply service, with its last-known review state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplyEntry {
    pub question: Question,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub difficulty_level: Option<String>,
}

impl SupplyEntry {
    #[must_use]
    pub fn unreviewed(question: Question) -> Self {
        Self {
            question,
            last_reviewed: None,
            difficulty_level: None,
        }
    }

    #[must_use]
    pub fn reviewed(
        question: Question,
        last_reviewed: DateTime<Utc>,
        difficulty_level: Option<Difficulty>,
    ) -> Self {
        Self {
            question,
            last_reviewed: Some(last_reviewed),
            difficulty_level: difficulty_level.map(|d| d.as_str().to_owned()),
        }
    }
}

/// Full response of the supply service for one plan.
///
/// The four arrays are labelled by difficulty but may overlap and may disagree
/// with `last_reviewed`; `QueueBuilder` reconciles them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewQuestions {
    pub new: Vec<SupplyEntry>,
    pub hard: Vec<SupplyEntry>,
    pub medium: Vec<SupplyEntry>,
    pub easy: Vec<SupplyEntry>,
    pub plan: StudyPlan,
}

impl ReviewQuestions {
    #[must_use]
    pub fn empty(plan: StudyPlan) -> Self {
        Self {
            new: Vec::new(),
            hard: Vec::new(),
            medium: Vec::new(),
            easy: Vec::new(),
            plan,
        }
    }

    #[must_use]
    pub fn total_entries(&self) -> usize {
        self.new.len() + self.hard.len() + self.medium.len() + self.easy.len()
    }
}

//
// ─── CLASSIFICATION ────────────────────────────────────────────────────────────
//

/// Where a supplied question belongs, decided by its review timestamp first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No review timestamp: always `new`, whatever label it carries.
    Unreviewed,
    /// Reviewed with a recognised difficulty label.
    Rated(Difficulty),
    /// Reviewed but the label is missing or unrecognised. Defaults to `medium`.
    DefaultMedium { label: Option<String> },
}

impl Classification {
    #[must_use]
    pub fn bucket(&self) -> Bucket {
        match self {
            Classification::Unreviewed => Bucket::New,
            Classification::Rated(difficulty) => Bucket::from(*difficulty),
            Classification::DefaultMedium { .. } => Bucket::Medium,
        }
    }
}

/// Classify a supplied question by `last_reviewed`, not by the array it came from.
#[must_use]
pub fn classify(last_reviewed: Option<DateTime<Utc>>, label: Option<&str>) -> Classification {
    if last_reviewed.is_none() {
        return Classification::Unreviewed;
    }
    match label.map(str::parse::<Difficulty>) {
        Some(Ok(difficulty)) => Classification::Rated(difficulty),
        Some(Err(_)) => Classification::DefaultMedium {
            label: label.map(str::to_owned),
        },
        None => Classification::DefaultMedium { label: None },
    }
}

//
// ─── BUILDER ───────────────────────────────────────────────────────────────────
//

/// Reconciles supplied arrays into canonical buckets, first occurrence wins.
#[derive(Debug, Default)]
pub struct QueueBuilder {
    seen: HashSet<QuestionId>,
    buckets: Buckets,
    last_reviewed: HashMap<QuestionId, DateTime<Utc>>,
    duplicates_skipped: usize,
}

impl QueueBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one supplied entry. Returns `None` when the question was already seen.
    pub fn push(&mut self, entry: SupplyEntry) -> Option<Classification> {
        let id = entry.question.id();
        if !self.seen.insert(id) {
            self.duplicates_skipped += 1;
            return None;
        }

        let classification = classify(entry.last_reviewed, entry.difficulty_level.as_deref());
        if let Classification::DefaultMedium { label } = &classification {
            log::warn!("question {id} reviewed without a usable difficulty ({label:?}); using medium");
        }
        if let Some(at) = entry.last_reviewed {
            self.last_reviewed.insert(id, at);
        }
        self.buckets.push_back(classification.bucket(), entry.question);
        Some(classification)
    }

    #[must_use]
    pub fn duplicates_skipped(&self) -> usize {
        self.duplicates_skipped
    }

    /// Finish building and hand the buckets to a fresh scheduler state.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::NoQuestions` if no entry was accepted.
    pub fn build(self, plan: StudyPlan) -> Result<SchedulerState, QueueError> {
        if self.buckets.is_empty() {
            return Err(QueueError::NoQuestions);
        }
        log::debug!(
            "queue built for plan {}: new={} hard={} medium={} easy={} (skipped {} duplicates)",
            plan.id(),
            self.buckets.len_of(Bucket::New),
            self.buckets.len_of(Bucket::Hard),
            self.buckets.len_of(Bucket::Medium),
            self.buckets.len_of(Bucket::Easy),
            self.duplicates_skipped,
        );
        Ok(SchedulerState::new(plan, self.buckets, self.last_reviewed))
    }

    /// Build from a whole supply response, reading `new`, `hard`, `medium`, `easy` in that order.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::NoQuestions` if the response holds no questions.
    pub fn from_supply(supplied: ReviewQuestions) -> Result<SchedulerState, QueueError> {
        log::debug!(
            "supply for plan {} returned {} entries",
            supplied.plan.id(),
            supplied.total_entries()
        );
        let ReviewQuestions {
            new,
            hard,
            medium,
            easy,
            plan,
        } = supplied;

        let mut builder = Self::new();
        for entry in new.into_iter().chain(hard).chain(medium).chain(easy) {
            builder.push(entry);
        }
        builder.build(plan)
    }
}
