use crate::model::{Question, ReviewSettings};
use crate::scheduler::{Bucket, Buckets};

/// Questions produced for one presentation slot, with the milestones that fired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOutput {
    pub questions: Vec<Question>,
    pub inserted_hard_milestone: bool,
    pub inserted_medium_milestone: bool,
}

impl StreamOutput {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// True when the streak that produced this output should be reset.
    #[must_use]
    pub fn milestone_fired(&self) -> bool {
        self.inserted_hard_milestone || self.inserted_medium_milestone
    }
}

/// Deterministic interleaving of new questions with previously rated ones.
///
/// On each call, in this order:
/// 1. a positive streak divisible by the hard interval pulls the head of `hard`;
/// 2. a positive streak divisible by the medium interval pulls the head of `medium`;
/// 3. the head of `new` is pulled if there is one;
/// 4. if nothing was pulled, the first non-empty of `hard`, `medium`, `easy` gives one.
///
/// Milestones are checked before the new pull, so a due milestone question is
/// never skipped because a new question is also available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamGenerator {
    hard_every: u32,
    medium_every: u32,
}

impl StreamGenerator {
    #[must_use]
    pub fn new(settings: &ReviewSettings) -> Self {
        Self {
            hard_every: settings.hard_milestone_every(),
            medium_every: settings.medium_milestone_every(),
        }
    }

    /// Remove and return the next question(s) to present.
    ///
    /// An empty output means every bucket is exhausted.
    pub fn produce_next(&self, buckets: &mut Buckets, streak: u32) -> StreamOutput {
        let mut out = StreamOutput::default();

        if is_milestone(streak, self.hard_every) {
            if let Some(q) = buckets.pop_front(Bucket::Hard) {
                out.questions.push(q);
                out.inserted_hard_milestone = true;
            }
        }

        if is_milestone(streak, self.medium_every) {
            if let Some(q) = buckets.pop_front(Bucket::Medium) {
                out.questions.push(q);
                out.inserted_medium_milestone = true;
            }
        }

        if let Some(q) = buckets.pop_front(Bucket::New) {
            out.questions.push(q);
        } else if out.questions.is_empty() {
            let fallback = [Bucket::Hard, Bucket::Medium, Bucket::Easy]
                .into_iter()
                .find_map(|bucket| buckets.pop_front(bucket));
            out.questions.extend(fallback);
        }

        out
    }
}

impl Default for StreamGenerator {
    fn default() -> Self {
        Self::new(&ReviewSettings::default())
    }
}

/// `produce_next` with the default milestone intervals (hard every 3, medium every 5).
pub fn produce_next(buckets: &mut Buckets, streak: u32) -> StreamOutput {
    StreamGenerator::default().produce_next(buckets, streak)
}

fn is_milestone(streak: u32, every: u32) -> bool {
    streak > 0 && every > 0 && streak % every == 0
}
