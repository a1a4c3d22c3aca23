use std::collections::VecDeque;
use std::fmt;

use crate::model::{Difficulty, Question, QuestionId};

/// One of the four difficulty-keyed queues a question can wait in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    New,
    Hard,
    Medium,
    Easy,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [Bucket::New, Bucket::Hard, Bucket::Medium, Bucket::Easy];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::New => "new",
            Bucket::Hard => "hard",
            Bucket::Medium => "medium",
            Bucket::Easy => "easy",
        }
    }
}

/// A rating always lands in a rated bucket; nothing returns to `new`.
impl From<Difficulty> for Bucket {
    fn from(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Bucket::Easy,
            Difficulty::Medium => Bucket::Medium,
            Difficulty::Hard => Bucket::Hard,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four FIFO queues, oldest-enqueued first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buckets {
    new: VecDeque<Question>,
    hard: VecDeque<Question>,
    medium: VecDeque<Question>,
    easy: VecDeque<Question>,
}

impl Buckets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, bucket: Bucket) -> &VecDeque<Question> {
        match bucket {
            Bucket::New => &self.new,
            Bucket::Hard => &self.hard,
            Bucket::Medium => &self.medium,
            Bucket::Easy => &self.easy,
        }
    }

    fn get_mut(&mut self, bucket: Bucket) -> &mut VecDeque<Question> {
        match bucket {
            Bucket::New => &mut self.new,
            Bucket::Hard => &mut self.hard,
            Bucket::Medium => &mut self.medium,
            Bucket::Easy => &mut self.easy,
        }
    }

    pub fn push_back(&mut self, bucket: Bucket, question: Question) {
        self.get_mut(bucket).push_back(question);
    }

    pub fn pop_front(&mut self, bucket: Bucket) -> Option<Question> {
        self.get_mut(bucket).pop_front()
    }

    /// Remove a question by identity from whichever bucket holds it.
    pub fn remove(&mut self, question_id: QuestionId) -> Option<(Bucket, Question)> {
        for bucket in Bucket::ALL {
            let queue = self.get_mut(bucket);
            if let Some(pos) = queue.iter().position(|q| q.id() == question_id) {
                return queue.remove(pos).map(|q| (bucket, q));
            }
        }
        None
    }

    #[must_use]
    pub fn locate(&self, question_id: QuestionId) -> Option<Bucket> {
        Bucket::ALL
            .into_iter()
            .find(|bucket| self.get(*bucket).iter().any(|q| q.id() == question_id))
    }

    #[must_use]
    pub fn len_of(&self, bucket: Bucket) -> usize {
        self.get(bucket).len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        Bucket::ALL.into_iter().map(|b| self.len_of(b)).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        Bucket::ALL.into_iter().all(|b| self.get(b).is_empty())
    }

    /// Every question id across all buckets, in bucket then queue order.
    pub fn ids(&self) -> impl Iterator<Item = QuestionId> + '_ {
        Bucket::ALL
            .into_iter()
            .flat_map(move |b| self.get(b).iter().map(Question::id))
    }
}
