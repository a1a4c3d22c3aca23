use super::machine::SessionPhase;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub phase: SessionPhase,
    pub new: usize,
    pub hard: usize,
    pub medium: usize,
    pub easy: usize,
    /// Drawn questions queued behind the current one.
    pub upcoming: usize,
    pub new_streak: u32,
    pub new_questions_answered: u32,
    pub ratings_given: usize,
    pub rating_in_flight: bool,
}

impl SessionProgress {
    /// Questions still sitting in buckets.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.new + self.hard + self.medium + self.easy
    }

    /// True while the learner may not submit another rating.
    #[must_use]
    pub fn rating_locked(&self) -> bool {
        self.rating_in_flight || self.phase != SessionPhase::Revealed
    }
}
