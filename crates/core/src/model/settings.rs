use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReviewSettingsError {
    #[error("hard milestone interval must be > 0")]
    InvalidHardMilestone,

    #[error("medium milestone interval must be > 0")]
    InvalidMediumMilestone,

    #[error("session limit must be > 0 when set")]
    InvalidSessionLimit,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Knobs for one review session.
///
/// A hard question is interleaved every `hard_milestone_every` new questions and a
/// medium one every `medium_milestone_every`. `session_limit` caps the number of
/// ratings before the session finishes on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewSettings {
    hard_milestone_every: u32,
    medium_milestone_every: u32,
    session_limit: Option<u32>,
}

impl ReviewSettings {
    pub const DEFAULT_HARD_MILESTONE: u32 = 3;
    pub const DEFAULT_MEDIUM_MILESTONE: u32 = 5;

    /// Creates custom review settings.
    ///
    /// # Errors
    ///
    /// Returns an error if either milestone interval is zero or the limit is `Some(0)`.
    pub fn new(
        hard_milestone_every: u32,
        medium_milestone_every: u32,
        session_limit: Option<u32>,
    ) -> Result<Self, ReviewSettingsError> {
        if hard_milestone_every == 0 {
            return Err(ReviewSettingsError::InvalidHardMilestone);
        }
        if medium_milestone_every == 0 {
            return Err(ReviewSettingsError::InvalidMediumMilestone);
        }
        if session_limit == Some(0) {
            return Err(ReviewSettingsError::InvalidSessionLimit);
        }

        Ok(Self {
            hard_milestone_every,
            medium_milestone_every,
            session_limit,
        })
    }

    /// Same settings with a different session limit.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSessionLimit` for `Some(0)`.
    pub fn with_session_limit(self, limit: Option<u32>) -> Result<Self, ReviewSettingsError> {
        Self::new(self.hard_milestone_every, self.medium_milestone_every, limit)
    }

    #[must_use]
    pub fn hard_milestone_every(&self) -> u32 {
        self.hard_milestone_every
    }

    #[must_use]
    pub fn medium_milestone_every(&self) -> u32 {
        self.medium_milestone_every
    }

    #[must_use]
    pub fn session_limit(&self) -> Option<u32> {
        self.session_limit
    }
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            hard_milestone_every: Self::DEFAULT_HARD_MILESTONE,
            medium_milestone_every: Self::DEFAULT_MEDIUM_MILESTONE,
            session_limit: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_three_and_five_without_limit() {
        let settings = ReviewSettings::default();
        assert_eq!(settings.hard_milestone_every(), 3);
        assert_eq!(settings.medium_milestone_every(), 5);
        assert_eq!(settings.session_limit(), None);
    }

    #[test]
    fn rejects_zero_values() {
        assert_eq!(
            ReviewSettings::new(0, 5, None),
            Err(ReviewSettingsError::InvalidHardMilestone)
        );
        assert_eq!(
            ReviewSettings::new(3, 0, None),
            Err(ReviewSettingsError::InvalidMediumMilestone)
        );
        assert_eq!(
            ReviewSettings::default().with_session_limit(Some(0)),
            Err(ReviewSettingsError::InvalidSessionLimit)
        );
    }
}
