use crate::model::{Difficulty, QuestionProgress};

/// Totals over every recorded rating in a plan.
///
/// `reviewed` counts records with a review timestamp; the three difficulty
/// totals count records by their latest rating, so `easy + medium + hard` can be
/// lower than `reviewed` when a reviewed record carries no label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressStats {
    pub reviewed: u32,
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

impl ProgressStats {
    #[must_use]
    pub fn from_progress<'a>(records: impl IntoIterator<Item = &'a QuestionProgress>) -> Self {
        let mut stats = Self::default();
        for record in records {
            if record.is_reviewed() {
                stats.reviewed = stats.reviewed.saturating_add(1);
            }
            match record.difficulty {
                Some(Difficulty::Easy) => stats.easy = stats.easy.saturating_add(1),
                Some(Difficulty::Medium) => stats.medium = stats.medium.saturating_add(1),
                Some(Difficulty::Hard) => stats.hard = stats.hard.saturating_add(1),
                None => {}
            }
        }
        stats
    }

    #[must_use]
    pub fn count(&self, difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionId;
    use crate::time::fixed_now;

    #[test]
    fn aggregates_latest_ratings() {
        let now = fixed_now();
        let records = vec![
            QuestionProgress::first_rating(QuestionId::new(1), Difficulty::Easy, now),
            QuestionProgress::first_rating(QuestionId::new(2), Difficulty::Hard, now),
            QuestionProgress::first_rating(QuestionId::new(3), Difficulty::Hard, now)
                .rated(Difficulty::Medium, now),
            QuestionProgress::from_persisted(QuestionId::new(4), None, Some(now), 1),
            QuestionProgress::from_persisted(QuestionId::new(5), None, None, 0),
        ];

        let stats = ProgressStats::from_progress(&records);

        assert_eq!(stats.reviewed, 4);
        assert_eq!(stats.easy, 1);
        assert_eq!(stats.medium, 1);
        assert_eq!(stats.hard, 1);
        assert_eq!(stats.count(Difficulty::Hard), 1);
    }

    #[test]
    fn empty_plan_has_zero_totals() {
        assert_eq!(ProgressStats::from_progress(&[]), ProgressStats::default());
    }
}
