mod difficulty;
mod ids;
mod plan;
mod progress;
mod question;
mod session;
mod settings;
mod stats;

pub use ids::{ParseIdError, QuestionId, QuestionSetId, StudyPlanId};

pub use difficulty::{Difficulty, DifficultyError};
pub use plan::StudyPlan;
pub use progress::QuestionProgress;
pub use question::{Question, QuestionError};
pub use session::{SessionRating, SessionSummary, SessionSummaryError};
pub use settings::{ReviewSettings, ReviewSettingsError};
pub use stats::ProgressStats;
