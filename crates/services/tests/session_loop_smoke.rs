use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use study_core::model::{
    Difficulty, Question, QuestionId, QuestionSetId, ReviewSettings, StudyPlan, StudyPlanId,
};
use study_core::time::fixed_now;
use services::{Clock, SessionError, SessionLoopService, SessionPhase};
use storage::repository::{
    InMemoryRepository, ProgressPersistence, QuestionBankRepository, QuestionSupply,
    RecordedRating, StorageError,
};

const PLAN: StudyPlanId = StudyPlanId::new(1);

fn question(id: u64) -> Question {
    Question::new(
        QuestionId::new(id),
        format!("Q{id}"),
        vec!["right".into(), "wrong".into()],
        0,
        Some(format!("page {id}")),
    )
    .unwrap()
}

async fn seeded_repo(count: u64) -> InMemoryRepository {
    let repo = InMemoryRepository::new().with_clock(Clock::fixed(fixed_now()));
    let plan = StudyPlan::new(PLAN, QuestionSetId::new(1), "Smoke Set");
    repo.upsert_plan(&plan).await.unwrap();
    for id in 1..=count {
        repo.upsert_question(plan.question_set_id(), &question(id))
            .await
            .unwrap();
    }
    repo
}

fn service(repo: &InMemoryRepository) -> SessionLoopService {
    SessionLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    )
}

fn assert_partition(ids: &[QuestionId], expected: usize) {
    let unique: HashSet<_> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len(), "question held twice");
    assert_eq!(ids.len(), expected, "question missing");
}

/// Persistence double that always fails and counts attempts.
struct FailingPersistence {
    calls: AtomicUsize,
}

#[async_trait]
impl ProgressPersistence for FailingPersistence {
    async fn record_rating(
        &self,
        _plan_id: StudyPlanId,
        _question_id: QuestionId,
        _rating: Difficulty,
    ) -> Result<RecordedRating, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Connection("offline".into()))
    }
}

#[tokio::test]
async fn session_loop_persists_each_rating() {
    let repo = seeded_repo(3).await;
    let loop_svc = service(&repo);

    let mut session = loop_svc.start_session(PLAN).await.unwrap();
    for rating in [Difficulty::Easy, Difficulty::Hard, Difficulty::Medium] {
        session.select(0).unwrap();
        assert!(session.reveal().unwrap());
        let result = loop_svc.rate_current(&mut session, rating).await.unwrap();
        assert_eq!(result.persisted.difficulty, Some(rating));
        assert_eq!(result.persisted.review_count, 1);
        assert!(!session.is_rating_in_flight());
        assert_partition(&session.question_ids(), 3);
    }

    let summary = loop_svc.finish(&mut session).unwrap();
    assert_eq!(summary.total_ratings(), 3);
    assert_eq!(summary.new_questions_answered(), 3);
    assert_eq!(summary.plan_stats().reviewed, 3);

    let stored = repo.fetch_review_questions(PLAN).await.unwrap();
    assert_eq!(stored.new.len(), 0);
    assert_eq!(stored.easy.len(), 1);
    assert_eq!(stored.hard.len(), 1);
    assert_eq!(stored.medium.len(), 1);
}

#[tokio::test]
async fn failed_persistence_surfaces_error_without_rollback() {
    let repo = seeded_repo(2).await;
    let failing = Arc::new(FailingPersistence {
        calls: AtomicUsize::new(0),
    });
    let loop_svc =
        SessionLoopService::new(Clock::fixed(fixed_now()), Arc::new(repo.clone()), failing.clone());

    let mut session = loop_svc.start_session(PLAN).await.unwrap();
    session.select(1).unwrap();
    assert!(!session.reveal().unwrap());

    let err = loop_svc
        .rate_current(&mut session, Difficulty::Hard)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::PersistenceFailure(_)));
    assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
    assert!(session.last_error().unwrap().contains("offline"));
    assert!(!session.is_rating_in_flight());
    assert_eq!(session.phase(), SessionPhase::Presenting);
    assert_eq!(session.current().unwrap().id(), QuestionId::new(2));
    assert_eq!(session.ratings().len(), 1);
    assert_eq!(session.progress().hard, 1);

    // The store never saw the rating; a reload shows the persisted truth.
    loop_svc.reload(&mut session).await.unwrap();
    assert_eq!(session.progress().hard, 0);
    assert_eq!(session.progress().new, 1);
    assert_eq!(session.current().unwrap().id(), QuestionId::new(1));
}

#[tokio::test]
async fn missing_plan_is_unavailable_until_reload() {
    let repo = InMemoryRepository::new();
    let loop_svc = service(&repo);

    let mut session = loop_svc.new_session(PLAN);
    let err = loop_svc.reload(&mut session).await.unwrap_err();
    assert!(matches!(err, SessionError::SupplyUnavailable(StorageError::NotFound)));
    assert_eq!(session.phase(), SessionPhase::Unavailable);

    let plan = StudyPlan::new(PLAN, QuestionSetId::new(1), "Late Set");
    repo.upsert_plan(&plan).await.unwrap();
    let err = loop_svc.reload(&mut session).await.unwrap_err();
    assert!(matches!(err, SessionError::NoQuestions));

    repo.upsert_question(plan.question_set_id(), &question(1))
        .await
        .unwrap();
    loop_svc.reload(&mut session).await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Presenting);
}

#[tokio::test]
async fn hard_questions_resurface_every_third_new_answer() {
    let repo = seeded_repo(20).await;
    let loop_svc = service(&repo);
    let mut session = loop_svc.start_session(PLAN).await.unwrap();

    let mut presented = Vec::new();
    for _ in 0..8 {
        let id = session.current().unwrap().id();
        presented.push(id.value());
        session.select(0).unwrap();
        session.reveal().unwrap();
        let rating = match id.value() {
            1 => Difficulty::Hard,
            2 => Difficulty::Medium,
            _ => Difficulty::Easy,
        };
        loop_svc.rate_current(&mut session, rating).await.unwrap();
        assert_partition(&session.question_ids(), 20);
    }

    // Every third new answer pulls q1 back from `hard`, restarting the streak.
    assert_eq!(presented, vec![1, 2, 3, 1, 4, 5, 6, 1]);
    assert_eq!(session.progress().new_streak, 0);
}

#[tokio::test]
async fn session_limit_stops_after_configured_ratings() {
    let repo = seeded_repo(5).await;
    let settings = ReviewSettings::default().with_session_limit(Some(2)).unwrap();
    let loop_svc = service(&repo).with_settings(settings);

    let mut session = loop_svc.start_session(PLAN).await.unwrap();
    for _ in 0..2 {
        session.select(0).unwrap();
        session.reveal().unwrap();
        loop_svc
            .rate_current(&mut session, Difficulty::Medium)
            .await
            .unwrap();
    }

    assert!(session.is_finished());
    assert_eq!(session.summary().unwrap().total_ratings(), 2);
    let err = loop_svc
        .rate_current(&mut session, Difficulty::Easy)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Finished));
}
