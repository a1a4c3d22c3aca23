use chrono::Duration;
use study_core::Clock;
use study_core::model::{
    Difficulty, Question, QuestionId, QuestionProgress, QuestionSetId, StudyPlan, StudyPlanId,
};
use study_core::time::fixed_now;
use storage::repository::{
    ProgressPersistence, QuestionBankRepository, QuestionSupply, StorageError,
};
use storage::sqlite::SqliteRepository;

fn question(id: u64) -> Question {
    Question::new(
        QuestionId::new(id),
        format!("Question {id}?"),
        vec!["first".into(), "second".into(), "third".into()],
        2,
        Some(format!("chapter {id}")),
    )
    .unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url)
        .await
        .expect("connect")
        .with_clock(Clock::fixed(fixed_now()));
    repo.migrate().await.expect("migrate");
    repo
}

async fn seed(repo: &SqliteRepository, questions: u64) -> StudyPlan {
    let plan = StudyPlan::new(StudyPlanId::new(1), QuestionSetId::new(3), "Physics");
    repo.upsert_plan(&plan).await.unwrap();
    for id in 1..=questions {
        repo.upsert_question(plan.question_set_id(), &question(id))
            .await
            .unwrap();
    }
    plan
}

#[tokio::test]
async fn sqlite_roundtrips_questions_in_id_order() {
    let repo = connect("memdb_questions").await;
    seed(&repo, 3).await;

    let fetched = repo.questions_for_set(QuestionSetId::new(3)).await.unwrap();

    assert_eq!(fetched.len(), 3);
    assert_eq!(fetched[0], question(1));
    assert_eq!(fetched[2].options().len(), 3);
    assert_eq!(fetched[2].citation(), Some("chapter 3"));
}

#[tokio::test]
async fn sqlite_record_rating_overwrites_single_record() {
    let repo = connect("memdb_ratings").await;
    seed(&repo, 2).await;

    let first = repo
        .record_rating(StudyPlanId::new(1), QuestionId::new(2), Difficulty::Hard)
        .await
        .unwrap();
    assert_eq!(first.progress.review_count, 1);
    assert_eq!(first.progress.difficulty, Some(Difficulty::Hard));

    let second = repo
        .record_rating(StudyPlanId::new(1), QuestionId::new(2), Difficulty::Medium)
        .await
        .unwrap();
    assert_eq!(second.progress.review_count, 2);
    assert_eq!(second.progress.last_reviewed, Some(fixed_now()));
    assert_eq!(second.plan.progress().len(), 1);
    assert_eq!(second.plan.question_set_name(), "Physics");
}

#[tokio::test]
async fn sqlite_supply_groups_by_stored_difficulty() {
    let repo = connect("memdb_supply").await;
    let plan = seed(&repo, 4).await;

    let earlier = fixed_now() - Duration::days(2);
    let plan = plan.with_progress([
        QuestionProgress::from_persisted(QuestionId::new(1), Some(Difficulty::Hard), Some(earlier), 3),
        QuestionProgress::from_persisted(QuestionId::new(2), Some(Difficulty::Easy), Some(earlier), 1),
        QuestionProgress::from_persisted(QuestionId::new(3), None, Some(earlier), 1),
    ]);
    repo.upsert_plan(&plan).await.unwrap();

    let supplied = repo.fetch_review_questions(plan.id()).await.unwrap();

    assert_eq!(supplied.hard.len(), 1);
    assert_eq!(supplied.easy.len(), 1);
    assert_eq!(supplied.medium.len(), 1);
    assert_eq!(supplied.medium[0].difficulty_level, None);
    assert_eq!(supplied.new.len(), 1);
    assert_eq!(supplied.new[0].question.id(), QuestionId::new(4));
    assert_eq!(supplied.hard[0].last_reviewed, Some(earlier));
    assert_eq!(supplied.plan.progress().len(), 3);
}

#[tokio::test]
async fn sqlite_rejects_unknown_plan_and_foreign_question() {
    let repo = connect("memdb_missing").await;
    seed(&repo, 1).await;

    let err = repo
        .fetch_review_questions(StudyPlanId::new(99))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let err = repo
        .record_rating(StudyPlanId::new(1), QuestionId::new(50), Difficulty::Easy)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let err = repo
        .upsert_question(QuestionSetId::new(77), &question(9))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_keeps_question_in_its_original_set() {
    let repo = connect("memdb_move").await;
    seed(&repo, 2).await;
    let other = StudyPlan::new(StudyPlanId::new(2), QuestionSetId::new(4), "Optics");
    repo.upsert_plan(&other).await.unwrap();

    let err = repo
        .upsert_question(other.question_set_id(), &question(2))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let physics = repo.questions_for_set(QuestionSetId::new(3)).await.unwrap();
    let optics = repo.questions_for_set(QuestionSetId::new(4)).await.unwrap();
    assert_eq!(physics.len(), 2);
    assert!(optics.is_empty());

    let supplied = repo.fetch_review_questions(StudyPlanId::new(1)).await.unwrap();
    assert_eq!(supplied.total_entries(), 2);
}
