use std::time::Duration;

use spacey_core::model::{
    BadgeTier, ChoiceOption, EarnedBadge, FeedbackEntry, Lesson, LessonProgress, LessonSlug,
    MediaPath, Question, QuestionBank, QuestionId, Section, SectionId, UserId,
};
use spacey_core::time::fixed_now;
use storage::repository::{
    BadgeRepository, FeedbackRepository, LessonRepository, ProgressRepository, QuizRepository,
};
use storage::sqlite::SqliteRepository;

fn slug() -> LessonSlug {
    LessonSlug::new("build-your-own-satellite").unwrap()
}

fn user() -> UserId {
    UserId::new("uid-1").unwrap()
}

fn build_lesson() -> Lesson {
    Lesson::new(
        slug(),
        "Build Your Own Satellite",
        Some("Design a satellite from scratch".into()),
        vec![
            Section::AudioText {
                id: SectionId::new("s1").unwrap(),
                text: "Welcome to mission control.".into(),
                audio_path: Some(MediaPath::new("audio/welcome.mp3").unwrap()),
            },
            Section::Text {
                id: SectionId::new("s2").unwrap(),
                content: "A satellite needs power, comms, and a payload.".into(),
                speak: true,
            },
            Section::Image {
                id: SectionId::new("s3").unwrap(),
                path: MediaPath::new("images/cubesat.png").unwrap(),
                caption: Some("A 1U CubeSat".into()),
                duration: Duration::from_millis(7000),
            },
        ],
    )
    .unwrap()
}

fn build_bank() -> QuestionBank {
    QuestionBank::new(
        slug(),
        Some("Satellite Quiz".into()),
        vec![
            Question::MultipleChoice {
                id: QuestionId::new("q1").unwrap(),
                text: "Which force keeps a satellite in orbit?".into(),
                options: vec![
                    ChoiceOption {
                        id: "a".into(),
                        text: "Gravity".into(),
                        is_correct: true,
                    },
                    ChoiceOption {
                        id: "b".into(),
                        text: "Magnetism".into(),
                        is_correct: false,
                    },
                ],
                explanation: "Gravity provides the centripetal force.".into(),
            },
            Question::Open {
                id: QuestionId::new("q2").unwrap(),
                text: "What is a payload?".into(),
                explanation: "The instruments the satellite carries.".into(),
            },
        ],
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrips_lesson_sections_in_order() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_lessons?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let lesson = build_lesson();
    repo.upsert_lesson(&lesson).await.unwrap();

    let fetched = repo.get_lesson(&slug()).await.unwrap().expect("lesson");
    assert_eq!(fetched, lesson);
    assert_eq!(fetched.sections()[2].kind(), lesson.sections()[2].kind());

    // Replacing the document drops removed sections.
    let trimmed = Lesson::new(
        slug(),
        "Build Your Own Satellite",
        None,
        vec![lesson.sections()[0].clone()],
    )
    .unwrap();
    repo.upsert_lesson(&trimmed).await.unwrap();
    let fetched = repo.get_lesson(&slug()).await.unwrap().expect("lesson");
    assert_eq!(fetched.total_sections(), 1);

    let summaries = repo.list_lessons(10).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].total_sections, 1);
}

#[tokio::test]
async fn sqlite_roundtrips_question_bank() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_quiz?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let bank = build_bank();
    repo.upsert_bank(&bank).await.unwrap();

    let fetched = repo.get_bank(&slug()).await.unwrap().expect("bank");
    assert_eq!(fetched, bank);

    let missing = LessonSlug::new("unknown-lesson").unwrap();
    assert!(repo.get_bank(&missing).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_progress_merges_on_doc_id() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_progress?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let first = LessonProgress::new(user(), slug(), "Satellites", 2, 12, fixed_now()).unwrap();
    repo.upsert_progress(&first).await.unwrap();

    let later = fixed_now() + chrono::Duration::seconds(30);
    let second = LessonProgress::new(user(), slug(), "Satellites", 7, 12, later).unwrap();
    repo.upsert_progress(&second).await.unwrap();

    let fetched = repo
        .get_progress(&user(), &slug())
        .await
        .unwrap()
        .expect("progress");
    assert_eq!(fetched.last_section_index(), 7);
    assert_eq!(fetched.percentage(), 58);

    let listed = repo.list_progress_for_user(&user()).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn sqlite_badges_are_idempotent_and_feedback_appends() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_badges?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let badge = EarnedBadge::new(
        user(),
        slug(),
        BadgeTier::StarVoyager,
        "Satellite Quiz",
        fixed_now(),
    );
    repo.upsert_badge(&badge).await.unwrap();
    repo.upsert_badge(&badge).await.unwrap();

    let badges = repo.list_badges_for_user(&user()).await.unwrap();
    assert_eq!(badges.len(), 1);
    assert_eq!(badges[0].tier, BadgeTier::StarVoyager);

    let entry = FeedbackEntry::new(Some(user()), "Great lesson!", 5, fixed_now()).unwrap();
    let first_id = repo.append_feedback(&entry).await.unwrap();
    let second_id = repo.append_feedback(&entry).await.unwrap();
    assert!(second_id > first_id);
}
