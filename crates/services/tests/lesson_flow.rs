//! End-to-end lesson playback: orchestrator + player + debounced progress,
//! over in-memory storage and fake backends.

mod support;

use std::sync::Arc;
use std::time::Duration;

use services::auth::SessionContext;
use services::lesson_loop::LessonLoopService;
use spacey_core::model::{
    Lesson, LessonSlug, MediaPath, Section, SectionId, UserId, UserProfile,
};
use spacey_core::time::fixed_clock;
use storage::media::InMemoryMediaStore;
use storage::repository::{InMemoryRepository, LessonRepository, ProgressRepository};
use support::SilentSink;

fn slug() -> LessonSlug {
    LessonSlug::new("build-your-own-satellite").unwrap()
}

fn user_profile() -> UserProfile {
    UserProfile {
        id: UserId::new("uid-1").unwrap(),
        email: "ada@example.org".into(),
        display_name: Some("Ada".into()),
        photo_url: None,
    }
}

fn timed_lesson(sections: usize) -> Lesson {
    let sections = (0..sections)
        .map(|i| Section::Text {
            id: SectionId::new(format!("s{i}")).unwrap(),
            content: format!("Step {i} of building your satellite."),
            speak: false,
        })
        .collect();
    Lesson::new(
        slug(),
        "Build Your Own Satellite",
        Some("Design a satellite from scratch".into()),
        sections,
    )
    .unwrap()
}

fn service(repo: &Arc<InMemoryRepository>) -> LessonLoopService {
    LessonLoopService::new(
        fixed_clock(),
        repo.clone(),
        repo.clone(),
        Arc::new(InMemoryMediaStore::new()),
        Arc::new(SilentSink),
        None,
    )
    .with_progress_debounce(Duration::from_millis(50))
}

#[tokio::test(start_paused = true)]
async fn twelve_sections_play_through_to_one_hundred_percent() {
    let repo = Arc::new(InMemoryRepository::new());
    repo.upsert_lesson(&timed_lesson(12)).await.unwrap();

    let session = SessionContext::new();
    session.set_user(user_profile());

    let mut run = service(&repo)
        .start(&slug(), session.watch())
        .await
        .unwrap();
    assert_eq!(run.orchestrator().index(), 0);
    assert!(!run.is_finished());

    run.run_to_end().await.unwrap();
    assert!(run.is_finished());
    assert_eq!(run.orchestrator().percentage(), 100);

    let stored = repo
        .get_progress(&UserId::new("uid-1").unwrap(), &slug())
        .await
        .unwrap()
        .expect("progress persisted");
    assert_eq!(stored.last_section_index(), 12);
    assert_eq!(stored.percentage(), 100);
    assert!(stored.is_finished());
}

#[tokio::test(start_paused = true)]
async fn broken_audio_section_is_skipped_not_stuck() {
    let repo = Arc::new(InMemoryRepository::new());
    let lesson = Lesson::new(
        slug(),
        "Build Your Own Satellite",
        None,
        vec![
            Section::Text {
                id: SectionId::new("s0").unwrap(),
                content: "Welcome.".into(),
                speak: false,
            },
            // Authoring error: narrated section without its audio reference.
            Section::AudioText {
                id: SectionId::new("s1").unwrap(),
                text: "This narration is missing its file.".into(),
                audio_path: None,
            },
            Section::Image {
                id: SectionId::new("s2").unwrap(),
                path: MediaPath::new("images/cubesat.png").unwrap(),
                caption: None,
                duration: Duration::from_millis(3000),
            },
        ],
    )
    .unwrap();
    repo.upsert_lesson(&lesson).await.unwrap();

    let session = SessionContext::new();
    session.set_user(user_profile());

    let mut run = service(&repo)
        .start(&slug(), session.watch())
        .await
        .unwrap();
    run.run_to_end().await.unwrap();

    assert!(run.is_finished());
    assert_eq!(run.orchestrator().index(), 3);
}

#[tokio::test(start_paused = true)]
async fn signed_out_runs_persist_nothing() {
    let repo = Arc::new(InMemoryRepository::new());
    repo.upsert_lesson(&timed_lesson(2)).await.unwrap();

    let session = SessionContext::new();
    let mut run = service(&repo)
        .start(&slug(), session.watch())
        .await
        .unwrap();
    run.run_to_end().await.unwrap();
    assert!(run.is_finished());

    let records = repo
        .list_progress_for_user(&UserId::new("uid-1").unwrap())
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test(start_paused = true)]
async fn manual_navigation_moves_both_ways_and_coalesces_writes() {
    let repo = Arc::new(InMemoryRepository::new());
    repo.upsert_lesson(&timed_lesson(5)).await.unwrap();

    let session = SessionContext::new();
    session.set_user(user_profile());

    let mut run = service(&repo)
        .start(&slug(), session.watch())
        .await
        .unwrap();

    run.next_section();
    run.next_section();
    run.previous_section();
    assert_eq!(run.orchestrator().index(), 1);

    // One quiet period later there is exactly one record, at the final index.
    tokio::time::sleep(Duration::from_millis(120)).await;
    let stored = repo
        .get_progress(&UserId::new("uid-1").unwrap(), &slug())
        .await
        .unwrap()
        .expect("progress persisted");
    assert_eq!(stored.last_section_index(), 1);
    assert_eq!(stored.percentage(), 20);
}

#[tokio::test]
async fn unknown_lesson_is_a_terminal_error() {
    let repo = Arc::new(InMemoryRepository::new());
    let session = SessionContext::new();
    let err = service(&repo)
        .start(&slug(), session.watch())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        services::error::LessonServiceError::NotFound(s) if s == slug()
    ));
}
