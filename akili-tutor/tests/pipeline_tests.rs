/// Integration tests for the generation pipelines
///
/// Run with: cargo test -p akili-tutor --test pipeline_tests

mod common;

use akili_shared::models::course::{Course, CourseScope, ExamType};
use akili_shared::models::exam::CourseExam;
use akili_shared::models::module::Module;
use akili_shared::models::quiz::QuizAttempt;
use akili_shared::scoring::{score_answers, EXAM_PASS_PERCENTAGE};
use akili_tutor::fallback::CAPACITY_MESSAGE;
use akili_tutor::pipeline::{GenerationError, NewCourse, MODULE_COUNT};
use akili_tutor::providers::{ProviderError, ScriptedProvider};
use akili_tutor::validator::ValidationPolicy;
use common::{balance, modules_json, new_user, pipeline, questions_json, seeded_subject, test_pool};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn jamb(user_id: Uuid, subject: &str) -> NewCourse {
    NewCourse {
        user_id,
        subject: subject.to_string(),
        scope: CourseScope::Exam { exam_type: ExamType::Jamb },
    }
}

async fn course_exists(pool: &sqlx::PgPool, user_id: Uuid, subject: &str) -> bool {
    Course::find_duplicate(pool, user_id, subject, &CourseScope::Exam { exam_type: ExamType::Jamb })
        .await
        .unwrap()
        .is_some()
}

#[tokio::test]
async fn test_all_tiers_down_refunds_course() {
    let Some(pool) = test_pool().await else { return };
    let user = new_user(&pool, 10).await;
    let subject = seeded_subject(&pool).await;

    let flash = Arc::new(ScriptedProvider::new("gemini_flash").fail(ProviderError::Status(503)));
    let paid = Arc::new(
        ScriptedProvider::new("gemini_paid").fail(ProviderError::Timeout(Duration::from_secs(55))),
    );
    let groq = Arc::new(ScriptedProvider::new("groq").fail(ProviderError::Transport("reset".into())));
    let pipeline = pipeline(&pool, vec![flash.clone(), paid.clone(), groq.clone()], ValidationPolicy::FailOpen);

    let err = pipeline.create_course(jamb(user.id, &subject)).await.unwrap_err();

    match err {
        GenerationError::ProvidersExhausted(message) => assert_eq!(message, CAPACITY_MESSAGE),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!((flash.calls(), paid.calls(), groq.calls()), (1, 1, 1));
    assert_eq!(balance(&pool, user.id).await, 10);
    assert!(!course_exists(&pool, user.id, &subject).await);
}

#[tokio::test]
async fn test_unparseable_modules_refund_course() {
    let Some(pool) = test_pool().await else { return };
    let user = new_user(&pool, 10).await;
    let subject = seeded_subject(&pool).await;

    let flash = Arc::new(ScriptedProvider::new("gemini_flash").respond("Sure! Here are your modules:"));
    let pipeline = pipeline(&pool, vec![flash], ValidationPolicy::FailOpen);

    let err = pipeline.create_course(jamb(user.id, &subject)).await.unwrap_err();

    assert!(matches!(err, GenerationError::Parse(_)));
    assert_eq!(balance(&pool, user.id).await, 10);
    assert!(!course_exists(&pool, user.id, &subject).await);
}

#[tokio::test]
async fn test_short_module_list_refunds_course() {
    let Some(pool) = test_pool().await else { return };
    let user = new_user(&pool, 10).await;
    let subject = seeded_subject(&pool).await;

    let flash = Arc::new(ScriptedProvider::new("gemini_flash").respond(modules_json(6)));
    let pipeline = pipeline(&pool, vec![flash], ValidationPolicy::FailOpen);

    let err = pipeline.create_course(jamb(user.id, &subject)).await.unwrap_err();

    assert!(matches!(err, GenerationError::TooFewItems { got: 6, .. }));
    assert_eq!(balance(&pool, user.id).await, 10);
    assert!(!course_exists(&pool, user.id, &subject).await);
}

#[tokio::test]
async fn test_course_created_from_second_tier() {
    let Some(pool) = test_pool().await else { return };
    let user = new_user(&pool, 10).await;
    let subject = seeded_subject(&pool).await;

    let flash = Arc::new(ScriptedProvider::new("gemini_flash").fail(ProviderError::Status(429)));
    let groq = Arc::new(
        ScriptedProvider::new("groq").respond(format!("```json\n{}\n```", modules_json(12))),
    );
    let pipeline = pipeline(&pool, vec![flash, groq], ValidationPolicy::FailOpen);

    let created = pipeline.create_course(jamb(user.id, &subject)).await.unwrap();

    assert!(created.created);
    assert_eq!(created.tier_used.as_deref(), Some("groq"));
    assert_eq!(created.modules.len(), MODULE_COUNT);
    assert_eq!(created.modules[0].position, 1);
    assert_eq!(created.modules[12].title, "Review: Module 1");
    assert_eq!(balance(&pool, user.id).await, 5);

    let stored = Module::list_for_course(&pool, created.course.id).await.unwrap();
    assert_eq!(stored.len(), MODULE_COUNT);
}

#[tokio::test]
async fn test_duplicate_course_is_free() {
    let Some(pool) = test_pool().await else { return };
    let user = new_user(&pool, 10).await;
    let subject = seeded_subject(&pool).await;

    let flash = Arc::new(ScriptedProvider::new("gemini_flash").respond(modules_json(15)));
    let pipeline = pipeline(&pool, vec![flash.clone()], ValidationPolicy::FailOpen);

    let first = pipeline.create_course(jamb(user.id, &subject)).await.unwrap();
    let second = pipeline
        .create_course(jamb(user.id, &subject.to_uppercase()))
        .await
        .unwrap();

    assert!(!second.created);
    assert_eq!(second.course.id, first.course.id);
    assert_eq!(second.modules.len(), MODULE_COUNT);
    assert_eq!(flash.calls(), 1);
    assert_eq!(balance(&pool, user.id).await, 5);
}

#[tokio::test]
async fn test_missing_curriculum_spends_nothing() {
    let Some(pool) = test_pool().await else { return };
    let user = new_user(&pool, 10).await;

    let flash = Arc::new(ScriptedProvider::new("gemini_flash").respond(modules_json(15)));
    let pipeline = pipeline(&pool, vec![flash.clone()], ValidationPolicy::FailOpen);

    let err = pipeline
        .create_course(jamb(user.id, "Underwater Basket Weaving"))
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::CurriculumMissing(_)));
    assert_eq!(flash.calls(), 0);
    assert_eq!(balance(&pool, user.id).await, 10);
}

#[tokio::test]
async fn test_insufficient_credits_skip_providers() {
    let Some(pool) = test_pool().await else { return };
    let user = new_user(&pool, 3).await;
    let subject = seeded_subject(&pool).await;

    let flash = Arc::new(ScriptedProvider::new("gemini_flash").respond(modules_json(15)));
    let pipeline = pipeline(&pool, vec![flash.clone()], ValidationPolicy::FailOpen);

    let err = pipeline.create_course(jamb(user.id, &subject)).await.unwrap_err();

    assert!(matches!(
        err,
        GenerationError::InsufficientCredits { required: 5, available: 3 }
    ));
    assert_eq!(flash.calls(), 0);
    assert!(!course_exists(&pool, user.id, &subject).await);
}

#[tokio::test]
async fn test_lesson_generated_once_then_cached() {
    let Some(pool) = test_pool().await else { return };
    let user = new_user(&pool, 10).await;
    let subject = seeded_subject(&pool).await;

    let flash = Arc::new(
        ScriptedProvider::new("gemini_flash")
            .respond(modules_json(15))
            .respond("# Motion\n\nSpeed is distance over time.")
            .respond("OK"),
    );
    let pipeline = pipeline(&pool, vec![flash.clone()], ValidationPolicy::FailOpen);
    let course = pipeline.create_course(jamb(user.id, &subject)).await.unwrap();
    let module = &course.modules[0];

    let first = pipeline.lesson_for_module(user.id, module.id).await.unwrap();
    assert!(!first.cached);
    assert_eq!(first.charged, 1);
    assert!(first.lesson.is_validated);
    assert!(first.lesson.content_html.contains("<h1>Motion</h1>"));

    let second = pipeline.lesson_for_module(user.id, module.id).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.charged, 0);
    assert_eq!(second.lesson.id, first.lesson.id);

    assert_eq!(flash.calls(), 3);
    assert_eq!(balance(&pool, user.id).await, 4);
}

#[tokio::test]
async fn test_lesson_fail_closed_refunds() {
    let Some(pool) = test_pool().await else { return };
    let user = new_user(&pool, 10).await;
    let subject = seeded_subject(&pool).await;

    // Module list and lesson succeed; the review call finds the script empty.
    let flash = Arc::new(
        ScriptedProvider::new("gemini_flash")
            .respond(modules_json(15))
            .respond("# Waves\n\nA wave carries energy."),
    );
    let pipeline = pipeline(&pool, vec![flash], ValidationPolicy::FailClosed);
    let course = pipeline.create_course(jamb(user.id, &subject)).await.unwrap();

    let err = pipeline
        .lesson_for_module(user.id, course.modules[1].id)
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::ReviewUnavailable));
    assert_eq!(balance(&pool, user.id).await, 5);
}

#[tokio::test]
async fn test_quiz_gating_and_reuse() {
    let Some(pool) = test_pool().await else { return };
    let user = new_user(&pool, 10).await;
    let subject = seeded_subject(&pool).await;

    let flash = Arc::new(
        ScriptedProvider::new("gemini_flash")
            .respond(modules_json(15))
            .respond(questions_json(5)),
    );
    let pipeline = pipeline(&pool, vec![flash.clone()], ValidationPolicy::FailOpen);
    let course = pipeline.create_course(jamb(user.id, &subject)).await.unwrap();
    let (first, second) = (&course.modules[0], &course.modules[1]);

    let locked = pipeline.start_quiz(user.id, second.id).await.unwrap_err();
    assert!(matches!(locked, GenerationError::ModuleLocked { required_position: 1 }));

    let quiz = pipeline.start_quiz(user.id, first.id).await.unwrap();
    assert!(!quiz.reused);
    assert_eq!(quiz.questions.len(), 5);

    let again = pipeline.start_quiz(user.id, first.id).await.unwrap();
    assert!(again.reused);
    assert_eq!(again.attempt_id, quiz.attempt_id);
    assert_eq!(flash.calls(), 2);

    // Quizzes are free
    assert_eq!(balance(&pool, user.id).await, 5);

    // Three of five correct is exactly 60 %, which unlocks the next module.
    let attempt = QuizAttempt::find_for_user(&pool, quiz.attempt_id, user.id)
        .await
        .unwrap()
        .unwrap();
    let card = score_answers(&attempt.questions, &[Some(0), Some(0), Some(0), Some(1), None], 60.0);
    assert!(card.passed);
    QuizAttempt::complete(&pool, attempt.id, &card).await.unwrap().unwrap();

    let unlocked = pipeline.start_quiz(user.id, second.id).await;
    assert!(!matches!(unlocked, Err(GenerationError::ModuleLocked { .. })));
}

#[tokio::test]
async fn test_exam_with_too_few_questions_refunds() {
    let Some(pool) = test_pool().await else { return };
    let user = new_user(&pool, 10).await;
    let subject = seeded_subject(&pool).await;

    let flash = Arc::new(
        ScriptedProvider::new("gemini_flash")
            .respond(modules_json(15))
            .respond(questions_json(3)),
    );
    let pipeline = pipeline(&pool, vec![flash], ValidationPolicy::FailOpen);
    let course = pipeline.create_course(jamb(user.id, &subject)).await.unwrap();
    assert_eq!(balance(&pool, user.id).await, 5);

    let err = pipeline.start_exam(user.id, course.course.id).await.unwrap_err();

    assert!(matches!(err, GenerationError::TooFewItems { got: 3, min: 5, .. }));
    assert_eq!(balance(&pool, user.id).await, 5);
    let open_exams: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM course_exams WHERE course_id = $1")
        .bind(course.course.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(open_exams, 0);
}

#[tokio::test]
async fn test_exam_generated_and_charged() {
    let Some(pool) = test_pool().await else { return };
    let user = new_user(&pool, 10).await;
    let subject = seeded_subject(&pool).await;

    let flash = Arc::new(
        ScriptedProvider::new("gemini_flash")
            .respond(modules_json(15))
            .respond(questions_json(20)),
    );
    let pipeline = pipeline(&pool, vec![flash.clone()], ValidationPolicy::FailOpen);
    let course = pipeline.create_course(jamb(user.id, &subject)).await.unwrap();

    let exam = pipeline.start_exam(user.id, course.course.id).await.unwrap();

    assert_eq!(exam.questions.len(), 20);
    assert_eq!(exam.charged, 5);
    assert_eq!(balance(&pool, user.id).await, 0);

    let stored = CourseExam::find_for_user(&pool, exam.exam_id, user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.total_questions, 20);

    let prompt = &flash.requests()[1].prompt;
    assert!(prompt.contains("Module 1, Module 2"));
    assert!(!prompt.contains("Module 15"));
}

async fn complete_perfectly(pool: &sqlx::PgPool, user_id: Uuid, exam_id: Uuid) {
    let exam = CourseExam::find_for_user(pool, exam_id, user_id).await.unwrap().unwrap();
    let answers = vec![Some(0); exam.questions.len()];
    let card = score_answers(&exam.questions, &answers, EXAM_PASS_PERCENTAGE);
    CourseExam::complete(pool, exam.id, &card).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_refused_exam_keeps_completed_result() {
    let Some(pool) = test_pool().await else { return };
    let user = new_user(&pool, 10).await;
    let subject = seeded_subject(&pool).await;

    let flash = Arc::new(
        ScriptedProvider::new("gemini_flash")
            .respond(modules_json(15))
            .respond(questions_json(20)),
    );
    let pipeline = pipeline(&pool, vec![flash.clone()], ValidationPolicy::FailOpen);
    let course = pipeline.create_course(jamb(user.id, &subject)).await.unwrap();
    let exam = pipeline.start_exam(user.id, course.course.id).await.unwrap();
    complete_perfectly(&pool, user.id, exam.exam_id).await;
    assert_eq!(balance(&pool, user.id).await, 0);

    let err = pipeline.start_exam(user.id, course.course.id).await.unwrap_err();

    assert!(matches!(err, GenerationError::InsufficientCredits { required: 5, available: 0 }));
    assert_eq!(flash.calls(), 2);
    assert_eq!(
        CourseExam::best_percentage(&pool, user.id, course.course.id).await.unwrap(),
        Some(100.0)
    );
}

#[tokio::test]
async fn test_completed_exam_cleared_only_by_successful_replacement() {
    let Some(pool) = test_pool().await else { return };
    let user = new_user(&pool, 20).await;
    let subject = seeded_subject(&pool).await;

    let flash = Arc::new(
        ScriptedProvider::new("gemini_flash")
            .respond(modules_json(15))
            .respond(questions_json(20))
            .respond("The exam is not ready yet.")
            .respond(questions_json(20)),
    );
    let pipeline = pipeline(&pool, vec![flash], ValidationPolicy::FailOpen);
    let course = pipeline.create_course(jamb(user.id, &subject)).await.unwrap();
    let first = pipeline.start_exam(user.id, course.course.id).await.unwrap();
    complete_perfectly(&pool, user.id, first.exam_id).await;
    assert_eq!(balance(&pool, user.id).await, 10);

    // Unusable output: refunded, earlier result untouched.
    let err = pipeline.start_exam(user.id, course.course.id).await.unwrap_err();
    assert!(matches!(err, GenerationError::Parse(_)));
    assert_eq!(balance(&pool, user.id).await, 10);
    assert_eq!(
        CourseExam::best_percentage(&pool, user.id, course.course.id).await.unwrap(),
        Some(100.0)
    );

    let replacement = pipeline.start_exam(user.id, course.course.id).await.unwrap();

    assert_eq!(balance(&pool, user.id).await, 5);
    assert_eq!(
        CourseExam::best_percentage(&pool, user.id, course.course.id).await.unwrap(),
        None
    );
    assert!(CourseExam::find_for_user(&pool, first.exam_id, user.id).await.unwrap().is_none());
    assert!(CourseExam::find_for_user(&pool, replacement.exam_id, user.id).await.unwrap().is_some());
}
