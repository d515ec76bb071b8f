/// Integration tests for referrals, payment settlement and grade aggregation
///
/// Run with: cargo test -p akili-shared --test records_tests

mod common;

use akili_shared::credits::CreditPolicy;
use akili_shared::grading::{GradeAggregator, GradingConfig};
use akili_shared::models::course::{Course, CourseScope, CreateCourse};
use akili_shared::models::curriculum::{CreateCurriculum, Curriculum};
use akili_shared::models::exam::CourseExam;
use akili_shared::models::lesson::{Lesson, ReportOutcome, StoreLesson};
use akili_shared::models::module::{Module, ModuleOutline};
use akili_shared::models::payment::Payment;
use akili_shared::models::question::Question;
use akili_shared::models::quiz::QuizAttempt;
use akili_shared::models::user::User;
use akili_shared::paystack::{settle_payment, Settlement};
use akili_shared::referrals::{claim_referral, ReferralError};
use akili_shared::scoring::{score_answers, EXAM_PASS_PERCENTAGE, QUIZ_PASS_PERCENTAGE};
use common::{balance, new_user, test_pool};
use uuid::Uuid;

fn questions(n: usize) -> Vec<Question> {
    (0..n)
        .map(|i| Question {
            question_text: format!("Question {}", i + 1),
            choices: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index: 0,
            explanation: String::new(),
        })
        .collect()
}

#[tokio::test]
async fn test_settlement_is_idempotent() {
    let Some(pool) = test_pool().await else { return };
    let user = new_user(&pool, 10).await;
    let reference = format!("ref_{}", Uuid::new_v4().simple());
    Payment::create(&pool, user.id, &reference, 100_000).await.unwrap();

    let first = settle_payment(&pool, &reference, 100_000).await.unwrap();
    assert_eq!(first, Settlement::Credited { credits: 120, balance: Some(130) });

    let second = settle_payment(&pool, &reference, 100_000).await.unwrap();
    assert_eq!(second, Settlement::AlreadySettled);
    assert_eq!(balance(&pool, user.id).await, 130);

    let payment = Payment::find_by_reference(&pool, &reference).await.unwrap().unwrap();
    assert!(payment.verified);
    assert_eq!(payment.credits, Some(120));
}

#[tokio::test]
async fn test_settlement_unknown_reference() {
    let Some(pool) = test_pool().await else { return };
    assert!(settle_payment(&pool, "ref_does_not_exist", 50_000).await.is_err());
}

#[tokio::test]
async fn test_referral_raises_referrer_cap_once() {
    let Some(pool) = test_pool().await else { return };
    let policy = CreditPolicy::default();
    let referrer = new_user(&pool, 10).await;
    let newcomer = new_user(&pool, 10).await;

    let outcome = claim_referral(&pool, &policy, newcomer.id, &referrer.username).await.unwrap();
    assert_eq!(outcome.referrer_id, referrer.id);
    assert_eq!(outcome.referrer_daily_cap, 12);

    let again = claim_referral(&pool, &policy, newcomer.id, &referrer.username).await;
    assert!(matches!(again, Err(ReferralError::AlreadyReferred)));

    let stored = User::find_by_id(&pool, newcomer.id).await.unwrap().unwrap();
    assert_eq!(stored.referred_by, Some(referrer.id));
}

#[tokio::test]
async fn test_referral_rejects_self_and_unknown() {
    let Some(pool) = test_pool().await else { return };
    let policy = CreditPolicy::default();
    let user = new_user(&pool, 10).await;

    assert!(matches!(
        claim_referral(&pool, &policy, user.id, &user.username).await,
        Err(ReferralError::SelfReferral)
    ));
    assert!(matches!(
        claim_referral(&pool, &policy, user.id, "nobody_00000000").await,
        Err(ReferralError::UnknownCode(_))
    ));
}

#[tokio::test]
async fn test_lesson_report_threshold_evicts() {
    let Some(pool) = test_pool().await else { return };
    let lesson = Lesson::store(
        &pool,
        StoreLesson {
            topic: format!("Topic {}", Uuid::new_v4()),
            syllabus_version: "1".to_string(),
            content_markdown: "# Hi".to_string(),
            content_html: "<h1>Hi</h1>".to_string(),
            is_validated: true,
            tier_used: "gemini_flash".to_string(),
            requested_by: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(
        Lesson::report(&pool, lesson.id, 2).await.unwrap(),
        ReportOutcome::Recorded { report_count: 1 }
    );
    assert_eq!(Lesson::report(&pool, lesson.id, 2).await.unwrap(), ReportOutcome::Evicted);
    assert!(Lesson::find_by_id(&pool, lesson.id).await.unwrap().is_none());
    assert_eq!(Lesson::report(&pool, lesson.id, 2).await.unwrap(), ReportOutcome::NotFound);
}

#[tokio::test]
async fn test_grade_recompute_uses_best_attempts() {
    let Some(pool) = test_pool().await else { return };
    let user = new_user(&pool, 10).await;
    let curriculum = Curriculum::create(
        &pool,
        CreateCurriculum {
            subject: "Biology".to_string(),
            school_level: Some("SS1".to_string()),
            term: Some("First Term".to_string()),
            version: "1".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let course = Course::create(
        &pool,
        CreateCourse {
            user_id: user.id,
            subject: "Biology".to_string(),
            scope: CourseScope::Level {
                school_level: "SS1".to_string(),
                term: "First Term".to_string(),
            },
            curriculum_id: Some(curriculum.id),
        },
    )
    .await
    .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    let outline = vec![
        ModuleOutline { title: "Cells".into(), topic: "Cell structure".into() },
        ModuleOutline { title: "Tissues".into(), topic: "Plant tissues".into() },
    ];
    let modules = Module::insert_outline(&mut conn, course.id, &outline).await.unwrap();
    drop(conn);
    assert_eq!(modules[1].position, 2);

    // Module 1: 40% then 100% -> best 100. Module 2: 60%.
    for (module, answers) in [
        (&modules[0], vec![Some(0), Some(1), Some(1), Some(1), Some(0)]),
        (&modules[0], vec![Some(0); 5]),
        (&modules[1], vec![Some(0), Some(0), Some(0), Some(1), Some(1)]),
    ] {
        let qs = questions(5);
        let attempt = QuizAttempt::create(&pool, user.id, module.id, qs.clone()).await.unwrap();
        let card = score_answers(&qs, &answers, QUIZ_PASS_PERCENTAGE);
        QuizAttempt::complete(&pool, attempt.id, &card).await.unwrap().unwrap();
    }

    let qs = questions(10);
    let exam = CourseExam::create_pending(&pool, user.id, course.id, "Biology exam").await.unwrap();
    CourseExam::attach_questions(&pool, exam.id, qs.clone()).await.unwrap();
    let answers: Vec<Option<i32>> = (0..10).map(|i| Some(if i < 7 { 0 } else { 1 })).collect();
    let card = score_answers(&qs, &answers, EXAM_PASS_PERCENTAGE);
    CourseExam::complete(&pool, exam.id, &card).await.unwrap().unwrap();

    let aggregator = GradeAggregator::new(pool.clone(), GradingConfig::default());
    let grade = aggregator.recompute(user.id, course.id).await.unwrap().unwrap();

    // CA = (100 + 60) / 2 = 80% of 40 = 32; exam = 70% of 60 = 42
    assert_eq!(grade.ca_score, 32.0);
    assert_eq!(grade.exam_score, 42.0);
    assert_eq!(grade.total_score, 74.0);
    assert_eq!(grade.letter, "A");

    let again = aggregator.recompute(user.id, course.id).await.unwrap().unwrap();
    assert_eq!(again.id, grade.id);
    assert_eq!(again.total_score, grade.total_score);
    assert!(Course::delete(&pool, course.id).await.unwrap());
}
