/// API route handlers, one module per resource
///
/// - `health`: liveness and readiness
/// - `courses`: course creation (module generation), listing, deletion
/// - `lessons`: lesson delivery and reports
/// - `quizzes`: module quizzes and submissions
/// - `exams`: course exams and submissions
/// - `grades`: term grades
/// - `credits`: balance, ledger history, dashboard
/// - `referrals`: referral claims
/// - `payments`: Paystack checkout, verification, webhook

pub mod courses;
pub mod credits;
pub mod exams;
pub mod grades;
pub mod health;
pub mod lessons;
pub mod payments;
pub mod quizzes;
pub mod referrals;
