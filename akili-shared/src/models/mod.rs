/// Database models for Akili
///
/// Each model exposes the queries the rest of the workspace needs as
/// associated async functions taking a `PgPool` (or a `PgConnection` when the
/// query must run inside a caller-owned transaction).
///
/// # Models
///
/// - `User`: learner identity and credit state
/// - `CreditTransaction`: append-only audit of balance changes
/// - `Curriculum`: syllabus reference data
/// - `Course`, `Module`: a learner's study plan and its outline
/// - `Lesson`: shared lesson cache
/// - `Question`, `QuizAttempt`, `CourseExam`: assessments
/// - `Grade`: derived term grades
/// - `Payment`: gateway checkouts

pub mod course;
pub mod credit_transaction;
pub mod curriculum;
pub mod exam;
pub mod grade;
pub mod lesson;
pub mod module;
pub mod payment;
pub mod question;
pub mod quiz;
pub mod user;
