/// Grade aggregation
///
/// A term grade has two components:
///
/// - **Continuous assessment (CA)**: mean of the learner's best completed quiz
///   percentage per module (modules without a completed attempt are left
///   out), scaled to `ca_max`.
/// - **Exam**: best completed course-exam percentage, scaled to `exam_max`.
///
/// `total = ca + exam` is mapped to a letter through fixed descending bands.
/// Recomputing overwrites the stored grade, so running it twice on the same
/// attempts gives the same row.

use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::course::Course;
use crate::models::exam::CourseExam;
use crate::models::grade::{Grade, GradeRecord};
use crate::models::quiz::QuizAttempt;
use crate::scoring::round2;

#[derive(Debug, thiserror::Error)]
pub enum GradeError {
    #[error("Course not found: {0}")]
    CourseNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Component weights, out of 100 together
#[derive(Debug, Clone, Copy)]
pub struct GradingConfig {
    pub ca_max: f64,
    pub exam_max: f64,
}

impl Default for GradingConfig {
    fn default() -> Self {
        GradingConfig {
            ca_max: 40.0,
            exam_max: 60.0,
        }
    }
}

/// Letter, grade point and remark for a score band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeBand {
    pub letter: &'static str,
    pub point: f64,
    pub remark: &'static str,
}

const BANDS: [(f64, GradeBand); 5] = [
    (70.0, GradeBand { letter: "A", point: 4.0, remark: "Excellent" }),
    (60.0, GradeBand { letter: "B", point: 3.0, remark: "Very Good" }),
    (50.0, GradeBand { letter: "C", point: 2.0, remark: "Good" }),
    (45.0, GradeBand { letter: "D", point: 1.0, remark: "Fair" }),
    (40.0, GradeBand { letter: "E", point: 0.5, remark: "Pass" }),
];

const FAIL: GradeBand = GradeBand { letter: "F", point: 0.0, remark: "Fail" };

/// Band for a total score; lower bounds are inclusive.
pub fn band_for(total: f64) -> GradeBand {
    BANDS
        .iter()
        .find(|(floor, _)| total >= *floor)
        .map(|(_, band)| *band)
        .unwrap_or(FAIL)
}

/// Scales the mean of per-module best percentages to `ca_max`
pub fn ca_component(best_per_module: &[f64], ca_max: f64) -> f64 {
    if best_per_module.is_empty() {
        return 0.0;
    }
    let mean = best_per_module.iter().sum::<f64>() / best_per_module.len() as f64;
    round2(mean / 100.0 * ca_max)
}

/// Scales the best exam percentage to `exam_max`
pub fn exam_component(best_exam: Option<f64>, exam_max: f64) -> f64 {
    best_exam.map(|p| round2(p / 100.0 * exam_max)).unwrap_or(0.0)
}

/// Builds the stored grade from attempt history
pub fn compute_grade(
    student_id: Uuid,
    curriculum_id: Uuid,
    term: &str,
    best_per_module: &[f64],
    best_exam: Option<f64>,
    config: GradingConfig,
) -> GradeRecord {
    let ca_score = ca_component(best_per_module, config.ca_max);
    let exam_score = exam_component(best_exam, config.exam_max);
    let total_score = round2(ca_score + exam_score);
    let band = band_for(total_score);

    GradeRecord {
        student_id,
        curriculum_id,
        term: term.to_string(),
        ca_score,
        exam_score,
        total_score,
        letter: band.letter,
        grade_point: band.point,
        remark: band.remark,
    }
}

/// Recomputes stored grades from quiz and exam history
#[derive(Debug, Clone)]
pub struct GradeAggregator {
    db: PgPool,
    config: GradingConfig,
}

impl GradeAggregator {
    pub fn new(db: PgPool, config: GradingConfig) -> Self {
        GradeAggregator { db, config }
    }

    /// Recomputes the grade for one course.
    ///
    /// Returns `None` when the course has no curriculum or no term, since the
    /// grade key would be incomplete.
    pub async fn recompute(&self, student_id: Uuid, course_id: Uuid) -> Result<Option<Grade>, GradeError> {
        let course = Course::find_for_user(&self.db, course_id, student_id)
            .await?
            .ok_or(GradeError::CourseNotFound(course_id))?;

        let (Some(curriculum_id), Some(term)) = (course.curriculum_id, course.term.as_deref()) else {
            debug!(course_id = %course_id, "Course has no curriculum term, skipping grade");
            return Ok(None);
        };

        let best: Vec<f64> = QuizAttempt::best_per_module(&self.db, student_id, course_id)
            .await?
            .into_iter()
            .map(|m| m.best_percentage)
            .collect();
        let best_exam = CourseExam::best_percentage(&self.db, student_id, course_id).await?;

        let record = compute_grade(student_id, curriculum_id, term, &best, best_exam, self.config);
        let grade = Grade::upsert(&self.db, &record).await?;

        info!(
            student_id = %student_id,
            course_id = %course_id,
            total = grade.total_score,
            letter = %grade.letter,
            "Grade recomputed"
        );
        Ok(Some(grade))
    }

    /// Recomputes every gradable course of a learner. Returns how many grades were written.
    pub async fn backfill_for_user(&self, student_id: Uuid) -> Result<usize, GradeError> {
        let courses = Course::list_for_user(&self.db, student_id).await?;
        let mut written = 0;

        for course in courses {
            if self.recompute(student_id, course.id).await?.is_some() {
                written += 1;
            }
        }

        info!(student_id = %student_id, written, "Grade backfill finished");
        Ok(written)
    }
}
