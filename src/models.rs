use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::TrackerError;

#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub learning_streak: i32,
    pub last_active_date: Option<DateTime<Utc>>,
}

impl StudentRecord {
    pub fn activity(&self) -> ActivityState {
        ActivityState {
            learning_streak: self.learning_streak,
            last_active_date: self.last_active_date,
        }
    }
}

/// Per-student streak counter plus the instant of the last qualifying activity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivityState {
    pub learning_streak: i32,
    pub last_active_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizStatus {
    Pending,
    Completed,
}

impl QuizStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizStatus::Pending => "pending",
            QuizStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, TrackerError> {
        match value {
            "pending" => Ok(QuizStatus::Pending),
            "completed" => Ok(QuizStatus::Completed),
            other => Err(TrackerError::Validation(format!(
                "unknown quiz status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuizResult {
    pub id: Uuid,
    pub title: String,
    pub status: QuizStatus,
    pub score_percentage: Option<i32>,
    pub total_questions: i32,
    pub correct_answers: i32,
}

#[derive(Debug, Clone)]
pub struct QuizQuestion {
    pub prompt: String,
    pub correct_answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentStatus {
    NotSubmitted,
    Submitted,
    Late,
    Evaluated,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::NotSubmitted => "not_submitted",
            AssignmentStatus::Submitted => "submitted",
            AssignmentStatus::Late => "late",
            AssignmentStatus::Evaluated => "evaluated",
        }
    }

    pub fn parse(value: &str) -> Result<Self, TrackerError> {
        match value {
            "not_submitted" => Ok(AssignmentStatus::NotSubmitted),
            "submitted" => Ok(AssignmentStatus::Submitted),
            "late" => Ok(AssignmentStatus::Late),
            "evaluated" => Ok(AssignmentStatus::Evaluated),
            other => Err(TrackerError::Validation(format!(
                "unknown assignment status '{other}'"
            ))),
        }
    }

    /// Status a fresh submission lands in: late once the deadline has passed.
    pub fn for_submission(now: DateTime<Utc>, deadline: DateTime<Utc>) -> Self {
        if now > deadline {
            AssignmentStatus::Late
        } else {
            AssignmentStatus::Submitted
        }
    }

    /// Submitted-or-evaluated counts as on time; late and not-submitted do not.
    pub fn is_on_time(&self) -> bool {
        matches!(self, AssignmentStatus::Submitted | AssignmentStatus::Evaluated)
    }

    pub fn is_submitted(&self) -> bool {
        !matches!(self, AssignmentStatus::NotSubmitted)
    }
}

#[derive(Debug, Clone)]
pub struct AssignmentRecord {
    pub id: Uuid,
    pub title: String,
    pub deadline: DateTime<Utc>,
    pub status: AssignmentStatus,
    pub marks: Option<i32>,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CourseProgress {
    pub id: Uuid,
    pub title: String,
    pub instructor: String,
    pub total_lessons: i32,
    pub lessons_completed: i32,
    pub progress_percentage: i32,
}

/// Lesson tallies for one module, backing the module-completion metric.
#[derive(Debug, Clone, Copy)]
pub struct ModuleTally {
    pub lesson_count: i64,
    pub completed_count: i64,
}

impl ModuleTally {
    pub fn is_complete(&self) -> bool {
        self.lesson_count > 0 && self.completed_count == self.lesson_count
    }
}

/// Invariant for `courses.progress_percentage`; recomputed after every lesson mutation.
pub fn progress_percentage(lessons_completed: i32, total_lessons: i32) -> i32 {
    if total_lessons <= 0 {
        return 0;
    }
    ((lessons_completed as f64 / total_lessons as f64) * 100.0).round() as i32
}

/// Quiz grading: answers match questions by position, missing answers count wrong.
pub fn grade_answers(questions: &[QuizQuestion], answers: &[String]) -> i32 {
    questions
        .iter()
        .zip(answers.iter())
        .filter(|(question, answer)| question.correct_answer == **answer)
        .count() as i32
}

pub fn quiz_score(correct_answers: i32, total_questions: i32) -> i32 {
    if total_questions <= 0 {
        return 0;
    }
    ((correct_answers as f64 / total_questions as f64) * 100.0).round() as i32
}

/// Everything the score and report commands surface for one student.
#[derive(Debug, Clone, Serialize)]
pub struct GrowthSnapshot {
    pub ogi: i32,
    pub classification: String,
    pub metrics: GrowthMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrowthMetrics {
    pub quiz_avg: i32,
    pub assignment_avg: i32,
    pub completion_rate: i32,
    pub consistency: i32,
    pub module_completion_pct: i32,
    pub assignment_completion: i32,
    pub total_quizzes: usize,
    pub completed_quizzes: usize,
    pub total_assignments: usize,
    pub submitted_assignments: usize,
    pub on_time_submissions: usize,
    pub learning_streak: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn progress_percentage_rounds_to_nearest() {
        assert_eq!(progress_percentage(8, 12), 67);
        assert_eq!(progress_percentage(1, 3), 33);
        assert_eq!(progress_percentage(12, 12), 100);
        assert_eq!(progress_percentage(0, 12), 0);
    }

    #[test]
    fn progress_percentage_guards_empty_course() {
        assert_eq!(progress_percentage(0, 0), 0);
    }

    #[test]
    fn submission_is_late_only_after_deadline() {
        let deadline = Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2026, 2, 28, 10, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 1).unwrap();

        assert_eq!(
            AssignmentStatus::for_submission(early, deadline),
            AssignmentStatus::Submitted
        );
        assert_eq!(
            AssignmentStatus::for_submission(deadline, deadline),
            AssignmentStatus::Submitted
        );
        assert_eq!(
            AssignmentStatus::for_submission(late, deadline),
            AssignmentStatus::Late
        );
    }

    #[test]
    fn late_is_not_on_time() {
        assert!(AssignmentStatus::Submitted.is_on_time());
        assert!(AssignmentStatus::Evaluated.is_on_time());
        assert!(!AssignmentStatus::Late.is_on_time());
        assert!(!AssignmentStatus::NotSubmitted.is_on_time());
    }

    #[test]
    fn grading_matches_answers_by_position() {
        let questions = vec![
            QuizQuestion {
                prompt: "q1".to_string(),
                correct_answer: "a".to_string(),
            },
            QuizQuestion {
                prompt: "q2".to_string(),
                correct_answer: "b".to_string(),
            },
            QuizQuestion {
                prompt: "q3".to_string(),
                correct_answer: "c".to_string(),
            },
        ];
        let answers = vec!["a".to_string(), "c".to_string()];

        assert_eq!(grade_answers(&questions, &answers), 1);
        assert_eq!(quiz_score(1, 3), 33);
        assert_eq!(quiz_score(2, 3), 67);
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            AssignmentStatus::NotSubmitted,
            AssignmentStatus::Submitted,
            AssignmentStatus::Late,
            AssignmentStatus::Evaluated,
        ] {
            assert_eq!(AssignmentStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(AssignmentStatus::parse("graded").is_err());
    }
}
