use crate::models::{
    AssignmentRecord, AssignmentStatus, CourseProgress, GrowthMetrics, GrowthSnapshot,
    ModuleTally, QuizResult, QuizStatus,
};

/// Placeholder contribution for work that was handed in but not yet graded.
pub const UNEVALUATED_MARKS: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Excellent,
    Improving,
    Stable,
    NeedsAttention,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Excellent => "Excellent",
            Classification::Improving => "Improving",
            Classification::Stable => "Stable",
            Classification::NeedsAttention => "Needs Attention",
        }
    }
}

/// Inclusive lower bounds, checked top-down.
pub fn classify(ogi: f64) -> Classification {
    if ogi >= 85.0 {
        Classification::Excellent
    } else if ogi >= 70.0 {
        Classification::Improving
    } else if ogi >= 50.0 {
        Classification::Stable
    } else {
        Classification::NeedsAttention
    }
}

/// Mean score over completed quizzes only; pending quizzes are invisible here.
pub fn quiz_average(quizzes: &[QuizResult]) -> f64 {
    let completed: Vec<&QuizResult> = quizzes
        .iter()
        .filter(|quiz| quiz.status == QuizStatus::Completed)
        .collect();
    if completed.is_empty() {
        return 0.0;
    }
    let total: f64 = completed
        .iter()
        .map(|quiz| quiz.score_percentage.unwrap_or(0) as f64)
        .sum();
    total / completed.len() as f64
}

/// Evaluated work contributes its marks, handed-in-but-ungraded work a fixed 80,
/// unsubmitted work 0. The divisor is the TOTAL assignment count, so unsubmitted
/// assignments drag the average down. Load-bearing; do not switch to a
/// submitted-only divisor.
pub fn assignment_average(assignments: &[AssignmentRecord]) -> f64 {
    if assignments.is_empty() {
        return 0.0;
    }
    let total: f64 = assignments
        .iter()
        .map(|assignment| match assignment.status {
            AssignmentStatus::Evaluated => assignment.marks.unwrap_or(0) as f64,
            AssignmentStatus::Submitted | AssignmentStatus::Late => UNEVALUATED_MARKS,
            AssignmentStatus::NotSubmitted => 0.0,
        })
        .sum();
    total / assignments.len() as f64
}

/// Mean of the per-course progress percentages.
pub fn completion_rate(courses: &[CourseProgress]) -> f64 {
    if courses.is_empty() {
        return 0.0;
    }
    let total: f64 = courses
        .iter()
        .map(|course| course.progress_percentage as f64)
        .sum();
    total / courses.len() as f64
}

/// Share of assignments that were on time (submitted or evaluated, never late),
/// out of all assignments.
pub fn consistency(assignments: &[AssignmentRecord]) -> f64 {
    if assignments.is_empty() {
        return 0.0;
    }
    let on_time = assignments
        .iter()
        .filter(|assignment| assignment.status.is_on_time())
        .count();
    (on_time as f64 / assignments.len() as f64) * 100.0
}

fn module_completion_pct(modules: &[ModuleTally]) -> f64 {
    if modules.is_empty() {
        return 0.0;
    }
    let complete = modules.iter().filter(|tally| tally.is_complete()).count();
    (complete as f64 / modules.len() as f64) * 100.0
}

/// Composite growth index over one student's full history. Sub-metrics are each
/// on a 0-100 scale and combined unrounded; rounding happens only here, at the
/// presentation boundary.
pub fn compute_growth(
    quizzes: &[QuizResult],
    assignments: &[AssignmentRecord],
    courses: &[CourseProgress],
    modules: &[ModuleTally],
    learning_streak: i32,
) -> GrowthSnapshot {
    let quiz_avg = quiz_average(quizzes);
    let assignment_avg = assignment_average(assignments);
    let completion = completion_rate(courses);
    let consistency_pct = consistency(assignments);

    let ogi = quiz_avg * 0.40 + assignment_avg * 0.30 + completion * 0.20 + consistency_pct * 0.10;

    let submitted = assignments
        .iter()
        .filter(|assignment| assignment.status.is_submitted())
        .count();
    let on_time = assignments
        .iter()
        .filter(|assignment| assignment.status.is_on_time())
        .count();
    let assignment_completion = if assignments.is_empty() {
        0.0
    } else {
        (submitted as f64 / assignments.len() as f64) * 100.0
    };

    GrowthSnapshot {
        ogi: ogi.round() as i32,
        classification: classify(ogi).as_str().to_string(),
        metrics: GrowthMetrics {
            quiz_avg: quiz_avg.round() as i32,
            assignment_avg: assignment_avg.round() as i32,
            completion_rate: completion.round() as i32,
            consistency: consistency_pct.round() as i32,
            module_completion_pct: module_completion_pct(modules).round() as i32,
            assignment_completion: assignment_completion.round() as i32,
            total_quizzes: quizzes.len(),
            completed_quizzes: quizzes
                .iter()
                .filter(|quiz| quiz.status == QuizStatus::Completed)
                .count(),
            total_assignments: assignments.len(),
            submitted_assignments: submitted,
            on_time_submissions: on_time,
            learning_streak,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn quiz(status: QuizStatus, score: Option<i32>) -> QuizResult {
        QuizResult {
            id: Uuid::new_v4(),
            title: "Sample Quiz".to_string(),
            status,
            score_percentage: score,
            total_questions: 10,
            correct_answers: score.map(|s| s / 10).unwrap_or(0),
        }
    }

    fn assignment(status: AssignmentStatus, marks: Option<i32>) -> AssignmentRecord {
        AssignmentRecord {
            id: Uuid::new_v4(),
            title: "Sample Assignment".to_string(),
            deadline: Utc::now() + Duration::days(7),
            status,
            marks,
            submitted_at: None,
        }
    }

    fn course(progress: i32) -> CourseProgress {
        CourseProgress {
            id: Uuid::new_v4(),
            title: "Sample Course".to_string(),
            instructor: "Dr. Ibarra".to_string(),
            total_lessons: 10,
            lessons_completed: progress / 10,
            progress_percentage: progress,
        }
    }

    #[test]
    fn empty_collections_score_zero_without_panicking() {
        let snapshot = compute_growth(&[], &[], &[], &[], 0);
        assert_eq!(snapshot.ogi, 0);
        assert_eq!(snapshot.metrics.quiz_avg, 0);
        assert_eq!(snapshot.metrics.assignment_avg, 0);
        assert_eq!(snapshot.metrics.completion_rate, 0);
        assert_eq!(snapshot.metrics.consistency, 0);
        assert_eq!(snapshot.classification, "Needs Attention");
    }

    #[test]
    fn quiz_average_ignores_pending_quizzes() {
        let quizzes = vec![
            quiz(QuizStatus::Completed, Some(90)),
            quiz(QuizStatus::Completed, Some(70)),
            quiz(QuizStatus::Pending, None),
        ];
        assert!((quiz_average(&quizzes) - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn assignment_average_divides_by_total_count() {
        let assignments = vec![
            assignment(AssignmentStatus::Evaluated, Some(90)),
            assignment(AssignmentStatus::Submitted, None),
            assignment(AssignmentStatus::NotSubmitted, None),
        ];
        let expected = (90.0 + 80.0 + 0.0) / 3.0;
        assert!((assignment_average(&assignments) - expected).abs() < 0.001);
    }

    #[test]
    fn consistency_excludes_late_submissions() {
        let assignments = vec![
            assignment(AssignmentStatus::Evaluated, Some(75)),
            assignment(AssignmentStatus::Late, None),
            assignment(AssignmentStatus::NotSubmitted, None),
        ];
        let expected = 100.0 / 3.0;
        assert!((consistency(&assignments) - expected).abs() < 0.001);
    }

    #[test]
    fn classification_boundaries_are_inclusive() {
        assert_eq!(classify(85.0), Classification::Excellent);
        assert_eq!(classify(84.0), Classification::Improving);
        assert_eq!(classify(70.0), Classification::Improving);
        assert_eq!(classify(69.0), Classification::Stable);
        assert_eq!(classify(50.0), Classification::Stable);
        assert_eq!(classify(49.0), Classification::NeedsAttention);
    }

    #[test]
    fn ogi_stays_within_bounds_for_perfect_inputs() {
        let quizzes = vec![quiz(QuizStatus::Completed, Some(100))];
        let assignments = vec![assignment(AssignmentStatus::Evaluated, Some(100))];
        let courses = vec![course(100)];
        let modules = vec![ModuleTally {
            lesson_count: 4,
            completed_count: 4,
        }];

        let snapshot = compute_growth(&quizzes, &assignments, &courses, &modules, 5);
        assert_eq!(snapshot.ogi, 100);
        assert_eq!(snapshot.classification, "Excellent");
        assert_eq!(snapshot.metrics.module_completion_pct, 100);
    }

    #[test]
    fn weighted_composite_matches_hand_computation() {
        let quizzes = vec![quiz(QuizStatus::Completed, Some(80))];
        let assignments = vec![
            assignment(AssignmentStatus::Evaluated, Some(90)),
            assignment(AssignmentStatus::Submitted, None),
        ];
        let courses = vec![course(60)];

        // quiz 80, assignment (90+80)/2 = 85, completion 60, consistency 100
        let expected: f64 = 80.0 * 0.40 + 85.0 * 0.30 + 60.0 * 0.20 + 100.0 * 0.10;
        let snapshot = compute_growth(&quizzes, &assignments, &courses, &[], 3);
        assert_eq!(snapshot.ogi, expected.round() as i32);
        assert_eq!(snapshot.classification, "Improving");
        assert_eq!(snapshot.metrics.on_time_submissions, 2);
        assert_eq!(snapshot.metrics.learning_streak, 3);
    }

    #[test]
    fn module_completion_requires_every_lesson_done() {
        let modules = vec![
            ModuleTally {
                lesson_count: 3,
                completed_count: 3,
            },
            ModuleTally {
                lesson_count: 3,
                completed_count: 2,
            },
            ModuleTally {
                lesson_count: 0,
                completed_count: 0,
            },
        ];
        let snapshot = compute_growth(&[], &[], &[], &modules, 0);
        assert_eq!(snapshot.metrics.module_completion_pct, 33);
    }
}
