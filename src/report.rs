use std::fmt::Write;

use crate::models::{CourseProgress, GrowthSnapshot, StudentRecord};

pub fn build_report(
    student: &StudentRecord,
    snapshot: &GrowthSnapshot,
    courses: &[CourseProgress],
) -> String {
    let mut output = String::new();
    let metrics = &snapshot.metrics;

    let _ = writeln!(output, "# Growth Report for {}", student.full_name);
    let _ = writeln!(output, "{}", student.email);
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Overall Growth Index: **{}** ({})",
        snapshot.ogi, snapshot.classification
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Metric Breakdown");
    let _ = writeln!(output, "| Metric | Value | Weight |");
    let _ = writeln!(output, "| --- | --- | --- |");
    let _ = writeln!(output, "| Quiz average | {} | 40% |", metrics.quiz_avg);
    let _ = writeln!(
        output,
        "| Assignment average | {} | 30% |",
        metrics.assignment_avg
    );
    let _ = writeln!(
        output,
        "| Course completion | {} | 20% |",
        metrics.completion_rate
    );
    let _ = writeln!(output, "| Consistency | {} | 10% |", metrics.consistency);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Activity");
    let _ = writeln!(
        output,
        "- Quizzes completed: {} of {}",
        metrics.completed_quizzes, metrics.total_quizzes
    );
    let _ = writeln!(
        output,
        "- Assignments submitted: {} of {} ({} on time)",
        metrics.submitted_assignments, metrics.total_assignments, metrics.on_time_submissions
    );
    let _ = writeln!(
        output,
        "- Modules fully completed: {}%",
        metrics.module_completion_pct
    );
    let _ = writeln!(output, "- Learning streak: {} days", metrics.learning_streak);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Courses");

    if courses.is_empty() {
        let _ = writeln!(output, "No enrolled courses.");
    } else {
        let mut sorted = courses.to_vec();
        sorted.sort_by(|a, b| b.progress_percentage.cmp(&a.progress_percentage));
        for course in sorted.iter() {
            let _ = writeln!(
                output,
                "- {} ({}): {}% complete, {} of {} lessons",
                course.title,
                course.instructor,
                course.progress_percentage,
                course.lessons_completed,
                course.total_lessons
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::growth::compute_growth;
    use uuid::Uuid;

    fn student() -> StudentRecord {
        StudentRecord {
            id: Uuid::new_v4(),
            full_name: "Priya Raghavan".to_string(),
            email: "priya.raghavan@example.com".to_string(),
            learning_streak: 4,
            last_active_date: None,
        }
    }

    #[test]
    fn report_includes_classification_and_courses() {
        let courses = vec![
            CourseProgress {
                id: Uuid::new_v4(),
                title: "Full Stack Web Development".to_string(),
                instructor: "Dr. Sumit Gupta".to_string(),
                total_lessons: 12,
                lessons_completed: 8,
                progress_percentage: 67,
            },
            CourseProgress {
                id: Uuid::new_v4(),
                title: "Data Structures in Depth".to_string(),
                instructor: "Prof. Elena Vasquez".to_string(),
                total_lessons: 4,
                lessons_completed: 4,
                progress_percentage: 100,
            },
        ];
        let snapshot = compute_growth(&[], &[], &courses, &[], 4);
        let report = build_report(&student(), &snapshot, &courses);

        assert!(report.contains("# Growth Report for Priya Raghavan"));
        assert!(report.contains(&format!(
            "Overall Growth Index: **{}** ({})",
            snapshot.ogi, snapshot.classification
        )));
        // Sorted by progress, the finished course comes first.
        let data_structures = report.find("Data Structures in Depth").unwrap();
        let full_stack = report.find("Full Stack Web Development").unwrap();
        assert!(data_structures < full_stack);
        assert!(report.contains("Learning streak: 4 days"));
    }

    #[test]
    fn report_handles_student_with_no_courses() {
        let snapshot = compute_growth(&[], &[], &[], &[], 0);
        let report = build_report(&student(), &snapshot, &[]);
        assert!(report.contains("No enrolled courses."));
        assert!(report.contains("(Needs Attention)"));
    }
}
