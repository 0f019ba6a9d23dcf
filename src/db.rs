use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::TrackerError;
use crate::models::{
    self, ActivityState, AssignmentRecord, AssignmentStatus, CourseProgress, ModuleTally,
    QuizQuestion, QuizResult, QuizStatus, StudentRecord,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn fetch_student(pool: &PgPool, email: &str) -> Result<StudentRecord, TrackerError> {
    let row = sqlx::query(
        "SELECT id, full_name, email, learning_streak, last_active_date \
         FROM growth_tracker.students WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?
    .ok_or(TrackerError::NotFound("student"))?;

    Ok(StudentRecord {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        learning_streak: row.get("learning_streak"),
        last_active_date: row.get("last_active_date"),
    })
}

pub async fn fetch_quiz_results(
    pool: &PgPool,
    student_id: Uuid,
) -> Result<Vec<QuizResult>, TrackerError> {
    let rows = sqlx::query(
        "SELECT id, title, status, score_percentage, total_questions, correct_answers \
         FROM growth_tracker.quizzes WHERE student_id = $1",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    let mut quizzes = Vec::new();
    for row in rows {
        let status: String = row.get("status");
        quizzes.push(QuizResult {
            id: row.get("id"),
            title: row.get("title"),
            status: QuizStatus::parse(&status)?,
            score_percentage: row.get("score_percentage"),
            total_questions: row.get("total_questions"),
            correct_answers: row.get("correct_answers"),
        });
    }
    Ok(quizzes)
}

pub async fn fetch_assignments(
    pool: &PgPool,
    student_id: Uuid,
) -> Result<Vec<AssignmentRecord>, TrackerError> {
    let rows = sqlx::query(
        "SELECT id, title, deadline, status, marks, submitted_at \
         FROM growth_tracker.assignments WHERE student_id = $1",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    let mut assignments = Vec::new();
    for row in rows {
        let status: String = row.get("status");
        assignments.push(AssignmentRecord {
            id: row.get("id"),
            title: row.get("title"),
            deadline: row.get("deadline"),
            status: AssignmentStatus::parse(&status)?,
            marks: row.get("marks"),
            submitted_at: row.get("submitted_at"),
        });
    }
    Ok(assignments)
}

fn course_from_row(row: &sqlx::postgres::PgRow) -> CourseProgress {
    CourseProgress {
        id: row.get("id"),
        title: row.get("title"),
        instructor: row.get("instructor"),
        total_lessons: row.get("total_lessons"),
        lessons_completed: row.get("lessons_completed"),
        progress_percentage: row.get("progress_percentage"),
    }
}

pub async fn fetch_course_progress(
    pool: &PgPool,
    student_id: Uuid,
) -> Result<Vec<CourseProgress>, TrackerError> {
    let rows = sqlx::query(
        "SELECT id, title, instructor, total_lessons, lessons_completed, progress_percentage \
         FROM growth_tracker.courses WHERE student_id = $1",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(course_from_row).collect())
}

pub async fn fetch_module_tallies(
    pool: &PgPool,
    student_id: Uuid,
) -> Result<Vec<ModuleTally>, TrackerError> {
    let rows = sqlx::query(
        "SELECT COUNT(l.id) AS lesson_count, \
                COUNT(l.id) FILTER (WHERE l.is_completed) AS completed_count \
         FROM growth_tracker.course_modules m \
         JOIN growth_tracker.courses c ON c.id = m.course_id \
         LEFT JOIN growth_tracker.lessons l ON l.module_id = m.id \
         WHERE c.student_id = $1 \
         GROUP BY m.id",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| ModuleTally {
            lesson_count: row.get("lesson_count"),
            completed_count: row.get("completed_count"),
        })
        .collect())
}

/// Conditional write for the streak counter: only lands if nobody else touched
/// `last_active_date` since we read it. Returns false on a lost race, which the
/// caller treats as already-recorded.
pub async fn persist_streak(
    pool: &PgPool,
    student_id: Uuid,
    observed_last_active: Option<DateTime<Utc>>,
    updated: ActivityState,
) -> Result<bool, TrackerError> {
    let result = sqlx::query(
        "UPDATE growth_tracker.students \
         SET learning_streak = $2, last_active_date = $3 \
         WHERE id = $1 AND last_active_date IS NOT DISTINCT FROM $4",
    )
    .bind(student_id)
    .bind(updated.learning_streak)
    .bind(updated.last_active_date)
    .bind(observed_last_active)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[derive(Debug)]
pub struct LessonCompletion {
    pub newly_completed: bool,
    pub course: CourseProgress,
}

pub async fn complete_lesson(
    pool: &PgPool,
    student_id: Uuid,
    course_title: &str,
    lesson_title: &str,
) -> Result<LessonCompletion, TrackerError> {
    let mut tx = pool.begin().await?;

    let course_row = sqlx::query(
        "SELECT id, title, instructor, total_lessons, lessons_completed, progress_percentage \
         FROM growth_tracker.courses WHERE student_id = $1 AND title = $2 FOR UPDATE",
    )
    .bind(student_id)
    .bind(course_title)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(TrackerError::NotFound("course"))?;
    let mut course = course_from_row(&course_row);

    let lesson_row = sqlx::query(
        "SELECT l.id, l.is_completed \
         FROM growth_tracker.lessons l \
         JOIN growth_tracker.course_modules m ON m.id = l.module_id \
         WHERE m.course_id = $1 AND l.title = $2",
    )
    .bind(course.id)
    .bind(lesson_title)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(TrackerError::NotFound("lesson"))?;

    let lesson_id: Uuid = lesson_row.get("id");
    let already_completed: bool = lesson_row.get("is_completed");
    if already_completed {
        tx.rollback().await?;
        return Ok(LessonCompletion {
            newly_completed: false,
            course,
        });
    }

    sqlx::query("UPDATE growth_tracker.lessons SET is_completed = TRUE WHERE id = $1")
        .bind(lesson_id)
        .execute(&mut *tx)
        .await?;

    let completed: i64 = sqlx::query(
        "SELECT COUNT(*) AS completed \
         FROM growth_tracker.lessons l \
         JOIN growth_tracker.course_modules m ON m.id = l.module_id \
         WHERE m.course_id = $1 AND l.is_completed",
    )
    .bind(course.id)
    .fetch_one(&mut *tx)
    .await?
    .get("completed");

    course.lessons_completed = completed as i32;
    course.progress_percentage =
        models::progress_percentage(course.lessons_completed, course.total_lessons);

    sqlx::query(
        "UPDATE growth_tracker.courses \
         SET lessons_completed = $2, progress_percentage = $3 WHERE id = $1",
    )
    .bind(course.id)
    .bind(course.lessons_completed)
    .bind(course.progress_percentage)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(LessonCompletion {
        newly_completed: true,
        course,
    })
}

pub async fn complete_course(
    pool: &PgPool,
    student_id: Uuid,
    course_title: &str,
) -> Result<CourseProgress, TrackerError> {
    let mut tx = pool.begin().await?;

    let course_row = sqlx::query(
        "SELECT id, title, instructor, total_lessons, lessons_completed, progress_percentage \
         FROM growth_tracker.courses WHERE student_id = $1 AND title = $2 FOR UPDATE",
    )
    .bind(student_id)
    .bind(course_title)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(TrackerError::NotFound("course"))?;
    let mut course = course_from_row(&course_row);

    sqlx::query(
        "UPDATE growth_tracker.lessons SET is_completed = TRUE \
         WHERE module_id IN \
           (SELECT id FROM growth_tracker.course_modules WHERE course_id = $1)",
    )
    .bind(course.id)
    .execute(&mut *tx)
    .await?;

    course.lessons_completed = course.total_lessons;
    course.progress_percentage = 100;

    sqlx::query(
        "UPDATE growth_tracker.courses \
         SET lessons_completed = total_lessons, progress_percentage = 100 WHERE id = $1",
    )
    .bind(course.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(course)
}

pub async fn submit_quiz(
    pool: &PgPool,
    student_id: Uuid,
    quiz_title: &str,
    answers: &[String],
) -> Result<QuizResult, TrackerError> {
    let mut tx = pool.begin().await?;

    let quiz_row = sqlx::query(
        "SELECT id, title, status, total_questions \
         FROM growth_tracker.quizzes \
         WHERE student_id = $1 AND title = $2 FOR UPDATE",
    )
    .bind(student_id)
    .bind(quiz_title)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(TrackerError::NotFound("quiz"))?;

    let quiz_id: Uuid = quiz_row.get("id");
    let status: String = quiz_row.get("status");
    if QuizStatus::parse(&status)? == QuizStatus::Completed {
        return Err(TrackerError::Validation("quiz already completed".to_string()));
    }
    let total_questions: i32 = quiz_row.get("total_questions");

    let question_rows = sqlx::query(
        "SELECT prompt, correct_answer FROM growth_tracker.quiz_questions \
         WHERE quiz_id = $1 ORDER BY position",
    )
    .bind(quiz_id)
    .fetch_all(&mut *tx)
    .await?;

    let questions: Vec<QuizQuestion> = question_rows
        .iter()
        .map(|row| QuizQuestion {
            prompt: row.get("prompt"),
            correct_answer: row.get("correct_answer"),
        })
        .collect();

    let correct = models::grade_answers(&questions, answers);
    let score = models::quiz_score(correct, total_questions);

    sqlx::query(
        "UPDATE growth_tracker.quizzes \
         SET correct_answers = $2, score_percentage = $3, status = 'completed' \
         WHERE id = $1",
    )
    .bind(quiz_id)
    .bind(correct)
    .bind(score)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(QuizResult {
        id: quiz_id,
        title: quiz_title.to_string(),
        status: QuizStatus::Completed,
        score_percentage: Some(score),
        total_questions,
        correct_answers: correct,
    })
}

pub async fn submit_assignment(
    pool: &PgPool,
    student_id: Uuid,
    assignment_title: &str,
    now: DateTime<Utc>,
) -> Result<AssignmentRecord, TrackerError> {
    let row = sqlx::query(
        "SELECT id, title, deadline, status, marks \
         FROM growth_tracker.assignments WHERE student_id = $1 AND title = $2",
    )
    .bind(student_id)
    .bind(assignment_title)
    .fetch_optional(pool)
    .await?
    .ok_or(TrackerError::NotFound("assignment"))?;

    let status: String = row.get("status");
    if AssignmentStatus::parse(&status)? == AssignmentStatus::Evaluated {
        return Err(TrackerError::Validation(
            "assignment already evaluated".to_string(),
        ));
    }

    let id: Uuid = row.get("id");
    let deadline: DateTime<Utc> = row.get("deadline");
    let new_status = AssignmentStatus::for_submission(now, deadline);

    sqlx::query(
        "UPDATE growth_tracker.assignments \
         SET status = $2, submitted_at = $3 WHERE id = $1",
    )
    .bind(id)
    .bind(new_status.as_str())
    .bind(now)
    .execute(pool)
    .await?;

    Ok(AssignmentRecord {
        id,
        title: assignment_title.to_string(),
        deadline,
        status: new_status,
        marks: row.get("marks"),
        submitted_at: Some(now),
    })
}

pub async fn grade_assignment(
    pool: &PgPool,
    student_id: Uuid,
    assignment_title: &str,
    marks: i32,
    feedback: Option<&str>,
) -> Result<AssignmentRecord, TrackerError> {
    if !(0..=100).contains(&marks) {
        return Err(TrackerError::Validation(format!(
            "marks must be between 0 and 100, got {marks}"
        )));
    }

    let row = sqlx::query(
        "UPDATE growth_tracker.assignments \
         SET status = 'evaluated', marks = $3, feedback = $4 \
         WHERE student_id = $1 AND title = $2 \
         RETURNING id, title, deadline, submitted_at",
    )
    .bind(student_id)
    .bind(assignment_title)
    .bind(marks)
    .bind(feedback)
    .fetch_optional(pool)
    .await?
    .ok_or(TrackerError::NotFound("assignment"))?;

    Ok(AssignmentRecord {
        id: row.get("id"),
        title: row.get("title"),
        deadline: row.get("deadline"),
        status: AssignmentStatus::Evaluated,
        marks: Some(marks),
        submitted_at: row.get("submitted_at"),
    })
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let student_id: Uuid = sqlx::query(
        r#"
        INSERT INTO growth_tracker.students (id, full_name, email, learning_streak, last_active_date)
        VALUES ($1, $2, $3, 0, NULL)
        ON CONFLICT (email) DO UPDATE SET full_name = EXCLUDED.full_name
        RETURNING id
        "#,
    )
    .bind(Uuid::parse_str("8f6b0c9a-51d2-4f6e-9a3b-7c1d2e8f4a5b")?)
    .bind("Priya Raghavan")
    .bind("priya.raghavan@example.com")
    .fetch_one(pool)
    .await?
    .get("id");

    let courses = vec![
        (
            "Full Stack Web Development",
            "Dr. Sumit Gupta",
            vec![
                (
                    "Frontend Foundations",
                    vec![
                        ("Semantic HTML", true),
                        ("CSS Grid and Flexbox", true),
                        ("Responsive Layouts", true),
                    ],
                ),
                (
                    "React Essentials",
                    vec![
                        ("Components and Props", true),
                        ("State and Effects", false),
                        ("Routing", false),
                    ],
                ),
            ],
        ),
        (
            "Data Structures in Depth",
            "Prof. Elena Vasquez",
            vec![(
                "Linear Structures",
                vec![
                    ("Arrays and Slices", false),
                    ("Linked Lists", false),
                    ("Stacks and Queues", false),
                    ("Hash Tables", false),
                ],
            )],
        ),
    ];

    for (title, instructor, modules) in courses {
        let total_lessons: i32 = modules
            .iter()
            .map(|(_, lessons)| lessons.len() as i32)
            .sum();
        let completed: i32 = modules
            .iter()
            .flat_map(|(_, lessons)| lessons.iter())
            .filter(|(_, done)| *done)
            .count() as i32;

        let course_id: Uuid = sqlx::query(
            r#"
            INSERT INTO growth_tracker.courses
            (id, student_id, title, instructor, total_lessons, lessons_completed, progress_percentage)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (student_id, title) DO UPDATE SET instructor = EXCLUDED.instructor
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(title)
        .bind(instructor)
        .bind(total_lessons)
        .bind(completed)
        .bind(models::progress_percentage(completed, total_lessons))
        .fetch_one(pool)
        .await?
        .get("id");

        for (position, (module_title, lessons)) in modules.iter().enumerate() {
            let module_id: Uuid = sqlx::query(
                r#"
                INSERT INTO growth_tracker.course_modules (id, course_id, title, position)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (course_id, position) DO UPDATE SET title = EXCLUDED.title
                RETURNING id
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(course_id)
            .bind(module_title)
            .bind(position as i32)
            .fetch_one(pool)
            .await?
            .get("id");

            for (lesson_position, (lesson_title, is_completed)) in lessons.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO growth_tracker.lessons (id, module_id, title, position, is_completed)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (module_id, position) DO NOTHING
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(module_id)
                .bind(lesson_title)
                .bind(lesson_position as i32)
                .bind(is_completed)
                .execute(pool)
                .await?;
            }
        }
    }

    let quizzes = vec![
        (
            "HTML and CSS Basics",
            15,
            vec![
                ("Which tag marks navigation?", "nav"),
                ("Which property creates a grid?", "display: grid"),
                ("Which unit scales with the root font size?", "rem"),
            ],
        ),
        (
            "React Fundamentals",
            20,
            vec![
                ("Which hook stores local state?", "useState"),
                ("Which hook runs after render?", "useEffect"),
            ],
        ),
    ];

    for (title, duration_mins, questions) in quizzes {
        let quiz_id: Uuid = sqlx::query(
            r#"
            INSERT INTO growth_tracker.quizzes
            (id, student_id, title, duration_mins, total_questions, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            ON CONFLICT (student_id, title) DO UPDATE SET duration_mins = EXCLUDED.duration_mins
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(title)
        .bind(duration_mins)
        .bind(questions.len() as i32)
        .fetch_one(pool)
        .await?
        .get("id");

        for (position, (prompt, correct_answer)) in questions.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO growth_tracker.quiz_questions
                (id, quiz_id, position, prompt, correct_answer)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (quiz_id, position) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(quiz_id)
            .bind(position as i32)
            .bind(prompt)
            .bind(correct_answer)
            .execute(pool)
            .await?;
        }
    }

    let now = Utc::now();
    let assignments = vec![
        (
            "Portfolio Landing Page",
            now - chrono::Duration::days(14),
            "evaluated",
            Some(88),
        ),
        (
            "REST API Design Document",
            now + chrono::Duration::days(7),
            "not_submitted",
            None,
        ),
        (
            "Linked List Implementation",
            now - chrono::Duration::days(2),
            "not_submitted",
            None,
        ),
    ];

    for (title, deadline, status, marks) in assignments {
        sqlx::query(
            r#"
            INSERT INTO growth_tracker.assignments
            (id, student_id, title, deadline, status, marks)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (student_id, title) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(title)
        .bind(deadline)
        .bind(status)
        .bind(marks)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        title: String,
        deadline: NaiveDate,
        status: String,
        marks: Option<i32>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let status = AssignmentStatus::parse(&row.status)?;
        if let Some(marks) = row.marks {
            if !(0..=100).contains(&marks) {
                return Err(TrackerError::Validation(format!(
                    "marks must be between 0 and 100, got {marks} for '{}'",
                    row.title
                ))
                .into());
            }
        }
        let deadline = row
            .deadline
            .and_hms_opt(23, 59, 59)
            .context("invalid deadline")?
            .and_utc();

        let student_id: Uuid = sqlx::query(
            r#"
            INSERT INTO growth_tracker.students (id, full_name, email, learning_streak)
            VALUES ($1, $2, $3, 0)
            ON CONFLICT (email) DO UPDATE SET full_name = EXCLUDED.full_name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.full_name)
        .bind(&row.email)
        .fetch_one(pool)
        .await?
        .get("id");

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO growth_tracker.assignments
            (id, student_id, title, deadline, status, marks, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(&row.title)
        .bind(deadline)
        .bind(status.as_str())
        .bind(row.marks)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
