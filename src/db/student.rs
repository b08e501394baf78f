use chrono::Utc;
use tracing::{debug, info};

use super::core::Database;
use crate::clustering::{AcademicLevel, Student};
use crate::db::Row;
use crate::TARGET_DB;

fn decode_error(column: &str, source: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

impl Database {
    /// Inserts or replaces roster rows for a teacher, keyed by student id
    pub async fn upsert_students(
        &self,
        teacher_id: &str,
        students: &[Student],
    ) -> Result<usize, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let mut transaction = self.pool().begin().await?;

        for student in students {
            upsert_student(&mut transaction, teacher_id, student, &now).await?;
        }

        transaction.commit().await?;
        debug!(target: TARGET_DB, "Stored {} students for teacher {}", students.len(), teacher_id);

        Ok(students.len())
    }

    /// Swaps a teacher's whole roster for `students`.
    ///
    /// The delete and the inserts share one transaction, so a failure leaves the previous
    /// roster in place.
    ///
    /// # Returns
    ///
    /// * `(removed, stored)` row counts.
    pub async fn replace_students(
        &self,
        teacher_id: &str,
        students: &[Student],
    ) -> Result<(u64, usize), sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let mut transaction = self.pool().begin().await?;

        let removed = sqlx::query("DELETE FROM students WHERE teacher_id = ?")
            .bind(teacher_id)
            .execute(&mut *transaction)
            .await?
            .rows_affected();

        for student in students {
            upsert_student(&mut transaction, teacher_id, student, &now).await?;
        }

        transaction.commit().await?;
        info!(
            target: TARGET_DB,
            "Replaced {} students for teacher {} with {}",
            removed,
            teacher_id,
            students.len()
        );

        Ok((removed, students.len()))
    }

    /// Roster for a teacher, in insertion order.
    ///
    /// A row with an unknown academic level or malformed interests fails the whole read
    /// with `ColumnDecode`.
    pub async fn students_for_teacher(&self, teacher_id: &str) -> Result<Vec<Student>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT student_id, major, academic_level, gpa, career_interests
            FROM students
            WHERE teacher_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(teacher_id)
        .fetch_all(self.pool())
        .await?;

        let mut students = Vec::with_capacity(rows.len());

        for row in rows {
            let level: String = row.get("academic_level");
            let academic_level = level
                .parse::<AcademicLevel>()
                .map_err(|e| decode_error("academic_level", std::io::Error::other(e.to_string())))?;

            let interests: String = row.get("career_interests");
            let career_interests: Vec<String> = serde_json::from_str(&interests)
                .map_err(|e| decode_error("career_interests", e))?;

            students.push(Student {
                id: row.get("student_id"),
                major: row.get("major"),
                academic_level,
                gpa: row.get("gpa"),
                career_interests,
            });
        }

        Ok(students)
    }
}

async fn upsert_student(
    transaction: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    teacher_id: &str,
    student: &Student,
    now: &str,
) -> Result<(), sqlx::Error> {
    let interests = serde_json::to_string(&student.career_interests)
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query(
        r#"
        INSERT INTO students
        (teacher_id, student_id, major, academic_level, gpa, career_interests, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(teacher_id, student_id) DO UPDATE SET
            major = ?3,
            academic_level = ?4,
            gpa = ?5,
            career_interests = ?6,
            updated_at = ?7
        "#,
    )
    .bind(teacher_id)
    .bind(&student.id)
    .bind(&student.major)
    .bind(student.academic_level.as_str())
    .bind(student.gpa)
    .bind(&interests)
    .bind(now)
    .execute(&mut **transaction)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::clustering::{AcademicLevel, Student};
    use crate::db::Database;

    #[tokio::test]
    async fn test_roster_round_trip_and_upsert() {
        let (_dir, db) = Database::open_temp().await;

        let students = vec![
            Student::new("s1", "Finance", AcademicLevel::Junior)
                .with_gpa(3.4)
                .with_interests(&["Banking", "Data Analysis"]),
            Student::new("s2", "Art", AcademicLevel::Freshman),
        ];
        assert_eq!(db.upsert_students("t1", &students).await.unwrap(), 2);

        let updated = vec![Student::new("s2", "Art", AcademicLevel::Sophomore).with_gpa(2.9)];
        db.upsert_students("t1", &updated).await.unwrap();
        db.upsert_students("t2", &students[..1]).await.unwrap();

        let roster = db.students_for_teacher("t1").await.unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0], students[0]);
        assert_eq!(roster[1].academic_level, AcademicLevel::Sophomore);
        assert_eq!(roster[1].gpa, Some(2.9));
        assert_eq!(db.students_for_teacher("t2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_students_swaps_roster() {
        let (_dir, db) = Database::open_temp().await;
        let old = vec![
            Student::new("a", "Art", AcademicLevel::Senior),
            Student::new("b", "Art", AcademicLevel::Senior),
        ];
        db.upsert_students("t1", &old).await.unwrap();
        db.upsert_students("t2", &old).await.unwrap();

        let new = vec![Student::new("c", "History", AcademicLevel::Junior)];
        assert_eq!(db.replace_students("t1", &new).await.unwrap(), (2, 1));

        let roster = db.students_for_teacher("t1").await.unwrap();
        assert_eq!(roster, new);
        assert_eq!(db.students_for_teacher("t2").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_previous_roster() {
        let (_dir, db) = Database::open_temp().await;
        let old = vec![Student::new("a", "Art", AcademicLevel::Senior)];
        db.upsert_students("t1", &old).await.unwrap();

        // Inserts fail after the delete has run inside the transaction
        sqlx::query(
            "CREATE TRIGGER reject_history BEFORE INSERT ON students \
             WHEN NEW.major = 'History' BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let new = vec![
            Student::new("b", "Biology", AcademicLevel::Junior),
            Student::new("c", "History", AcademicLevel::Junior),
        ];
        assert!(db.replace_students("t1", &new).await.is_err());
        assert_eq!(db.students_for_teacher("t1").await.unwrap(), old);
    }

    #[tokio::test]
    async fn test_corrupt_rows_are_decode_errors() {
        let (_dir, db) = Database::open_temp().await;
        db.upsert_students("t1", &[Student::new("a", "Art", AcademicLevel::Senior)])
            .await
            .unwrap();

        sqlx::query("UPDATE students SET academic_level = 'Postdoc' WHERE student_id = 'a'")
            .execute(db.pool())
            .await
            .unwrap();
        let err = db.students_for_teacher("t1").await.unwrap_err();
        assert!(matches!(err, sqlx::Error::ColumnDecode { ref index, .. } if index == "academic_level"));

        sqlx::query(
            "UPDATE students SET academic_level = 'Senior', career_interests = 'not json' \
             WHERE student_id = 'a'",
        )
        .execute(db.pool())
        .await
        .unwrap();
        let err = db.students_for_teacher("t1").await.unwrap_err();
        assert!(matches!(err, sqlx::Error::ColumnDecode { ref index, .. } if index == "career_interests"));
    }
}
