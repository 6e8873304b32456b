use std::collections::HashMap;

use async_trait::async_trait;
use cohort_model::{Course, CourseId, Lecture, LectureId, Section, SectionId};
use sqlx::PgPool;
use uuid::Uuid;

use super::rows::{column, db_err};
use crate::database::ports::content::CourseContentRepository;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
pub struct PostgresCourseContentRepository {
    pool: PgPool,
}

impl PostgresCourseContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CourseContentRepository for PostgresCourseContentRepository {
    async fn load_course(&self, course_id: CourseId) -> Result<Option<Course>> {
        let Some(course_row) =
            sqlx::query("SELECT title FROM courses WHERE id = $1")
                .bind(course_id.to_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err("Failed to load course"))?
        else {
            return Ok(None);
        };

        let section_rows = sqlx::query(
            r#"
            SELECT id, title
            FROM course_sections
            WHERE course_id = $1 AND retired_at IS NULL
            ORDER BY position, id
            "#,
        )
        .bind(course_id.to_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to load course sections"))?;

        let lecture_rows = sqlx::query(
            r#"
            SELECT id, section_id, title, duration_seconds
            FROM course_lectures
            WHERE course_id = $1 AND retired_at IS NULL
            ORDER BY position, id
            "#,
        )
        .bind(course_id.to_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to load course lectures"))?;

        let mut sections = Vec::with_capacity(section_rows.len());
        let mut slots: HashMap<SectionId, usize> = HashMap::new();
        for row in &section_rows {
            let id = SectionId::from(column::<Uuid>(row, "id")?);
            slots.insert(id, sections.len());
            sections.push(Section {
                id,
                title: column(row, "title")?,
                lectures: Vec::new(),
            });
        }

        for row in &lecture_rows {
            let section_id = SectionId::from(column::<Uuid>(row, "section_id")?);
            // Lectures under a retired section are not part of the outline.
            let Some(&slot) = slots.get(&section_id) else {
                continue;
            };
            let duration: i64 = column(row, "duration_seconds")?;
            let duration_seconds = u32::try_from(duration).map_err(|_| {
                CoreError::CorruptRecord(format!(
                    "lecture duration out of range: {duration}"
                ))
            })?;
            sections[slot].lectures.push(Lecture {
                id: LectureId::from(column::<Uuid>(row, "id")?),
                title: column(row, "title")?,
                duration_seconds,
            });
        }

        Ok(Some(Course {
            id: course_id,
            title: column(&course_row, "title")?,
            sections,
        }))
    }

    async fn publish_course(&self, course: &Course) -> Result<()> {
        if let Some(duplicate) = course.duplicate_lecture() {
            return Err(CoreError::InvalidInput(format!(
                "lecture {duplicate} appears more than once in course {}",
                course.id
            )));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin publish transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO courses (id, title)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE
            SET title = EXCLUDED.title, updated_at = NOW()
            "#,
        )
        .bind(course.id.to_uuid())
        .bind(&course.title)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to upsert course"))?;

        let mut section_ids = Vec::with_capacity(course.sections.len());
        let mut lecture_ids = Vec::new();

        for (section_pos, section) in course.sections.iter().enumerate() {
            section_ids.push(section.id.to_uuid());
            sqlx::query(
                r#"
                INSERT INTO course_sections (id, course_id, title, position, retired_at)
                VALUES ($1, $2, $3, $4, NULL)
                ON CONFLICT (id) DO UPDATE
                SET course_id = EXCLUDED.course_id,
                    title = EXCLUDED.title,
                    position = EXCLUDED.position,
                    retired_at = NULL
                "#,
            )
            .bind(section.id.to_uuid())
            .bind(course.id.to_uuid())
            .bind(&section.title)
            .bind(position(section_pos)?)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to upsert section"))?;

            for (lecture_pos, lecture) in section.lectures.iter().enumerate() {
                lecture_ids.push(lecture.id.to_uuid());
                sqlx::query(
                    r#"
                    INSERT INTO course_lectures
                        (id, course_id, section_id, title, duration_seconds, position, retired_at)
                    VALUES ($1, $2, $3, $4, $5, $6, NULL)
                    ON CONFLICT (id) DO UPDATE
                    SET course_id = EXCLUDED.course_id,
                        section_id = EXCLUDED.section_id,
                        title = EXCLUDED.title,
                        duration_seconds = EXCLUDED.duration_seconds,
                        position = EXCLUDED.position,
                        retired_at = NULL
                    "#,
                )
                .bind(lecture.id.to_uuid())
                .bind(course.id.to_uuid())
                .bind(section.id.to_uuid())
                .bind(&lecture.title)
                .bind(i64::from(lecture.duration_seconds))
                .bind(position(lecture_pos)?)
                .execute(&mut *tx)
                .await
                .map_err(db_err("Failed to upsert lecture"))?;
            }
        }

        sqlx::query(
            r#"
            UPDATE course_lectures
            SET retired_at = NOW()
            WHERE course_id = $1
              AND retired_at IS NULL
              AND NOT (id = ANY($2))
            "#,
        )
        .bind(course.id.to_uuid())
        .bind(&lecture_ids)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to retire removed lectures"))?;

        sqlx::query(
            r#"
            UPDATE course_sections
            SET retired_at = NOW()
            WHERE course_id = $1
              AND retired_at IS NULL
              AND NOT (id = ANY($2))
            "#,
        )
        .bind(course.id.to_uuid())
        .bind(&section_ids)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to retire removed sections"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit course publish"))?;
        Ok(())
    }

    async fn retire_lecture(
        &self,
        course_id: CourseId,
        lecture_id: LectureId,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE course_lectures
            SET retired_at = NOW()
            WHERE course_id = $1 AND id = $2 AND retired_at IS NULL
            "#,
        )
        .bind(course_id.to_uuid())
        .bind(lecture_id.to_uuid())
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to retire lecture"))?;

        Ok(result.rows_affected() == 1)
    }
}

fn position(index: usize) -> Result<i32> {
    i32::try_from(index).map_err(|_| {
        CoreError::InvalidInput(format!("position {index} is out of range"))
    })
}
