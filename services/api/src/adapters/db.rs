//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `CourseStore` and `SessionStore` ports from the `core` crate. It handles
//! all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_builder_core::domain::{Course, Depth, NewCourse, Step};
use course_builder_core::ports::{CoursePatch, CourseStore, PortError, PortResult, SessionStore};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `CourseStore` and `SessionStore` ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct CourseRecord {
    id: Uuid,
    user_id: String,
    topic: String,
    depth: String,
    outline: String,
    steps: Json<Vec<Step>>,
    created_at: DateTime<Utc>,
}

impl CourseRecord {
    fn to_domain(self) -> PortResult<Course> {
        let depth = self
            .depth
            .parse::<Depth>()
            .map_err(|e| PortError::Unexpected(format!("Course {}: {}", self.id, e)))?;
        Ok(Course {
            id: self.id.to_string(),
            user_id: self.user_id,
            topic: self.topic,
            depth,
            outline: self.outline,
            steps: self.steps.0,
            created_at: self.created_at,
        })
    }
}

/// Course ids are UUIDs in storage; anything else cannot name a stored course.
fn parse_course_id(course_id: &str) -> PortResult<Uuid> {
    Uuid::parse_str(course_id)
        .map_err(|_| PortError::NotFound(format!("Course {} not found", course_id)))
}

//=========================================================================================
// `CourseStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CourseStore for DbAdapter {
    async fn list_courses_for_user(&self, user_id: &str) -> PortResult<Vec<Course>> {
        let records = sqlx::query_as::<_, CourseRecord>(
            "SELECT id, user_id, topic, depth, outline, steps, created_at FROM courses WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        records.into_iter().map(CourseRecord::to_domain).collect()
    }

    async fn create_course(&self, course: NewCourse) -> PortResult<String> {
        if course.steps.is_empty() {
            return Err(PortError::Unexpected(
                "A course must have at least one step.".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO courses (id, user_id, topic, depth, outline, steps, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id)
        .bind(&course.user_id)
        .bind(&course.topic)
        .bind(course.depth.as_str())
        .bind(&course.outline)
        .bind(Json(&course.steps))
        .bind(course.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        info!("Stored course {} for user {}", id, course.user_id);
        Ok(id.to_string())
    }

    async fn update_course(
        &self,
        user_id: &str,
        course_id: &str,
        patch: CoursePatch,
    ) -> PortResult<()> {
        let id = parse_course_id(course_id)?;
        let result = sqlx::query("UPDATE courses SET steps = $1 WHERE id = $2 AND user_id = $3")
            .bind(Json(&patch.steps))
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Course {} not found", course_id)));
        }
        Ok(())
    }

    async fn delete_course(&self, user_id: &str, course_id: &str) -> PortResult<()> {
        let id = parse_course_id(course_id)?;
        let result = sqlx::query("DELETE FROM courses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Course {} not found", course_id)));
        }
        Ok(())
    }
}

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for DbAdapter {
    async fn user_for_session(&self, session_id: &str) -> PortResult<String> {
        let id = Uuid::parse_str(session_id).map_err(|_| PortError::Unauthorized)?;
        let user_id = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        user_id.ok_or(PortError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_uuid_ids_are_not_found() {
        assert!(matches!(
            parse_course_id("not-a-uuid"),
            Err(PortError::NotFound(_))
        ));
        let id = Uuid::new_v4();
        assert_eq!(parse_course_id(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn records_with_unknown_depth_are_rejected() {
        let record = CourseRecord {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            topic: "Rust".to_string(),
            depth: "45".to_string(),
            outline: String::new(),
            steps: Json(vec![]),
            created_at: Utc::now(),
        };
        assert!(record.to_domain().is_err());
    }
}
