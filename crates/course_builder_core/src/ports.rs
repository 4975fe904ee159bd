//! crates/course_builder_core/src/ports.rs
//!
//! Defines the service contracts (traits) the course controller depends on.
//! These traits form the boundary of the hexagonal architecture: storage, the
//! AI generation backend, and the presentation layer are all plugged in from
//! the outside.

use async_trait::async_trait;

use crate::domain::{Course, Depth, NewCourse, Notification, OutlineStep, Step, ViewSnapshot};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    /// The caller's session is missing, unknown or expired.
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Port Payloads
//=========================================================================================

/// The only course fields the client ever writes back after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoursePatch {
    pub steps: Vec<Step>,
}

/// Inputs for answering a question about a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepQuestion {
    pub topic: String,
    pub step_title: String,
    pub step_content: String,
    pub question: String,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable storage for course records.
#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Lists all courses owned by `user_id`, in storage order.
    async fn list_courses_for_user(&self, user_id: &str) -> PortResult<Vec<Course>>;

    /// Stores a new course and returns the identifier assigned to it.
    async fn create_course(&self, course: NewCourse) -> PortResult<String>;

    /// Replaces the steps of a course owned by `user_id`.
    /// A course that does not exist or belongs to someone else is `NotFound`.
    async fn update_course(&self, user_id: &str, course_id: &str, patch: CoursePatch)
        -> PortResult<()>;

    async fn delete_course(&self, user_id: &str, course_id: &str) -> PortResult<()>;
}

/// Resolves sign-in sessions issued by the identity provider.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the user that owns a live session, or `Unauthorized`.
    async fn user_for_session(&self, session_id: &str) -> PortResult<String>;
}

/// The AI backend that writes courses and answers questions about them.
#[async_trait]
pub trait CourseGenerationService: Send + Sync {
    /// Produces an ordered outline for `topic` at the requested depth.
    async fn generate_course(&self, topic: &str, depth: Depth) -> PortResult<Vec<OutlineStep>>;

    /// Answers a free-text question about one step of a course.
    async fn answer_step_question(&self, input: &StepQuestion) -> PortResult<String>;
}

/// Receives everything the user should see. Implementations must not block.
pub trait ViewSink: Send + Sync {
    /// Called after every local state change with the full view.
    fn render(&self, view: ViewSnapshot);

    /// Shows a transient toast.
    fn notify(&self, notification: Notification);
}
