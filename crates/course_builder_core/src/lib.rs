pub mod actions;
pub mod controller;
pub mod domain;
pub mod optimistic;
pub mod ports;

pub use actions::{ActionError, GENERIC_FAILURE_MESSAGE};
pub use controller::{ControllerError, CourseController, FALLBACK_ANSWER, PLACEHOLDER_ANSWER};
pub use domain::{
    Course, CourseProgress, Depth, ExternalLink, GenerationState, NewCourse, Notification,
    NotificationLevel, OutlineStep, Quiz, QuizQuestion, Step, StepPatch, UserContext,
    ViewSnapshot,
};
pub use ports::{
    CourseGenerationService, CoursePatch, CourseStore, PortError, PortResult, SessionStore,
    StepQuestion, ViewSink,
};
