//! crates/course_builder_core/src/controller.rs
//!
//! The course page controller. It owns the in-memory course list, the active
//! selection and the generation lifecycle, and keeps them convergent with
//! storage through optimistic updates that are rolled back on failure.
//!
//! Every failure is caught here, logged, and turned into a toast on the
//! `ViewSink`. Methods still return a `Result` so callers can tell what happened.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::actions::{self, ActionError};
use crate::domain::{
    merge_step, Course, CourseProgress, Depth, GenerationState, NewCourse, Notification,
    StepPatch, UserContext, ViewSnapshot,
};
use crate::optimistic::{apply_optimistically, Outcome};
use crate::ports::{
    CourseGenerationService, CoursePatch, CourseStore, PortError, StepQuestion, ViewSink,
};

/// Returned by `ask_question` while the controller is not ready yet.
pub const PLACEHOLDER_ANSWER: &str = "Still getting things ready. Please ask again in a moment.";

/// Returned by `ask_question` when the answer could not be produced.
pub const FALLBACK_ANSWER: &str =
    "Sorry, I couldn't answer that question right now. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    #[error("The app is still loading. Please try again in a moment.")]
    NotReady,
    #[error("A course is already being generated.")]
    GenerationInProgress,
    #[error("{}", .0.user_message())]
    Action(#[from] ActionError),
    #[error("Storage error: {0}")]
    Storage(#[from] PortError),
    /// A local change was reverted because storage rejected it.
    #[error("Your changes could not be saved: {0}")]
    SyncFailed(PortError),
}

//=========================================================================================
// View State
//=========================================================================================

#[derive(Debug, Default)]
struct ViewState {
    user: Option<UserContext>,
    courses: Vec<Course>,
    active_course_id: Option<String>,
    generation: GenerationState,
}

impl ViewState {
    fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            ready: self.user.is_some(),
            courses: self.courses.clone(),
            progress: self
                .courses
                .iter()
                .map(|c| CourseProgress {
                    course_id: c.id.clone(),
                    completed_steps: c.completed_steps(),
                    total_steps: c.steps.len(),
                    percent: c.progress(),
                })
                .collect(),
            active_course_id: self.active_course_id.clone(),
            generation: self.generation,
        }
    }

    fn active_course(&self) -> Option<&Course> {
        let id = self.active_course_id.as_deref()?;
        self.course(id)
    }

    fn course(&self, course_id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == course_id)
    }

    fn position(&self, course_id: &str) -> Option<usize> {
        self.courses.iter().position(|c| c.id == course_id)
    }
}

//=========================================================================================
// The Controller
//=========================================================================================

pub struct CourseController {
    store: Arc<dyn CourseStore>,
    generator: Arc<dyn CourseGenerationService>,
    sink: Arc<dyn ViewSink>,
    state: Mutex<ViewState>,
}

impl CourseController {
    /// Creates a controller that is not ready yet. Call `ready` once the user is known.
    pub fn new(
        store: Arc<dyn CourseStore>,
        generator: Arc<dyn CourseGenerationService>,
        sink: Arc<dyn ViewSink>,
    ) -> Self {
        Self {
            store,
            generator,
            sink,
            state: Mutex::new(ViewState::default()),
        }
    }

    /// The readiness signal: records the signed-in user and loads their courses.
    pub async fn ready(&self, user: UserContext) -> Result<usize, ControllerError> {
        info!("Controller ready for user {}", user.user_id);
        {
            let mut state = self.state.lock().await;
            state.user = Some(user);
            self.publish(&state);
        }
        self.load_courses().await
    }

    pub async fn snapshot(&self) -> ViewSnapshot {
        self.state.lock().await.snapshot()
    }

    /// The active course, if the selected id still exists in the collection.
    pub async fn active_course(&self) -> Option<Course> {
        self.state.lock().await.active_course().cloned()
    }

    /// Selects a course, or clears the selection with `None`.
    /// Unknown ids are accepted and simply resolve to no active course.
    pub async fn select_course(&self, course_id: Option<String>) {
        let mut state = self.state.lock().await;
        state.active_course_id = course_id;
        self.publish(&state);
    }

    //-------------------------------------------------------------------------------------
    // Loading
    //-------------------------------------------------------------------------------------

    /// Replaces the local collection with the user's stored courses.
    /// On failure the current collection is kept.
    pub async fn load_courses(&self) -> Result<usize, ControllerError> {
        let user_id = self.user_id().await.ok_or(ControllerError::NotReady)?;

        match self.store.list_courses_for_user(&user_id).await {
            Ok(courses) => {
                let count = courses.len();
                let mut state = self.state.lock().await;
                state.courses = courses;
                self.publish(&state);
                info!("Loaded {} courses for user {}", count, user_id);
                Ok(count)
            }
            Err(e) => {
                error!("Failed to load courses for user {}: {:?}", user_id, e);
                self.sink.notify(Notification::error(
                    "Error loading courses",
                    "We couldn't fetch your saved courses. Please refresh the page.",
                ));
                Err(ControllerError::Storage(e))
            }
        }
    }

    //-------------------------------------------------------------------------------------
    // Generation
    //-------------------------------------------------------------------------------------

    /// Generates, stores and selects a new course.
    ///
    /// Moves the lifecycle `idle -> generating -> done`, or back to `idle` on
    /// any failure. A second start while one is running is refused.
    pub async fn generate_course(
        &self,
        topic: &str,
        depth: Depth,
    ) -> Result<Course, ControllerError> {
        let user_id = {
            let mut state = self.state.lock().await;
            let Some(user) = state.user.clone() else {
                drop(state);
                return Err(self.refuse_not_ready());
            };
            if state.generation == GenerationState::Generating {
                drop(state);
                warn!("Ignoring generation request while another is in flight");
                self.sink.notify(Notification::info(
                    "Please wait",
                    ControllerError::GenerationInProgress.to_string(),
                ));
                return Err(ControllerError::GenerationInProgress);
            }
            state.generation = GenerationState::Generating;
            self.publish(&state);
            user.user_id
        };

        match self.build_course(&user_id, topic, depth).await {
            Ok(course) => {
                let mut state = self.state.lock().await;
                state.courses.insert(0, course.clone());
                state.active_course_id = Some(course.id.clone());
                state.generation = GenerationState::Done;
                self.publish(&state);
                info!("Course {} created with {} steps", course.id, course.steps.len());
                Ok(course)
            }
            Err(e) => {
                error!("Course generation for '{}' failed: {:?}", topic, e);
                {
                    let mut state = self.state.lock().await;
                    state.generation = GenerationState::Idle;
                    self.publish(&state);
                }
                self.sink
                    .notify(Notification::error("Course generation failed", e.to_string()));
                Err(e)
            }
        }
    }

    async fn build_course(
        &self,
        user_id: &str,
        topic: &str,
        depth: Depth,
    ) -> Result<Course, ControllerError> {
        let outline =
            actions::generate_course_outline(self.generator.as_ref(), topic, depth).await?;
        let new_course = NewCourse::from_outline(user_id, topic.trim(), depth, outline);
        let course_id = self.store.create_course(new_course.clone()).await?;
        Ok(new_course.with_id(course_id))
    }

    //-------------------------------------------------------------------------------------
    // Optimistic Mutations
    //-------------------------------------------------------------------------------------

    /// Merges `patch` into one step, shows it immediately, then stores the new step list.
    /// If storage fails, the course is put back exactly as it was.
    pub async fn update_step(
        &self,
        course_id: &str,
        step_number: u32,
        patch: StepPatch,
    ) -> Result<(), ControllerError> {
        let Some(user_id) = self.user_id().await else {
            return Err(self.refuse_not_ready());
        };
        let store = self.store.clone();
        let outcome = apply_optimistically(
            &self.state,
            |state: &mut ViewState| {
                let index = state.position(course_id)?;
                let course = &mut state.courses[index];
                let snapshot = course.clone();
                course.steps = merge_step(&course.steps, step_number, &patch);
                Some((snapshot, course.steps.clone()))
            },
            |state| self.publish(state),
            |steps| async move {
                store
                    .update_course(&user_id, course_id, CoursePatch { steps })
                    .await
            },
            |state, snapshot| {
                if let Some(index) = state.position(course_id) {
                    state.courses[index] = snapshot;
                }
            },
        )
        .await;

        match outcome {
            Outcome::Skipped => {
                warn!("Step update for unknown course {} ignored", course_id);
                Ok(())
            }
            Outcome::Confirmed => Ok(()),
            Outcome::RolledBack(e) => {
                error!(
                    "Failed to sync step {} of course {}: {:?}",
                    step_number, course_id, e
                );
                self.sink.notify(Notification::error(
                    "Sync error",
                    "Your progress couldn't be saved, so the change was undone.",
                ));
                Err(ControllerError::SyncFailed(e))
            }
        }
    }

    /// Removes a course from view immediately, then deletes it from storage.
    /// If storage fails, the whole previous collection comes back in its old order.
    pub async fn delete_course(&self, course_id: &str) -> Result<(), ControllerError> {
        let Some(user_id) = self.user_id().await else {
            return Err(self.refuse_not_ready());
        };
        let store = self.store.clone();
        let outcome = apply_optimistically(
            &self.state,
            |state: &mut ViewState| {
                let index = state.position(course_id)?;
                let snapshot = (state.courses.clone(), state.active_course_id.clone());
                state.courses.remove(index);
                if state.active_course_id.as_deref() == Some(course_id) {
                    state.active_course_id = None;
                }
                Some((snapshot, ()))
            },
            |state| self.publish(state),
            |()| async move { store.delete_course(&user_id, course_id).await },
            |state, (courses, active_course_id)| {
                state.courses = courses;
                state.active_course_id = active_course_id;
            },
        )
        .await;

        match outcome {
            Outcome::Skipped => {
                warn!("Delete for unknown course {} ignored", course_id);
                Ok(())
            }
            Outcome::Confirmed => {
                info!("Course {} deleted", course_id);
                Ok(())
            }
            Outcome::RolledBack(e) => {
                error!("Failed to delete course {}: {:?}", course_id, e);
                self.sink.notify(Notification::error(
                    "Delete failed",
                    "The course couldn't be deleted and has been restored.",
                ));
                Err(ControllerError::SyncFailed(e))
            }
        }
    }

    //-------------------------------------------------------------------------------------
    // Question Answering
    //-------------------------------------------------------------------------------------

    /// Answers a question about one step. Never fails: problems produce a
    /// fixed fallback answer and a toast.
    pub async fn ask_question(&self, course_id: &str, step_number: u32, question: &str) -> String {
        let input = {
            let state = self.state.lock().await;
            if state.user.is_none() {
                return PLACEHOLDER_ANSWER.to_string();
            }
            let Some(course) = state.course(course_id) else {
                warn!("Question asked about unknown course {}", course_id);
                return FALLBACK_ANSWER.to_string();
            };
            let Some(step) = course.step(step_number) else {
                warn!(
                    "Question asked about unknown step {} of course {}",
                    step_number, course_id
                );
                return FALLBACK_ANSWER.to_string();
            };
            StepQuestion {
                topic: course.topic.clone(),
                step_title: step.title.clone(),
                step_content: step.content.clone(),
                question: question.to_string(),
            }
        };

        match actions::answer_step_question(self.generator.as_ref(), &input).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(
                    "Failed to answer question on step {} of course {}: {:?}",
                    step_number, course_id, e
                );
                let description = match e {
                    ActionError::EmptyQuestion => e.user_message(),
                    _ => "We couldn't get an answer to your question.".to_string(),
                };
                self.sink.notify(Notification::error("Error", description));
                FALLBACK_ANSWER.to_string()
            }
        }
    }

    //-------------------------------------------------------------------------------------
    // Helpers
    //-------------------------------------------------------------------------------------

    async fn user_id(&self) -> Option<String> {
        self.state.lock().await.user.as_ref().map(|u| u.user_id.clone())
    }

    fn refuse_not_ready(&self) -> ControllerError {
        self.sink.notify(Notification::error(
            "Not ready",
            ControllerError::NotReady.to_string(),
        ));
        ControllerError::NotReady
    }

    fn publish(&self, state: &ViewState) {
        self.sink.render(state.snapshot());
    }
}
