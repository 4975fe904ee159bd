//! crates/course_builder_core/src/actions.rs
//!
//! Thin wrappers around the generation service that validate input and turn
//! "successful but useless" results into errors. Both the controller and the
//! REST endpoints go through these.

use tracing::{info, warn};

use crate::domain::{Depth, OutlineStep};
use crate::ports::{CourseGenerationService, PortError, StepQuestion};

/// Shown when a failure carries no usable message of its own.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("Please enter a topic for your course.")]
    EmptyTopic,
    #[error("Please enter a question.")]
    EmptyQuestion,
    /// The generation call succeeded but produced nothing usable.
    #[error("The AI could not build a course for this topic. Try rephrasing it or picking another topic.")]
    EmptyCourse,
    #[error("The generated course outline was malformed: {0}")]
    MalformedOutline(String),
    #[error("{0}")]
    Gateway(#[from] PortError),
}

impl ActionError {
    /// The message to put in front of the user.
    pub fn user_message(&self) -> String {
        match self {
            ActionError::Gateway(PortError::Unexpected(msg)) if msg.trim().is_empty() => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Generates a course outline and checks it is usable.
///
/// Rejects an empty topic before any network call, an empty outline, and an
/// outline whose step numbers are not strictly increasing positive integers.
pub async fn generate_course_outline(
    generator: &dyn CourseGenerationService,
    topic: &str,
    depth: Depth,
) -> Result<Vec<OutlineStep>, ActionError> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(ActionError::EmptyTopic);
    }

    info!("Generating a {}-step course on '{}'", depth.as_str(), topic);
    let outline = generator.generate_course(topic, depth).await?;

    if outline.is_empty() {
        warn!("Generation for '{}' returned zero steps", topic);
        return Err(ActionError::EmptyCourse);
    }
    validate_step_numbers(&outline)?;

    info!("Generated {} steps for '{}'", outline.len(), topic);
    Ok(outline)
}

/// Asks the generation service about one step.
pub async fn answer_step_question(
    generator: &dyn CourseGenerationService,
    input: &StepQuestion,
) -> Result<String, ActionError> {
    if input.question.trim().is_empty() {
        return Err(ActionError::EmptyQuestion);
    }
    let answer = generator.answer_step_question(input).await?;
    Ok(answer)
}

fn validate_step_numbers(outline: &[OutlineStep]) -> Result<(), ActionError> {
    let mut previous = 0;
    for entry in outline {
        if entry.step <= previous {
            return Err(ActionError::MalformedOutline(format!(
                "step {} follows step {}",
                entry.step, previous
            )));
        }
        previous = entry.step;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::ports::PortResult;

    struct ScriptedGenerator {
        outline: PortResult<Vec<OutlineStep>>,
        calls: Mutex<u32>,
    }

    impl ScriptedGenerator {
        fn returning(outline: PortResult<Vec<OutlineStep>>) -> Self {
            Self {
                outline,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl CourseGenerationService for ScriptedGenerator {
        async fn generate_course(&self, _topic: &str, _depth: Depth) -> PortResult<Vec<OutlineStep>> {
            *self.calls.lock().unwrap() += 1;
            self.outline.clone()
        }

        async fn answer_step_question(&self, input: &StepQuestion) -> PortResult<String> {
            Ok(format!("answer to {}", input.question))
        }
    }

    fn step(n: u32) -> OutlineStep {
        OutlineStep {
            step: n,
            title: format!("Step {}", n),
            description: String::new(),
            content: "body".to_string(),
            fun_fact: None,
            external_links: None,
            quiz: None,
        }
    }

    #[tokio::test]
    async fn empty_outline_is_a_user_facing_error() {
        let generator = ScriptedGenerator::returning(Ok(vec![]));

        let err = generate_course_outline(&generator, "X", Depth::Fifteen)
            .await
            .unwrap_err();

        assert_eq!(err, ActionError::EmptyCourse);
        let transport = ActionError::Gateway(PortError::Unexpected("connection reset".into()));
        assert_ne!(err.user_message(), transport.user_message());
    }

    #[tokio::test]
    async fn blank_topic_never_reaches_the_gateway() {
        let generator = ScriptedGenerator::returning(Ok(vec![step(1)]));

        let err = generate_course_outline(&generator, "   ", Depth::Thirty)
            .await
            .unwrap_err();

        assert_eq!(err, ActionError::EmptyTopic);
        assert_eq!(*generator.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn out_of_order_steps_are_rejected() {
        let generator = ScriptedGenerator::returning(Ok(vec![step(1), step(3), step(2)]));

        let err = generate_course_outline(&generator, "Rust", Depth::Fifteen)
            .await
            .unwrap_err();

        assert!(matches!(err, ActionError::MalformedOutline(_)));
    }

    #[tokio::test]
    async fn gateway_errors_keep_their_message() {
        let generator =
            ScriptedGenerator::returning(Err(PortError::Unexpected("rate limited".to_string())));

        let err = generate_course_outline(&generator, "Rust", Depth::Fifteen)
            .await
            .unwrap_err();

        assert!(err.user_message().contains("rate limited"));
        assert_eq!(
            ActionError::Gateway(PortError::Unexpected(String::new())).user_message(),
            GENERIC_FAILURE_MESSAGE
        );
    }

    #[tokio::test]
    async fn blank_questions_are_rejected() {
        let generator = ScriptedGenerator::returning(Ok(vec![]));
        let input = StepQuestion {
            topic: "Rust".to_string(),
            step_title: "Ownership".to_string(),
            step_content: String::new(),
            question: " ".to_string(),
        };

        let err = answer_step_question(&generator, &input).await.unwrap_err();
        assert_eq!(err, ActionError::EmptyQuestion);
    }
}
