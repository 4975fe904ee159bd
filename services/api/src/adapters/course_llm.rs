//! services/api/src/adapters/course_llm.rs
//!
//! This module contains the adapter for the course-writing LLM.
//! It implements the `CourseGenerationService` port from the `core` crate.

const COURSE_INSTRUCTIONS: &str = r#"You are an expert teacher who designs short self-paced courses.

Given a TOPIC and a NUMBER OF STEPS, write a course that takes a beginner from the basics to a confident understanding of the topic.

Rules:
- Write EXACTLY the requested number of steps, numbered from 1 upwards in order.
- Each step has a short "title", a one-sentence "description", and a "content" body of two to four paragraphs written in plain, friendly language.
- You MAY add a "funFact" (one surprising sentence) to a step when you know a genuinely interesting one.
- You MAY add "externalLinks" (a list of objects with "title" and "url") pointing at reputable, long-lived resources. Never invent URLs.
- You MAY add a "quiz" object with a "questions" list; each question has "question", "options" (three or four strings) and "correctAnswer" (one of the options).
- Omit optional fields entirely when you have nothing good for them. Do not emit empty strings or empty lists.

Output:
- Respond with ONLY a JSON object of the form {"course": [ ...steps... ]}.
- Each step object has the keys "step", "title", "description", "content" and, optionally, "funFact", "externalLinks", "quiz".
- No markdown, no commentary."#;

const COURSE_INPUT_TEMPLATE: &str = r#"TOPIC:
{topic}

NUMBER OF STEPS:
{depth}"#;

const ANSWER_INSTRUCTIONS: &str = r#"You are a patient tutor helping a learner who is working through one step of a course.

Answer the learner's QUESTION using the STEP CONTENT as your main reference and your general knowledge of the COURSE TOPIC to fill gaps.

Style:
- Be clear and encouraging.
- Keep answers short: a few sentences, or a short list when steps or comparisons help.
- If the question has nothing to do with the course topic, say so briefly and steer back to the step."#;

const ANSWER_INPUT_TEMPLATE: &str = r#"COURSE TOPIC:
{topic}

STEP TITLE:
{step_title}

STEP CONTENT:
---
{step_content}
---

QUESTION:
{question}"#;

use async_openai::{
    config::OpenAIConfig, error::OpenAIError, types::responses::CreateResponseArgs, Client,
};
use async_trait::async_trait;
use course_builder_core::domain::{Depth, OutlineStep};
use course_builder_core::ports::{CourseGenerationService, PortError, PortResult, StepQuestion};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CourseGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiCourseAdapter {
    client: Client<OpenAIConfig>,
    course_model: String,
    answer_model: String,
}

/// The JSON envelope the course prompt asks for.
#[derive(Deserialize)]
struct GeneratedCourse {
    #[serde(default)]
    course: Vec<OutlineStep>,
}

impl OpenAiCourseAdapter {
    /// Creates a new `OpenAiCourseAdapter`.
    pub fn new(client: Client<OpenAIConfig>, course_model: String, answer_model: String) -> Self {
        Self {
            client,
            course_model,
            answer_model,
        }
    }

    async fn respond(
        &self,
        model: &str,
        instructions: &str,
        input: String,
        max_output_tokens: u32,
    ) -> PortResult<String> {
        let request = CreateResponseArgs::default()
            .model(model)
            .instructions(instructions)
            .input(input)
            .max_output_tokens(max_output_tokens)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .responses()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        Ok(response.output_text().unwrap_or_default())
    }
}

/// Parses the model's course JSON, tolerating a surrounding markdown code fence.
fn parse_course(raw: &str) -> PortResult<Vec<OutlineStep>> {
    let fence = Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$")
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
    let body = match fence.captures(raw) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => raw.trim(),
    };

    let parsed: GeneratedCourse = serde_json::from_str(body).map_err(|e| {
        PortError::Unexpected(format!("Course generation returned invalid JSON: {}", e))
    })?;

    // Drop optional fields the model filled with empty values.
    Ok(parsed
        .course
        .into_iter()
        .map(|mut step| {
            step.fun_fact = step.fun_fact.filter(|f| !f.trim().is_empty());
            step.external_links = step.external_links.filter(|l| !l.is_empty());
            step.quiz = step.quiz.filter(|q| !q.questions.is_empty());
            step
        })
        .collect())
}

//=========================================================================================
// `CourseGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CourseGenerationService for OpenAiCourseAdapter {
    /// Asks the model for a full course outline on `topic`.
    async fn generate_course(&self, topic: &str, depth: Depth) -> PortResult<Vec<OutlineStep>> {
        let input = COURSE_INPUT_TEMPLATE
            .replace("{topic}", topic)
            .replace("{depth}", depth.as_str());

        let raw = self
            .respond(&self.course_model, COURSE_INSTRUCTIONS, input, 16_000)
            .await?;
        debug!("Course model returned {} bytes", raw.len());

        let steps = parse_course(&raw)?;
        info!(
            "Course model produced {} of {} requested steps for '{}'",
            steps.len(),
            depth.step_count(),
            topic
        );
        Ok(steps)
    }

    /// Answers a learner's question about a single step.
    async fn answer_step_question(&self, input: &StepQuestion) -> PortResult<String> {
        let user_input = ANSWER_INPUT_TEMPLATE
            .replace("{topic}", &input.topic)
            .replace("{step_title}", &input.step_title)
            .replace("{step_content}", &input.step_content)
            .replace("{question}", &input.question);

        let answer = self
            .respond(&self.answer_model, ANSWER_INSTRUCTIONS, user_input, 1_000)
            .await?;

        let answer = answer.trim();
        if answer.is_empty() {
            return Err(PortError::Unexpected(
                "Answer LLM response contained no text content.".to_string(),
            ));
        }
        Ok(answer.to_string())
    }
}
