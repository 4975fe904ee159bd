//! crates/course_builder_core/src/domain.rs
//!
//! Defines the core data structures for courses, their steps, and the
//! transient view state the controller publishes.
//! Types derive `serde` so the same shapes travel to storage and to the client
//! without a lossy mapping layer; optional enrichments stay `Option`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Course Depth
//=========================================================================================

/// The fixed set of course lengths a user can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Depth {
    #[serde(rename = "15")]
    Fifteen,
    #[serde(rename = "30")]
    Thirty,
}

impl Depth {
    /// Number of steps a course of this depth is expected to contain.
    pub fn step_count(self) -> u32 {
        match self {
            Depth::Fifteen => 15,
            Depth::Thirty => 30,
        }
    }

    /// The wire label used by the generation gateway (`"15"` or `"30"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Depth::Fifteen => "15",
            Depth::Thirty => "30",
        }
    }
}

impl std::str::FromStr for Depth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "15" => Ok(Depth::Fifteen),
            "30" => Ok(Depth::Thirty),
            other => Err(format!("'{}' is not a supported course depth", other)),
        }
    }
}

//=========================================================================================
// Step Enrichments
//=========================================================================================

/// A link to further reading attached to a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLink {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// An optional self-check attached to a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub questions: Vec<QuizQuestion>,
}

//=========================================================================================
// Generation Output
//=========================================================================================

/// One entry of a course outline as produced by the generation gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineStep {
    pub step: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fun_fact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_links: Option<Vec<ExternalLink>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Quiz>,
}

//=========================================================================================
// Steps
//=========================================================================================

/// A single unit of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub step_number: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub content: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fun_fact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_links: Option<Vec<ExternalLink>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Quiz>,
}

impl From<OutlineStep> for Step {
    fn from(outline: OutlineStep) -> Self {
        Self {
            step_number: outline.step,
            title: outline.title,
            description: outline.description,
            content: outline.content,
            completed: false,
            fun_fact: outline.fun_fact,
            external_links: outline.external_links,
            quiz: outline.quiz,
        }
    }
}

/// A partial update to a step. Absent fields leave the step untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fun_fact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_links: Option<Vec<ExternalLink>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Quiz>,
}

impl StepPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }
}

impl Step {
    /// Returns a copy of this step with every field present in `patch` applied.
    pub fn merged(&self, patch: &StepPatch) -> Step {
        let mut step = self.clone();
        if let Some(title) = &patch.title {
            step.title = title.clone();
        }
        if let Some(description) = &patch.description {
            step.description = description.clone();
        }
        if let Some(content) = &patch.content {
            step.content = content.clone();
        }
        if let Some(completed) = patch.completed {
            step.completed = completed;
        }
        if let Some(fun_fact) = &patch.fun_fact {
            step.fun_fact = Some(fun_fact.clone());
        }
        if let Some(links) = &patch.external_links {
            step.external_links = Some(links.clone());
        }
        if let Some(quiz) = &patch.quiz {
            step.quiz = Some(quiz.clone());
        }
        step
    }
}

/// Applies `patch` to the step numbered `step_number`, leaving the others as they are.
/// An unknown step number yields an unchanged copy of `steps`.
pub fn merge_step(steps: &[Step], step_number: u32, patch: &StepPatch) -> Vec<Step> {
    steps
        .iter()
        .map(|step| {
            if step.step_number == step_number {
                step.merged(patch)
            } else {
                step.clone()
            }
        })
        .collect()
}

//=========================================================================================
// Courses
//=========================================================================================

/// A course that has not been stored yet and therefore has no identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    pub user_id: String,
    pub topic: String,
    pub depth: Depth,
    pub outline: String,
    pub steps: Vec<Step>,
    pub created_at: DateTime<Utc>,
}

impl NewCourse {
    /// Builds a course from a generated outline. Every step starts incomplete.
    pub fn from_outline(
        user_id: impl Into<String>,
        topic: impl Into<String>,
        depth: Depth,
        outline: Vec<OutlineStep>,
    ) -> Self {
        let summary = summarize_outline(&outline);
        Self {
            user_id: user_id.into(),
            topic: topic.into(),
            depth,
            outline: summary,
            steps: outline.into_iter().map(Step::from).collect(),
            created_at: Utc::now(),
        }
    }

    /// Attaches the identifier assigned by storage.
    pub fn with_id(self, id: impl Into<String>) -> Course {
        Course {
            id: id.into(),
            user_id: self.user_id,
            topic: self.topic,
            depth: self.depth,
            outline: self.outline,
            steps: self.steps,
            created_at: self.created_at,
        }
    }
}

/// A generated curriculum for a topic, composed of ordered steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub user_id: String,
    pub topic: String,
    pub depth: Depth,
    pub outline: String,
    pub steps: Vec<Step>,
    pub created_at: DateTime<Utc>,
}

impl Course {
    pub fn step(&self, step_number: u32) -> Option<&Step> {
        self.steps.iter().find(|s| s.step_number == step_number)
    }

    pub fn completed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.completed).count()
    }

    /// Completion percentage in `0..=100`, rounded down.
    pub fn progress(&self) -> u8 {
        if self.steps.is_empty() {
            return 0;
        }
        ((self.completed_steps() * 100) / self.steps.len()) as u8
    }

    /// Number of entries declared by the outline summary.
    pub fn outline_step_count(&self) -> usize {
        self.outline.lines().filter(|l| !l.trim().is_empty()).count()
    }
}

/// The outline summary is one numbered line per step: `"3. Title"`.
/// Titles are folded onto a single line so the line count always matches the steps.
fn summarize_outline(outline: &[OutlineStep]) -> String {
    outline
        .iter()
        .map(|s| {
            let title = s.title.split_whitespace().collect::<Vec<_>>().join(" ");
            format!("{}. {}", s.step, title)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

//=========================================================================================
// View State
//=========================================================================================

/// Lifecycle of a single course generation request. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    #[default]
    Idle,
    Generating,
    Done,
}

/// The identity of the signed-in user, handed to the controller when it becomes ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// A transient toast shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Progress figures for one course, sent alongside the course list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub course_id: String,
    pub completed_steps: usize,
    pub total_steps: usize,
    pub percent: u8,
}

/// Everything the presentation layer needs to render the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    pub ready: bool,
    pub courses: Vec<Course>,
    pub progress: Vec<CourseProgress>,
    pub active_course_id: Option<String>,
    pub generation: GenerationState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline_step(step: u32, title: &str) -> OutlineStep {
        OutlineStep {
            step,
            title: title.to_string(),
            description: format!("about {}", title),
            content: format!("content of {}", title),
            fun_fact: None,
            external_links: None,
            quiz: None,
        }
    }

    #[test]
    fn optional_enrichments_are_copied_only_when_present() {
        let mut with_extras = outline_step(1, "Intro");
        with_extras.fun_fact = Some("Octopuses have three hearts.".to_string());
        with_extras.external_links = Some(vec![ExternalLink {
            title: "Docs".to_string(),
            url: "https://example.com".to_string(),
        }]);

        let plain = Step::from(outline_step(2, "Next"));
        let rich = Step::from(with_extras);

        assert!(!rich.completed);
        assert_eq!(rich.fun_fact.as_deref(), Some("Octopuses have three hearts."));
        assert_eq!(rich.external_links.as_ref().map(Vec::len), Some(1));
        assert!(rich.quiz.is_none());
        assert!(plain.fun_fact.is_none());
        assert!(plain.external_links.is_none());
    }

    #[test]
    fn absent_enrichments_are_not_serialized() {
        let step = Step::from(outline_step(1, "Intro"));
        let json = serde_json::to_value(&step).unwrap();
        assert!(json.get("funFact").is_none());
        assert!(json.get("externalLinks").is_none());
        assert!(json.get("quiz").is_none());

        let back: Step = serde_json::from_value(json).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn merge_step_only_touches_the_matching_step() {
        let steps: Vec<Step> = vec![outline_step(1, "A"), outline_step(2, "B")]
            .into_iter()
            .map(Step::from)
            .collect();

        let merged = merge_step(&steps, 2, &StepPatch::completed(true));
        assert!(!merged[0].completed);
        assert!(merged[1].completed);
        assert_eq!(merged[1].title, "B");

        let untouched = merge_step(&steps, 9, &StepPatch::completed(true));
        assert_eq!(untouched, steps);
    }

    #[test]
    fn outline_summary_declares_one_line_per_step() {
        let course = NewCourse::from_outline(
            "user-1",
            "Rust",
            Depth::Fifteen,
            vec![outline_step(1, "Ownership"), outline_step(2, "Borrowing")],
        )
        .with_id("c1");

        assert_eq!(course.outline, "1. Ownership\n2. Borrowing");
        assert_eq!(course.outline_step_count(), course.steps.len());
    }

    #[test]
    fn multi_line_titles_still_declare_one_line_per_step() {
        let course = NewCourse::from_outline(
            "user-1",
            "Rust",
            Depth::Fifteen,
            vec![outline_step(1, "Intro\nand  setup\n"), outline_step(2, "Next")],
        )
        .with_id("c1");

        assert_eq!(course.outline, "1. Intro and setup\n2. Next");
        assert_eq!(course.outline_step_count(), course.steps.len());
        assert_eq!(course.steps[0].title, "Intro\nand  setup\n");
    }

    #[test]
    fn progress_rounds_down() {
        let mut course = NewCourse::from_outline(
            "user-1",
            "Rust",
            Depth::Fifteen,
            vec![outline_step(1, "A"), outline_step(2, "B"), outline_step(3, "C")],
        )
        .with_id("c1");
        assert_eq!(course.progress(), 0);

        course.steps[0].completed = true;
        assert_eq!(course.completed_steps(), 1);
        assert_eq!(course.progress(), 33);
    }

    #[test]
    fn depth_uses_numeric_labels() {
        assert_eq!(serde_json::to_string(&Depth::Thirty).unwrap(), "\"30\"");
        assert_eq!("15".parse::<Depth>().unwrap(), Depth::Fifteen);
        assert!("20".parse::<Depth>().is_err());
        assert_eq!(Depth::Thirty.step_count(), 30);
    }
}
