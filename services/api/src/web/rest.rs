//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::{AppState, CurrentUser};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use course_builder_core::{
    actions::{self, ActionError},
    domain::{Course, Depth, OutlineStep},
    ports::StepQuestion,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_courses_handler,
        generate_course_handler,
        answer_question_handler,
    ),
    components(
        schemas(
            ListCoursesResponse,
            GenerateCourseRequest,
            GenerateCourseResponse,
            AnswerQuestionRequest,
            AnswerQuestionResponse,
        )
    ),
    tags(
        (name = "Course Builder API", description = "API endpoints for AI-generated step-by-step courses.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct ListCoursesResponse {
    #[schema(value_type = Vec<Object>)]
    courses: Vec<Course>,
}

#[derive(Deserialize, ToSchema)]
pub struct GenerateCourseRequest {
    topic: String,
    /// Either `"15"` or `"30"`.
    depth: String,
}

/// The generated outline. Nothing is stored by this endpoint.
#[derive(Serialize, ToSchema)]
pub struct GenerateCourseResponse {
    #[schema(value_type = Vec<Object>)]
    course: Vec<OutlineStep>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerQuestionRequest {
    topic: String,
    step_title: String,
    #[serde(default)]
    step_content: Option<String>,
    question: String,
}

#[derive(Serialize, ToSchema)]
pub struct AnswerQuestionResponse {
    answer: String,
}

/// Maps a validation or generation failure onto an HTTP status.
fn action_status(err: &ActionError) -> StatusCode {
    match err {
        ActionError::EmptyTopic | ActionError::EmptyQuestion => StatusCode::BAD_REQUEST,
        ActionError::EmptyCourse | ActionError::MalformedOutline(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ActionError::Gateway(_) => StatusCode::BAD_GATEWAY,
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the caller's stored courses, newest first.
#[utoipa::path(
    get,
    path = "/courses",
    responses(
        (status = 200, description = "The caller's courses", body = ListCoursesResponse),
        (status = 401, description = "Missing or invalid session"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("session" = String, Cookie, description = "The caller's sign-in session.")
    )
)]
pub async fn list_courses_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let courses = app_state
        .store
        .list_courses_for_user(&user_id)
        .await
        .map_err(|e| {
            error!("Failed to list courses for user {}: {:?}", user_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load courses".to_string(),
            )
        })?;

    Ok(Json(ListCoursesResponse { courses }))
}

/// Generate a course outline for a topic.
///
/// An outline with zero steps is reported as `422`, separately from upstream failures (`502`).
#[utoipa::path(
    post,
    path = "/actions/generate-course",
    request_body = GenerateCourseRequest,
    responses(
        (status = 200, description = "Outline generated", body = GenerateCourseResponse),
        (status = 400, description = "Bad request (e.g., empty topic or unknown depth)"),
        (status = 422, description = "The model produced no usable course"),
        (status = 502, description = "The generation service failed")
    ),
    params(
        ("session" = String, Cookie, description = "The caller's sign-in session.")
    )
)]
pub async fn generate_course_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<GenerateCourseRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let depth = req
        .depth
        .parse::<Depth>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    match actions::generate_course_outline(app_state.generator.as_ref(), &req.topic, depth).await
    {
        Ok(course) => Ok(Json(GenerateCourseResponse { course })),
        Err(e) => {
            error!("Failed to generate course for '{}': {:?}", req.topic, e);
            Err((action_status(&e), e.user_message()))
        }
    }
}

/// Answer a question about one course step.
#[utoipa::path(
    post,
    path = "/actions/answer-question",
    request_body = AnswerQuestionRequest,
    responses(
        (status = 200, description = "Answer generated", body = AnswerQuestionResponse),
        (status = 400, description = "Bad request (e.g., empty question)"),
        (status = 502, description = "The generation service failed")
    ),
    params(
        ("session" = String, Cookie, description = "The caller's sign-in session.")
    )
)]
pub async fn answer_question_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<AnswerQuestionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let input = StepQuestion {
        topic: req.topic,
        step_title: req.step_title,
        step_content: req.step_content.unwrap_or_default(),
        question: req.question,
    };

    match actions::answer_step_question(app_state.generator.as_ref(), &input).await {
        Ok(answer) => Ok(Json(AnswerQuestionResponse { answer })),
        Err(e) => {
            error!("Failed to answer question on '{}': {:?}", input.step_title, e);
            Err((action_status(&e), e.user_message()))
        }
    }
}
