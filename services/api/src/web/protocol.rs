//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the course page in the
//! browser and the controller running for that connection.

use course_builder_core::domain::{Depth, Notification, StepPatch, ViewSnapshot};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// The user intents a client can forward to its controller.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The readiness signal. This must be the first message sent on the connection.
    Init,

    /// Re-fetches the course list from storage.
    Reload,

    /// Selects a course, or returns to the "new course" view with `null`.
    SelectCourse { course_id: Option<String> },

    GenerateCourse { topic: String, depth: Depth },

    /// Applies a partial update to one step, e.g. toggling `completed`.
    UpdateStep {
        course_id: String,
        step_number: u32,
        patch: StepPatch,
    },

    DeleteCourse { course_id: String },

    /// Asks a question about one step. `request_id` is echoed back with the answer.
    AskQuestion {
        request_id: String,
        course_id: String,
        step_number: u32,
        question: String,
    },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The full page state. Sent after every local change, including optimistic ones.
    View { view: ViewSnapshot },

    /// A transient toast.
    Notification { notification: Notification },

    Answer { request_id: String, answer: String },

    /// Reports a protocol error to the client.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_step_carries_a_partial_patch() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "update_step",
            "course_id": "c1",
            "step_number": 2,
            "patch": { "completed": true }
        }))
        .unwrap();

        assert_eq!(
            msg,
            ClientMessage::UpdateStep {
                course_id: "c1".to_string(),
                step_number: 2,
                patch: StepPatch::completed(true),
            }
        );
    }

    #[test]
    fn generate_course_accepts_numeric_depth_labels() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "generate_course",
            "topic": "Sourdough",
            "depth": "30"
        }))
        .unwrap();

        assert_eq!(
            msg,
            ClientMessage::GenerateCourse {
                topic: "Sourdough".to_string(),
                depth: Depth::Thirty,
            }
        );
        assert!(serde_json::from_value::<ClientMessage>(json!({
            "type": "generate_course",
            "topic": "Sourdough",
            "depth": "20"
        }))
        .is_err());
    }

    #[test]
    fn server_messages_are_tagged() {
        let json = serde_json::to_value(ServerMessage::Answer {
            request_id: "q1".to_string(),
            answer: "42".to_string(),
        })
        .unwrap();
        assert_eq!(json, json!({"type": "answer", "request_id": "q1", "answer": "42"}));
    }
}
