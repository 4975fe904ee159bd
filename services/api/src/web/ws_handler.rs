//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! Each connection owns one `CourseController`; client messages are user intents
//! and every state change is pushed back as a `ServerMessage`.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, CurrentUser, WsViewSink},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use course_builder_core::{controller::CourseController, domain::UserContext};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, info, warn};

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user_id: String) {
    info!("New WebSocket connection established for user: {}", user_id);

    let (sender, mut receiver) = socket.split();
    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_outbound(sender, outbound_rx));

    let controller = Arc::new(CourseController::new(
        app_state.store.clone(),
        app_state.generator.clone(),
        Arc::new(WsViewSink::new(outbound.clone())),
    ));

    // --- 1. Initialization Phase ---
    match receiver.next().await {
        Some(Ok(Message::Text(init_json))) => match serde_json::from_str::<ClientMessage>(&init_json) {
            Ok(ClientMessage::Init) => {
                // A failed load has already been reported to the client as a toast.
                if let Err(e) = controller.ready(UserContext { user_id: user_id.clone() }).await {
                    warn!("Initial course load failed for user {}: {}", user_id, e);
                }
            }
            _ => {
                error!("First message was not a valid Init message.");
                send_error(&outbound, "The first message must be 'init'.");
                // Release every sender so the writer flushes the error and stops.
                drop(controller);
                drop(outbound);
                let _ = writer.await;
                return;
            }
        },
        _ => {
            error!("Client disconnected before sending Init message.");
            writer.abort();
            return;
        }
    }

    // --- 2. Main Message Loop ---
    loop {
        if let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => {
                        // Each intent runs on its own task so the loop keeps reading
                        // while storage and generation calls are in flight.
                        tokio::spawn(handle_intent(
                            client_msg,
                            controller.clone(),
                            outbound.clone(),
                        ));
                    }
                    Err(e) => {
                        warn!("Failed to deserialize client message: {:?}", e);
                        send_error(&outbound, "Unrecognized message.");
                    }
                },
                Message::Close(_) => {
                    info!("Client sent close message.");
                    break;
                }
                _ => {}
            }
        } else {
            info!("Client disconnected.");
            break;
        }
    }

    // --- 3. Cleanup ---
    // In-flight intents keep their own controller handle and finish their storage calls.
    writer.abort();
    info!("WebSocket connection closed for user {}.", user_id);
}

/// Dispatches one client intent to the controller.
async fn handle_intent(
    msg: ClientMessage,
    controller: Arc<CourseController>,
    outbound: UnboundedSender<ServerMessage>,
) {
    // Controller failures have already been logged and shown as toasts.
    match msg {
        ClientMessage::Init => {
            warn!("Ignoring repeated Init message.");
        }
        ClientMessage::Reload => {
            let _ = controller.load_courses().await;
        }
        ClientMessage::SelectCourse { course_id } => {
            controller.select_course(course_id).await;
        }
        ClientMessage::GenerateCourse { topic, depth } => {
            let _ = controller.generate_course(&topic, depth).await;
        }
        ClientMessage::UpdateStep {
            course_id,
            step_number,
            patch,
        } => {
            let _ = controller.update_step(&course_id, step_number, patch).await;
        }
        ClientMessage::DeleteCourse { course_id } => {
            let _ = controller.delete_course(&course_id).await;
        }
        ClientMessage::AskQuestion {
            request_id,
            course_id,
            step_number,
            question,
        } => {
            let answer = controller
                .ask_question(&course_id, step_number, &question)
                .await;
            if outbound
                .send(ServerMessage::Answer { request_id, answer })
                .is_err()
            {
                warn!("Client disconnected before the answer was ready.");
            }
        }
    }
}

/// Drains the outbound queue onto the socket until every sender is gone.
async fn write_outbound(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound: UnboundedReceiver<ServerMessage>,
) {
    while let Some(msg) = outbound.recv().await {
        let json = match serde_json::to_string(&msg) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize server message: {:?}", e);
                continue;
            }
        };
        if sender.send(Message::Text(json.into())).await.is_err() {
            warn!("Failed to send message. Client may have disconnected.");
            break;
        }
    }
}

fn send_error(outbound: &UnboundedSender<ServerMessage>, message: &str) {
    let _ = outbound.send(ServerMessage::Error {
        message: message.to_string(),
    });
}
