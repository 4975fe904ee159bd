//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-connection view sink.

use crate::config::Config;
use crate::web::protocol::ServerMessage;
use course_builder_core::domain::{Notification, ViewSnapshot};
use course_builder_core::ports::{CourseGenerationService, CourseStore, SessionStore, ViewSink};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CourseStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub generator: Arc<dyn CourseGenerationService>,
    pub config: Arc<Config>,
}

/// The identity attached to a request by the `require_user` middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

//=========================================================================================
// WsViewSink (Specific to One WebSocket Connection)
//=========================================================================================

/// Forwards controller output to the connection's writer task.
pub struct WsViewSink {
    outbound: UnboundedSender<ServerMessage>,
}

impl WsViewSink {
    pub fn new(outbound: UnboundedSender<ServerMessage>) -> Self {
        Self { outbound }
    }

    fn send(&self, message: ServerMessage) {
        // The writer is gone once the client disconnects; late updates are dropped.
        if self.outbound.send(message).is_err() {
            debug!("Dropping view update for a closed connection.");
        }
    }
}

impl ViewSink for WsViewSink {
    fn render(&self, view: ViewSnapshot) {
        self.send(ServerMessage::View { view });
    }

    fn notify(&self, notification: Notification) {
        self.send(ServerMessage::Notification { notification });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_builder_core::domain::GenerationState;
    use tokio::sync::mpsc;

    #[test]
    fn sink_forwards_views_and_toasts_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = WsViewSink::new(tx);

        sink.notify(Notification::error("Sync error", "Reverted."));
        sink.render(ViewSnapshot {
            ready: true,
            courses: vec![],
            progress: vec![],
            active_course_id: None,
            generation: GenerationState::Idle,
        });

        assert!(matches!(rx.try_recv(), Ok(ServerMessage::Notification { .. })));
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::View { .. })));
    }

    #[test]
    fn closed_connection_does_not_panic() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        WsViewSink::new(tx).notify(Notification::info("Hello", "Nobody is listening."));
    }
}
