//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use course_builder_core::ports::{PortError, SessionStore};
use std::sync::Arc;
use tracing::{error, warn};

use crate::web::state::{AppState, CurrentUser};

/// The cookie the identity provider sets once the user has signed in.
pub const SESSION_COOKIE: &str = "session";

/// Middleware that validates the session cookie and stores the owner for handlers.
///
/// Browsers send the cookie on the WebSocket upgrade too, so `/ws` is covered.
/// If valid, inserts a `CurrentUser` into request extensions.
/// If missing or invalid, waits the configured grace delay and returns 401 Unauthorized,
/// which sends the client to its landing page.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user_id = match resolve_user(state.sessions.as_ref(), req.headers()).await {
        Ok(user_id) => user_id,
        Err(status) => {
            warn!("Rejected unauthenticated request to {}.", req.uri().path());
            tokio::time::sleep(state.config.auth_redirect_delay).await;
            return Err(status);
        }
    };

    req.extensions_mut().insert(CurrentUser(user_id));
    Ok(next.run(req).await)
}

/// Looks the session cookie up in the session store.
async fn resolve_user(sessions: &dyn SessionStore, headers: &HeaderMap) -> Result<String, StatusCode> {
    let session_id = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(session_from_cookie)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    sessions
        .user_for_session(session_id)
        .await
        .map_err(|e| {
            if e != PortError::Unauthorized {
                error!("Failed to validate session: {:?}", e);
            }
            StatusCode::UNAUTHORIZED
        })
}

fn session_from_cookie(cookie_header: &str) -> Option<&str> {
    cookie_header.split(';').find_map(|c| {
        let (name, value) = c.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use course_builder_core::ports::PortResult;

    struct OneSession;

    #[async_trait]
    impl SessionStore for OneSession {
        async fn user_for_session(&self, session_id: &str) -> PortResult<String> {
            match session_id {
                "s-1" => Ok("user-1".to_string()),
                "broken" => Err(PortError::Unexpected("db down".to_string())),
                _ => Err(PortError::Unauthorized),
            }
        }
    }

    fn cookie(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn session_is_read_from_the_cookie_header() {
        assert_eq!(session_from_cookie("session=abc"), Some("abc"));
        assert_eq!(session_from_cookie("theme=dark; session=abc"), Some("abc"));
        assert_eq!(session_from_cookie("session_old=abc"), None);
        assert_eq!(session_from_cookie("session="), None);
    }

    #[tokio::test]
    async fn a_live_session_resolves_to_its_owner() {
        let user = resolve_user(&OneSession, &cookie("theme=dark; session=s-1")).await;
        assert_eq!(user, Ok("user-1".to_string()));
    }

    #[tokio::test]
    async fn identity_headers_are_not_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("user-1"));
        assert_eq!(
            resolve_user(&OneSession, &headers).await,
            Err(StatusCode::UNAUTHORIZED)
        );
    }

    #[tokio::test]
    async fn unknown_or_unverifiable_sessions_are_rejected() {
        assert_eq!(
            resolve_user(&OneSession, &cookie("session=forged")).await,
            Err(StatusCode::UNAUTHORIZED)
        );
        assert_eq!(
            resolve_user(&OneSession, &cookie("session=broken")).await,
            Err(StatusCode::UNAUTHORIZED)
        );
    }
}
