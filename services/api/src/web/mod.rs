pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

// Re-export the handlers the binary needs to build the web server router.
pub use middleware::require_user;
pub use rest::{answer_question_handler, generate_course_handler, list_courses_handler};
pub use ws_handler::ws_handler;
