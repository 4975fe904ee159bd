pub mod course_llm;
pub mod db;

pub use course_llm::OpenAiCourseAdapter;
pub use db::DbAdapter;
