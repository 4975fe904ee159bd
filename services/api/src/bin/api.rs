//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{course_llm::OpenAiCourseAdapter, db::DbAdapter},
    config::Config,
    error::ApiError,
    web::{
        answer_question_handler, generate_course_handler, list_courses_handler, require_user,
        rest::ApiDoc, state::AppState, ws_handler,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);

    let course_adapter = Arc::new(OpenAiCourseAdapter::new(
        openai_client,
        config.course_model.clone(),
        config.answer_model.clone(),
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        store: db_adapter.clone(),
        sessions: db_adapter,
        generator: course_adapter,
        config: config.clone(),
    });

    let allowed_origin = config.allowed_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!(
            "Invalid ALLOWED_ORIGIN '{}': {}",
            config.allowed_origin, e
        ))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Every API route needs a signed-in session.
    let protected_routes = Router::new()
        .route("/courses", get(list_courses_handler))
        .route("/actions/generate-course", post(generate_course_handler))
        .route("/actions/answer-question", post(answer_question_handler))
        .route("/ws", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_user,
        ));

    let api_router = Router::new()
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
