use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tasterec::{init_tracing, AppState, Config, ItemRating, Rating, RecError, UserId};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: String,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct UserSummary {
    user_id: UserId,
    exists: bool,
    ratings: Vec<Rating>,
}

fn status_for(e: &RecError) -> StatusCode {
    match e {
        RecError::InvalidInput(_) | RecError::UnknownItem(_) => StatusCode::BAD_REQUEST,
        RecError::Classifier(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn fail(context: &str, e: RecError) -> StatusCode {
    tracing::error!("{}: {}", context, e);
    status_for(&e)
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HashMap<String, String>>> {
    let snapshot = state.serving_service.snapshot();
    let mut status = HashMap::new();
    status.insert("status".to_string(), "healthy".to_string());
    status.insert("service".to_string(), "tasterec".to_string());
    status.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());
    status.insert("catalog_items".to_string(), snapshot.catalog().len().to_string());
    status.insert("known_users".to_string(), snapshot.similarity().len().to_string());

    Json(ApiResponse::success(status))
}

async fn get_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ApiResponse<tasterec::RecommendationResponse>>, StatusCode> {
    state
        .serving_service
        .recommendations_for(user_id)
        .await
        .map(|response| Json(ApiResponse::success(response)))
        .map_err(|e| fail("Failed to get recommendations", e))
}

async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ApiResponse<UserSummary>>, StatusCode> {
    let exists = state
        .serving_service
        .login(user_id)
        .await
        .map_err(|e| fail("Failed to look up user", e))?;
    let ratings = state
        .serving_service
        .ratings_for(user_id)
        .await
        .map_err(|e| fail("Failed to read ratings", e))?;

    Ok(Json(ApiResponse::success(UserSummary {
        user_id,
        exists,
        ratings,
    })))
}

async fn create_ratings(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(ratings): Json<Vec<ItemRating>>,
) -> Result<Json<ApiResponse<String>>, StatusCode> {
    state
        .serving_service
        .create_ratings(user_id, &ratings)
        .await
        .map_err(|e| fail("Failed to store ratings", e))?;

    Ok(Json(ApiResponse::success("Ratings stored".to_string())))
}

async fn update_ratings(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(ratings): Json<Vec<ItemRating>>,
) -> Result<Json<ApiResponse<String>>, StatusCode> {
    let updated = state
        .serving_service
        .update_ratings(user_id, &ratings)
        .await
        .map_err(|e| fail("Failed to update ratings", e))?;

    if !updated {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(ApiResponse::success("Ratings updated".to_string())))
}

async fn get_cold_start(State(state): State<AppState>) -> Json<ApiResponse<Vec<tasterec::Recommendation>>> {
    Json(ApiResponse::success(state.serving_service.cold_start_items()))
}

async fn get_stats(State(state): State<AppState>) -> Json<ApiResponse<HashMap<String, u64>>> {
    Json(ApiResponse::success(state.serving_service.stats()))
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/recommendations/:user_id", get(get_recommendations))
        .route("/users/:user_id", get(get_user))
        .route("/users/:user_id/ratings", axum::routing::put(create_ratings).post(update_ratings))
        .route("/cold-start", get(get_cold_start))
        .route("/stats", get(get_stats))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    let config = Config::load_or_default(&args.config)?;
    info!("Starting tasterec server with config: {:?}", config.server);

    let addr = config.server.socket_addr()?;
    let state = AppState::new(config).await?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
