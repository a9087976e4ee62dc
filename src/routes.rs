use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::handlers::{
    ads_handler, login_handler, root_handler, upload_ad_handler, upload_handler, videos_handler,
};
use crate::models::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/login", post(login_handler))
        .route("/upload", post(upload_handler))
        .route("/videos", get(videos_handler))
        .route("/upload_ad", post(upload_ad_handler))
        .route("/ads", get(ads_handler))
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
