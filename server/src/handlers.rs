use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};

use crate::state::AppState;

pub async fn ping_handler() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

pub async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    match tokio::fs::read_to_string(&state.index_file).await {
        Ok(contents) => Html(contents).into_response(),
        Err(error) => {
            tracing::error!(
                path = %state.index_file.display(),
                %error,
                "Failed to read index page"
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
