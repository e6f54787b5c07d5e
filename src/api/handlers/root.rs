use crate::APP_USER_AGENT;
use axum::{http::StatusCode, response::IntoResponse};

// Undocumented root route; useful for load balancers that probe `/`.
pub async fn root() -> impl IntoResponse {
    (StatusCode::OK, APP_USER_AGENT)
}
