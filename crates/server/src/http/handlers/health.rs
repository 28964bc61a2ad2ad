use crate::state::AppState;
use axum::{extract::State, Json};

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": if state.registry.is_closed() { "shutting_down" } else { "ok" },
        "topics": state.registry.topic_count(),
        "subscribers": state.registry.total_subscribers(),
    }))
}
