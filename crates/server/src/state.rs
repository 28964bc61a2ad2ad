use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Duration;

use crate::realtime::TopicRegistry;
use crate::service::CommentService;

#[derive(Clone)]
pub struct AppState {
    pub comments: CommentService,
    pub registry: Arc<TopicRegistry>,
    pub keep_alive: Duration,
}

impl FromRef<AppState> for CommentService {
    fn from_ref(state: &AppState) -> Self {
        state.comments.clone()
    }
}
