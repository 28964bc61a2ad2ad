use axum::{
    extract::{Path, State},
    Json,
};
use domain::{CommentId, LikeState, UserId};
use serde::Deserialize;

use crate::error::ServiceError;
use crate::service::CommentService;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLikeRequest {
    pub user_id: String,
}

pub async fn toggle_like(
    State(comments): State<CommentService>,
    Path(comment_id): Path<String>,
    Json(payload): Json<ToggleLikeRequest>,
) -> Result<Json<LikeState>, ServiceError> {
    let comment_id = CommentId::new(comment_id).map_err(ServiceError::InvalidId)?;
    let user_id = UserId::new(payload.user_id).map_err(ServiceError::InvalidId)?;
    Ok(Json(comments.toggle_like(comment_id, user_id).await?))
}
