use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::{Comment, CommentId, CommentThread, PostId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::service::CommentService;

// --- DTOs ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub author_id: String,
    pub content: String,
    pub parent_id: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

#[derive(Serialize)]
pub struct DeleteCommentResponse {
    pub deleted: Vec<CommentId>,
}

// --- Handlers ---

pub async fn list_comments(
    State(comments): State<CommentService>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<CommentThread>>, ServiceError> {
    let post_id = PostId::new(post_id).map_err(ServiceError::InvalidId)?;
    Ok(Json(comments.list_threads(&post_id).await?))
}

pub async fn create_comment(
    State(comments): State<CommentService>,
    Path(post_id): Path<String>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ServiceError> {
    let post_id = PostId::new(post_id).map_err(ServiceError::InvalidId)?;
    let author_id = UserId::new(payload.author_id).map_err(ServiceError::InvalidId)?;
    // a malformed parent id can never match an existing comment
    let parent_id = payload
        .parent_id
        .map(|p| CommentId::new(p).map_err(|_| ServiceError::InvalidParent))
        .transpose()?;

    let comment = comments
        .create(post_id, author_id, payload.content, parent_id)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn update_comment(
    State(comments): State<CommentService>,
    Path(comment_id): Path<String>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, ServiceError> {
    let comment_id = CommentId::new(comment_id).map_err(ServiceError::InvalidId)?;
    Ok(Json(comments.update(comment_id, payload.content).await?))
}

pub async fn delete_comment(
    State(comments): State<CommentService>,
    Path(comment_id): Path<String>,
) -> Result<Json<DeleteCommentResponse>, ServiceError> {
    let comment_id = CommentId::new(comment_id).map_err(ServiceError::InvalidId)?;
    let deleted = comments.delete(comment_id).await?;
    Ok(Json(DeleteCommentResponse { deleted }))
}
