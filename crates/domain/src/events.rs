use crate::models::{Comment, CommentId, PostId};
use crate::thread::CommentThread;
use serde::{Deserialize, Serialize};

/// One delivery unit on a post's comment stream.
///
/// Serialized with an internal `type` tag, e.g.
/// `{"type":"deleted","postId":"p1","commentId":"c1"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    #[serde(rename_all = "camelCase")]
    Initial {
        post_id: PostId,
        comments: Vec<CommentThread>,
    },
    #[serde(rename_all = "camelCase")]
    Created { post_id: PostId, comment: Comment },
    #[serde(rename_all = "camelCase")]
    Updated { post_id: PostId, comment: Comment },
    #[serde(rename_all = "camelCase")]
    Deleted {
        post_id: PostId,
        comment_id: CommentId,
    },
}

impl StreamEvent {
    pub fn created(comment: Comment) -> Self {
        Self::Created {
            post_id: comment.post_id.clone(),
            comment,
        }
    }

    pub fn updated(comment: Comment) -> Self {
        Self::Updated {
            post_id: comment.post_id.clone(),
            comment,
        }
    }

    pub fn post_id(&self) -> &PostId {
        match self {
            Self::Initial { post_id, .. }
            | Self::Created { post_id, .. }
            | Self::Updated { post_id, .. }
            | Self::Deleted { post_id, .. } => post_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Initial { .. } => "initial",
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::Deleted { .. } => "deleted",
        }
    }
}
