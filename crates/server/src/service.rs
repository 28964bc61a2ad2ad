use domain::{
    thread_comments, Comment, CommentId, CommentThread, LikeState, NewComment, Post, PostId,
    StreamEvent, UserId,
};
use mailer::{Notification, NotificationQueue, Template};
use std::future::Future;
use std::sync::Arc;
use storage::CommentStore;
use tracing::{debug, info, warn};

use crate::error::ServiceError;
use crate::realtime::{SubscriptionSession, TopicRegistry};

const EXCERPT_CHARS: usize = 140;

#[derive(Clone, Copy, Debug)]
pub struct ServiceOptions {
    pub max_content_length: usize,
    pub sink_capacity: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            max_content_length: 10_000,
            sink_capacity: 64,
        }
    }
}

/// Comment mutations and the live stream that follows them.
///
/// Every mutation persists first and publishes only once the store accepted
/// it. Mutations run on their own task so a caller that goes away cannot
/// leave a write committed but unpublished.
#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn CommentStore>,
    registry: Arc<TopicRegistry>,
    notifications: NotificationQueue,
    options: ServiceOptions,
}

impl CommentService {
    pub fn new(
        store: Arc<dyn CommentStore>,
        registry: Arc<TopicRegistry>,
        notifications: NotificationQueue,
        options: ServiceOptions,
    ) -> Self {
        Self {
            store,
            registry,
            notifications,
            options,
        }
    }

    pub async fn list_threads(&self, post_id: &PostId) -> Result<Vec<CommentThread>, ServiceError> {
        self.require_post(post_id).await?;
        let comments = self.store.list_by_post(post_id).await?;
        Ok(thread_comments(comments))
    }

    pub async fn open_stream(&self, post_id: PostId) -> Result<SubscriptionSession, ServiceError> {
        self.require_post(&post_id).await?;
        SubscriptionSession::open(
            self.registry.clone(),
            self.store.as_ref(),
            post_id,
            self.options.sink_capacity,
        )
        .await
    }

    pub async fn create(
        &self,
        post_id: PostId,
        author_id: UserId,
        content: String,
        parent_id: Option<CommentId>,
    ) -> Result<Comment, ServiceError> {
        let this = self.clone();
        detached(async move {
            let content = this.validate_content(&content)?;
            let post = this.require_post(&post_id).await?;

            let lane = this.registry.lane(&post_id).await;

            let parent = match parent_id {
                Some(pid) => match this.store.find_by_id(&pid).await? {
                    Some(p) if p.post_id == post_id => Some(p),
                    _ => return Err(ServiceError::InvalidParent),
                },
                None => None,
            };

            let comment = this
                .store
                .create(NewComment {
                    post_id: post_id.clone(),
                    parent_id: parent.as_ref().map(|p| p.id.clone()),
                    author_id,
                    content,
                })
                .await?;

            let delivered = this
                .registry
                .fanout(&post_id, StreamEvent::created(comment.clone()));
            drop(lane);

            info!(post_id = %post_id, comment_id = %comment.id, delivered, "comment created");

            let notifier = this.clone();
            let created = comment.clone();
            tokio::spawn(async move {
                notifier.notify(&post, parent.as_ref(), &created).await;
            });

            Ok(comment)
        })
        .await
    }

    pub async fn update(&self, comment_id: CommentId, content: String) -> Result<Comment, ServiceError> {
        let this = self.clone();
        detached(async move {
            let content = this.validate_content(&content)?;
            let existing = this.require_comment(&comment_id).await?;

            let lane = this.registry.lane(&existing.post_id).await;
            let comment = this
                .store
                .update(&comment_id, &content)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("comment {comment_id}")))?;
            let delivered = this
                .registry
                .fanout(&comment.post_id, StreamEvent::updated(comment.clone()));
            drop(lane);

            info!(post_id = %comment.post_id, comment_id = %comment.id, delivered, "comment updated");
            Ok(comment)
        })
        .await
    }

    /// Deletes the comment and all of its replies. Returns the removed ids in
    /// the order their `deleted` events were published.
    pub async fn delete(&self, comment_id: CommentId) -> Result<Vec<CommentId>, ServiceError> {
        let this = self.clone();
        detached(async move {
            let existing = this.require_comment(&comment_id).await?;
            let post_id = existing.post_id;

            let lane = this.registry.lane(&post_id).await;
            let removed = this.store.delete(&comment_id).await?;
            if removed.is_empty() {
                return Err(ServiceError::NotFound(format!("comment {comment_id}")));
            }
            for id in &removed {
                this.registry.fanout(
                    &post_id,
                    StreamEvent::Deleted {
                        post_id: post_id.clone(),
                        comment_id: id.clone(),
                    },
                );
            }
            drop(lane);

            info!(post_id = %post_id, comment_id = %comment_id, removed = removed.len(), "comment deleted");
            Ok(removed)
        })
        .await
    }

    /// Likes or unlikes. Like counts are read on demand and not broadcast.
    pub async fn toggle_like(&self, comment_id: CommentId, user_id: UserId) -> Result<LikeState, ServiceError> {
        let this = self.clone();
        detached(async move {
            let existing = this.require_comment(&comment_id).await?;

            // a delete may have committed while we waited for the lane
            let _lane = this.registry.lane(&existing.post_id).await;
            this.require_comment(&comment_id).await?;
            let liked = this.store.toggle_like_relation(&comment_id, &user_id).await?;
            let like_count = this.store.count_likes(&comment_id).await?;
            debug!(comment_id = %comment_id, user_id = %user_id, liked, like_count, "like toggled");
            Ok(LikeState { liked, like_count })
        })
        .await
    }

    async fn require_post(&self, post_id: &PostId) -> Result<Post, ServiceError> {
        self.store
            .find_post(post_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("post {post_id}")))
    }

    async fn require_comment(&self, comment_id: &CommentId) -> Result<Comment, ServiceError> {
        self.store
            .find_by_id(comment_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("comment {comment_id}")))
    }

    fn validate_content(&self, content: &str) -> Result<String, ServiceError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ServiceError::InvalidContent("content is empty".into()));
        }
        if content.chars().count() > self.options.max_content_length {
            return Err(ServiceError::InvalidContent(format!(
                "content exceeds {} characters",
                self.options.max_content_length
            )));
        }
        Ok(content.to_string())
    }

    async fn notify(&self, post: &Post, parent: Option<&Comment>, comment: &Comment) {
        let Some((recipient_id, template)) = recipient_for(post, parent, comment) else {
            return;
        };

        let recipient = match self.store.find_user(&recipient_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!(user_id = %recipient_id, "notification recipient unknown, skipping");
                return;
            }
            Err(e) => {
                warn!("notification recipient lookup failed: {:?}", e);
                return;
            }
        };
        let Some(email) = recipient.email else {
            debug!(user_id = %recipient_id, "notification recipient has no email, skipping");
            return;
        };

        let author_name = match self.store.find_user(&comment.author_id).await {
            Ok(Some(user)) => user.display_name,
            _ => comment.author_id.to_string(),
        };

        let context = serde_json::json!({
            "postId": post.id,
            "postTitle": post.title,
            "commentId": comment.id,
            "authorName": author_name,
            "recipientName": recipient.display_name,
            "excerpt": excerpt(&comment.content),
        });

        self.notifications.enqueue(Notification {
            recipient: email,
            template,
            context,
        });
    }
}

/// Who hears about a new comment: the post author for top-level comments,
/// the parent's author for replies. Nobody is told about their own comment.
fn recipient_for(post: &Post, parent: Option<&Comment>, comment: &Comment) -> Option<(UserId, Template)> {
    let (recipient, template) = match parent {
        Some(p) => (p.author_id.clone(), Template::NewReply),
        None => (post.author_id.clone(), Template::NewComment),
    };
    (recipient != comment.author_id).then_some((recipient, template))
}

fn excerpt(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

async fn detached<T, F>(fut: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(fut)
        .await
        .map_err(|e| ServiceError::Store(anyhow::Error::new(e).context("mutation task failed")))?
}
