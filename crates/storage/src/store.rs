use crate::Db;
use async_trait::async_trait;
use domain::{Comment, CommentId, NewComment, Post, PostId, User, UserId};

/// Durable comment CRUD consumed by the comment service.
///
/// Implementations own their transactional integrity; callers treat every
/// error as transient.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn find_post(&self, id: &PostId) -> anyhow::Result<Option<Post>>;

    async fn find_user(&self, id: &UserId) -> anyhow::Result<Option<User>>;

    async fn find_by_id(&self, id: &CommentId) -> anyhow::Result<Option<Comment>>;

    /// All comments of a post, oldest first.
    async fn list_by_post(&self, post_id: &PostId) -> anyhow::Result<Vec<Comment>>;

    async fn create(&self, new: NewComment) -> anyhow::Result<Comment>;

    /// Replaces the content and bumps `updated_at`. `None` if absent.
    async fn update(&self, id: &CommentId, content: &str) -> anyhow::Result<Option<Comment>>;

    /// Cascading delete. Removed ids come back deepest-first; empty if absent.
    async fn delete(&self, id: &CommentId) -> anyhow::Result<Vec<CommentId>>;

    /// Returns whether the user likes the comment after the toggle.
    async fn toggle_like_relation(&self, id: &CommentId, user: &UserId) -> anyhow::Result<bool>;

    async fn count_likes(&self, id: &CommentId) -> anyhow::Result<i64>;
}

#[async_trait]
impl CommentStore for Db {
    async fn find_post(&self, id: &PostId) -> anyhow::Result<Option<Post>> {
        self.get_post(id).await
    }

    async fn find_user(&self, id: &UserId) -> anyhow::Result<Option<User>> {
        self.get_user(id).await
    }

    async fn find_by_id(&self, id: &CommentId) -> anyhow::Result<Option<Comment>> {
        self.get_comment(id).await
    }

    async fn list_by_post(&self, post_id: &PostId) -> anyhow::Result<Vec<Comment>> {
        self.list_comments(post_id).await
    }

    async fn create(&self, new: NewComment) -> anyhow::Result<Comment> {
        self.insert_comment(new).await
    }

    async fn update(&self, id: &CommentId, content: &str) -> anyhow::Result<Option<Comment>> {
        self.update_comment_content(id, content).await
    }

    async fn delete(&self, id: &CommentId) -> anyhow::Result<Vec<CommentId>> {
        self.delete_comment_tree(id).await
    }

    async fn toggle_like_relation(&self, id: &CommentId, user: &UserId) -> anyhow::Result<bool> {
        self.toggle_like(id, user).await
    }

    async fn count_likes(&self, id: &CommentId) -> anyhow::Result<i64> {
        Db::count_likes(self, id).await
    }
}
