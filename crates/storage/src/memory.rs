use crate::CommentStore;
use async_trait::async_trait;
use chrono::Utc;
use domain::{Comment, CommentId, NewComment, Post, PostId, User, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct State {
    posts: HashMap<PostId, Post>,
    users: HashMap<UserId, User>,
    // insertion order doubles as creation order
    comments: Vec<Comment>,
    likes: HashSet<(CommentId, UserId)>,
}

impl State {
    fn like_count(&self, id: &CommentId) -> i64 {
        self.likes.iter().filter(|(c, _)| c == id).count() as i64
    }

    fn with_likes(&self, comment: &Comment) -> Comment {
        Comment {
            like_count: self.like_count(&comment.id),
            ..comment.clone()
        }
    }
}

/// Process-local [`CommentStore`]; contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn upsert_post(&self, post: Post) {
        self.state().posts.insert(post.id.clone(), post);
    }

    pub fn upsert_user(&self, user: User) {
        self.state().users.insert(user.id.clone(), user);
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn find_post(&self, id: &PostId) -> anyhow::Result<Option<Post>> {
        Ok(self.state().posts.get(id).cloned())
    }

    async fn find_user(&self, id: &UserId) -> anyhow::Result<Option<User>> {
        Ok(self.state().users.get(id).cloned())
    }

    async fn find_by_id(&self, id: &CommentId) -> anyhow::Result<Option<Comment>> {
        let state = self.state();
        Ok(state
            .comments
            .iter()
            .find(|c| &c.id == id)
            .map(|c| state.with_likes(c)))
    }

    async fn list_by_post(&self, post_id: &PostId) -> anyhow::Result<Vec<Comment>> {
        let state = self.state();
        Ok(state
            .comments
            .iter()
            .filter(|c| &c.post_id == post_id)
            .map(|c| state.with_likes(c))
            .collect())
    }

    async fn create(&self, new: NewComment) -> anyhow::Result<Comment> {
        let now = Utc::now().naive_utc();
        let comment = Comment {
            id: CommentId::generate(),
            post_id: new.post_id,
            parent_id: new.parent_id,
            author_id: new.author_id,
            content: new.content,
            like_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.state().comments.push(comment.clone());
        Ok(comment)
    }

    async fn update(&self, id: &CommentId, content: &str) -> anyhow::Result<Option<Comment>> {
        let mut state = self.state();
        let Some(comment) = state.comments.iter_mut().find(|c| &c.id == id) else {
            return Ok(None);
        };
        comment.content = content.to_string();
        comment.updated_at = Utc::now().naive_utc();
        let comment = comment.clone();
        Ok(Some(state.with_likes(&comment)))
    }

    async fn delete(&self, id: &CommentId) -> anyhow::Result<Vec<CommentId>> {
        let mut state = self.state();
        if !state.comments.iter().any(|c| &c.id == id) {
            return Ok(Vec::new());
        }

        // walk the subtree level by level, then emit the deepest level first
        let mut levels: Vec<Vec<CommentId>> = vec![vec![id.clone()]];
        loop {
            let Some(frontier) = levels.last() else { break };
            let next: Vec<CommentId> = state
                .comments
                .iter()
                .filter(|c| c.parent_id.as_ref().is_some_and(|p| frontier.contains(p)))
                .map(|c| c.id.clone())
                .collect();
            if next.is_empty() {
                break;
            }
            levels.push(next);
        }
        let removed: Vec<CommentId> = levels.into_iter().rev().flatten().collect();

        state.comments.retain(|c| !removed.contains(&c.id));
        state.likes.retain(|(c, _)| !removed.contains(c));
        Ok(removed)
    }

    async fn toggle_like_relation(&self, id: &CommentId, user: &UserId) -> anyhow::Result<bool> {
        let mut state = self.state();
        let key = (id.clone(), user.clone());
        if state.likes.remove(&key) {
            Ok(false)
        } else {
            state.likes.insert(key);
            Ok(true)
        }
    }

    async fn count_likes(&self, id: &CommentId) -> anyhow::Result<i64> {
        Ok(self.state().like_count(id))
    }
}
