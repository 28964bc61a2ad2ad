//! Shared fixtures for the server's unit tests.

use async_trait::async_trait;
use domain::{Comment, CommentId, NewComment, Post, PostId, User, UserId};
use mailer::{Mailer, Template};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storage::{CommentStore, MemoryStore};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::realtime::TopicRegistry;
use crate::service::{CommentService, ServiceOptions};

pub fn post_p1() -> PostId {
    PostId::new("p1").unwrap()
}

pub fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

/// [`MemoryStore`] whose writes can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn upsert_post(&self, post: Post) {
        self.inner.upsert_post(post);
    }

    pub fn upsert_user(&self, user: User) {
        self.inner.upsert_user(user);
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("database is locked");
        }
        Ok(())
    }
}

#[async_trait]
impl CommentStore for FlakyStore {
    async fn find_post(&self, id: &PostId) -> anyhow::Result<Option<Post>> {
        self.inner.find_post(id).await
    }

    async fn find_user(&self, id: &UserId) -> anyhow::Result<Option<User>> {
        self.inner.find_user(id).await
    }

    async fn find_by_id(&self, id: &CommentId) -> anyhow::Result<Option<Comment>> {
        self.inner.find_by_id(id).await
    }

    async fn list_by_post(&self, post_id: &PostId) -> anyhow::Result<Vec<Comment>> {
        self.inner.list_by_post(post_id).await
    }

    async fn create(&self, new: NewComment) -> anyhow::Result<Comment> {
        self.check()?;
        self.inner.create(new).await
    }

    async fn update(&self, id: &CommentId, content: &str) -> anyhow::Result<Option<Comment>> {
        self.check()?;
        self.inner.update(id, content).await
    }

    async fn delete(&self, id: &CommentId) -> anyhow::Result<Vec<CommentId>> {
        self.check()?;
        self.inner.delete(id).await
    }

    async fn toggle_like_relation(&self, id: &CommentId, user: &UserId) -> anyhow::Result<bool> {
        self.check()?;
        self.inner.toggle_like_relation(id, user).await
    }

    async fn count_likes(&self, id: &CommentId) -> anyhow::Result<i64> {
        self.inner.count_likes(id).await
    }
}

struct ChannelMailer(mpsc::UnboundedSender<(String, Template)>);

#[async_trait]
impl Mailer for ChannelMailer {
    async fn send_notification(
        &self,
        recipient: &str,
        template: Template,
        _context: &Value,
    ) -> anyhow::Result<()> {
        let _ = self.0.send((recipient.to_string(), template));
        Ok(())
    }
}

pub struct Fixture {
    pub store: Arc<FlakyStore>,
    pub registry: Arc<TopicRegistry>,
    pub service: CommentService,
    mail_rx: mpsc::UnboundedReceiver<(String, Template)>,
    _cancel: tokio_util::sync::DropGuard,
}

impl Fixture {
    pub async fn next_mail(&mut self, within: Duration) -> Option<(String, Template)> {
        tokio::time::timeout(within, self.mail_rx.recv())
            .await
            .ok()
            .flatten()
    }
}

/// Post `p1` written by user `1`, plus users `42` and `7`.
pub fn fixture() -> Fixture {
    let store = Arc::new(FlakyStore::default());
    store.upsert_post(Post {
        id: post_p1(),
        author_id: user("1"),
        title: "Hello".into(),
    });
    for (id, name, email) in [
        ("1", "Author", "author@example.org"),
        ("42", "Ferris", "u42@example.org"),
        ("7", "Corro", "u7@example.org"),
    ] {
        store.upsert_user(User {
            id: user(id),
            display_name: name.into(),
            email: Some(email.into()),
        });
    }

    let (mail_tx, mail_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let (queue, _worker) = mailer::spawn(Arc::new(ChannelMailer(mail_tx)), 16, cancel.clone());

    let registry = Arc::new(TopicRegistry::new());
    let service = CommentService::new(
        store.clone(),
        registry.clone(),
        queue,
        ServiceOptions::default(),
    );

    Fixture {
        store,
        registry,
        service,
        mail_rx,
        _cancel: cancel.drop_guard(),
    }
}
