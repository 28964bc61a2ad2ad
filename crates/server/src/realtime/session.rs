use domain::{thread_comments, PostId, StreamEvent};
use futures::Stream;
use std::sync::Arc;
use storage::CommentStore;
use tokio::sync::mpsc;
use tracing::info;

use super::registry::{SubscriptionHandle, TopicRegistry};
use crate::error::ServiceError;

/// One client's live view of a post's comments.
///
/// The first event is always the `initial` snapshot, followed by every event
/// published for the post afterwards. Dropping the session unregisters its
/// sink, whatever path the connection took to end.
pub struct SubscriptionSession {
    registry: Arc<TopicRegistry>,
    handle: SubscriptionHandle,
    rx: mpsc::Receiver<Arc<StreamEvent>>,
}

impl SubscriptionSession {
    pub async fn open(
        registry: Arc<TopicRegistry>,
        store: &dyn CommentStore,
        post_id: PostId,
        capacity: usize,
    ) -> Result<Self, ServiceError> {
        let (tx, rx) = mpsc::channel(capacity.max(1));

        // no mutation of this post can commit between snapshot and subscribe
        let lane = registry.lane(&post_id).await;
        let comments = store.list_by_post(&post_id).await?;
        let initial = StreamEvent::Initial {
            post_id: post_id.clone(),
            comments: thread_comments(comments),
        };
        // the queue is empty, so this only fails if rx is gone
        tx.try_send(Arc::new(initial))
            .map_err(|_| ServiceError::Unavailable)?;
        let handle = registry.subscribe(&post_id, tx)?;
        drop(lane);

        info!(post_id = %post_id, subscriber = handle.id(), "stream session opened");
        Ok(Self {
            registry,
            handle,
            rx,
        })
    }

    /// Waits for the next event. `None` once the sink was evicted or the
    /// registry shut down.
    pub async fn recv(&mut self) -> Option<Arc<StreamEvent>> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Arc<StreamEvent>> {
        self.rx.try_recv().ok()
    }

    pub fn into_stream(self) -> impl Stream<Item = Arc<StreamEvent>> + Send + 'static {
        futures::stream::unfold(self, |mut session| async move {
            let event = session.recv().await?;
            Some((event, session))
        })
    }
}

impl Drop for SubscriptionSession {
    fn drop(&mut self) {
        self.registry.unsubscribe(&self.handle);
        info!(
            post_id = %self.handle.post_id(),
            subscriber = self.handle.id(),
            "stream session closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{CommentId, NewComment, UserId};
    use futures::StreamExt;
    use storage::MemoryStore;

    fn post() -> PostId {
        PostId::new("p1").unwrap()
    }

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        let a = store
            .create(NewComment {
                post_id: post(),
                parent_id: None,
                author_id: UserId::new("42").unwrap(),
                content: "root".into(),
            })
            .await
            .unwrap();
        store
            .create(NewComment {
                post_id: post(),
                parent_id: Some(a.id),
                author_id: UserId::new("7").unwrap(),
                content: "reply".into(),
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn first_event_is_the_snapshot() {
        let store = seeded_store().await;
        let registry = Arc::new(TopicRegistry::new());
        let mut session = SubscriptionSession::open(registry.clone(), &store, post(), 8)
            .await
            .unwrap();

        let expected = thread_comments(store.list_by_post(&post()).await.unwrap());
        match session.recv().await.as_deref() {
            Some(StreamEvent::Initial { comments, .. }) => assert_eq!(comments, &expected),
            other => panic!("unexpected first event: {other:?}"),
        }
        assert_eq!(registry.subscriber_count(&post()), 1);
    }

    #[tokio::test]
    async fn snapshot_is_not_fanned_out() {
        let store = MemoryStore::new();
        let registry = Arc::new(TopicRegistry::new());
        let mut first = SubscriptionSession::open(registry.clone(), &store, post(), 8)
            .await
            .unwrap();
        assert!(first.try_recv().is_some());

        let _second = SubscriptionSession::open(registry.clone(), &store, post(), 8)
            .await
            .unwrap();
        assert!(first.try_recv().is_none());
    }

    #[tokio::test]
    async fn drop_unsubscribes() {
        let store = MemoryStore::new();
        let registry = Arc::new(TopicRegistry::new());
        let session = SubscriptionSession::open(registry.clone(), &store, post(), 8)
            .await
            .unwrap();
        assert_eq!(registry.subscriber_count(&post()), 1);

        drop(session);
        assert_eq!(registry.subscriber_count(&post()), 0);
        let ev = StreamEvent::Deleted {
            post_id: post(),
            comment_id: CommentId::new("c1").unwrap(),
        };
        assert_eq!(registry.fanout(&post(), ev), 0);
    }

    #[tokio::test]
    async fn stream_ends_on_shutdown_and_releases_sink() {
        let store = MemoryStore::new();
        let registry = Arc::new(TopicRegistry::new());
        let session = SubscriptionSession::open(registry.clone(), &store, post(), 8)
            .await
            .unwrap();
        let mut stream = Box::pin(session.into_stream());

        assert_eq!(stream.next().await.unwrap().kind(), "initial");
        registry.shutdown();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn open_after_shutdown_is_refused() {
        let store = MemoryStore::new();
        let registry = Arc::new(TopicRegistry::new());
        registry.shutdown();
        let res = SubscriptionSession::open(registry, &store, post(), 8).await;
        assert!(matches!(res, Err(ServiceError::Unavailable)));
    }
}
