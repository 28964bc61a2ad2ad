use domain::{PostId, StreamEvent};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Write end of one subscriber's bounded event queue.
pub type Sink = mpsc::Sender<Arc<StreamEvent>>;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("topic registry is shut down")]
    Closed,
}

/// Returned by [`TopicRegistry::subscribe`]; the only way to unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    post_id: PostId,
    id: u64,
}

impl SubscriptionHandle {
    pub fn post_id(&self) -> &PostId {
        &self.post_id
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Default)]
struct Topic {
    sinks: Mutex<HashMap<u64, Sink>>,
    lane: Arc<AsyncMutex<()>>,
}

impl Topic {
    fn sinks(&self) -> MutexGuard<'_, HashMap<u64, Sink>> {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Post id -> live sinks.
///
/// The map itself is only locked to look up, insert or drop a topic. Each
/// topic guards its sinks with its own mutex, so fanouts on different posts
/// never wait on each other. Topics disappear once they have no sinks and no
/// one holds their write lane.
pub struct TopicRegistry {
    topics: RwLock<HashMap<PostId, Arc<Topic>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl Default for TopicRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<PostId, Arc<Topic>>> {
        self.topics.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<PostId, Arc<Topic>>> {
        self.topics.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn topic(&self, post_id: &PostId) -> Arc<Topic> {
        if let Some(topic) = self.read().get(post_id) {
            return topic.clone();
        }
        self.write().entry(post_id.clone()).or_default().clone()
    }

    fn prune(&self, post_id: &PostId) {
        let mut topics = self.write();
        let idle = topics
            .get(post_id)
            .is_some_and(|t| Arc::strong_count(t) == 1 && t.sinks().is_empty());
        if idle {
            topics.remove(post_id);
        }
    }

    pub fn subscribe(&self, post_id: &PostId, sink: Sink) -> Result<SubscriptionHandle, RegistryError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RegistryError::Closed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.topic(post_id).sinks().insert(id, sink);
        let handle = SubscriptionHandle {
            post_id: post_id.clone(),
            id,
        };

        // lost a race with shutdown()
        if self.closed.load(Ordering::Acquire) {
            self.unsubscribe(&handle);
            return Err(RegistryError::Closed);
        }

        debug!(post_id = %post_id, subscriber = id, "sink registered");
        Ok(handle)
    }

    /// Removes the sink. Unknown or already removed handles are ignored.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) {
        let Some(topic) = self.read().get(&handle.post_id).cloned() else {
            return;
        };
        let removed = topic.sinks().remove(&handle.id).is_some();
        drop(topic);

        if removed {
            debug!(post_id = %handle.post_id, subscriber = handle.id, "sink removed");
            self.prune(&handle.post_id);
        }
    }

    /// Pushes `event` to every sink registered under `post_id` right now and
    /// returns how many accepted it.
    ///
    /// Never waits on a subscriber: a sink whose queue is full or whose
    /// receiver is gone is dropped from the registry.
    pub fn fanout(&self, post_id: &PostId, event: StreamEvent) -> usize {
        let Some(topic) = self.read().get(post_id).cloned() else {
            return 0;
        };
        let event = Arc::new(event);
        let mut delivered = 0;
        let mut evicted = 0;

        topic.sinks().retain(|id, sink| match sink.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(post_id = %post_id, subscriber = *id, "subscriber too slow, evicting");
                evicted += 1;
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(post_id = %post_id, subscriber = *id, "subscriber gone, removing");
                evicted += 1;
                false
            }
        });
        drop(topic);

        if evicted > 0 {
            self.prune(post_id);
        }
        delivered
    }

    /// Serialises writers of one topic. Held across persist + publish by
    /// mutations and across snapshot + subscribe by new sessions.
    pub async fn lane(&self, post_id: &PostId) -> TopicLane<'_> {
        let topic = self.topic(post_id);
        let lane = topic.lane.clone();
        let mut guard = TopicLane {
            registry: self,
            post_id: post_id.clone(),
            topic: Some(topic),
            held: None,
        };
        guard.held = Some(lane.lock_owned().await);
        guard
    }

    pub fn subscriber_count(&self, post_id: &PostId) -> usize {
        self.read()
            .get(post_id)
            .map(|t| t.sinks().len())
            .unwrap_or(0)
    }

    pub fn topic_count(&self) -> usize {
        self.read().len()
    }

    pub fn total_subscribers(&self) -> usize {
        self.read().values().map(|t| t.sinks().len()).sum()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Drops every sink, which ends all open streams, and refuses new ones.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        let mut topics = self.write();
        let sinks: usize = topics.values().map(|t| t.sinks().len()).sum();
        for topic in topics.values() {
            topic.sinks().clear();
        }
        topics.clear();
        info!(sinks, "topic registry shut down");
    }
}

/// Exclusive write access to one topic; see [`TopicRegistry::lane`].
pub struct TopicLane<'a> {
    registry: &'a TopicRegistry,
    post_id: PostId,
    topic: Option<Arc<Topic>>,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for TopicLane<'_> {
    fn drop(&mut self) {
        self.held.take();
        self.topic.take();
        self.registry.prune(&self.post_id);
    }
}
