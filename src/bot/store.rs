//! In-memory per-chat conversation state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::generation::GenerationResult;

/// Default number of chats kept before the least recently used is dropped.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Idle per-chat locks are pruned once the map grows past this size.
const LOCK_PRUNE_THRESHOLD: usize = 1024;

/// The most recent generated code for one chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    pub chat_id: i64,
    pub code: String,
    pub language: String,
    pub updated_at: DateTime<Utc>,
    /// Message id of the bot's reply carrying the code.
    pub last_reply_id: Option<i64>,
}

struct Slot {
    session: ChatSession,
    /// Logical clock value of the last read or write.
    touched: u64,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<i64, Slot>,
    /// Touch time → chat id, oldest first.
    recency: BTreeMap<u64, i64>,
    clock: u64,
}

impl Inner {
    /// Advance the clock and move the chat to the newest position.
    fn touch(&mut self, chat_id: i64, previous: Option<u64>) -> u64 {
        if let Some(previous) = previous {
            self.recency.remove(&previous);
        }
        self.clock += 1;
        self.recency.insert(self.clock, chat_id);
        self.clock
    }

    fn evict_oldest(&mut self) -> Option<i64> {
        let (_, chat_id) = self.recency.pop_first()?;
        self.sessions.remove(&chat_id);
        Some(chat_id)
    }
}

/// Chat id → session map, bounded with least-recently-used eviction.
pub struct ConversationStore {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl ConversationStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Replace the chat's session with the given result.
    pub async fn put(&self, chat_id: i64, result: &GenerationResult) -> ChatSession {
        let mut inner = self.inner.lock().await;
        let previous = inner.sessions.get(&chat_id).map(|slot| slot.touched);

        if previous.is_none() && inner.sessions.len() >= self.capacity {
            if let Some(id) = inner.evict_oldest() {
                debug!("Evicted session for chat {id}");
            }
        }
        let touched = inner.touch(chat_id, previous);

        let session = ChatSession {
            chat_id,
            code: result.code.clone(),
            language: result.language.clone(),
            updated_at: Utc::now(),
            last_reply_id: None,
        };
        inner.sessions.insert(
            chat_id,
            Slot {
                session: session.clone(),
                touched,
            },
        );
        session
    }

    /// Current session for the chat. `None` means nothing generated yet.
    pub async fn get(&self, chat_id: i64) -> Option<ChatSession> {
        let mut inner = self.inner.lock().await;
        let previous = inner.sessions.get(&chat_id)?.touched;
        let touched = inner.touch(chat_id, Some(previous));
        let slot = inner.sessions.get_mut(&chat_id)?;
        slot.touched = touched;
        Some(slot.session.clone())
    }

    /// Remember which bot message carried the chat's code.
    pub async fn set_reply_id(&self, chat_id: i64, message_id: i64) {
        let mut inner = self.inner.lock().await;
        if let Some(slot) = inner.sessions.get_mut(&chat_id) {
            slot.session.last_reply_id = Some(message_id);
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// One async lock per chat, so a chat's requests run one at a time.
#[derive(Default)]
pub struct ChatLocks {
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    /// Wait for the chat's lock. Held until the guard is dropped.
    pub async fn acquire(&self, chat_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            if locks.len() >= LOCK_PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(chat_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result(code: &str, language: &str) -> GenerationResult {
        GenerationResult {
            code: code.to_string(),
            language: language.to_string(),
            raw: code.to_string(),
        }
    }

    #[tokio::test]
    async fn test_get_absent() {
        let store = ConversationStore::default();
        assert!(store.get(42).await.is_none());
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = ConversationStore::default();
        store.put(42, &result("print(1)", "python")).await;
        let session = store.get(42).await.unwrap();
        assert_eq!(session.chat_id, 42);
        assert_eq!(session.code, "print(1)");
        assert_eq!(session.language, "python");
        assert_eq!(session.last_reply_id, None);
    }

    #[tokio::test]
    async fn test_overwrite_keeps_one_session() {
        let store = ConversationStore::default();
        store.put(7, &result("a", "python")).await;
        let second = store.put(7, &result("b", "go")).await;
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(7).await, Some(second));
    }

    #[tokio::test]
    async fn test_reply_id_only_for_existing() {
        let store = ConversationStore::default();
        store.set_reply_id(1, 99).await;
        assert!(store.get(1).await.is_none());

        store.put(1, &result("x", "python")).await;
        store.set_reply_id(1, 99).await;
        assert_eq!(store.get(1).await.unwrap().last_reply_id, Some(99));
    }

    #[tokio::test]
    async fn test_evicts_least_recently_used() {
        let store = ConversationStore::new(2);
        store.put(1, &result("one", "python")).await;
        store.put(2, &result("two", "python")).await;
        // Reading chat 1 makes chat 2 the oldest.
        store.get(1).await;
        store.put(3, &result("three", "python")).await;

        assert_eq!(store.len().await, 2);
        assert!(store.get(1).await.is_some());
        assert!(store.get(2).await.is_none());
        assert!(store.get(3).await.is_some());
    }

    #[tokio::test]
    async fn test_overwrite_at_capacity_does_not_evict() {
        let store = ConversationStore::new(2);
        store.put(1, &result("one", "python")).await;
        store.put(2, &result("two", "python")).await;
        store.put(1, &result("uno", "python")).await;
        assert!(store.get(2).await.is_some());
        assert_eq!(store.get(1).await.unwrap().code, "uno");
    }

    #[tokio::test]
    async fn test_eviction_follows_touch_order_over_many_chats() {
        let store = ConversationStore::new(3);
        for chat in 1..=3 {
            store.put(chat, &result("x", "python")).await;
        }
        store.get(1).await;
        store.put(2, &result("y", "python")).await;

        // Chat 3 is now the oldest, then 1, then 2.
        store.put(4, &result("z", "python")).await;
        assert!(store.get(3).await.is_none());
        store.put(5, &result("w", "python")).await;
        assert!(store.get(1).await.is_none());

        assert_eq!(store.len().await, 3);
        for chat in [2, 4, 5] {
            assert!(store.get(chat).await.is_some(), "chat {chat}");
        }
    }

    #[tokio::test]
    async fn test_missed_get_does_not_grow_index() {
        let store = ConversationStore::new(1);
        store.put(1, &result("x", "python")).await;
        for chat in 2..50 {
            assert!(store.get(chat).await.is_none());
        }
        assert_eq!(store.inner.lock().await.recency.len(), 1);
        store.put(2, &result("y", "python")).await;
        assert!(store.get(1).await.is_none());
        assert_eq!(store.inner.lock().await.recency.len(), 1);
    }

    #[tokio::test]
    async fn test_chat_lock_serializes_same_chat() {
        let locks = Arc::new(ChatLocks::default());
        let guard = locks.acquire(5).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.acquire(5).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        // Another chat is not blocked.
        let _other = locks.acquire(6).await;

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
