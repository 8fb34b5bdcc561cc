use parking_lot::Mutex;
use tracing::debug;

use super::message::{Message, MessageId};
use crate::stream::{MessageSink, MessageUpdate};

/// The meeting's ordered message list.
///
/// Every mutation takes the lock for its whole duration, so concurrent
/// streams never observe or produce a half-applied update.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Mutex<Vec<Message>>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, message: Message) {
        self.messages.lock().push(message);
    }

    /// Apply `f` to the message with `id`. Returns false if there is none.
    pub fn update(&self, id: MessageId, f: impl FnOnce(&mut Message)) -> bool {
        let mut messages = self.messages.lock();
        match messages.iter_mut().find(|m| m.id == id) {
            Some(m) => {
                f(m);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: MessageId) -> Option<Message> {
        let mut messages = self.messages.lock();
        let pos = messages.iter().position(|m| m.id == id)?;
        Some(messages.remove(pos))
    }

    /// Swap in the list loaded from the backend.
    pub fn replace_all(&self, messages: Vec<Message>) {
        *self.messages.lock() = messages;
    }

    pub fn get(&self, id: MessageId) -> Option<Message> {
        self.messages.lock().iter().find(|m| m.id == id).cloned()
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.messages.lock().iter().any(|m| m.id == id)
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

impl MessageSink for MessageStore {
    fn publish(&self, update: MessageUpdate) {
        let MessageUpdate {
            id,
            content,
            clear_thinking,
            finished,
        } = update;
        let applied = self.update(id, |m| {
            m.content = content;
            if clear_thinking {
                m.is_thinking = false;
            }
            m.is_streaming = !finished;
        });
        if !applied {
            debug!(%id, "update for a message that is no longer listed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(id: MessageId, content: &str, clear_thinking: bool, finished: bool) -> MessageUpdate {
        MessageUpdate {
            id,
            content: content.to_string(),
            clear_thinking,
            finished,
        }
    }

    #[test]
    fn first_publish_clears_thinking_and_sets_content_together() {
        let store = MessageStore::new();
        let placeholder = Message::thinking(3, 7, "Ada");
        let id = placeholder.id;
        store.append(placeholder);

        store.publish(update(id, "Hel", true, false));
        let m = store.get(id).unwrap();
        assert!(!m.is_thinking);
        assert!(m.is_streaming);
        assert_eq!(m.content, "Hel");

        store.publish(update(id, "Hello", false, false));
        assert!(!store.get(id).unwrap().is_thinking);

        store.publish(update(id, "Hello", true, true));
        let m = store.get(id).unwrap();
        assert!(!m.is_pending());
        assert_eq!(m.content, "Hello");
    }

    #[test]
    fn updates_touch_only_their_message() {
        let store = MessageStore::new();
        let a = Message::thinking(3, 1, "A");
        let b = Message::thinking(3, 2, "B");
        let (a_id, b_id) = (a.id, b.id);
        store.append(a);
        store.append(b);

        store.publish(update(b_id, "from b", true, false));
        assert!(store.get(a_id).unwrap().is_thinking);
        assert_eq!(store.get(b_id).unwrap().content, "from b");
    }

    #[test]
    fn publish_after_removal_is_ignored() {
        let store = MessageStore::new();
        let m = Message::thinking(3, 7, "Ada");
        let id = m.id;
        store.append(m);
        assert!(store.remove(id).is_some());

        store.publish(update(id, "late", true, false));
        assert!(store.is_empty());
    }

    #[test]
    fn replace_all_drops_local_messages() {
        let store = MessageStore::new();
        let m = Message::thinking(3, 7, "Ada");
        let id = m.id;
        store.append(m);

        store.replace_all(vec![Message::user(3, "User", "persisted")]);
        assert!(!store.contains(id));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn order_is_append_order() {
        let store = MessageStore::new();
        store.append(Message::user(3, "User", "one"));
        store.append(Message::user(3, "User", "two"));
        let contents: Vec<_> = store.snapshot().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, ["one", "two"]);
    }
}
