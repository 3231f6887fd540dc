//! Ordered, de-duplicated record lists.
//!
//! The same message can reach a view twice: once from the REST history and
//! again from the socket, or from the REST fallback and then its own echo.
//! [`Timeline`] keeps insertion order and refuses a second record with an id
//! it already holds.

use api::{Circle, DirectMessage, FriendRequest, Friendship, Message, User};

/// Records with a server-assigned id.
pub trait Identified {
    fn id(&self) -> &str;
}

macro_rules! identified {
    ($($ty:ty),* $(,)?) => {
        $(impl Identified for $ty {
            fn id(&self) -> &str {
                &self.id
            }
        })*
    };
}

identified!(Message, DirectMessage, FriendRequest, Friendship, Circle, User);

#[derive(Debug, Clone, PartialEq)]
pub struct Timeline<T> {
    items: Vec<T>,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Identified> Timeline<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list, keeping the first occurrence of each id.
    pub fn from_records(records: impl IntoIterator<Item = T>) -> Self {
        let mut timeline = Self::new();
        timeline.replace_all(records);
        timeline
    }

    /// Append `record` unless its id is already present. Returns whether it was added.
    pub fn push(&mut self, record: T) -> bool {
        if self.contains(record.id()) {
            tracing::trace!("skipping duplicate record {}", record.id());
            return false;
        }
        self.items.push(record);
        true
    }

    pub fn replace_all(&mut self, records: impl IntoIterator<Item = T>) {
        self.items.clear();
        for record in records {
            self.push(record);
        }
    }

    /// Put a freshly loaded history in front of whatever arrived while it was
    /// loading. A record present in both keeps its history position but takes
    /// the newer, already held value.
    pub fn merge_history(&mut self, history: impl IntoIterator<Item = T>) {
        let arrived = std::mem::take(&mut self.items);
        for record in history {
            self.push(record);
        }
        for record in arrived {
            self.upsert(record);
        }
    }

    /// Insert or replace in place, keeping the original position.
    pub fn upsert(&mut self, record: T) {
        match self.items.iter_mut().find(|item| item.id() == record.id()) {
            Some(slot) => *slot = record,
            None => self.items.push(record),
        }
    }

    /// Apply `f` to the record with `id`, if any.
    pub fn update(&mut self, id: &str, f: impl FnOnce(&mut T)) -> bool {
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(item) => {
                f(item);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a, T> IntoIterator for &'a Timeline<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, content: &str) -> Message {
        Message {
            id: id.into(),
            circle_id: "c1".into(),
            sender_id: "u1".into(),
            sender_name: None,
            content: content.into(),
            created_at: String::new(),
        }
    }

    #[test]
    fn test_push_ignores_duplicate_ids() {
        let mut timeline = Timeline::new();
        assert!(timeline.push(message("m1", "first")));
        assert!(timeline.push(message("m2", "second")));
        assert!(!timeline.push(message("m1", "echo")));

        let contents: Vec<&str> = timeline.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[test]
    fn test_replace_all_keeps_first_occurrence() {
        let timeline = Timeline::from_records(vec![
            message("m1", "a"),
            message("m2", "b"),
            message("m1", "c"),
        ]);
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.get("m1").unwrap().content, "a");
    }

    #[test]
    fn test_merge_history_keeps_records_that_arrived_during_load() {
        let mut timeline = Timeline::new();
        timeline.push(message("m3", "live"));
        timeline.push(message("m2", "edited live"));

        timeline.merge_history(vec![message("m1", "a"), message("m2", "b")]);

        let ids: Vec<&str> = timeline.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
        assert_eq!(timeline.get("m2").unwrap().content, "edited live");
    }

    #[test]
    fn test_upsert_update_and_remove() {
        let mut timeline = Timeline::from_records(vec![message("m1", "a"), message("m2", "b")]);

        timeline.upsert(message("m1", "edited"));
        assert_eq!(timeline.as_slice()[0].content, "edited");
        timeline.upsert(message("m3", "c"));
        assert_eq!(timeline.len(), 3);

        assert!(timeline.update("m2", |m| m.content.push('!')));
        assert!(!timeline.update("missing", |_| {}));
        assert_eq!(timeline.get("m2").unwrap().content, "b!");

        assert_eq!(timeline.remove("m1").map(|m| m.id), Some("m1".to_string()));
        assert!(timeline.remove("m1").is_none());
        assert!(!timeline.contains("m1"));
    }
}
