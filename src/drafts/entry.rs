use crate::storage::{load_json_from_storage, remove_from_storage, save_json_to_storage};
use crate::util::now_ms;
use serde::{Deserialize, Serialize};

/// Local copy of an entry's notes as last typed, kept until the backend has it.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub(crate) struct NotesDraft {
    pub entry_id: String,
    pub value: String,
    pub updated_ms: i64,
    pub synced_ms: i64,
}

impl NotesDraft {
    pub fn is_unsynced(&self) -> bool {
        self.updated_ms > self.synced_ms
    }

    pub fn touch(&mut self, value: &str, now_ms: i64) {
        self.value = value.to_string();
        // Clock skew must never make a fresh edit look synced.
        self.updated_ms = now_ms.max(self.synced_ms + 1);
    }

    /// Marks the draft synced only if `saved` is what the draft currently holds;
    /// an edit made while the save was in flight stays unsynced.
    pub fn mark_synced(&mut self, saved: &str) {
        if self.value == saved {
            self.synced_ms = self.synced_ms.max(self.updated_ms);
        }
    }

    /// Draft text that should replace `server_notes`, if any.
    pub fn pending_value(&self, server_notes: &str) -> Option<&str> {
        if self.is_unsynced() && !self.value.is_empty() && self.value != server_notes {
            Some(&self.value)
        } else {
            None
        }
    }
}

fn key(entry_id: &str) -> String {
    format!("journal_draft_notes::{entry_id}")
}

fn load_draft(entry_id: &str) -> NotesDraft {
    load_json_from_storage::<NotesDraft>(&key(entry_id)).unwrap_or_else(|| NotesDraft {
        entry_id: entry_id.to_string(),
        ..Default::default()
    })
}

pub(crate) fn touch_entry_notes(entry_id: &str, content: &str) {
    if entry_id.trim().is_empty() {
        return;
    }

    let mut d = load_draft(entry_id);
    d.touch(content, now_ms());
    save_json_to_storage(&key(entry_id), &d);
}

pub(crate) fn mark_entry_notes_synced(entry_id: &str, saved: &str) {
    if entry_id.trim().is_empty() {
        return;
    }

    let mut d = load_draft(entry_id);
    d.mark_synced(saved);
    if d.is_unsynced() {
        save_json_to_storage(&key(entry_id), &d);
    } else {
        remove_from_storage(&key(entry_id));
    }
}

pub(crate) fn pending_notes_draft(entry_id: &str, server_notes: &str) -> Option<String> {
    if entry_id.trim().is_empty() {
        return None;
    }

    load_draft(entry_id)
        .pending_value(server_notes)
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(value: &str, updated_ms: i64, synced_ms: i64) -> NotesDraft {
        NotesDraft {
            entry_id: "e1".to_string(),
            value: value.to_string(),
            updated_ms,
            synced_ms,
        }
    }

    #[test]
    fn test_touch_marks_unsynced() {
        let mut d = draft("", 0, 0);
        d.touch("hello", 100);
        assert!(d.is_unsynced());
        assert_eq!(d.pending_value("server"), Some("hello"));
    }

    #[test]
    fn test_touch_with_skewed_clock_stays_unsynced() {
        let mut d = draft("a", 500, 500);
        d.touch("ab", 10);
        assert!(d.is_unsynced());
    }

    #[test]
    fn test_mark_synced_requires_matching_value() {
        let mut d = draft("hello world", 200, 0);
        d.mark_synced("hello");
        assert!(d.is_unsynced());

        d.mark_synced("hello world");
        assert!(!d.is_unsynced());
        assert_eq!(d.pending_value("hello"), None);
    }

    #[test]
    fn test_pending_value_ignores_equal_or_empty() {
        assert_eq!(draft("same", 10, 0).pending_value("same"), None);
        assert_eq!(draft("", 10, 0).pending_value("server"), None);
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_draft_lifecycle_in_local_storage() {
        let id = "wasm-draft-entry";
        touch_entry_notes(id, "offline edit");
        assert_eq!(
            pending_notes_draft(id, "server").as_deref(),
            Some("offline edit")
        );

        mark_entry_notes_synced(id, "offline edit");
        assert_eq!(pending_notes_draft(id, "server"), None);
    }
}
