pub(crate) mod entry;

pub(crate) use entry::{mark_entry_notes_synced, pending_notes_draft, touch_entry_notes};
