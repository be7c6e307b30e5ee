use super::{AutosaveController, BrowserScheduler, FlushReason, SaveStatus};
use crate::drafts::{mark_entry_notes_synced, pending_notes_draft, touch_entry_notes};
use crate::state::AppContext;
use crate::store::{ApiEntryStore, EntryStore};
use leptos::ev;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::window_event_listener;
use web_sys::VisibilityState;

type EntryController = AutosaveController<ApiEntryStore, BrowserScheduler>;

/// Handle returned by [`use_entry_autosave`].
#[derive(Clone, Copy)]
pub(crate) struct EntryAutosave {
    /// Current editor content. Replaced on load and on clean store updates.
    pub content: RwSignal<String>,
    pub status: RwSignal<SaveStatus>,
    /// Edits not yet written, including after a failed save has reverted
    /// its status to idle.
    pub unsaved: RwSignal<bool>,
    pub loading: RwSignal<bool>,
    controller: StoredValue<EntryController, LocalStorage>,
}

impl EntryAutosave {
    /// Feed a keystroke from the editor.
    pub fn on_input(&self, value: String) {
        self.content.set(value.clone());
        let _ = self.controller.try_with_value(|c| {
            if let Some(id) = c.document_id() {
                touch_entry_notes(&id, &value);
            }
            c.on_content_changed(&value);
        });
    }

    /// Explicit save (button or shortcut).
    pub fn save(&self) {
        let _ = self
            .controller
            .try_with_value(|c| c.flush(FlushReason::Explicit));
    }
}

/// Autosave the notes of the entry selected by `entry_id`.
///
/// Changing the id loads the new entry and discards the old session. Hiding
/// the page flushes, pagehide and unmount flush with keepalive.
pub(crate) fn use_entry_autosave(entry_id: Signal<Option<String>>) -> EntryAutosave {
    let app_state = expect_context::<AppContext>();
    let store = app_state.0.entries.get_value();

    let content = RwSignal::new(String::new());
    let status = RwSignal::new(SaveStatus::Idle);
    let unsaved = RwSignal::new(false);
    let loading = RwSignal::new(false);

    let controller = AutosaveController::new(
        store.clone(),
        BrowserScheduler,
        app_state.0.config.autosave(),
    );
    controller.on_status(move |s| status.set(s));
    controller.on_content_replaced(move |s| content.set(s.to_string()));
    controller.on_unsaved_changed(move |u| unsaved.set(u));
    controller.on_persisted(|id, saved| mark_entry_notes_synced(id, saved));
    let controller = StoredValue::new_local(controller);

    Effect::new(move |_| {
        let id = entry_id.get().filter(|id| !id.trim().is_empty());
        // Navigating between entries reuses the page; the old entry's edits
        // go out before its session is replaced.
        controller.with_value(|c| {
            if c.document_id() != id {
                c.flush(FlushReason::Teardown);
            }
        });
        let Some(id) = id else {
            controller.with_value(|c| c.load_document(None, String::new()));
            return;
        };

        if let Some(entry) = store.get_entry_by_id(&id) {
            open_entry(controller, content, &id, entry.notes);
            return;
        }

        controller.with_value(|c| c.load_document(None, String::new()));
        loading.set(true);
        let store = store.clone();
        let app_state = app_state.clone();
        spawn_local(async move {
            let result = store.load_entry(&id).await;
            if entry_id.get_untracked().as_deref() != Some(id.as_str()) {
                return;
            }
            loading.set(false);
            match result {
                Ok(entry) => open_entry(controller, content, &id, entry.notes),
                Err(e) => {
                    log::warn!("entry {id}: load failed: {e}");
                    app_state.0.push_notice(format!("Failed to load entry: {e}"));
                    // Keep an offline draft editable; it is saved once the
                    // backend answers again.
                    if let Some(draft) = pending_notes_draft(&id, "") {
                        let _ = controller.try_with_value(|c| {
                            c.on_content_changed(&draft);
                            c.attach_document(id.clone());
                        });
                        content.set(draft);
                    }
                }
            }
        });
    });

    let visibility = window_event_listener(ev::visibilitychange, move |_ev: web_sys::Event| {
        if document().visibility_state() == VisibilityState::Hidden {
            let _ = controller.try_with_value(|c| c.flush(FlushReason::Hidden));
        }
    });
    let pagehide = window_event_listener(ev::pagehide, move |_ev: web_sys::PageTransitionEvent| {
        let _ = controller.try_with_value(|c| c.flush(FlushReason::Unload));
    });
    let handles = StoredValue::new_local(Some((visibility, pagehide)));

    on_cleanup(move || {
        let _ = controller.try_with_value(|c| {
            c.flush(FlushReason::Teardown);
            c.detach();
        });
        if let Some(Some((visibility, pagehide))) = handles.try_update_value(|h| h.take()) {
            visibility.remove();
            pagehide.remove();
        }
    });

    EntryAutosave {
        content,
        status,
        unsaved,
        loading,
        controller,
    }
}

/// Load `notes` as the persisted baseline, then replay a newer local draft
/// left behind by an earlier session.
fn open_entry(
    controller: StoredValue<EntryController, LocalStorage>,
    content: RwSignal<String>,
    id: &str,
    notes: String,
) {
    let draft = pending_notes_draft(id, &notes);
    let _ = controller.try_with_value(|c| {
        c.load_document(Some(id.to_string()), notes);
        if let Some(draft) = &draft {
            log::info!("entry {id}: restoring unsynced local draft");
            c.on_content_changed(draft);
        }
    });
    if let Some(draft) = draft {
        content.set(draft);
    }
}
