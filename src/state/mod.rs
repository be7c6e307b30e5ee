use crate::api::ApiClient;
use crate::config::EnvConfig;
use crate::models::{Entity, Entry};
use crate::store::{ApiEntryStore, EntryCache, StoreError};
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::rc::Rc;

// Older notices are dropped once this many are shown.
const MAX_NOTICES: usize = 5;

#[derive(Clone)]
pub(crate) struct AppState {
    pub config: EnvConfig,

    /// Shared entry store (cache + backend). Not `Send`, so it lives in local storage.
    pub entries: StoredValue<ApiEntryStore, LocalStorage>,

    /// Mirror of the cache for views, newest first.
    pub entry_list: RwSignal<Vec<Entry>>,
    pub entries_loading: RwSignal<bool>,
    pub entries_error: RwSignal<Option<String>>,

    pub entities: RwSignal<Vec<Entity>>,

    /// User-facing messages (failed explicit saves, load errors).
    pub notices: RwSignal<Vec<String>>,
}

impl AppState {
    pub fn new(config: EnvConfig) -> Self {
        let api = ApiClient::load_from_storage(&config);
        let notices = RwSignal::new(Vec::<String>::new());
        let entry_list = RwSignal::new(Vec::<Entry>::new());

        let cache = EntryCache::new();
        cache.subscribe(Rc::new(move |entry: &Entry| {
            let entry = entry.clone();
            entry_list.update(|list| upsert_newest_first(list, entry));
        }));

        let store = ApiEntryStore::new(api, cache).with_error_sink(move |msg| {
            notices.update(|n| push_bounded(n, msg));
        });

        Self {
            config,
            entries: StoredValue::new_local(store),
            entry_list,
            entries_loading: RwSignal::new(false),
            entries_error: RwSignal::new(None),
            entities: RwSignal::new(vec![]),
            notices,
        }
    }

    pub fn push_notice(&self, msg: String) {
        self.notices.update(|n| push_bounded(n, msg));
    }

    pub fn dismiss_notice(&self, index: usize) {
        self.notices.update(|n| {
            if index < n.len() {
                n.remove(index);
            }
        });
    }

    /// Reload the entry list and entity definitions from the backend.
    pub fn refresh_entries(&self) {
        if self.entries_loading.get_untracked() {
            return;
        }
        self.entries_loading.set(true);
        self.entries_error.set(None);

        let store = self.entries.get_value();
        let state = self.clone();
        spawn_local(async move {
            match store.refresh_entries().await {
                Ok(_) => {}
                Err(e) => {
                    log::warn!("entry list refresh failed: {e}");
                    state.entries_error.set(Some(describe_load_error(&e)));
                }
            }
            match store.load_entities().await {
                Ok(entities) => state.entities.set(entities),
                Err(e) => log::warn!("entity list refresh failed: {e}"),
            }
            state.entries_loading.set(false);
        });
    }
}

fn describe_load_error(e: &StoreError) -> String {
    match e {
        StoreError::Api(crate::api::ApiError::Unauthorized) => {
            "Not signed in: set a token to load entries".to_string()
        }
        other => other.to_string(),
    }
}

fn push_bounded(notices: &mut Vec<String>, msg: String) {
    notices.push(msg);
    if notices.len() > MAX_NOTICES {
        let excess = notices.len() - MAX_NOTICES;
        notices.drain(..excess);
    }
}

fn upsert_newest_first(list: &mut Vec<Entry>, entry: Entry) {
    list.retain(|e| e.id != entry.id);
    let pos = list
        .iter()
        .position(|e| e.timestamp < entry.timestamp)
        .unwrap_or(list.len());
    list.insert(pos, entry);
}

#[derive(Clone)]
pub(crate) struct AppContext(pub AppState);
