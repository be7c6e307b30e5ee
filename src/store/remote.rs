use super::{
    EntryCache, EntryListener, EntryStore, StoreError, StoreResult, SubscriptionId, UpdateOptions,
};
use crate::api::{ApiClient, ApiError, KEEPALIVE_BODY_LIMIT};
use crate::models::{Entity, Entry, EntryPatch};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

/// Entry store backed by the journal HTTP API.
///
/// Reads are served from the shared [`EntryCache`]; writes hit the backend and
/// are applied to the cache once the backend accepted them.
#[derive(Clone)]
pub(crate) struct ApiEntryStore {
    api: ApiClient,
    cache: EntryCache,
    /// Where non-silent failures are reported (the app's notice list).
    error_sink: Option<Rc<dyn Fn(String)>>,
}

impl ApiEntryStore {
    pub fn new(api: ApiClient, cache: EntryCache) -> Self {
        Self {
            api,
            cache,
            error_sink: None,
        }
    }

    pub fn with_error_sink(mut self, sink: impl Fn(String) + 'static) -> Self {
        self.error_sink = Some(Rc::new(sink));
        self
    }

    pub async fn load_entry(&self, id: &str) -> StoreResult<Entry> {
        let entry = match self.api.get_entry(id).await {
            Ok(entry) => entry,
            Err(ApiError::Http { status: 404, .. }) => {
                return Err(StoreError::NotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        self.cache.put(entry.clone());
        Ok(entry)
    }

    pub async fn refresh_entries(&self) -> StoreResult<Vec<Entry>> {
        for entry in self.api.list_entries().await? {
            self.cache.put(entry);
        }
        Ok(self.cache.all())
    }

    pub async fn load_entities(&self) -> StoreResult<Vec<Entity>> {
        Ok(self.api.list_entities().await?)
    }

    async fn send_update(
        &self,
        id: &str,
        patch: &EntryPatch,
        options: UpdateOptions,
    ) -> StoreResult<()> {
        if options.keepalive {
            let body_len = serde_json::to_vec(patch)
                .map(|b| b.len())
                .unwrap_or(usize::MAX);
            if body_len <= KEEPALIVE_BODY_LIMIT {
                self.api.update_entry_keepalive(id, patch).await?;
                self.cache.apply(id, patch);
                return Ok(());
            }
            log::warn!(
                "entry {id}: {body_len} byte patch exceeds the keepalive limit, sending without keepalive"
            );
        }

        let updated = self.api.update_entry(id, patch).await?;
        self.cache.put(updated);
        Ok(())
    }
}

impl EntryStore for ApiEntryStore {
    fn get_entry_by_id(&self, id: &str) -> Option<Entry> {
        self.cache.get(id)
    }

    fn update_entry(
        &self,
        id: &str,
        patch: EntryPatch,
        options: UpdateOptions,
    ) -> LocalBoxFuture<'static, StoreResult<()>> {
        let this = self.clone();
        let id = id.to_string();
        Box::pin(async move {
            let result = this.send_update(&id, &patch, options).await;
            if let Err(e) = &result {
                if options.keepalive || !e.is_transient() {
                    log::error!("entry {id}: save failed: {e}");
                } else {
                    log::warn!("entry {id}: save failed: {e}");
                }
                if !options.silent {
                    if let Some(sink) = &this.error_sink {
                        sink(format!("Failed to save: {e}"));
                    }
                }
            }
            result
        })
    }

    fn subscribe(&self, listener: EntryListener) -> SubscriptionId {
        self.cache.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.cache.unsubscribe(id)
    }
}
