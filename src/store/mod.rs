//! Entry store: cached, subscribable access to entries plus async persistence.
//!
//! The autosave controller only sees the [`EntryStore`] trait, so the browser
//! store and the in-memory store used by tests are interchangeable.

pub(crate) mod cache;
pub(crate) mod remote;

use crate::api::ApiError;
use crate::models::{Entry, EntryPatch};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

pub(crate) use cache::EntryCache;
pub(crate) use remote::ApiEntryStore;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Do not surface a failure to the user (background autosave).
    pub silent: bool,
    /// Delivery must survive the page being torn down right after the call.
    pub keepalive: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("entry {0} not found")]
    NotFound(String),
}

impl StoreError {
    /// True when the same update might succeed later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Api(e) => e.is_transient(),
            Self::NotFound(_) => false,
        }
    }
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct SubscriptionId(pub(crate) u64);

pub(crate) type EntryListener = Rc<dyn Fn(&Entry)>;

pub(crate) trait EntryStore: Clone + 'static {
    /// Synchronous cache lookup.
    fn get_entry_by_id(&self, id: &str) -> Option<Entry>;

    fn update_entry(
        &self,
        id: &str,
        patch: EntryPatch,
        options: UpdateOptions,
    ) -> LocalBoxFuture<'static, StoreResult<()>>;

    /// `listener` runs after every change to a cached entry.
    fn subscribe(&self, listener: EntryListener) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);
}
