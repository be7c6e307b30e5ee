//! Deterministic stand-ins for the browser: a virtual clock scheduler and an
//! in-memory entry store with scriptable failures and held responses.

use crate::api::ApiError;
use crate::autosave::Scheduler;
use crate::models::{Entry, EntryPatch};
use crate::store::{
    EntryCache, EntryListener, EntryStore, StoreError, StoreResult, SubscriptionId, UpdateOptions,
};
use futures::channel::oneshot;
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) fn entry(id: &str, notes: &str) -> Entry {
    Entry {
        id: id.to_string(),
        entity_id: "journal".to_string(),
        timestamp: 0,
        notes: notes.to_string(),
        value: None,
        images: vec![],
        links: vec![],
        location: None,
        tags: vec![],
    }
}

struct Timer {
    id: u64,
    due_ms: u64,
    task: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct Clock {
    now_ms: u64,
    next_id: u64,
    timers: Vec<Timer>,
}

/// Scheduler with a virtual clock. Time only moves in [`advance`](Self::advance);
/// spawned futures run on a local pool that is drained after every timer.
#[derive(Clone)]
pub(crate) struct ManualScheduler {
    clock: Rc<RefCell<Clock>>,
    pool: Rc<RefCell<LocalPool>>,
    spawner: LocalSpawner,
}

impl ManualScheduler {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            clock: Rc::new(RefCell::new(Clock::default())),
            pool: Rc::new(RefCell::new(pool)),
            spawner,
        }
    }

    pub fn pending_timers(&self) -> usize {
        self.clock.borrow().timers.len()
    }

    pub fn run_until_stalled(&self) {
        self.pool.borrow_mut().run_until_stalled();
    }

    /// Move the clock forward, firing due timers in deadline order.
    pub fn advance(&self, ms: u64) {
        self.run_until_stalled();
        let target = self.clock.borrow().now_ms + ms;

        loop {
            let next = {
                let mut clock = self.clock.borrow_mut();
                let due = clock
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due_ms <= target)
                    .min_by_key(|(_, t)| (t.due_ms, t.id))
                    .map(|(i, _)| i);
                due.map(|i| {
                    let timer = clock.timers.remove(i);
                    clock.now_ms = timer.due_ms;
                    timer
                })
            };
            let Some(timer) = next else {
                break;
            };
            (timer.task)();
            self.run_until_stalled();
        }

        self.clock.borrow_mut().now_ms = target;
    }
}

impl Scheduler for ManualScheduler {
    type Handle = u64;

    fn defer(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> u64 {
        let mut clock = self.clock.borrow_mut();
        clock.next_id += 1;
        let id = clock.next_id;
        let due_ms = clock.now_ms + u64::from(delay_ms);
        clock.timers.push(Timer { id, due_ms, task });
        id
    }

    fn cancel(&self, handle: u64) {
        self.clock.borrow_mut().timers.retain(|t| t.id != handle);
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        self.spawner
            .spawn_local(task)
            .expect("test pool accepts tasks");
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct UpdateCall {
    pub id: String,
    pub patch: EntryPatch,
    pub options: UpdateOptions,
}

#[derive(Default)]
struct MemoryState {
    calls: Vec<UpdateCall>,
    failing: bool,
    hold: bool,
    held: Vec<oneshot::Sender<()>>,
}

/// In-memory [`EntryStore`]. Successful updates are applied to its cache,
/// which notifies subscribers like the real store does.
#[derive(Clone, Default)]
pub(crate) struct MemoryEntryStore {
    cache: EntryCache,
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryEntryStore {
    pub fn with_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        let store = Self::default();
        for e in entries {
            store.cache.put(e);
        }
        store
    }

    pub fn cache(&self) -> &EntryCache {
        &self.cache
    }

    pub fn calls(&self) -> Vec<UpdateCall> {
        self.state.borrow().calls.clone()
    }

    pub fn saved_notes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.patch.notes)
            .collect()
    }

    /// Outcome of every update that resolves from now on.
    pub fn set_failing(&self, failing: bool) {
        self.state.borrow_mut().failing = failing;
    }

    /// Keep update futures pending until [`release_next`](Self::release_next).
    pub fn hold_responses(&self, hold: bool) {
        self.state.borrow_mut().hold = hold;
    }

    pub fn held_count(&self) -> usize {
        self.state.borrow().held.len()
    }

    /// Let the oldest held update resolve. Returns false if none was held.
    pub fn release_next(&self) -> bool {
        let sender = {
            let mut state = self.state.borrow_mut();
            if state.held.is_empty() {
                return false;
            }
            state.held.remove(0)
        };
        sender.send(()).is_ok()
    }
}

impl EntryStore for MemoryEntryStore {
    fn get_entry_by_id(&self, id: &str) -> Option<Entry> {
        self.cache.get(id)
    }

    fn update_entry(
        &self,
        id: &str,
        patch: EntryPatch,
        options: UpdateOptions,
    ) -> LocalBoxFuture<'static, StoreResult<()>> {
        let gate = {
            let mut state = self.state.borrow_mut();
            state.calls.push(UpdateCall {
                id: id.to_string(),
                patch: patch.clone(),
                options,
            });
            if state.hold {
                let (tx, rx) = oneshot::channel();
                state.held.push(tx);
                Some(rx)
            } else {
                None
            }
        };

        let this = self.clone();
        let id = id.to_string();
        Box::pin(async move {
            if let Some(rx) = gate {
                let _ = rx.await;
            }
            if this.state.borrow().failing {
                return Err(StoreError::Api(ApiError::Network("offline".to_string())));
            }
            if !this.cache.apply(&id, &patch) {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
    }

    fn subscribe(&self, listener: EntryListener) -> SubscriptionId {
        self.cache.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.cache.unsubscribe(id)
    }
}
