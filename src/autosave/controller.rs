use super::scheduler::Scheduler;
use super::session::{BeginSave, CarriedSave, EditSession, FinishSave, SkipReason};
use super::status::{FlushReason, SaveStatus, SaveTrigger};
use crate::config::AutosaveConfig;
use crate::models::{Entry, EntryPatch};
use crate::store::{EntryStore, SubscriptionId};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

type StatusListener = Rc<dyn Fn(SaveStatus)>;
type ContentListener = Rc<dyn Fn(&str)>;
type PersistedListener = Rc<dyn Fn(&str, &str)>;
type UnsavedListener = Rc<dyn Fn(bool)>;

struct Inner<S, T: Scheduler> {
    session: EditSession<T::Handle>,
    store: S,
    scheduler: T,
    config: AutosaveConfig,
    subscription: Option<SubscriptionId>,
    on_status: Option<StatusListener>,
    on_content: Option<ContentListener>,
    on_persisted: Option<PersistedListener>,
    on_unsaved: Option<UnsavedListener>,
    /// Last value reported to `on_unsaved`.
    unsaved: bool,
    /// Saves of replaced documents waiting on their in-flight predecessor.
    carried: Vec<CarriedSave>,
}

/// Debounced autosave for one entry's notes.
///
/// Edits land in an in-memory buffer; a save is issued once typing pauses for
/// `debounce_ms`, or right away on [`flush`](Self::flush). At most one save is
/// in flight; anything requested meanwhile runs after it resolves. Failures
/// are turned into [`SaveStatus::Error`] and never reach the caller.
///
/// Clones share state. Listeners are never called while state is borrowed,
/// so they may call back into the controller.
pub(crate) struct AutosaveController<S, T: Scheduler> {
    inner: Rc<RefCell<Inner<S, T>>>,
}

impl<S, T: Scheduler> Clone for AutosaveController<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: EntryStore, T: Scheduler> AutosaveController<S, T> {
    pub fn new(store: S, scheduler: T, config: AutosaveConfig) -> Self {
        let controller = Self {
            inner: Rc::new(RefCell::new(Inner {
                session: EditSession::default(),
                store: store.clone(),
                scheduler,
                config,
                subscription: None,
                on_status: None,
                on_content: None,
                on_persisted: None,
                on_unsaved: None,
                unsaved: false,
                carried: Vec::new(),
            })),
        };

        let weak = Rc::downgrade(&controller.inner);
        let subscription = store.subscribe(Rc::new(move |entry: &Entry| {
            if let Some(c) = Self::upgrade(&weak) {
                c.on_store_update(entry);
            }
        }));
        controller.inner.borrow_mut().subscription = Some(subscription);

        controller
    }

    fn upgrade(weak: &Weak<RefCell<Inner<S, T>>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn weak(&self) -> Weak<RefCell<Inner<S, T>>> {
        Rc::downgrade(&self.inner)
    }

    pub fn on_status(&self, f: impl Fn(SaveStatus) + 'static) {
        self.inner.borrow_mut().on_status = Some(Rc::new(f));
    }

    /// Called when the buffer is replaced from outside (document load or a
    /// store update), so the editing surface can re-render.
    pub fn on_content_replaced(&self, f: impl Fn(&str) + 'static) {
        self.inner.borrow_mut().on_content = Some(Rc::new(f));
    }

    /// Called with `(document_id, content)` after each successful save.
    pub fn on_persisted(&self, f: impl Fn(&str, &str) + 'static) {
        self.inner.borrow_mut().on_persisted = Some(Rc::new(f));
    }

    /// Called whenever [`needs_save`](Self::needs_save) flips.
    pub fn on_unsaved_changed(&self, f: impl Fn(bool) + 'static) {
        self.inner.borrow_mut().on_unsaved = Some(Rc::new(f));
    }

    pub fn status(&self) -> SaveStatus {
        self.inner.borrow().session.status()
    }

    pub fn content(&self) -> String {
        self.inner.borrow().session.buffered().to_string()
    }

    pub fn document_id(&self) -> Option<String> {
        self.inner.borrow().session.document_id().map(|s| s.to_string())
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.inner.borrow().session.has_unsaved_changes()
    }

    /// Like [`has_unsaved_changes`](Self::has_unsaved_changes), but also true
    /// while the buffer differs from the save in flight.
    pub fn needs_save(&self) -> bool {
        self.inner.borrow().session.needs_save()
    }

    /// Load `document_id` with `persisted` as the baseline.
    ///
    /// A different document discards the buffer and all timers and starts
    /// Idle. A save already queued behind an in-flight one still goes out for
    /// the old document. The same document is treated as a store update and
    /// only replaces a clean buffer.
    pub fn load_document(&self, document_id: Option<String>, persisted: String) {
        if document_id.is_some() && document_id == self.document_id() {
            self.accept_remote(&persisted);
            return;
        }

        log::debug!("autosave: load {:?}", document_id);
        let (timers, scheduler) = {
            let mut inner = self.inner.borrow_mut();
            if let Some(carried) = inner.session.hand_off() {
                log::debug!(
                    "autosave: carrying queued save of {} past reset",
                    carried.document_id
                );
                inner.carried.push(carried);
            }
            let timers = inner.session.reset(document_id, persisted.clone());
            (timers, inner.scheduler.clone())
        };
        for handle in timers {
            scheduler.cancel(handle);
        }
        self.emit_status(SaveStatus::Idle);
        self.emit_content(&persisted);
        self.sync_unsaved();
    }

    /// Bind a session that was created before its target was known. Edits
    /// typed so far are kept and saved on the usual schedule.
    pub fn attach_document(&self, document_id: String) {
        let attached = self.inner.borrow_mut().session.attach(document_id.clone());
        if !attached {
            log::debug!("autosave: attach {document_id} ignored, session already bound");
            return;
        }
        if self.has_unsaved_changes() {
            self.schedule_deferred_save();
        }
    }

    pub fn on_content_changed(&self, content: &str) {
        let dirty = self.transition(|s| s.edit(content));
        if dirty {
            self.schedule_deferred_save();
        } else {
            self.cancel_pending_timer();
        }
    }

    /// Save now, bypassing the debounce. No-op when there is nothing to save.
    pub fn flush(&self, reason: FlushReason) {
        self.cancel_pending_timer();
        self.attempt_save(SaveTrigger::Flush(reason));
    }

    /// React to a store change. Only the current document is considered, and
    /// local edits always win over what the store says.
    pub fn on_store_update(&self, entry: &Entry) {
        if self.document_id().as_deref() != Some(entry.id.as_str()) {
            return;
        }
        self.accept_remote(&entry.notes);
    }

    /// Stop listening to the store and drop timers. A save already in flight
    /// still completes.
    pub fn detach(&self) {
        let (subscription, store, scheduler, timers) = {
            let mut inner = self.inner.borrow_mut();
            let timers: Vec<T::Handle> = inner
                .session
                .take_pending_timer()
                .into_iter()
                .chain(inner.session.take_status_timer())
                .collect();
            (
                inner.subscription.take(),
                inner.store.clone(),
                inner.scheduler.clone(),
                timers,
            )
        };
        if let Some(id) = subscription {
            store.unsubscribe(id);
        }
        for handle in timers {
            scheduler.cancel(handle);
        }
    }

    fn accept_remote(&self, content: &str) {
        let replaced = self.inner.borrow_mut().session.accept_remote(content);
        if replaced {
            log::debug!("autosave: buffer replaced by store update");
            self.emit_content(content);
        }
    }

    fn schedule_deferred_save(&self) {
        let weak = self.weak();
        let (scheduler, delay) = {
            let inner = self.inner.borrow();
            (inner.scheduler.clone(), inner.config.debounce_ms)
        };

        let handle = scheduler.defer(
            delay,
            Box::new(move || {
                if let Some(c) = Self::upgrade(&weak) {
                    // The fired timer is spent; drop its handle.
                    c.inner.borrow_mut().session.take_pending_timer();
                    if c.needs_save() {
                        c.attempt_save(SaveTrigger::Debounce);
                    }
                }
            }),
        );

        let replaced = self.inner.borrow_mut().session.set_pending_timer(handle);
        if let Some(old) = replaced {
            scheduler.cancel(old);
        }
    }

    fn cancel_pending_timer(&self) {
        let (handle, scheduler) = {
            let mut inner = self.inner.borrow_mut();
            (inner.session.take_pending_timer(), inner.scheduler.clone())
        };
        if let Some(handle) = handle {
            scheduler.cancel(handle);
        }
    }

    fn attempt_save(&self, trigger: SaveTrigger) {
        let begin = self.transition(|s| s.begin_save(trigger));
        let (document_id, snapshot, epoch) = match begin {
            BeginSave::Start {
                document_id,
                snapshot,
                epoch,
            } => (document_id, snapshot, epoch),
            BeginSave::Queued => {
                log::debug!("autosave: {trigger:?} queued behind in-flight save");
                return;
            }
            BeginSave::Skipped(SkipReason::NoTarget) => {
                log::debug!("autosave: {trigger:?} skipped, no target document");
                return;
            }
            BeginSave::Skipped(reason) => {
                log::debug!("autosave: {trigger:?} skipped ({reason:?})");
                return;
            }
        };

        let (store, scheduler) = {
            let inner = self.inner.borrow();
            (inner.store.clone(), inner.scheduler.clone())
        };

        log::debug!("autosave: saving {document_id} ({trigger:?})");
        let pending = store.update_entry(
            &document_id,
            EntryPatch::notes(snapshot.clone()),
            trigger.options(),
        );

        // The save holds a strong reference: it must finish even if the
        // editing surface is already gone.
        let this = self.clone();
        scheduler.spawn(Box::pin(async move {
            let ok = pending.await.is_ok();
            this.finish_save(epoch, &document_id, &snapshot, ok);
        }));
    }

    fn finish_save(&self, epoch: u64, document_id: &str, snapshot: &str, ok: bool) {
        let finish = self.transition(|s| s.finish_save(epoch, ok));
        let FinishSave::Done { next } = finish else {
            log::debug!("autosave: completion for replaced document {document_id}");
            if ok {
                self.emit_persisted(document_id, snapshot);
            }
            self.send_carried(epoch);
            return;
        };

        if ok {
            self.emit_persisted(document_id, snapshot);
        }

        if let Some(trigger) = next {
            self.attempt_save(trigger);
        }
    }

    /// Issue the save that was queued behind the `epoch` save when its
    /// document was replaced. Only store delivery and `on_persisted` follow;
    /// the current session is not touched.
    fn send_carried(&self, epoch: u64) {
        let (carried, store, scheduler) = {
            let mut inner = self.inner.borrow_mut();
            let Some(pos) = inner.carried.iter().position(|c| c.epoch == epoch) else {
                return;
            };
            (
                inner.carried.remove(pos),
                inner.store.clone(),
                inner.scheduler.clone(),
            )
        };

        log::debug!(
            "autosave: saving {} ({:?}, carried)",
            carried.document_id,
            carried.trigger
        );
        let pending = store.update_entry(
            &carried.document_id,
            EntryPatch::notes(carried.snapshot.clone()),
            carried.trigger.options(),
        );
        let this = self.clone();
        scheduler.spawn(Box::pin(async move {
            if pending.await.is_ok() {
                this.emit_persisted(&carried.document_id, &carried.snapshot);
            }
        }));
    }

    /// Run `f` on the session, then publish the status change (if any) and
    /// keep the Saved/Error revert timer in step with it.
    fn transition<R>(&self, f: impl FnOnce(&mut EditSession<T::Handle>) -> R) -> R {
        let (result, before, after) = {
            let mut inner = self.inner.borrow_mut();
            let before = inner.session.status();
            let result = f(&mut inner.session);
            (result, before, inner.session.status())
        };

        if before != after {
            log::debug!("autosave: {before:?} -> {after:?}");
            self.rearm_status_timer(after);
            self.emit_status(after);
        }
        self.sync_unsaved();
        result
    }

    fn sync_unsaved(&self) {
        let (changed, listener) = {
            let mut inner = self.inner.borrow_mut();
            let now = inner.session.needs_save();
            let changed = now != inner.unsaved;
            inner.unsaved = now;
            (changed.then_some(now), inner.on_unsaved.clone())
        };
        if let (Some(now), Some(f)) = (changed, listener) {
            f(now);
        }
    }

    fn rearm_status_timer(&self, status: SaveStatus) {
        let (old, scheduler, config) = {
            let mut inner = self.inner.borrow_mut();
            (
                inner.session.take_status_timer(),
                inner.scheduler.clone(),
                inner.config,
            )
        };
        if let Some(handle) = old {
            scheduler.cancel(handle);
        }
        if !status.is_transient() {
            return;
        }

        let delay = if status == SaveStatus::Error {
            config.error_display_ms
        } else {
            config.saved_display_ms
        };
        let weak = self.weak();
        let handle = scheduler.defer(
            delay,
            Box::new(move || {
                if let Some(c) = Self::upgrade(&weak) {
                    c.inner.borrow_mut().session.take_status_timer();
                    c.transition(|s| s.revert_transient_status());
                }
            }),
        );
        self.inner.borrow_mut().session.set_status_timer(handle);
    }

    fn emit_status(&self, status: SaveStatus) {
        let listener = self.inner.borrow().on_status.clone();
        if let Some(f) = listener {
            f(status);
        }
    }

    fn emit_persisted(&self, document_id: &str, snapshot: &str) {
        let listener = self.inner.borrow().on_persisted.clone();
        if let Some(f) = listener {
            f(document_id, snapshot);
        }
    }

    fn emit_content(&self, content: &str) {
        let listener = self.inner.borrow().on_content.clone();
        if let Some(f) = listener {
            f(content);
        }
    }
}
