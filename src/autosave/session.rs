use super::status::{SaveStatus, SaveTrigger};

/// Why a save attempt did not issue a store call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SkipReason {
    /// No document id yet (or a blank one).
    NoTarget,
    /// Empty content is never written.
    Empty,
    /// Buffer already matches what is persisted.
    Clean,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum BeginSave {
    Start {
        document_id: String,
        snapshot: String,
        epoch: u64,
    },
    /// A save is in flight; this one runs after it resolves.
    Queued,
    Skipped(SkipReason),
}

/// A save queued behind an in-flight one when its document is replaced.
/// It is issued once the in-flight save for `epoch` resolves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CarriedSave {
    pub document_id: String,
    pub snapshot: String,
    pub trigger: SaveTrigger,
    pub epoch: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FinishSave {
    /// Completion for a document that has since been replaced.
    Stale,
    Done {
        /// A save queued behind the one that just finished, to run now.
        next: Option<SaveTrigger>,
    },
}

/// Edit state for one document.
///
/// Pure bookkeeping: the controller owns timers, the store and listeners and
/// asks the session what to do. `H` is the scheduler's timer handle; handles
/// live here so there is never an ambient timer id to lose track of.
pub(crate) struct EditSession<H> {
    document_id: Option<String>,
    buffered: String,
    persisted: String,
    status: SaveStatus,
    pending_timer: Option<H>,
    status_timer: Option<H>,
    /// Content sent by the save currently in flight.
    in_flight: Option<String>,
    queued: Option<SaveTrigger>,
    /// Bumped on every document reset so late completions can be told apart.
    epoch: u64,
}

impl<H> Default for EditSession<H> {
    fn default() -> Self {
        Self {
            document_id: None,
            buffered: String::new(),
            persisted: String::new(),
            status: SaveStatus::Idle,
            pending_timer: None,
            status_timer: None,
            in_flight: None,
            queued: None,
            epoch: 0,
        }
    }
}

impl<H> EditSession<H> {
    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn buffered(&self) -> &str {
        &self.buffered
    }

    #[allow(dead_code)]
    pub fn persisted(&self) -> &str {
        &self.persisted
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.buffered != self.persisted
    }

    /// True when the buffer still has to be written: it differs from the
    /// baseline, or from what the in-flight save is about to make the baseline.
    pub fn needs_save(&self) -> bool {
        self.has_unsaved_changes()
            || self
                .in_flight
                .as_deref()
                .is_some_and(|snapshot| snapshot != self.buffered)
    }

    pub fn take_pending_timer(&mut self) -> Option<H> {
        self.pending_timer.take()
    }

    /// Returns the handle it replaced, which the caller must cancel.
    pub fn set_pending_timer(&mut self, handle: H) -> Option<H> {
        self.pending_timer.replace(handle)
    }

    pub fn take_status_timer(&mut self) -> Option<H> {
        self.status_timer.take()
    }

    pub fn set_status_timer(&mut self, handle: H) -> Option<H> {
        self.status_timer.replace(handle)
    }

    /// Start over on `document_id` with `persisted` as the baseline. Returns
    /// the timers that must be cancelled.
    pub fn reset(&mut self, document_id: Option<String>, persisted: String) -> Vec<H> {
        let timers = self.take_timers();
        *self = Self {
            document_id,
            buffered: persisted.clone(),
            persisted,
            epoch: self.epoch + 1,
            ..Self::default()
        };
        timers
    }

    /// Take the save queued behind the in-flight one, so it survives a
    /// [`reset`](Self::reset). Nothing is carried when no save is in flight.
    pub fn hand_off(&mut self) -> Option<CarriedSave> {
        let snapshot = self.in_flight.as_deref()?;
        let document_id = self.document_id.clone()?;
        let trigger = self.queued.take()?;
        if self.buffered.is_empty() || self.buffered == snapshot {
            return None;
        }
        Some(CarriedSave {
            document_id,
            snapshot: self.buffered.clone(),
            trigger,
            epoch: self.epoch,
        })
    }

    /// Bind a session that started without a target. Only the `None` -> id
    /// transition is allowed; edits made so far are kept.
    pub fn attach(&mut self, document_id: String) -> bool {
        if self.document_id.is_some() || document_id.trim().is_empty() {
            return false;
        }
        self.document_id = Some(document_id);
        true
    }

    /// Record a local edit. Returns true when there is now something to save.
    pub fn edit(&mut self, content: &str) -> bool {
        self.buffered = content.to_string();
        let dirty = self.needs_save();
        // While a save is in flight the indicator keeps showing it; the
        // outcome decides between Saved and Dirty.
        if !self.is_saving() {
            self.status = if dirty { SaveStatus::Dirty } else { SaveStatus::Idle };
        }
        dirty
    }

    /// Replace a clean buffer with newer persisted content from the store.
    /// Refused while there are local changes or a save is in flight.
    pub fn accept_remote(&mut self, content: &str) -> bool {
        if self.has_unsaved_changes() || self.is_saving() || self.buffered == content {
            return false;
        }
        self.buffered = content.to_string();
        self.persisted = content.to_string();
        true
    }

    pub fn begin_save(&mut self, trigger: SaveTrigger) -> BeginSave {
        let Some(document_id) = self.document_id.clone().filter(|id| !id.trim().is_empty())
        else {
            return BeginSave::Skipped(SkipReason::NoTarget);
        };
        if self.buffered.is_empty() {
            return BeginSave::Skipped(SkipReason::Empty);
        }
        if self.is_saving() {
            if !self.needs_save() {
                return BeginSave::Skipped(SkipReason::Clean);
            }
            self.queued = Some(match self.queued {
                Some(q) => q.merge(trigger),
                None => trigger,
            });
            return BeginSave::Queued;
        }
        if !self.has_unsaved_changes() {
            return BeginSave::Skipped(SkipReason::Clean);
        }

        self.in_flight = Some(self.buffered.clone());
        self.status = SaveStatus::Saving;
        BeginSave::Start {
            document_id,
            snapshot: self.buffered.clone(),
            epoch: self.epoch,
        }
    }

    pub fn finish_save(&mut self, epoch: u64, ok: bool) -> FinishSave {
        if epoch != self.epoch {
            return FinishSave::Stale;
        }
        let Some(snapshot) = self.in_flight.take() else {
            return FinishSave::Stale;
        };

        if ok {
            self.persisted = snapshot;
            self.status = if self.has_unsaved_changes() {
                SaveStatus::Dirty
            } else {
                SaveStatus::Saved
            };
        } else {
            self.status = SaveStatus::Error;
        }

        let unsaved = self.has_unsaved_changes();
        let queued = self.queued.take().filter(|_| unsaved);
        // The baseline moved under the buffer and no timer will pick it up.
        let orphaned = ok && unsaved && self.pending_timer.is_none();
        let next = queued.or(orphaned.then_some(SaveTrigger::Debounce));
        FinishSave::Done { next }
    }

    /// Saved/Error fall back to Idle once their display window is over.
    pub fn revert_transient_status(&mut self) -> bool {
        if self.status.is_transient() {
            self.status = SaveStatus::Idle;
            true
        } else {
            false
        }
    }

    fn take_timers(&mut self) -> Vec<H> {
        self.pending_timer
            .take()
            .into_iter()
            .chain(self.status_timer.take())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autosave::status::FlushReason;

    fn session(id: &str, persisted: &str) -> EditSession<u32> {
        let mut s = EditSession::default();
        s.reset(Some(id.to_string()), persisted.to_string());
        s
    }

    fn start(s: &mut EditSession<u32>) -> (String, u64) {
        match s.begin_save(SaveTrigger::Debounce) {
            BeginSave::Start {
                snapshot, epoch, ..
            } => (snapshot, epoch),
            other => panic!("expected a save to start, got {other:?}"),
        }
    }

    #[test]
    fn test_edit_marks_dirty_and_undo_marks_idle() {
        let mut s = session("e1", "a");
        assert!(s.edit("ab"));
        assert_eq!(s.status(), SaveStatus::Dirty);

        assert!(!s.edit("a"));
        assert_eq!(s.status(), SaveStatus::Idle);
        assert!(!s.has_unsaved_changes());
    }

    #[test]
    fn test_begin_save_preconditions() {
        let mut s: EditSession<u32> = EditSession::default();
        s.edit("orphan");
        assert_eq!(
            s.begin_save(SaveTrigger::Debounce),
            BeginSave::Skipped(SkipReason::NoTarget)
        );

        let mut s = session("e1", "a");
        s.edit("");
        assert_eq!(
            s.begin_save(SaveTrigger::Debounce),
            BeginSave::Skipped(SkipReason::Empty)
        );

        let mut s = session("e1", "a");
        assert_eq!(
            s.begin_save(SaveTrigger::Debounce),
            BeginSave::Skipped(SkipReason::Clean)
        );
    }

    #[test]
    fn test_blank_id_is_no_target() {
        let mut s = session("  ", "");
        s.edit("x");
        assert_eq!(
            s.begin_save(SaveTrigger::Debounce),
            BeginSave::Skipped(SkipReason::NoTarget)
        );
    }

    #[test]
    fn test_save_success_updates_baseline() {
        let mut s = session("e1", "a");
        s.edit("b");
        let (snapshot, epoch) = start(&mut s);
        assert_eq!(snapshot, "b");
        assert_eq!(s.status(), SaveStatus::Saving);

        assert_eq!(s.finish_save(epoch, true), FinishSave::Done { next: None });
        assert_eq!(s.status(), SaveStatus::Saved);
        assert_eq!(s.persisted(), "b");
        assert!(!s.has_unsaved_changes());
    }

    #[test]
    fn test_edit_during_save_resolves_to_dirty() {
        let mut s = session("e1", "");
        s.edit("b");
        let (_, epoch) = start(&mut s);

        s.edit("bc");
        assert_eq!(s.status(), SaveStatus::Saving);

        s.finish_save(epoch, true);
        assert_eq!(s.persisted(), "b");
        assert_eq!(s.status(), SaveStatus::Dirty);
        assert!(s.has_unsaved_changes());
    }

    #[test]
    fn test_second_save_is_queued_and_merged() {
        let mut s = session("e1", "");
        s.edit("b");
        let (_, epoch) = start(&mut s);

        s.edit("bc");
        assert_eq!(s.begin_save(SaveTrigger::Debounce), BeginSave::Queued);
        assert_eq!(
            s.begin_save(SaveTrigger::Flush(FlushReason::Teardown)),
            BeginSave::Queued
        );

        match s.finish_save(epoch, true) {
            FinishSave::Done { next: Some(t) } => assert!(t.options().keepalive),
            other => panic!("expected queued save, got {other:?}"),
        }
    }

    #[test]
    fn test_queue_dropped_when_nothing_left_to_save() {
        let mut s = session("e1", "");
        s.edit("b");
        let (_, epoch) = start(&mut s);
        s.edit("bc");
        assert_eq!(s.begin_save(SaveTrigger::Debounce), BeginSave::Queued);
        s.edit("b");

        assert_eq!(s.finish_save(epoch, true), FinishSave::Done { next: None });
        assert_eq!(s.status(), SaveStatus::Saved);
    }

    #[test]
    fn test_typing_back_to_old_text_during_save_still_saves() {
        let mut s = session("e1", "a");
        s.edit("b");
        let (_, epoch) = start(&mut s);

        assert!(s.edit("a"), "buffer differs from the in-flight snapshot");
        assert_eq!(
            s.begin_save(SaveTrigger::Flush(FlushReason::Hidden)),
            BeginSave::Queued
        );

        assert_eq!(
            s.finish_save(epoch, true),
            FinishSave::Done {
                next: Some(SaveTrigger::Flush(FlushReason::Hidden))
            }
        );
        assert_eq!(s.persisted(), "b");
        assert!(s.has_unsaved_changes());
    }

    #[test]
    fn test_baseline_moving_under_buffer_requests_follow_up() {
        let mut s = session("e1", "a");
        s.edit("b");
        let (_, epoch) = start(&mut s);
        s.edit("a");

        assert_eq!(
            s.finish_save(epoch, true),
            FinishSave::Done {
                next: Some(SaveTrigger::Debounce)
            }
        );
    }

    #[test]
    fn test_pending_timer_suppresses_follow_up() {
        let mut s = session("e1", "");
        s.edit("b");
        let (_, epoch) = start(&mut s);
        s.edit("bc");
        s.set_pending_timer(3);

        assert_eq!(s.finish_save(epoch, true), FinishSave::Done { next: None });
        assert_eq!(s.status(), SaveStatus::Dirty);
    }

    #[test]
    fn test_failed_save_with_reverted_buffer_is_clean() {
        let mut s = session("e1", "a");
        s.edit("b");
        let (_, epoch) = start(&mut s);
        s.edit("a");

        assert_eq!(s.finish_save(epoch, false), FinishSave::Done { next: None });
        assert!(!s.needs_save());
    }

    #[test]
    fn test_hand_off_carries_queued_save_across_reset() {
        let mut s = session("e1", "");
        s.edit("a");
        let (_, old_epoch) = start(&mut s);
        s.edit("ab");
        assert_eq!(
            s.begin_save(SaveTrigger::Flush(FlushReason::Teardown)),
            BeginSave::Queued
        );

        let carried = s.hand_off().expect("queued save is carried");
        assert_eq!(carried.document_id, "e1");
        assert_eq!(carried.snapshot, "ab");
        assert_eq!(carried.epoch, old_epoch);
        assert!(carried.trigger.options().keepalive);

        s.reset(Some("e2".to_string()), "fresh".to_string());
        assert_eq!(s.finish_save(old_epoch, true), FinishSave::Stale);
    }

    #[test]
    fn test_hand_off_without_queue_or_flight_is_empty() {
        let mut s = session("e1", "");
        s.edit("a");
        assert_eq!(s.hand_off(), None);

        start(&mut s);
        assert_eq!(s.hand_off(), None);
    }

    #[test]
    fn test_failure_keeps_buffer() {
        let mut s = session("e1", "a");
        s.edit("b");
        let (_, epoch) = start(&mut s);
        s.finish_save(epoch, false);

        assert_eq!(s.status(), SaveStatus::Error);
        assert_eq!(s.buffered(), "b");
        assert_eq!(s.persisted(), "a");
        assert!(s.has_unsaved_changes());
    }

    #[test]
    fn test_reset_ignores_late_completion() {
        let mut s = session("e1", "");
        s.edit("old");
        let (_, old_epoch) = start(&mut s);

        s.reset(Some("e2".to_string()), "fresh".to_string());
        assert_eq!(s.finish_save(old_epoch, true), FinishSave::Stale);
        assert_eq!(s.persisted(), "fresh");
        assert_eq!(s.status(), SaveStatus::Idle);
        assert!(!s.is_saving());
    }

    #[test]
    fn test_reset_returns_timers() {
        let mut s = session("e1", "");
        s.set_pending_timer(7);
        s.set_status_timer(9);
        let mut timers = s.reset(Some("e2".to_string()), String::new());
        timers.sort();
        assert_eq!(timers, vec![7, 9]);
        assert!(s.take_pending_timer().is_none());
    }

    #[test]
    fn test_attach_only_from_none() {
        let mut s: EditSession<u32> = EditSession::default();
        s.edit("typed early");
        assert!(s.attach("e1".to_string()));
        assert_eq!(s.buffered(), "typed early");
        assert!(s.has_unsaved_changes());
        assert!(!s.attach("e2".to_string()));
        assert_eq!(s.document_id(), Some("e1"));
    }

    #[test]
    fn test_accept_remote_only_when_clean() {
        let mut s = session("e1", "a");
        assert!(s.accept_remote("server"));
        assert_eq!(s.buffered(), "server");

        s.edit("local");
        assert!(!s.accept_remote("server2"));
        assert_eq!(s.buffered(), "local");
    }

    #[test]
    fn test_accept_remote_refused_while_saving() {
        let mut s = session("e1", "a");
        s.edit("b");
        start(&mut s);
        s.edit("a");
        assert!(!s.accept_remote("server"));
    }

    #[test]
    fn test_revert_transient_status() {
        let mut s = session("e1", "a");
        s.edit("b");
        let (_, epoch) = start(&mut s);
        s.finish_save(epoch, true);
        assert!(s.revert_transient_status());
        assert_eq!(s.status(), SaveStatus::Idle);
        assert!(!s.revert_transient_status());
    }
}
