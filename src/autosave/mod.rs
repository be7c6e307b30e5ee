//! Debounced autosave for entry notes.
//!
//! [`EditSession`](session::EditSession) holds the buffer, the persisted
//! baseline and the explicit [`SaveStatus`]. [`AutosaveController`] drives it
//! with a [`Scheduler`] and an [`EntryStore`](crate::store::EntryStore), and
//! [`use_entry_autosave`] binds a controller to a Leptos component and the
//! page lifecycle (visibility, pagehide, unmount).

pub(crate) mod controller;
pub(crate) mod lifecycle;
pub(crate) mod scheduler;
pub(crate) mod session;
pub(crate) mod status;

pub(crate) use controller::AutosaveController;
pub(crate) use lifecycle::{use_entry_autosave, EntryAutosave};
pub(crate) use scheduler::{BrowserScheduler, Scheduler};
pub use status::{FlushReason, SaveStatus};
