use crate::store::UpdateOptions;

/// Visible save state of an edit session.
///
/// ```text
/// idle --(edit)--> dirty --(debounce expiry)--> saving --(success)--> saved --(timeout)--> idle
///                                            \--(failure)--> error --(timeout)--> idle
/// dirty --(flush)--> saving
/// any --(new document loaded)--> idle
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SaveStatus {
    #[default]
    Idle,
    Dirty,
    Saving,
    Saved,
    Error,
}

impl SaveStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::Dirty => "Unsaved changes",
            Self::Saving => "Saving…",
            Self::Saved => "Saved",
            Self::Error => "Failed to save",
        }
    }

    /// Saved and Error are shown for a short window, then revert to Idle.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Saved | Self::Error)
    }
}

/// Why a flush was forced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushReason {
    /// The user asked to save.
    Explicit,
    /// The document became hidden (tab switch, minimize).
    Hidden,
    /// The page is being unloaded.
    Unload,
    /// The editing surface is being torn down.
    Teardown,
}

/// What started a save attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveTrigger {
    Debounce,
    Flush(FlushReason),
}

impl SaveTrigger {
    pub fn options(self) -> UpdateOptions {
        match self {
            Self::Debounce => UpdateOptions {
                silent: true,
                keepalive: false,
            },
            Self::Flush(reason) => UpdateOptions {
                silent: reason != FlushReason::Explicit,
                keepalive: matches!(reason, FlushReason::Unload | FlushReason::Teardown),
            },
        }
    }

    /// Combine two triggers waiting behind the same in-flight save.
    /// Keepalive wins over loudness: it is what survives the page going away.
    pub fn merge(self, other: SaveTrigger) -> SaveTrigger {
        let (a, b) = (self.options(), other.options());
        if a.keepalive || b.keepalive {
            SaveTrigger::Flush(FlushReason::Teardown)
        } else if !a.silent || !b.silent {
            SaveTrigger::Flush(FlushReason::Explicit)
        } else if self == SaveTrigger::Debounce {
            other
        } else {
            self
        }
    }
}
