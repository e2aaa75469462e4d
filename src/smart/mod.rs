//! SMART sessions: the per-device protocol drivers behind [`Smart`].
//!
//! ```text
//! Unopened ──open──▶ Opened ──update──▶ UpdateSucceeded / UpdateFailed ──close──▶ Closed
//! ```
//!
//! A session only exists in `Opened` or later; a device whose session could
//! not be established carries [`NoopSmart`], which stays `Unopened`.
//! `update()` after `close()` is a caller bug and panics.

pub mod generic;
pub mod nvme;
pub mod passthrough;

pub use generic::{AtaChannel, GenericSmart, SmartGeneric};
pub use nvme::{NvmeChannel, NvmeSmart};
pub use passthrough::{AtaPassthroughMode, SatChannel, ScsiDevice};

use crate::bus::SmartType;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Unopened,
    Opened,
    UpdateSucceeded,
    UpdateFailed,
    Closed,
}

/// Operations shared by every session flavour.
pub trait SmartSession {
    /// One protocol round-trip. Returns whether it succeeded; on failure the
    /// previous data stays in place.
    fn update(&mut self) -> bool;

    /// Result of the most recent `update()`.
    fn last_update(&self) -> bool;

    fn state(&self) -> SessionState;

    /// Release every native resource. Calling it again does nothing.
    fn close(&mut self);
}

/// Bookkeeping shared by the concrete sessions.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state:       SessionState,
    last_update: bool,
}

impl Lifecycle {
    pub(crate) fn opened() -> Self {
        Self { state: SessionState::Opened, last_update: false }
    }

    pub(crate) fn assert_open(&self, op: &str) {
        assert!(
            self.state != SessionState::Closed,
            "{op} called on a closed SMART session"
        );
    }

    pub(crate) fn record(&mut self, ok: bool) -> bool {
        self.last_update = ok;
        self.state = if ok { SessionState::UpdateSucceeded } else { SessionState::UpdateFailed };
        ok
    }

    /// Returns true the first time only.
    pub(crate) fn close(&mut self) -> bool {
        if self.state == SessionState::Closed {
            return false;
        }
        self.state = SessionState::Closed;
        true
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn last_update(&self) -> bool {
        self.last_update
    }
}

/// Stand-in session for devices without usable SMART access.
#[derive(Debug, Default)]
pub struct NoopSmart;

impl SmartSession for NoopSmart {
    fn update(&mut self) -> bool {
        false
    }

    fn last_update(&self) -> bool {
        false
    }

    fn state(&self) -> SessionState {
        SessionState::Unopened
    }

    fn close(&mut self) {}
}

/// The health session owned by a [`crate::DiskInfo`].
pub enum Smart {
    Unsupported(NoopSmart),
    Generic(GenericSmart),
    Nvme(NvmeSmart),
}

impl Smart {
    pub fn unsupported() -> Self {
        Smart::Unsupported(NoopSmart)
    }

    pub fn smart_type(&self) -> SmartType {
        match self {
            Smart::Unsupported(_) => SmartType::Unsupported,
            Smart::Generic(_)     => SmartType::Generic,
            Smart::Nvme(_)        => SmartType::Nvme,
        }
    }

    pub fn as_generic(&self) -> Option<&GenericSmart> {
        match self {
            Smart::Generic(s) => Some(s),
            _                 => None,
        }
    }

    pub fn as_nvme(&self) -> Option<&NvmeSmart> {
        match self {
            Smart::Nvme(s) => Some(s),
            _              => None,
        }
    }

    fn session(&self) -> &dyn SmartSession {
        match self {
            Smart::Unsupported(s) => s,
            Smart::Generic(s)     => s,
            Smart::Nvme(s)        => s,
        }
    }

    fn session_mut(&mut self) -> &mut dyn SmartSession {
        match self {
            Smart::Unsupported(s) => s,
            Smart::Generic(s)     => s,
            Smart::Nvme(s)        => s,
        }
    }
}

impl SmartSession for Smart {
    fn update(&mut self) -> bool {
        self.session_mut().update()
    }

    fn last_update(&self) -> bool {
        self.session().last_update()
    }

    fn state(&self) -> SessionState {
        self.session().state()
    }

    fn close(&mut self) {
        self.session_mut().close()
    }
}

impl std::fmt::Debug for Smart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Smart")
            .field("type", &self.smart_type())
            .field("state", &self.state())
            .field("last_update", &self.last_update())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_session_never_updates() {
        let mut smart = Smart::unsupported();
        assert_eq!(smart.smart_type(), SmartType::Unsupported);
        assert!(!smart.update());
        assert!(!smart.last_update());
        assert_eq!(smart.state(), SessionState::Unopened);
        smart.close();
        smart.close();
        assert!(smart.as_generic().is_none());
        assert!(smart.as_nvme().is_none());
    }

    #[test]
    fn lifecycle_close_reports_first_call_only() {
        let mut l = Lifecycle::opened();
        assert!(l.record(true));
        assert_eq!(l.state(), SessionState::UpdateSucceeded);
        assert!(!l.record(false));
        assert!(!l.last_update());
        assert!(l.close());
        assert!(!l.close());
    }

    #[test]
    fn sessions_cross_threads_and_stay_small() {
        fn assert_send<T: Send>() {}
        assert_send::<Smart>();
        assert_send::<crate::DiskInfo>();
        // The ATA response lives on the heap, so no variant dwarfs the others.
        assert!(std::mem::size_of::<Smart>() < 200);
    }

    #[test]
    #[should_panic(expected = "closed SMART session")]
    fn use_after_close_panics() {
        let mut l = Lifecycle::opened();
        l.close();
        l.assert_open("update");
    }
}
