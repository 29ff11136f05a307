//! Per-session context
//!
//! Created once when the host session starts and dropped when it ends, so the
//! frame callback never has to discover the binding or reference space lazily.

use super::binding::{ReferenceSpace, XrSession};

/// Binding and reference space for one running session
pub struct SessionContext<S: XrSession> {
    session: S,
    space: ReferenceSpace,
}

impl<S: XrSession> SessionContext<S> {
    pub fn new(session: S, space: ReferenceSpace) -> Self {
        tracing::debug!(space = space.id, kind = ?space.kind, "Session context created");
        Self { session, space }
    }

    pub fn space(&self) -> ReferenceSpace {
        self.space
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Give the host its session back
    pub fn into_session(self) -> S {
        self.session
    }
}
