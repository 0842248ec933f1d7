use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::AccessFlags;
use crate::PoolId;
use crate::Rank;
use crate::SESSION_ID_LEN;
use crate::SESSION_TRANSITIONS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconnected,
    Connected,
    /// Bound leader no longer trusted; next operation re-resolves
    Degraded,
    /// Last re-resolution exhausted every replica
    Failed,
}

impl SessionState {
    fn label(self) -> &'static str {
        match self {
            SessionState::Unconnected => "unconnected",
            SessionState::Connected => "connected",
            SessionState::Degraded => "degraded",
            SessionState::Failed => "failed",
        }
    }
}

#[derive(Debug)]
struct SessionStatus {
    state: SessionState,
    leader: Option<Rank>,
}

#[derive(Debug)]
struct SessionInner {
    id: String,
    pool_id: PoolId,
    flags: AccessFlags,
    status: Mutex<SessionStatus>,
}

/// Client handle on one pool.
///
/// Cloning shares the handle; the state is visible to the connection
/// manager and the exclusion coordinator.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Debug for Session {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let status = self.inner.status.lock();
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("pool_id", &self.inner.pool_id)
            .field("state", &status.state)
            .field("leader", &status.leader)
            .finish()
    }
}

impl Session {
    pub(crate) fn connected(
        pool_id: PoolId,
        flags: AccessFlags,
        leader: Rank,
    ) -> Self {
        SESSION_TRANSITIONS
            .with_label_values(&[SessionState::Connected.label()])
            .inc();
        Self {
            inner: Arc::new(SessionInner {
                id: nanoid::nanoid!(SESSION_ID_LEN),
                pool_id,
                flags,
                status: Mutex::new(SessionStatus {
                    state: SessionState::Connected,
                    leader: Some(leader),
                }),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn pool_id(&self) -> PoolId {
        self.inner.pool_id
    }

    pub fn flags(&self) -> AccessFlags {
        self.inner.flags
    }

    pub fn state(&self) -> SessionState {
        self.inner.status.lock().state
    }

    /// Rank the session currently believes to be leader
    pub fn leader(&self) -> Option<Rank> {
        self.inner.status.lock().leader
    }

    /// Anything but `Unconnected`
    pub fn is_open(&self) -> bool {
        self.state() != SessionState::Unconnected
    }

    /// Connected -> Degraded. Returns false for any other starting state.
    pub(crate) fn degrade(&self) -> bool {
        let mut status = self.inner.status.lock();
        if status.state != SessionState::Connected {
            return false;
        }
        self.set_state(&mut status, SessionState::Degraded);
        true
    }

    /// Degrades the session if its leader is one of `ranks`.
    pub(crate) fn degrade_if_bound_to(
        &self,
        ranks: &[Rank],
    ) -> bool {
        let mut status = self.inner.status.lock();
        let bound = status.leader.is_some_and(|l| ranks.contains(&l));
        if !bound || status.state == SessionState::Unconnected {
            return false;
        }
        status.leader = None;
        if status.state == SessionState::Connected {
            self.set_state(&mut status, SessionState::Degraded);
        }
        true
    }

    /// Binds a freshly resolved leader. Refused once the session is closed.
    pub(crate) fn rebind(
        &self,
        leader: Rank,
    ) -> bool {
        let mut status = self.inner.status.lock();
        if status.state == SessionState::Unconnected {
            return false;
        }
        status.leader = Some(leader);
        if status.state != SessionState::Connected {
            self.set_state(&mut status, SessionState::Connected);
        }
        true
    }

    pub(crate) fn fail(&self) {
        let mut status = self.inner.status.lock();
        if status.state != SessionState::Unconnected {
            self.set_state(&mut status, SessionState::Failed);
        }
    }

    /// Moves to `Unconnected`. Returns false if already there.
    pub(crate) fn close(&self) -> bool {
        let mut status = self.inner.status.lock();
        if status.state == SessionState::Unconnected {
            return false;
        }
        status.leader = None;
        self.set_state(&mut status, SessionState::Unconnected);
        true
    }

    fn set_state(
        &self,
        status: &mut SessionStatus,
        to: SessionState,
    ) {
        debug!(
            "session {} (pool {}): {:?} -> {:?}",
            self.inner.id, self.inner.pool_id, status.state, to
        );
        status.state = to;
        SESSION_TRANSITIONS.with_label_values(&[to.label()]).inc();
    }
}
