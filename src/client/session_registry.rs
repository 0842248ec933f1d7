use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::AccessFlags;
use crate::PoolError;
use crate::PoolId;
use crate::Rank;
use crate::Result;
use crate::Session;
use crate::SESSION_ID_LEN;

/// Outstanding sessions across all pools
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
    /// Connects admitted but not yet bound to a leader
    reservations: DashMap<String, (PoolId, AccessFlags)>,
    /// Serializes the mode check with the reservation insert
    admission: Mutex<()>,
}

/// Claim on a pool's access mode held while a connect resolves its leader.
///
/// Dropping it without [`Reservation::commit`] gives the mode back, so a
/// failed or cancelled connect never leaves a stale claim behind.
#[derive(Debug)]
pub(crate) struct Reservation<'a> {
    registry: &'a SessionRegistry,
    id: String,
}

impl Reservation<'_> {
    /// Registers the session before the claim is released.
    pub(crate) fn commit(
        self,
        session: Session,
    ) {
        self.registry.register(session);
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.registry.reservations.remove(&self.id);
    }
}

impl SessionRegistry {
    pub fn register(
        &self,
        session: Session,
    ) {
        self.sessions.insert(session.id().to_string(), session);
    }

    /// Admits a connect in `flags` mode against the open sessions and the
    /// connects still in flight for `pool_id`.
    ///
    /// Exclusive mode requires no other holder; shared mode only conflicts
    /// with an exclusive holder.
    pub(crate) fn reserve(
        &self,
        pool_id: PoolId,
        flags: AccessFlags,
    ) -> Result<Reservation<'_>> {
        let _admission = self.admission.lock();

        let mut holders: Vec<AccessFlags> = self
            .sessions
            .iter()
            .filter(|e| e.value().pool_id() == pool_id && e.value().is_open())
            .map(|e| e.value().flags())
            .collect();
        holders.extend(
            self.reservations
                .iter()
                .filter(|e| e.value().0 == pool_id)
                .map(|e| e.value().1),
        );

        let conflict = if flags.is_exclusive() {
            !holders.is_empty()
        } else {
            holders.iter().any(|f| f.is_exclusive())
        };
        if conflict {
            debug!("pool {}: {} refused, {} holders", pool_id, flags, holders.len());
            return Err(PoolError::PoolBusy {
                pool_id,
                sessions: holders.len(),
            }
            .into());
        }

        let id = nanoid::nanoid!(SESSION_ID_LEN);
        self.reservations.insert(id.clone(), (pool_id, flags));
        Ok(Reservation { registry: self, id })
    }

    /// Connects admitted for `pool_id` and still resolving
    pub fn pending_count(
        &self,
        pool_id: PoolId,
    ) -> usize {
        self.reservations.iter().filter(|e| e.value().0 == pool_id).count()
    }

    pub fn remove(
        &self,
        session_id: &str,
    ) -> Option<Session> {
        self.sessions.remove(session_id).map(|(_, s)| s)
    }

    pub fn sessions_for(
        &self,
        pool_id: PoolId,
    ) -> Vec<Session> {
        self.sessions
            .iter()
            .filter(|e| e.value().pool_id() == pool_id)
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn open_count(
        &self,
        pool_id: PoolId,
    ) -> usize {
        self.sessions
            .iter()
            .filter(|e| e.value().pool_id() == pool_id && e.value().is_open())
            .count()
    }

    /// Degrades every session of `pool_id` bound to one of `ranks`.
    pub fn degrade_bound_to(
        &self,
        pool_id: PoolId,
        ranks: &[Rank],
    ) -> usize {
        self.sessions_for(pool_id)
            .into_iter()
            .filter(|s| s.degrade_if_bound_to(ranks))
            .count()
    }

    /// Forces every session of `pool_id` to `Unconnected` and forgets them.
    pub fn close_pool(
        &self,
        pool_id: PoolId,
    ) -> usize {
        let sessions = self.sessions_for(pool_id);
        for session in &sessions {
            session.close();
            self.sessions.remove(session.id());
        }
        sessions.len()
    }
}
