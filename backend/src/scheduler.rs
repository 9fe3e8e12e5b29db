use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::RwLock;
use tokio::task::AbortHandle;
use tracing::{debug, info};
use uuid::Uuid;
use wheel_core::SessionStore;

struct PendingEnd {
    spin_id: Uuid,
    handle: AbortHandle,
}

/// Deferred end-of-spin transitions, at most one pending per owner.
#[derive(Clone, Default)]
pub struct SpinScheduler {
    pending: Arc<Mutex<HashMap<String, PendingEnd>>>,
}

impl SpinScheduler {
    /// Flips the owner's session to not running once `delay` elapses,
    /// replacing whatever end-transition the owner had pending.
    pub fn schedule(
        &self,
        sessions: Arc<RwLock<SessionStore>>,
        owner: String,
        spin_id: Uuid,
        delay: Duration,
    ) {
        let mut pending = self.pending.lock();
        if let Some(previous) = pending.remove(&owner) {
            previous.handle.abort();
            debug!(owner = %owner, spin_id = %previous.spin_id, "superseded pending end-transition");
        }

        let pending_ends = self.pending.clone();
        let task_owner = owner.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if sessions.write().await.finish(&task_owner, spin_id) {
                info!(owner = %task_owner, %spin_id, "spin reached its target time");
            }
            let mut pending = pending_ends.lock();
            if pending.get(&task_owner).is_some_and(|p| p.spin_id == spin_id) {
                pending.remove(&task_owner);
            }
        });

        pending.insert(
            owner,
            PendingEnd {
                spin_id,
                handle: task.abort_handle(),
            },
        );
    }

    pub fn cancel(&self, owner: &str) -> bool {
        match self.pending.lock().remove(owner) {
            Some(previous) => {
                previous.handle.abort();
                debug!(owner, spin_id = %previous.spin_id, "cancelled pending end-transition");
                true
            }
            None => false,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}
