//! In-memory workflow session registry.

use std::collections::HashMap;
use std::sync::Arc;

use ib_workflow::WorkflowSession;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::PortalError;

/// Shared map of live workflow sessions. Sessions are process-local;
/// restarting the server abandons in-flight edits, which the portal
/// treats as a fresh start rather than something to recover.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, WorkflowSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: WorkflowSession) -> Uuid {
        let id = session.id;
        self.inner.write().await.insert(id, session);
        id
    }

    pub async fn get(&self, id: Uuid) -> Result<WorkflowSession, PortalError> {
        self.inner
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortalError::not_found(format!("workflow session {id}")))
    }

    /// Run a closure against the live session under the write lock. The
    /// closure must not await; commits happen outside and are marked via
    /// a second `mutate` call.
    pub async fn mutate<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut WorkflowSession) -> Result<T, PortalError>,
    ) -> Result<T, PortalError> {
        let mut guard = self.inner.write().await;
        let session = guard
            .get_mut(&id)
            .ok_or_else(|| PortalError::not_found(format!("workflow session {id}")))?;
        f(session)
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.inner.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
