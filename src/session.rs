//! Session host — one isolated `WizardController` per browser session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::SessionError;
use crate::intake::{Clock, CompletenessPolicy, WizardController};
use crate::schema::FeatureSchema;

/// A live session.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub controller: WizardController,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// In-memory session map. Sessions never share state.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
    schema: &'static FeatureSchema,
    clock: Arc<dyn Clock>,
    policy: CompletenessPolicy,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(
        schema: &'static FeatureSchema,
        clock: Arc<dyn Clock>,
        policy: CompletenessPolicy,
        idle_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            schema,
            clock,
            policy,
            idle_timeout,
        })
    }

    /// Open a new session on the first page.
    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let session = Session {
            id,
            controller: WizardController::new(self.schema, Arc::clone(&self.clock), self.policy),
            created_at: now,
            last_seen: now,
        };
        self.sessions.write().await.insert(id, session);
        info!(session_id = %id, "Session created");
        id
    }

    /// Run `f` against the session's controller and mark the session active.
    pub async fn with_session<F, R>(&self, id: Uuid, f: F) -> Result<R, SessionError>
    where
        F: FnOnce(&mut WizardController) -> R,
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound { id })?;
        session.last_seen = Utc::now();
        Ok(f(&mut session.controller))
    }

    /// Drop a session. Returns whether it existed.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!(session_id = %id, "Session closed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop sessions idle longer than the timeout. Returns how many.
    pub async fn prune_idle(&self) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(self.idle_timeout)
            .ok()
            .and_then(|idle| Utc::now().checked_sub_signed(idle))
        else {
            return 0;
        };
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, s| {
            let keep = s.last_seen > cutoff;
            if !keep {
                debug!(session_id = %id, "Session expired");
            }
            keep
        });
        let pruned = before - sessions.len();
        if pruned > 0 {
            info!(pruned, remaining = sessions.len(), "Pruned idle sessions");
        }
        pruned
    }
}

/// Spawn a background task that periodically prunes idle sessions.
pub fn spawn_prune_task(store: Arc<SessionStore>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            store.prune_idle().await;
        }
    })
}
