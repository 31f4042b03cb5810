//! Session scope: one resource-store lifetime plus the environment it runs in.

use ground_store::Store;
use ground_types::{GlobalEnv, SessionId};
use std::fmt;
use std::sync::Arc;

/// Lifecycle of a dispatcher instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Accepting dispatch calls.
    Active,
    /// Releasing the session store and draining the deferred queue.
    Disposing,
    /// Terminal.
    Disposed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Disposing => write!(f, "disposing"),
            Self::Disposed => write!(f, "disposed"),
        }
    }
}

/// Identity, environment snapshot and exclusively-owned store of one session.
pub struct Session {
    id: SessionId,
    env: Arc<GlobalEnv>,
    store: Store,
}

impl Session {
    pub(crate) fn new(env: Arc<GlobalEnv>, store: Store) -> Self {
        Self {
            id: SessionId::new(),
            env,
            store,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Snapshot captured when the session was created.
    #[must_use]
    pub fn env(&self) -> &Arc<GlobalEnv> {
        &self.env
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Where new sessions take their environment snapshot from.
#[derive(Clone, Debug)]
pub(crate) enum EnvSource {
    /// The process-wide snapshot current at session creation.
    Global,
    /// A fixed snapshot, for embedded use and tests.
    Fixed(Arc<GlobalEnv>),
}

impl EnvSource {
    pub(crate) fn snapshot(&self) -> Arc<GlobalEnv> {
        match self {
            Self::Global => GlobalEnv::global(),
            Self::Fixed(env) => Arc::clone(env),
        }
    }
}
