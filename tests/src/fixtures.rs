//! # Test Fixtures
//!
//! In-memory stand-ins for the file and SQL backends, plus a small message
//! vocabulary with handlers that exercise the store through the proxy.

use async_trait::async_trait;
use ground_mediator::{FromProxy, Mediate, MediatorProxy, NotificationHandler, RequestHandler};
use ground_store::{
    DbConnection, DbConnectionHandle, FileBackend, FileBackendHandle, StoreBuilders,
};
use ground_types::{Backend, HandlerError, HandlerResult, Notification, Request, StoreError};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Ordered record of backend lifecycle events and handler side effects.
pub type EventLog = Arc<Mutex<Vec<String>>>;

// =============================================================================
// BACKENDS
// =============================================================================

/// File backend keeping blobs in memory.
pub struct MemoryFiles {
    id: usize,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    released: AtomicBool,
    events: EventLog,
}

impl MemoryFiles {
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        if self.released.load(Ordering::SeqCst) {
            return Err(StoreError::Disposed {
                backend: Backend::FileStore,
            });
        }
        self.blobs.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.lock().get(key).cloned()
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileBackend for MemoryFiles {
    async fn release(&self) -> Result<(), StoreError> {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.events.lock().push(format!("files#{} released", self.id));
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// SQL connection recording every statement it executes.
pub struct MemoryDb {
    id: usize,
    closed: AtomicBool,
    events: EventLog,
}

impl MemoryDb {
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn execute(&self, statement: &str) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Disposed {
                backend: Backend::Database,
            });
        }
        self.events
            .lock()
            .push(format!("db#{} {}", self.id, statement));
        Ok(())
    }
}

#[async_trait]
impl DbConnection for MemoryDb {
    async fn close(&self) -> Result<(), StoreError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.events.lock().push(format!("db#{} closed", self.id));
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Builders wired to in-memory backends, with build counters.
pub struct MemoryBackends {
    pub builders: StoreBuilders,
    pub events: EventLog,
    pub file_builds: Arc<AtomicUsize>,
    pub db_builds: Arc<AtomicUsize>,
}

impl MemoryBackends {
    #[must_use]
    pub fn new() -> Self {
        let events = EventLog::default();
        let file_builds = Arc::new(AtomicUsize::new(0));
        let db_builds = Arc::new(AtomicUsize::new(0));

        let (file_events, file_count) = (events.clone(), file_builds.clone());
        let (db_events, db_count) = (events.clone(), db_builds.clone());
        let builders = StoreBuilders::new(
            move || {
                let id = file_count.fetch_add(1, Ordering::SeqCst) + 1;
                let events = file_events.clone();
                async move {
                    events.lock().push(format!("files#{id} built"));
                    Ok::<_, StoreError>(Arc::new(MemoryFiles {
                        id,
                        blobs: Mutex::new(HashMap::new()),
                        released: AtomicBool::new(false),
                        events,
                    }) as FileBackendHandle)
                }
            },
            move || {
                let id = db_count.fetch_add(1, Ordering::SeqCst) + 1;
                let events = db_events.clone();
                async move {
                    events.lock().push(format!("db#{id} opened"));
                    Ok::<_, StoreError>(Arc::new(MemoryDb {
                        id,
                        closed: AtomicBool::new(false),
                        events,
                    }) as DbConnectionHandle)
                }
            },
        );

        Self {
            builders,
            events,
            file_builds,
            db_builds,
        }
    }

    /// Snapshot of the event log.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl Default for MemoryBackends {
    fn default() -> Self {
        Self::new()
    }
}

/// Builders whose database connection never comes up.
#[must_use]
pub fn offline_database(events: EventLog) -> StoreBuilders {
    StoreBuilders::new(
        move || {
            let events = events.clone();
            async move {
                Ok::<_, StoreError>(Arc::new(MemoryFiles {
                    id: 1,
                    blobs: Mutex::new(HashMap::new()),
                    released: AtomicBool::new(false),
                    events,
                }) as FileBackendHandle)
            }
        },
        || async {
            Err::<DbConnectionHandle, _>(StoreError::build_failed(
                Backend::Database,
                "connection refused",
            ))
        },
    )
}

// =============================================================================
// MESSAGES
// =============================================================================

pub struct Ping(pub String);

impl Request for Ping {
    type Output = String;
}

pub struct Pong(pub &'static str);

impl Notification for Pong {}

/// Store a document and announce it.
pub struct SaveDocument {
    pub key: String,
    pub body: String,
}

impl Request for SaveDocument {
    /// Id of the file backend the document landed in.
    type Output = usize;
}

pub struct DocumentSaved {
    pub key: String,
}

impl Notification for DocumentSaved {}

// =============================================================================
// HANDLERS
// =============================================================================

pub struct EchoHandler;

impl FromProxy for EchoHandler {
    fn from_proxy(_proxy: MediatorProxy) -> HandlerResult<Self> {
        Ok(Self)
    }
}

#[async_trait]
impl RequestHandler<Ping> for EchoHandler {
    async fn handle(&self, request: &Ping) -> HandlerResult<String> {
        Ok(request.0.clone())
    }
}

/// Writes the body to the session's file backend, records it in the
/// session's database, then schedules `DocumentSaved`.
pub struct SaveDocumentHandler {
    proxy: MediatorProxy,
}

impl FromProxy for SaveDocumentHandler {
    fn from_proxy(proxy: MediatorProxy) -> HandlerResult<Self> {
        Ok(Self { proxy })
    }
}

#[async_trait]
impl RequestHandler<SaveDocument> for SaveDocumentHandler {
    async fn handle(&self, request: &SaveDocument) -> HandlerResult<usize> {
        let files = self.proxy.store().file_backend().await?;
        let files = memory_files(&*files)?;
        files.put(&request.key, request.body.as_bytes())?;

        let db = self.proxy.store().db_connection().await?;
        memory_db(&*db)?.execute(&format!("INSERT document {}", request.key))?;

        self.proxy.notify_all(DocumentSaved {
            key: request.key.clone(),
        })?;
        Ok(files.id())
    }
}

/// Records the save in its own session's database.
pub struct AuditHandler {
    proxy: MediatorProxy,
}

impl FromProxy for AuditHandler {
    fn from_proxy(proxy: MediatorProxy) -> HandlerResult<Self> {
        Ok(Self { proxy })
    }
}

#[async_trait]
impl NotificationHandler<DocumentSaved> for AuditHandler {
    async fn handle(&self, notification: &DocumentSaved) -> HandlerResult<()> {
        let db = self.proxy.store().db_connection().await?;
        memory_db(&*db)?.execute(&format!("INSERT audit {}", notification.key))?;
        Ok(())
    }
}

pub fn memory_files(handle: &dyn FileBackend) -> HandlerResult<&MemoryFiles> {
    handle
        .as_any()
        .downcast_ref::<MemoryFiles>()
        .ok_or_else(|| HandlerError::rejected("unexpected file backend"))
}

pub fn memory_db(handle: &dyn DbConnection) -> HandlerResult<&MemoryDb> {
    handle
        .as_any()
        .downcast_ref::<MemoryDb>()
        .ok_or_else(|| HandlerError::rejected("unexpected database connection"))
}
