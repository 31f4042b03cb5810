//! # Resource Store
//!
//! Lazily builds and caches at most one file backend and one database
//! connection, and owns their release.

use crate::backend::{DbConnectionHandle, FileBackendHandle, StoreBuilders};
use futures::future::{BoxFuture, FutureExt};
use ground_types::{describe_panic, Backend, StoreError};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Per-session resource store.
///
/// Not `Clone`: a store has exactly one owner, its session.
pub struct Store {
    builders: StoreBuilders,
    file: OnceCell<FileBackendHandle>,
    db: OnceCell<DbConnectionHandle>,
    disposed: AtomicBool,
}

impl Store {
    /// Create an empty store wired to the given builders.
    #[must_use]
    pub fn new(builders: StoreBuilders) -> Self {
        Self {
            builders,
            file: OnceCell::new(),
            db: OnceCell::new(),
            disposed: AtomicBool::new(false),
        }
    }

    /// The file backend, built on first access.
    ///
    /// # Errors
    ///
    /// - `StoreError::BuildFailed` - the builder failed (not cached)
    /// - `StoreError::Disposed` - the store was already disposed
    pub async fn file_backend(&self) -> Result<FileBackendHandle, StoreError> {
        self.ensure_live(Backend::FileStore)?;
        let handle = self
            .file
            .get_or_try_init(|| invoke_builder(Backend::FileStore, || (self.builders.file)()))
            .await?;
        Ok(Arc::clone(handle))
    }

    /// The database connection, built on first access.
    ///
    /// # Errors
    ///
    /// - `StoreError::BuildFailed` - the builder failed (not cached)
    /// - `StoreError::Disposed` - the store was already disposed
    pub async fn db_connection(&self) -> Result<DbConnectionHandle, StoreError> {
        self.ensure_live(Backend::Database)?;
        let handle = self
            .db
            .get_or_try_init(|| invoke_builder(Backend::Database, || (self.builders.db)()))
            .await?;
        Ok(Arc::clone(handle))
    }

    /// A new store wired to the same builders, with nothing built yet.
    #[must_use]
    pub fn spawn_child(&self) -> Store {
        Store::new(self.builders.clone())
    }

    /// Release whatever was built. Idempotent, never fails.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(file) = self.file.get() {
            release_quietly(Backend::FileStore, file.release()).await;
        }
        if let Some(db) = self.db.get() {
            release_quietly(Backend::Database, db.close()).await;
        }

        debug!(
            file_built = self.file.initialized(),
            db_built = self.db.initialized(),
            "Store disposed"
        );
    }

    #[must_use]
    pub fn has_file_backend(&self) -> bool {
        self.file.initialized()
    }

    #[must_use]
    pub fn has_db_connection(&self) -> bool {
        self.db.initialized()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn ensure_live(&self, backend: Backend) -> Result<(), StoreError> {
        if self.is_disposed() {
            return Err(StoreError::Disposed { backend });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("file_built", &self.file.initialized())
            .field("db_built", &self.db.initialized())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

async fn invoke_builder<T, F>(backend: Backend, builder: F) -> Result<T, StoreError>
where
    F: FnOnce() -> BoxFuture<'static, Result<T, StoreError>>,
{
    debug!(backend = %backend, "Building backend");

    let future = std::panic::catch_unwind(AssertUnwindSafe(builder))
        .map_err(|panic| StoreError::build_failed(backend, describe_panic(&*panic)))?;

    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(handle)) => Ok(handle),
        Ok(Err(e)) => {
            debug!(backend = %backend, error = %e, "Backend build failed");
            Err(e)
        }
        Err(panic) => Err(StoreError::build_failed(
            backend,
            describe_panic(&*panic),
        )),
    }
}

async fn release_quietly(backend: Backend, release: BoxFuture<'_, Result<(), StoreError>>) {
    match AssertUnwindSafe(release).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(backend = %backend, error = %e, "Backend release failed"),
        Err(panic) => warn!(
            backend = %backend,
            reason = %describe_panic(&*panic),
            "Backend release panicked"
        ),
    }
}
