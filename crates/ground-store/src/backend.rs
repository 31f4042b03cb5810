//! # Backend Contracts (Driven Ports)
//!
//! The file storage and SQL client implementations live outside this
//! workspace. The store only needs to build, hand out and release them.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use ground_types::StoreError;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;

/// A file storage backend.
#[async_trait]
pub trait FileBackend: Send + Sync + 'static {
    /// Release the backend. Must be idempotent.
    async fn release(&self) -> Result<(), StoreError>;

    /// Downcast hook for handler code that knows the concrete backend.
    fn as_any(&self) -> &dyn Any;
}

/// A database connection.
///
/// Transaction and command creation are exposed by the concrete type,
/// reached through [`DbConnection::as_any`].
#[async_trait]
pub trait DbConnection: Send + Sync + 'static {
    /// Close the connection. Must be idempotent.
    async fn close(&self) -> Result<(), StoreError>;

    /// Downcast hook for handler code that knows the concrete client.
    fn as_any(&self) -> &dyn Any;
}

pub type FileBackendHandle = Arc<dyn FileBackend>;
pub type DbConnectionHandle = Arc<dyn DbConnection>;

/// Zero-argument async builder for the file backend.
pub type FileBackendBuilder =
    Arc<dyn Fn() -> BoxFuture<'static, Result<FileBackendHandle, StoreError>> + Send + Sync>;

/// Zero-argument async builder for the database connection.
pub type DbConnectionBuilder =
    Arc<dyn Fn() -> BoxFuture<'static, Result<DbConnectionHandle, StoreError>> + Send + Sync>;

/// The pair of builders a store, and every child it spawns, is wired to.
#[derive(Clone)]
pub struct StoreBuilders {
    pub(crate) file: FileBackendBuilder,
    pub(crate) db: DbConnectionBuilder,
}

impl StoreBuilders {
    /// Wire two async closures as builders.
    ///
    /// ```rust,ignore
    /// let builders = StoreBuilders::new(
    ///     || async { Ok(Arc::new(LocalFiles::open("/srv/ground")?) as FileBackendHandle) },
    ///     || async { Ok(Arc::new(PgConnection::connect(&settings).await?) as DbConnectionHandle) },
    /// );
    /// ```
    pub fn new<F, FFut, D, DFut>(file: F, db: D) -> Self
    where
        F: Fn() -> FFut + Send + Sync + 'static,
        FFut: Future<Output = Result<FileBackendHandle, StoreError>> + Send + 'static,
        D: Fn() -> DFut + Send + Sync + 'static,
        DFut: Future<Output = Result<DbConnectionHandle, StoreError>> + Send + 'static,
    {
        Self {
            file: Arc::new(move || file().boxed()),
            db: Arc::new(move || db().boxed()),
        }
    }

    /// Wire already type-erased builders.
    #[must_use]
    pub fn from_parts(file: FileBackendBuilder, db: DbConnectionBuilder) -> Self {
        Self { file, db }
    }
}

impl std::fmt::Debug for StoreBuilders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreBuilders").finish_non_exhaustive()
    }
}
