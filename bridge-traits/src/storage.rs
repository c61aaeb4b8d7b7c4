//! File System Abstraction
//!
//! Client secrets and token files are small JSON documents, so the trait
//! deals in whole files only. Implementations decide how the bytes reach the
//! disk; callers decide where files live.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Whole-file access to the credentials directory.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn copy_template(fs: &dyn FileSystemAccess, from: &Path, to: &Path) -> Result<()> {
///     let data = fs.read_file(from).await?;
///     fs.create_file(to, data).await
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Create `path` and any missing parents. Succeeds if it already exists.
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read the whole file. A missing file reports
    /// [`is_not_found`](crate::error::BridgeError::is_not_found).
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Replace the file's contents, creating parent directories as needed.
    ///
    /// Readers see either the old or the new contents, never a partial write.
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Create a file that must not exist yet. An existing file reports
    /// [`is_already_exists`](crate::error::BridgeError::is_already_exists)
    /// and is left untouched.
    async fn create_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Entries directly inside `path`, in no particular order.
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;
}
