//! Scoped scratch directories
//!
//! [`with_temp_dir`] hands a fresh directory to a unit of work and removes it
//! on every exit path before returning. The `TempDir` guard is held for the
//! whole scope, so a panicking or dropped future still gets cleaned up
//! (synchronously, from `Drop`).

use crate::config::TEMP_DIR_PREFIX;
use std::future::Future;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Run `work` inside a freshly created, uniquely named directory under the
/// system temp root.
///
/// The directory and everything in it are removed once `work` finishes:
/// - on success, a removal failure is returned as the error;
/// - on failure, the original error is returned and a removal failure is
///   only logged.
///
/// # Example
/// ```no_run
/// # async fn demo() -> kodegen_bundler_notarize::error::Result<()> {
/// use kodegen_bundler_notarize::temp::with_temp_dir;
///
/// let size = with_temp_dir(|dir| async move {
///     tokio::fs::write(dir.join("a.txt"), b"hello").await?;
///     Ok::<_, kodegen_bundler_notarize::NotarizeError>(5)
/// })
/// .await?;
/// # Ok(()) }
/// ```
pub async fn with_temp_dir<F, Fut, T, E>(work: F) -> std::result::Result<T, E>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: From<std::io::Error>,
{
    let guard = tempfile::Builder::new()
        .prefix(TEMP_DIR_PREFIX)
        .tempdir()?;
    let dir = guard.path().to_path_buf();
    tracing::debug!(dir = %dir.display(), "doing work inside temp dir");

    match work(dir).await {
        Ok(value) => {
            tracing::debug!("work succeeded");
            remove_scratch_dir(guard).await?;
            Ok(value)
        }
        Err(err) => {
            tracing::debug!("work failed");
            if let Err(cleanup_err) = remove_scratch_dir(guard).await {
                tracing::warn!(error = %cleanup_err, "failed to remove temp dir after failed work");
            }
            Err(err)
        }
    }
}

async fn remove_scratch_dir(guard: TempDir) -> std::io::Result<()> {
    let path = guard.path().to_path_buf();
    let result = remove_dir(&path).await;
    // The guard's own removal is a no-op now, or a last attempt if ours failed.
    drop(guard);
    if result.is_ok() {
        tracing::debug!(dir = %path.display(), "removed temp dir");
    }
    result
}

async fn remove_dir(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        // Work may have removed its own scratch space
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotarizeError;

    #[tokio::test]
    async fn test_dir_exists_during_work_and_is_removed_after() {
        let mut seen = None;
        let result = with_temp_dir(|dir| {
            seen = Some(dir.clone());
            async move {
                assert!(dir.is_dir());
                let name = dir.file_name().unwrap().to_string_lossy().to_string();
                assert!(name.starts_with(TEMP_DIR_PREFIX));

                tokio::fs::create_dir_all(dir.join("nested/deeper")).await?;
                tokio::fs::write(dir.join("nested/deeper/file.txt"), b"data").await?;
                let read = tokio::fs::read(dir.join("nested/deeper/file.txt")).await?;
                Ok::<_, NotarizeError>(read.len())
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 4);
        let dir = seen.unwrap();
        assert!(!dir.exists(), "temp dir should be gone: {}", dir.display());
    }

    #[tokio::test]
    async fn test_dir_is_removed_when_work_fails() {
        let mut seen = None;
        let err = with_temp_dir(|dir| {
            seen = Some(dir.clone());
            async move {
                tokio::fs::write(dir.join("partial.zip"), b"junk").await?;
                Err::<(), _>(NotarizeError::CommandExecution("boom".to_string()))
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, NotarizeError::CommandExecution(ref m) if m == "boom"));
        assert!(!seen.unwrap().exists());
    }

    #[tokio::test]
    async fn test_work_removing_its_own_dir_is_not_an_error() {
        let value = with_temp_dir(|dir| async move {
            tokio::fs::remove_dir_all(&dir).await?;
            Ok::<_, std::io::Error>("done")
        })
        .await
        .unwrap();
        assert_eq!(value, "done");
    }

    #[tokio::test]
    async fn test_each_invocation_gets_a_distinct_dir() {
        let (a, b) = tokio::join!(
            with_temp_dir(|dir| async move { Ok::<_, std::io::Error>(dir) }),
            with_temp_dir(|dir| async move { Ok::<_, std::io::Error>(dir) }),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a, b);
        assert!(!a.exists());
        assert!(!b.exists());
    }
}
