//! ZIP packaging of app bundles for upload
//!
//! `altool` only accepts a single file, so the `.app` directory is zipped
//! first. `zip` runs from the bundle's parent directory so the archive holds
//! `Name.app/...` rather than absolute paths, and `-y` stores symlinks as
//! links (frameworks inside a bundle rely on them).

use crate::error::{NotarizeError, Result};
use std::path::{Path, PathBuf};

/// Archive `app_path` into `<dir>/<bundle stem>.zip` and return that path.
///
/// # Errors
/// * `InvalidConfig` - the bundle path has no usable name or parent
/// * `CommandExecution` - `zip` could not be started
/// * `ArchiveFailed` - `zip` exited non-zero; carries its exit code and output
pub async fn zip_app(dir: &Path, app_path: &Path) -> Result<PathBuf> {
    let bundle_name = app_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            NotarizeError::InvalidConfig(format!("Invalid app bundle path: {}", app_path.display()))
        })?;

    let stem = app_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| NotarizeError::InvalidConfig("Invalid app name".to_string()))?;

    // A bare `Foo.app` has an empty parent; zip from the current directory.
    let app_parent = match app_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let zip_path = absolute(&dir.join(format!("{stem}.zip")))?;
    tracing::info!(zip = %zip_path.display(), "zipping application");

    // `zip -r` updates an existing archive in place, keeping entries that
    // were since deleted from the bundle.
    match tokio::fs::remove_file(&zip_path).await {
        Ok(()) => tracing::debug!("removed previous archive"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let output = tokio::process::Command::new("zip")
        .args(["-r", "-y"])
        .arg(&zip_path)
        .arg(bundle_name)
        .current_dir(app_parent)
        .output()
        .await
        .map_err(|e| NotarizeError::CommandExecution(format!("zip failed to start: {e}")))?;

    if !output.status.success() {
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(NotarizeError::ArchiveFailed {
            code: output.status.code(),
            output: combined,
        });
    }

    tracing::debug!("zip succeeded");
    Ok(zip_path)
}

// `zip` runs in another working directory, so a relative output path would
// land next to the bundle instead of in `dir`.
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn zip_available() -> bool {
        let available = tokio::process::Command::new("zip")
            .arg("-v")
            .output()
            .await
            .is_ok_and(|o| o.status.success());
        if !available {
            eprintln!("zip not found on PATH, skipping");
        }
        available
    }

    async fn make_bundle(root: &Path, name: &str) -> PathBuf {
        let app = root.join(name);
        tokio::fs::create_dir_all(app.join("Contents/MacOS")).await.unwrap();
        tokio::fs::write(app.join("Contents/Info.plist"), b"<plist/>")
            .await
            .unwrap();
        tokio::fs::write(app.join("Contents/MacOS/Kodegen"), b"#!/bin/sh\n")
            .await
            .unwrap();
        app
    }

    #[tokio::test]
    async fn test_zip_app_creates_archive_named_after_bundle() {
        if !zip_available().await {
            return;
        }
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let app = make_bundle(src.path(), "Kodegen.app").await;

        let zip_path = zip_app(out.path(), &app).await.unwrap();

        assert_eq!(zip_path, out.path().join("Kodegen.zip"));
        let meta = tokio::fs::metadata(&zip_path).await.unwrap();
        assert!(meta.is_file());
        assert!(meta.len() > 0);

        // Entries are stored relative to the bundle's parent
        let bytes = tokio::fs::read(&zip_path).await.unwrap();
        let haystack = String::from_utf8_lossy(&bytes);
        assert!(haystack.contains("Kodegen.app/Contents/Info.plist"));
        assert!(!haystack.contains(&*src.path().to_string_lossy()));
    }

    #[tokio::test]
    async fn test_rezip_drops_files_removed_from_bundle() {
        if !zip_available().await {
            return;
        }
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let app = make_bundle(src.path(), "Kodegen.app").await;
        let stale = app.join("Contents/old_removed_file.txt");
        tokio::fs::write(&stale, b"stale").await.unwrap();

        let first = zip_app(out.path(), &app).await.unwrap();
        let bytes = tokio::fs::read(&first).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("old_removed_file.txt"));

        tokio::fs::remove_file(&stale).await.unwrap();
        tokio::fs::write(app.join("Contents/new.txt"), b"new").await.unwrap();

        let second = zip_app(out.path(), &app).await.unwrap();
        assert_eq!(first, second);
        let bytes = tokio::fs::read(&second).await.unwrap();
        let haystack = String::from_utf8_lossy(&bytes);
        assert!(!haystack.contains("old_removed_file.txt"));
        assert!(haystack.contains("Kodegen.app/Contents/new.txt"));
    }

    #[tokio::test]
    async fn test_zip_app_failure_reports_exit_code() {
        if !zip_available().await {
            return;
        }
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let missing = src.path().join("Missing.app");

        let err = zip_app(out.path(), &missing).await.unwrap_err();

        match &err {
            NotarizeError::ArchiveFailed { code, .. } => {
                let code = code.expect("zip exited normally");
                assert_ne!(code, 0);
                assert!(err.to_string().contains(&format!("exited with code: {code}")));
            }
            other => panic!("expected ArchiveFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zip_app_rejects_path_without_name() {
        let out = TempDir::new().unwrap();
        let err = zip_app(out.path(), Path::new("/")).await.unwrap_err();
        assert!(matches!(err, NotarizeError::InvalidConfig(_)));
    }

    #[test]
    fn test_archive_failed_message() {
        let err = NotarizeError::ArchiveFailed {
            code: Some(12),
            output: "zip error: Nothing to do!".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("exited with code: 12"));
        assert!(message.contains("Nothing to do!"));
    }
}
