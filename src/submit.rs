//! Notarization workflow for macOS apps
//!
//! Uploads a zipped bundle with `xcrun altool`, polls the service until the
//! submission leaves `in progress`, and staples the ticket to the bundle.
//!
//! # Process
//! 1. Zip the bundle inside a scratch directory ([`crate::temp::with_temp_dir`])
//! 2. Submit with `altool --notarize-app`, read back the `RequestUUID`
//! 3. Poll `altool --notarization-info` at a fixed interval
//! 4. Staple the ticket with `xcrun stapler`

use crate::archive::zip_app;
use crate::config::{AppleIdCredentials, NotarizeConfig};
use crate::error::{NotarizeError, Result};
use crate::logging::redacted;
use crate::report::{NotarizationInfo, NotarizationStatus, parse_notarization_info, parse_request_uuid};
use crate::temp::with_temp_dir;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Everything needed to notarize one bundle.
#[derive(Debug, Clone)]
pub struct NotarizeOptions {
    pub app_path: PathBuf,
    pub bundle_id: String,
    pub credentials: AppleIdCredentials,
}

impl From<NotarizeConfig> for NotarizeOptions {
    fn from(config: NotarizeConfig) -> Self {
        Self {
            app_path: config.app_path,
            bundle_id: config.bundle_id,
            credentials: config.credentials,
        }
    }
}

/// Something that can report on a submission.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn status(&self, uuid: &str) -> Result<NotarizationInfo>;
}

/// [`StatusSource`] backed by `xcrun altool --notarization-info`.
#[derive(Debug, Clone)]
pub struct Altool {
    credentials: AppleIdCredentials,
}

impl Altool {
    #[must_use]
    pub fn new(credentials: AppleIdCredentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl StatusSource for Altool {
    async fn status(&self, uuid: &str) -> Result<NotarizationInfo> {
        notarization_info(uuid, &self.credentials).await
    }
}

fn altool_command(credentials: &AppleIdCredentials) -> Command {
    let mut cmd = Command::new("xcrun");
    cmd.arg("altool");
    cmd.arg("-u")
        .arg(&credentials.apple_id)
        .arg("-p")
        .arg(&credentials.password);
    if let Some(team_id) = &credentials.team_id {
        cmd.arg("--asc-provider").arg(team_id);
    }
    cmd
}

fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

async fn run_altool(cmd: &mut Command, action: &str) -> Result<String> {
    let output = cmd
        .output()
        .await
        .map_err(|e| NotarizeError::CommandExecution(format!("xcrun altool failed: {e}")))?;
    let text = combined_output(&output);

    if !output.status.success() {
        return Err(NotarizeError::CommandExecution(format!(
            "{action} failed with code {}:\n{text}",
            output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string())
        )));
    }

    Ok(text)
}

/// Upload `zip_path` and return the request UUID assigned by the service.
pub async fn upload_app(
    zip_path: &Path,
    bundle_id: &str,
    credentials: &AppleIdCredentials,
) -> Result<String> {
    tracing::info!(
        zip = %zip_path.display(),
        bundle_id,
        apple_id = %credentials.apple_id,
        password = %redacted(&credentials.password),
        "uploading to Apple"
    );

    let mut cmd = altool_command(credentials);
    cmd.arg("--notarize-app")
        .arg("-f")
        .arg(zip_path)
        .arg("--primary-bundle-id")
        .arg(bundle_id);

    let output = run_altool(&mut cmd, "Notarization upload").await?;

    let uuid = parse_request_uuid(&output).ok_or_else(|| {
        NotarizeError::UnexpectedOutput(format!(
            "No RequestUUID in altool upload output:\n{output}"
        ))
    })?;
    tracing::info!(%uuid, "upload succeeded");
    Ok(uuid)
}

/// Ask the service for the current report on `uuid`.
pub async fn notarization_info(
    uuid: &str,
    credentials: &AppleIdCredentials,
) -> Result<NotarizationInfo> {
    tracing::debug!(%uuid, "requesting notarization info");
    let mut cmd = altool_command(credentials);
    cmd.arg("--notarization-info").arg(uuid);

    let output = run_altool(&mut cmd, "Notarization info").await?;
    Ok(parse_notarization_info(&output))
}

/// Poll `source` every `interval` until the submission is no longer in
/// progress.
///
/// # Returns
/// * `Ok(info)` - the service reported `success`
/// * `Err(NotarizationRejected)` - any other final status
/// * `Err(UnexpectedOutput)` - a report carried no status line
pub async fn wait_for_notarization<S>(
    source: &S,
    uuid: &str,
    interval: Duration,
) -> Result<NotarizationInfo>
where
    S: StatusSource + ?Sized,
{
    loop {
        let info = source.status(uuid).await?;
        match &info.status {
            Some(NotarizationStatus::InProgress) => {
                tracing::info!(%uuid, wait_secs = interval.as_secs(), "notarization in progress");
                tokio::time::sleep(interval).await;
            }
            Some(NotarizationStatus::Success) => {
                tracing::info!(
                    %uuid,
                    status_message = info.status_message.as_deref().unwrap_or_default(),
                    "notarization succeeded"
                );
                return Ok(info);
            }
            Some(status) => {
                return Err(rejection(uuid, status, &info));
            }
            None => {
                return Err(NotarizeError::UnexpectedOutput(format!(
                    "Notarization report for {uuid} has no status"
                )));
            }
        }
    }
}

fn rejection(uuid: &str, status: &NotarizationStatus, info: &NotarizationInfo) -> NotarizeError {
    NotarizeError::NotarizationRejected {
        uuid: uuid.to_string(),
        status: status.to_string(),
        message: info.status_message.clone(),
        log_file_url: info.log_file_url.clone(),
    }
}

/// Staple the notarization ticket to an app bundle
pub async fn staple_app(app_path: &Path) -> Result<()> {
    let app_name = app_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| NotarizeError::InvalidConfig("Invalid app name".to_string()))?;

    let app_parent = match app_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    tracing::info!(app = %app_path.display(), "stapling ticket");
    let output = Command::new("xcrun")
        .args(["stapler", "staple", "-v", app_name])
        .current_dir(app_parent)
        .output()
        .await
        .map_err(|e| NotarizeError::CommandExecution(format!("stapler failed: {e}")))?;

    if !output.status.success() {
        return Err(NotarizeError::CommandExecution(format!(
            "Stapling failed: {}",
            combined_output(&output)
        )));
    }

    Ok(())
}

/// Zip, upload, wait for and staple one bundle.
///
/// Returns the final report of a successful submission.
pub async fn notarize(options: &NotarizeOptions, interval: Duration) -> Result<NotarizationInfo> {
    if !tokio::fs::try_exists(&options.app_path).await? {
        return Err(NotarizeError::InvalidConfig(format!(
            "App bundle not found: {}",
            options.app_path.display()
        )));
    }

    let info = with_temp_dir(|dir| async move {
        let zip_path = zip_app(&dir, &options.app_path).await?;
        let uuid = upload_app(&zip_path, &options.bundle_id, &options.credentials).await?;
        let altool = Altool::new(options.credentials.clone());
        wait_for_notarization(&altool, &uuid, interval).await
    })
    .await?;

    staple_app(&options.app_path).await?;
    Ok(info)
}

/// Check that the external tools used by [`notarize`] are available.
pub async fn check_dependencies() -> Result<()> {
    let zip_check = Command::new("zip").arg("-v").output().await;
    if !zip_check.is_ok_and(|o| o.status.success()) {
        return Err(NotarizeError::MissingDependency(
            "'zip' command not available in PATH".to_string(),
        ));
    }

    let altool_check = Command::new("xcrun")
        .args(["altool", "--version"])
        .output()
        .await;
    if !altool_check.is_ok_and(|o| o.status.success()) {
        return Err(NotarizeError::MissingDependency(
            "xcrun altool not available.\n\
             Install Xcode Command Line Tools:\n\
             xcode-select --install"
                .to_string(),
        ));
    }

    Ok(())
}
