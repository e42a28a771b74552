//! Export and install flows.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::Stream;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use shopfront_events::EventBus;
use shopfront_protocol::{ArchiveName, TaskId, ThemeInstalled};
use shopfront_runner::{CommandRunner, CommandSpec, RunError};

use crate::archive::ArchiveRef;
use crate::check::ExportCheck;
use crate::error::ThemeError;
use crate::upload::UploadReceiver;

/// Paths, command lines and limits used by [`ThemeService`].
#[derive(Debug, Clone)]
pub struct ThemeSettings {
    /// Directory uploaded archives are stored in.
    pub upload_dir: PathBuf,
    /// Working directory of the packaging command; exports land here.
    pub export_dir: PathBuf,
    pub export_command: Vec<String>,
    pub install_command: Vec<String>,
    pub export_check: ExportCheck,
    /// Upper bound on each external command (`None` = unbounded).
    pub command_timeout: Option<Duration>,
    pub max_upload_bytes: Option<u64>,
    /// Run install commands one at a time.
    pub serialize_installs: bool,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("public/static/files"),
            export_dir: PathBuf::from("."),
            export_command: to_owned_line(crate::DEFAULT_EXPORT_COMMAND),
            install_command: to_owned_line(crate::DEFAULT_INSTALL_COMMAND),
            export_check: ExportCheck::default(),
            command_timeout: Some(shopfront_runner::DEFAULT_COMMAND_TIMEOUT),
            max_upload_bytes: None,
            serialize_installs: false,
        }
    }
}

fn to_owned_line(line: &[&str]) -> Vec<String> {
    line.iter().map(|s| s.to_string()).collect()
}

/// Receipt for an accepted install: the upload is stored and the install
/// command has been started in the background.
#[derive(Debug, Clone)]
pub struct InstallTicket {
    pub task_id: TaskId,
    pub archive: ArchiveRef,
}

/// Theme export and installation.
///
/// Shared by all request handlers; every method takes `&self`.
pub struct ThemeService {
    settings: ThemeSettings,
    runner: Arc<dyn CommandRunner>,
    bus: EventBus,
    receiver: UploadReceiver,
    install_gate: Option<Arc<Semaphore>>,
    installs: TaskTracker,
    cancel: CancellationToken,
}

impl ThemeService {
    pub fn new(settings: ThemeSettings, runner: Arc<dyn CommandRunner>, bus: EventBus) -> Self {
        let receiver = UploadReceiver::new(&settings.upload_dir)
            .with_max_bytes(settings.max_upload_bytes);
        let install_gate = settings
            .serialize_installs
            .then(|| Arc::new(Semaphore::new(1)));
        Self {
            settings,
            runner,
            bus,
            receiver,
            install_gate,
            installs: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn settings(&self) -> &ThemeSettings {
        &self.settings
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Packages the active theme into a new archive.
    ///
    /// Waits for the packaging command and resolves to the archive once
    /// the command has exited cleanly and [`ExportCheck`] confirms the
    /// archive was produced.
    pub async fn export_theme(&self) -> Result<ArchiveRef, ThemeError> {
        let task_id = TaskId::new();
        let archive = ArchiveRef::in_dir(&self.settings.export_dir, ArchiveName::for_task(task_id));
        let spec = self
            .command(&self.settings.export_command)?
            .arg(archive.name().as_str())
            .current_dir(&self.settings.export_dir);

        tracing::info!(%task_id, archive = %archive.name(), "exporting theme");
        let output = match self.runner.run(spec, self.cancel.child_token()).await {
            Ok(output) => output,
            Err(e) => {
                tracing::error!(%task_id, "exporting theme failed: {e}");
                return Err(e.into());
            }
        };

        if !self
            .settings
            .export_check
            .confirms(&output, archive.path())
            .await
        {
            tracing::error!(
                %task_id,
                stdout = %output.stdout.trim(),
                "packaging command exited cleanly without producing the archive"
            );
            return Err(ThemeError::ExportIncomplete);
        }

        tracing::info!(%task_id, "theme successfully exported to {}", archive.name());
        Ok(archive)
    }

    /// Stores an uploaded theme archive and starts installing it.
    ///
    /// Resolves as soon as the upload is on disk; the install command runs
    /// in the background and its outcome is published on the bus as a
    /// `THEME_INSTALLED` event tagged with the ticket's task id.
    pub async fn install_theme<S, O, E>(
        &self,
        body: S,
        boundary: impl Into<String>,
    ) -> Result<InstallTicket, ThemeError>
    where
        S: Stream<Item = Result<O, E>> + Send + 'static,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let upload = match self.receiver.receive(body, boundary).await {
            Ok(upload) => upload,
            Err(e) => {
                tracing::error!("theme upload failed: {e}");
                return Err(e.into());
            }
        };

        let task_id = TaskId::new();
        tracing::info!(%task_id, archive = %upload.name, size = upload.size, "theme archive uploaded");
        self.spawn_install(task_id, &upload.name);

        Ok(InstallTicket {
            task_id,
            archive: upload.archive_ref(),
        })
    }

    /// Cancels running commands and waits for background installs to
    /// publish their outcome.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.installs.close();
        self.installs.wait().await;
    }

    fn spawn_install(&self, task_id: TaskId, archive: &ArchiveName) {
        let spec = self
            .command(&self.settings.install_command)
            .map(|spec| spec.arg(archive.as_str()));
        let runner = Arc::clone(&self.runner);
        let bus = self.bus.clone();
        let gate = self.install_gate.clone();
        let cancel = self.cancel.child_token();

        self.installs.spawn(async move {
            let _permit = match &gate {
                Some(gate) => gate.acquire().await.ok(),
                None => None,
            };

            tracing::info!(%task_id, "installing theme...");
            let result = match spec {
                Ok(spec) => runner.run(spec, cancel).await.map(drop),
                Err(e) => Err(e),
            };

            let event = match result {
                Ok(()) => {
                    tracing::info!(%task_id, "theme successfully installed");
                    ThemeInstalled::succeeded(task_id)
                }
                Err(e) => {
                    tracing::error!(%task_id, "installing theme failed: {e}");
                    ThemeInstalled::failed(task_id, e.to_string())
                }
            };
            bus.publish(event);
        });
    }

    fn command(&self, line: &[String]) -> Result<CommandSpec, RunError> {
        let spec = CommandSpec::from_command_line(line)?;
        Ok(match self.settings.command_timeout {
            Some(limit) => spec.timeout(limit),
            None => spec,
        })
    }
}
