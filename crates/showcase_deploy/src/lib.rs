//! # Showcase Deploy
//!
//! A [`Deployer`] that shells out to `git` and to a deploy script.
//!
//! * [`Deployer::push`] runs `git add .`, `git commit` and `git push`, each
//!   bounded by a timeout. A clean tree skips the commit instead of failing.
//! * [`Deployer::launch`] starts the deploy script detached, with stdout and
//!   stderr appended to a fresh `deploy-<utc timestamp>.log` in the log directory.
//!   The exit status is only logged, never awaited by the caller.

use chrono::{DateTime, Local, Utc};
use showcase_core::clock::MonotonicMillis;
use showcase_core::prelude::*;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{error, info, warn};

#[derive(Clone, Debug)]
pub struct ShellDeployerConfig {
    /// Working tree the git commands and the deploy script run in.
    pub repo_dir: PathBuf,
    /// Relative paths resolve against `repo_dir`.
    pub script: PathBuf,
    pub interpreter: String,
    /// Relative paths resolve against `repo_dir`.
    pub log_dir: PathBuf,
    pub remote: String,
    pub branch: String,
    /// Program invoked for git commands. Defaults to `git` on the `PATH`.
    pub git: PathBuf,
    /// Upper bound for every git command.
    pub command_timeout: Duration,
}

impl Default for ShellDeployerConfig {
    fn default() -> Self {
        Self {
            repo_dir: PathBuf::from("."),
            script: PathBuf::from("scripts/deploy.sh"),
            interpreter: "bash".to_string(),
            log_dir: PathBuf::from("logs"),
            remote: "origin".to_string(),
            branch: "master".to_string(),
            git: PathBuf::from("git"),
            command_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ShellDeployer {
    config: ShellDeployerConfig,
    clock: Arc<MonotonicMillis>,
}

struct CommandOutput {
    stdout: String,
    stderr: String,
}

impl ShellDeployer {
    pub fn new(config: ShellDeployerConfig) -> Self {
        Self {
            config,
            clock: Arc::new(MonotonicMillis::new()),
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.config.repo_dir.join(&self.config.log_dir)
    }

    async fn git(&self, args: &[&str]) -> Result<CommandOutput, DeployError> {
        let command = format!("git {}", args.join(" "));
        info!("Running {command}");

        let mut cmd = Command::new(&self.config.git);
        cmd.args(args)
            .current_dir(&self.config.repo_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.config.command_timeout, cmd.output())
            .await
            .map_err(|_| DeployError::Timeout {
                command: command.clone(),
                timeout: self.config.command_timeout,
            })?
            .map_err(|source| DeployError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if output.status.success() {
            Ok(CommandOutput { stdout, stderr })
        } else {
            // git reports "nothing to commit" on stdout, keep both streams.
            let detail = [stderr.trim(), stdout.trim()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            Err(DeployError::CommandFailed {
                command,
                stderr: detail,
            })
        }
    }

    async fn create_log_file(&self, dir: &Path) -> Result<(String, std::fs::File), DeployError> {
        tokio::fs::create_dir_all(dir).await?;

        // UTC keeps names ordered across DST changes; the clock keeps launches
        // from one process apart. Sequenced names cover other writers.
        let stamp = DateTime::from_timestamp_millis(self.clock.next()).unwrap_or_else(Utc::now);
        let base = log_file_name(&stamp);
        for attempt in 0..100 {
            let name = match attempt {
                0 => base.clone(),
                n => log_file_name_with_sequence(&base, n),
            };
            let opened = std::fs::OpenOptions::new()
                .append(true)
                .create_new(true)
                .open(dir.join(&name));
            match opened {
                Ok(file) => return Ok((name, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(DeployError::Io(e)),
            }
        }
        Err(DeployError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            "no free deploy log name",
        )))
    }
}

impl Deployer for ShellDeployer {
    async fn launch(&self) -> Result<LaunchReceipt, DeployError> {
        let (log_file, file) = self.create_log_file(&self.log_dir()).await?;
        {
            use std::io::Write;
            let mut header = &file;
            writeln!(
                header,
                "==> {} {} ({})",
                self.config.interpreter,
                self.config.script.display(),
                Local::now().to_rfc3339()
            )?;
        }
        let stderr = file.try_clone()?;

        let command = format!("{} {}", self.config.interpreter, self.config.script.display());
        let mut child = Command::new(&self.config.interpreter)
            .arg(&self.config.script)
            .current_dir(&self.config.repo_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(file))
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|source| DeployError::Spawn {
                command: command.clone(),
                source,
            })?;

        let pid = child.id();
        let log = log_file.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => info!(%log, "Deploy finished"),
                Ok(status) => warn!(%log, "Deploy exited with {status}"),
                Err(e) => error!(%log, "Failed to wait for deploy: {e}"),
            }
        });

        Ok(LaunchReceipt { log_file, pid })
    }

    async fn push(&self) -> Result<PushReport, DeployError> {
        let commit_message = commit_message(&Local::now());

        self.git(&["add", "."]).await?;

        let committed = match self.git(&["commit", "-m", &commit_message]).await {
            Ok(_) => true,
            Err(DeployError::CommandFailed { stderr, .. })
                if stderr.contains(NOTHING_TO_COMMIT) =>
            {
                info!("Nothing to commit, pushing as is");
                false
            }
            Err(e) => return Err(e),
        };

        let pushed = self
            .git(&["push", &self.config.remote, &self.config.branch])
            .await?;

        Ok(PushReport {
            commit_message,
            committed,
            // git writes push progress to stderr.
            output: format!("{}{}", pushed.stdout, pushed.stderr),
        })
    }
}
