//! # Plugin Runner
//!
//! Owns the lifecycle of a single plugin process.
//!
//! ```text
//! [PENDING] ──start──→ [RUNNING] ──exit / kill──→ [EXITED(status)]
//!     │
//!     └──spawn failure──→ [EXITED(None)]
//! ```
//!
//! The state lives behind a `watch` channel. `kill` holds the read side
//! while it checks for `RUNNING` and raises the kill notification, and the
//! owning task takes the write side to record the exit, so a kill can never
//! signal a process whose exit has already been recorded.
//!
//! The child leads its own process group and a kill signals the whole
//! group, so helpers forked by a wrapper script go down with it. Output
//! forwarding gets [`OUTPUT_DRAIN_TIMEOUT`] after the exit is recorded.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use garden_telemetry::{metric_inc, PLUGINS_KILLED};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How long captured output may keep draining once the child is gone.
pub const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Lifecycle state of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// `start` has not been called.
    Pending,
    /// The child process is alive.
    Running { pid: Option<u32> },
    /// The child is gone. `None` when it never started.
    Exited(Option<ExitStatus>),
}

impl RunnerState {
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Runs one plugin entry point as a child process.
///
/// Arguments, working directory and environment are supplied by the caller.
/// The environment is layered over this process's own.
#[derive(Debug)]
pub struct PluginRunner {
    unique_name: String,
    args: Vec<String>,
    cwd: PathBuf,
    env: HashMap<String, String>,
    state: watch::Sender<RunnerState>,
    kill_requested: Notify,
}

impl PluginRunner {
    pub fn new(
        unique_name: impl Into<String>,
        args: Vec<String>,
        cwd: impl Into<PathBuf>,
        env: HashMap<String, String>,
    ) -> Self {
        let (state, _) = watch::channel(RunnerState::Pending);
        Self {
            unique_name: unique_name.into(),
            args,
            cwd: cwd.into(),
            env,
            state,
            kill_requested: Notify::new(),
        }
    }

    #[must_use]
    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    #[must_use]
    pub fn state(&self) -> RunnerState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// Exit status once the child is gone; `None` while pending, running,
    /// or when the spawn failed.
    #[must_use]
    pub fn exit_status(&self) -> Option<ExitStatus> {
        match self.state() {
            RunnerState::Exited(status) => status,
            _ => None,
        }
    }

    /// Wait until `start` has either spawned the child or given up.
    pub async fn wait_started(&self) {
        let mut rx = self.state.subscribe();
        // Err only if the sender is gone, which cannot outlive `self`.
        let _ = rx.wait_for(|state| *state != RunnerState::Pending).await;
    }

    /// Wait until the child is gone.
    pub async fn wait_exited(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx
            .wait_for(|state| matches!(state, RunnerState::Exited(_)))
            .await;
    }

    /// Spawn the plugin and wait for it to exit or be killed.
    ///
    /// Never fails: spawn and runtime errors are logged and the runner
    /// ends up `EXITED`.
    pub async fn start(&self) {
        if self.state() != RunnerState::Pending {
            warn!(plugin = %self.unique_name, "Runner already started");
            return;
        }

        info!(plugin = %self.unique_name, args = ?self.args, "Starting plugin");

        let Some((program, rest)) = self.args.split_first() else {
            error!(plugin = %self.unique_name, "Plugin has no entry point");
            self.state.send_replace(RunnerState::Exited(None));
            return;
        };

        let mut command = Command::new(program);
        command
            .args(rest)
            .current_dir(&self.cwd)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!(plugin = %self.unique_name, error = %e, "Plugin died");
                self.state.send_replace(RunnerState::Exited(None));
                return;
            }
        };

        let forwarders: Vec<JoinHandle<()>> = [
            child
                .stdout
                .take()
                .map(|out| self.forward(out, Stream::Stdout)),
            child
                .stderr
                .take()
                .map(|err| self.forward(err, Stream::Stderr)),
        ]
        .into_iter()
        .flatten()
        .collect();

        self.state
            .send_replace(RunnerState::Running { pid: child.id() });

        let result = tokio::select! {
            result = child.wait() => result,
            _ = self.kill_requested.notified() => {
                self.signal(&mut child);
                child.wait().await
            }
        };

        match result {
            Ok(status) => {
                self.state.send_replace(RunnerState::Exited(Some(status)));
                info!(plugin = %self.unique_name, %status, "Plugin is officially stopped");
            }
            Err(e) => {
                self.state.send_replace(RunnerState::Exited(None));
                error!(plugin = %self.unique_name, error = %e, "Plugin died");
            }
        }

        // A daemonized grandchild may still hold the pipes open.
        for forwarder in forwarders {
            let abort = forwarder.abort_handle();
            if tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, forwarder).await.is_err() {
                debug!(plugin = %self.unique_name, "Output still open after exit; detaching");
                abort.abort();
            }
        }
    }

    /// Record that the owning task was torn down before `start` returned.
    pub(crate) fn mark_abandoned(&self) {
        self.state.send_if_modified(|state| {
            if matches!(state, RunnerState::Exited(_)) {
                return false;
            }
            *state = RunnerState::Exited(None);
            true
        });
    }

    /// Send SIGKILL to the child's process group, falling back to the
    /// child alone.
    fn signal(&self, child: &mut Child) {
        #[cfg(unix)]
        {
            if let Some(pid) = child.id() {
                // The child called setpgid(0, 0), so its pid is the group id.
                let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
                if rc == 0 {
                    return;
                }
                let e = std::io::Error::last_os_error();
                warn!(plugin = %self.unique_name, error = %e,
                    "Group kill failed; killing the child only");
            }
        }

        if let Err(e) = child.start_kill() {
            warn!(plugin = %self.unique_name, error = %e, "Kill signal failed");
        }
    }

    /// Forcibly terminate the child if it is still alive.
    ///
    /// Safe to call at any time and from any task. Returns whether a kill
    /// was requested.
    pub fn kill(&self) -> bool {
        let state = self.state.borrow();
        if !state.is_running() {
            debug!(plugin = %self.unique_name, state = ?*state, "Kill ignored; plugin not running");
            return false;
        }

        warn!(plugin = %self.unique_name, "About to kill plugin");
        metric_inc!(PLUGINS_KILLED);
        self.kill_requested.notify_one();
        true
    }

    fn forward<R>(&self, reader: R, stream: Stream) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let plugin = self.unique_name.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match stream {
                        Stream::Stdout => info!(plugin = %plugin, "{line}"),
                        Stream::Stderr => warn!(plugin = %plugin, "{line}"),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        debug!(plugin = %plugin, ?stream, error = %e, "Plugin output closed");
                        break;
                    }
                }
            }
        })
    }
}
