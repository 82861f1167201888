//! Backend process supervision.
//!
//! # Responsibilities
//! - Launch exactly one backend as a process group leader
//! - Inject the mode/port environment and working directory
//! - Drain backend output into the shim log
//! - Terminate the whole process group on stop or drop

use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::backend::env::BackendEnv;
use crate::backend::Backend;
use crate::config::BackendConfig;

const REAP_POLL: Duration = Duration::from_millis(50);

/// Error type for supervisor operations.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("backend already running with pid {0}")]
    AlreadyRunning(u32),

    #[error("project root {0:?} is not a directory")]
    ProjectRoot(PathBuf),

    #[error("failed to launch {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Owns the lifecycle of the single local backend process.
#[derive(Debug)]
pub struct Supervisor {
    config: BackendConfig,
    child: Mutex<Option<Child>>,
}

impl Supervisor {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            child: Mutex::new(None),
        }
    }

    /// Launch the backend and return its pid.
    ///
    /// A previous backend that has already exited is replaced; a live one is
    /// an error.
    pub fn start(&self) -> Result<u32, SupervisorError> {
        let mut slot = self.lock();
        if let Some(child) = slot.as_mut() {
            if matches!(child.try_wait(), Ok(None)) {
                return Err(SupervisorError::AlreadyRunning(child.id()));
            }
        }

        let root = &self.config.project_root;
        if !root.is_dir() {
            return Err(SupervisorError::ProjectRoot(root.clone()));
        }

        let env = BackendEnv::inherit().with_overrides(&self.config);
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .current_dir(root)
            .env_clear()
            .envs(env.iter())
            .stdin(Stdio::null());

        if self.config.capture_output {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|source| SupervisorError::Spawn {
            program: self.config.program.clone(),
            source,
        })?;
        let pid = child.id();

        if let Some(stdout) = child.stdout.take() {
            drain_output(pid, "stdout", stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            drain_output(pid, "stderr", stderr);
        }

        tracing::info!(
            pid,
            program = %self.config.program,
            port = self.config.port,
            project_root = ?root,
            "Backend started"
        );

        *slot = Some(child);
        Ok(pid)
    }

    /// Terminate the backend's process group, if one was started.
    ///
    /// Errors are ignored and repeated calls are no-ops. The child is reaped;
    /// if it outlives the grace period the group is killed outright.
    pub fn stop(&self) {
        let Some(mut child) = self.lock().take() else {
            return;
        };
        let pid = child.id();

        if let Err(e) = terminate_group(&mut child) {
            tracing::debug!(pid, error = %e, "Ignoring failure to signal backend");
        }

        match wait_with_grace(&mut child, self.config.stop_grace()) {
            Some(status) => tracing::info!(pid, %status, "Backend stopped"),
            None => {
                tracing::warn!(pid, "Backend still running after grace period, killing process group");
                let _ = kill_group(&mut child);
                let _ = child.wait();
            }
        }
    }

    /// Whether a started backend is still alive.
    pub fn is_running(&self) -> bool {
        match self.lock().as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.lock().as_ref().map(Child::id)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Child>> {
        self.child.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Backend for Supervisor {
    fn port(&self) -> u16 {
        self.config.port
    }

    fn stop(&self) {
        Supervisor::stop(self);
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Forward each line the backend writes into the log.
fn drain_output<R>(pid: u32, stream: &'static str, reader: R)
where
    R: Read + Send + 'static,
{
    let spawned = thread::Builder::new()
        .name(format!("backend-{stream}"))
        .spawn(move || {
            for line in BufReader::new(reader).lines() {
                let Ok(line) = line else { break };
                if stream == "stderr" {
                    tracing::warn!(target: "backend", pid, stream, "{line}");
                } else {
                    tracing::info!(target: "backend", pid, stream, "{line}");
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(pid, stream, error = %e, "Failed to start output drain");
    }
}

fn wait_with_grace(child: &mut Child, grace: Duration) -> Option<ExitStatus> {
    let deadline = Instant::now() + grace;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) => {}
            Err(_) => return None,
        }
        if Instant::now() >= deadline {
            return None;
        }
        thread::sleep(REAP_POLL);
    }
}

#[cfg(unix)]
fn terminate_group(child: &mut Child) -> io::Result<()> {
    signal_group(child.id(), libc::SIGTERM)
}

#[cfg(unix)]
fn kill_group(child: &mut Child) -> io::Result<()> {
    signal_group(child.id(), libc::SIGKILL)
}

/// The child was spawned with `process_group(0)`, so its pid is the group id.
#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) -> io::Result<()> {
    let pgid = libc::pid_t::try_from(pid).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
    // SAFETY: killpg takes plain integers and touches no memory we own.
    if unsafe { libc::killpg(pgid, signal) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn terminate_group(child: &mut Child) -> io::Result<()> {
    child.kill()
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) -> io::Result<()> {
    child.kill()
}
